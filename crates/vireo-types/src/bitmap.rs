//! The bitmap kind: indivisible basic types as a fixed-width bitset.
//!
//! Union, intersection, and difference are plain bitwise operations. The
//! `NOT_SET` bit is internal: it encodes "key may be absent" inside map
//! field values and must never appear in a user-visible type, so it is
//! excluded from [`Bitmap::TOP`].

use bitflags::bitflags;
use vireo_ast::Basic;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Bitmap: u16 {
        const BINARY = 1;
        const EMPTY_LIST = 1 << 1;
        const INTEGER = 1 << 2;
        const FLOAT = 1 << 3;
        const PID = 1 << 4;
        const PORT = 1 << 5;
        const REFERENCE = 1 << 6;
        const NON_EMPTY_LIST = 1 << 7;
        const TUPLE = 1 << 8;
        const FUN = 1 << 9;
        /// Internal field-value marker, never part of TOP.
        const NOT_SET = 1 << 10;
    }
}

impl Bitmap {
    /// All user-visible basic types.
    pub const TOP: Bitmap = Bitmap::from_bits_truncate(0x3ff);

    pub fn bit_of(basic: Basic) -> Bitmap {
        match basic {
            Basic::Binary => Bitmap::BINARY,
            Basic::EmptyList => Bitmap::EMPTY_LIST,
            Basic::Integer => Bitmap::INTEGER,
            Basic::Float => Bitmap::FLOAT,
            Basic::Pid => Bitmap::PID,
            Basic::Port => Bitmap::PORT,
            Basic::Reference => Bitmap::REFERENCE,
            Basic::NonEmptyList => Bitmap::NON_EMPTY_LIST,
            Basic::Tuple => Bitmap::TUPLE,
            Basic::Fun => Bitmap::FUN,
        }
    }

    /// The user-visible basic types present, in quoting order.
    pub fn basics(self) -> Vec<Basic> {
        Basic::ALL
            .into_iter()
            .filter(|basic| self.contains(Bitmap::bit_of(*basic)))
            .collect()
    }
}
