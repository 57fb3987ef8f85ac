//! Set-theoretic type descriptors for vireo.
//!
//! This crate is the core of the engine. A [`Descr`] denotes a set of
//! runtime values, partitioned by kind: a bitmap of indivisible basic
//! types, a finite/cofinite atom set, a BDD of map literals, and an
//! optional `dynamic` entry that makes the descriptor *gradual* — the
//! dynamic part is the runtime upper bound, the rest the static lower
//! bound, and the constructor pipeline maintains `static ⊆ dynamic`.
//!
//! All operations are pure: descriptors are immutable and every operation
//! returns a fresh value. Recursive types go through the node layer
//! ([`Node`], [`build_recursive`]); emptiness and subtyping over nodes are
//! decided coinductively with memoization on node identities.
//!
//! Kind values are kept normalized: a kind that denotes the empty set of
//! its kind is absent from the descriptor (the map BDD is the one
//! exception — a non-`False` BDD may still denote the empty set, which is
//! what the emptiness procedure decides).

use std::collections::BTreeSet;
use std::fmt;

mod atom;
mod bdd;
mod bitmap;
mod builder;
mod map;
mod node;
mod quote;

pub use atom::AtomSet;
pub use bdd::Bdd;
pub use bitmap::Bitmap;
pub use builder::{build_recursive, from_quoted};
pub use map::{optional, required, MapField};
pub use node::{to_node, Gen, Node, NodeId, State};
pub use vireo_ast::{Basic, FieldExpr, Symbol, TypeExpr};

use map::MapLiteral;
use node::Seen;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a map query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// The descriptor is not known to be a map.
    BadMap,
    /// The key is not guaranteed to be present.
    BadKey,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::BadMap => write!(f, "not a map type"),
            MapError::BadKey => write!(f, "key is not guaranteed to be present"),
        }
    }
}

impl std::error::Error for MapError {}

/// Failure of the recursive builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    UnboundVar(Symbol),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnboundVar(name) => {
                write!(f, "unbound recursion variable `{name}`")
            }
        }
    }
}

impl std::error::Error for BuildError {}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// An immutable set-theoretic type, partitioned by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descr {
    pub(crate) bitmap: Bitmap,
    pub(crate) atoms: Option<AtomSet>,
    pub(crate) maps: Option<Bdd<MapLiteral>>,
    pub(crate) dynamic: Option<Box<Descr>>,
}

impl Default for Descr {
    fn default() -> Descr {
        none()
    }
}

impl fmt::Display for Descr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_quoted())
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// The empty type.
pub fn none() -> Descr {
    Descr {
        bitmap: Bitmap::empty(),
        atoms: None,
        maps: None,
        dynamic: None,
    }
}

/// The top type.
pub fn term() -> Descr {
    Descr {
        bitmap: Bitmap::TOP,
        atoms: Some(AtomSet::top()),
        maps: Some(Bdd::True),
        dynamic: None,
    }
}

/// The top gradual type: anything at runtime, nothing statically.
pub fn dynamic() -> Descr {
    dynamic_of(term())
}

/// A gradual type upper-bounded by `descr` at runtime.
pub fn dynamic_of(descr: Descr) -> Descr {
    let bound = match descr.dynamic {
        Some(inner) => *inner,
        None => descr,
    };
    Descr {
        dynamic: Some(Box::new(bound)),
        ..none()
    }
}

pub fn binary() -> Descr {
    Descr::from_bitmap(Bitmap::BINARY)
}

pub fn empty_list() -> Descr {
    Descr::from_bitmap(Bitmap::EMPTY_LIST)
}

pub fn integer() -> Descr {
    Descr::from_bitmap(Bitmap::INTEGER)
}

pub fn float() -> Descr {
    Descr::from_bitmap(Bitmap::FLOAT)
}

pub fn pid() -> Descr {
    Descr::from_bitmap(Bitmap::PID)
}

pub fn port() -> Descr {
    Descr::from_bitmap(Bitmap::PORT)
}

pub fn reference() -> Descr {
    Descr::from_bitmap(Bitmap::REFERENCE)
}

pub fn non_empty_list() -> Descr {
    Descr::from_bitmap(Bitmap::NON_EMPTY_LIST)
}

pub fn tuple() -> Descr {
    Descr::from_bitmap(Bitmap::TUPLE)
}

pub fn fun() -> Descr {
    Descr::from_bitmap(Bitmap::FUN)
}

/// All atoms.
pub fn atom() -> Descr {
    Descr {
        atoms: Some(AtomSet::top()),
        ..none()
    }
}

/// Exactly the given atoms; the empty set collapses to `none()`.
pub fn atoms<I, S>(atoms: I) -> Descr
where
    I: IntoIterator<Item = S>,
    S: Into<Symbol>,
{
    match AtomSet::finite(atoms) {
        Some(set) => Descr {
            atoms: Some(set),
            ..none()
        },
        None => none(),
    }
}

pub fn boolean() -> Descr {
    atoms(["false", "true"])
}

/// A map admitting unknown extra keys beyond the declared fields.
pub fn open_map<K, I>(fields: I) -> Descr
where
    K: Into<Symbol>,
    I: IntoIterator<Item = (K, MapField)>,
{
    map_descr(map::MapTag::Open, fields)
}

/// A map with exactly the declared fields.
pub fn closed_map<K, I>(fields: I) -> Descr
where
    K: Into<Symbol>,
    I: IntoIterator<Item = (K, MapField)>,
{
    map_descr(map::MapTag::Closed, fields)
}

fn map_descr<K, I>(tag: map::MapTag, fields: I) -> Descr
where
    K: Into<Symbol>,
    I: IntoIterator<Item = (K, MapField)>,
{
    Descr::from_map_literal(MapLiteral {
        tag,
        fields: fields
            .into_iter()
            .map(|(key, field)| (key.into(), field))
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Kind-pointwise operations
// ---------------------------------------------------------------------------

fn non_false(bdd: Bdd<MapLiteral>) -> Option<Bdd<MapLiteral>> {
    if bdd == Bdd::False { None } else { Some(bdd) }
}

fn union_static(a: &Descr, b: &Descr) -> Descr {
    Descr {
        bitmap: a.bitmap | b.bitmap,
        atoms: match (&a.atoms, &b.atoms) {
            (Some(x), Some(y)) => Some(x.union(y)),
            (Some(x), None) | (None, Some(x)) => Some(x.clone()),
            (None, None) => None,
        },
        maps: match (&a.maps, &b.maps) {
            (Some(x), Some(y)) => non_false(x.union(y)),
            (Some(x), None) | (None, Some(x)) => Some(x.clone()),
            (None, None) => None,
        },
        dynamic: None,
    }
}

fn inter_static(a: &Descr, b: &Descr) -> Descr {
    Descr {
        bitmap: a.bitmap & b.bitmap,
        atoms: match (&a.atoms, &b.atoms) {
            (Some(x), Some(y)) => x.intersection(y),
            _ => None,
        },
        maps: match (&a.maps, &b.maps) {
            (Some(x), Some(y)) => non_false(x.intersection(y)),
            _ => None,
        },
        dynamic: None,
    }
}

fn diff_static(a: &Descr, b: &Descr) -> Descr {
    Descr {
        bitmap: a.bitmap.difference(b.bitmap),
        atoms: match (&a.atoms, &b.atoms) {
            (None, _) => None,
            (Some(x), None) => Some(x.clone()),
            (Some(x), Some(y)) => x.difference(y),
        },
        maps: match (&a.maps, &b.maps) {
            (None, _) => None,
            (Some(x), None) => Some(x.clone()),
            (Some(x), Some(y)) => non_false(x.difference(y)),
        },
        dynamic: None,
    }
}

fn subtype_static(left: &Descr, right: &Descr) -> bool {
    let mut seen = Seen::new();
    descr_empty(&diff_static(left, right), &mut seen)
}

/// Emptiness with the caller's memoization set; node traversals re-enter
/// here. A gradual descriptor is empty iff its upper bound is.
pub(crate) fn descr_empty(descr: &Descr, seen: &mut Seen) -> bool {
    let upper = match &descr.dynamic {
        Some(dynamic) => &**dynamic,
        None => descr,
    };
    upper.bitmap.is_empty()
        && upper.atoms.is_none()
        && match &upper.maps {
            None => true,
            Some(bdd) => !map::map_not_empty(bdd, seen),
        }
}

// ---------------------------------------------------------------------------
// The descriptor API
// ---------------------------------------------------------------------------

impl Descr {
    pub(crate) fn from_bitmap(bitmap: Bitmap) -> Descr {
        Descr { bitmap, ..none() }
    }

    pub(crate) fn from_map_literal(literal: MapLiteral) -> Descr {
        Descr {
            maps: Some(Bdd::single(literal)),
            ..none()
        }
    }

    pub fn is_gradual(&self) -> bool {
        self.dynamic.is_some()
    }

    /// The static lower bound: the descriptor without its dynamic entry.
    pub(crate) fn static_part(&self) -> Descr {
        Descr {
            dynamic: None,
            ..self.clone()
        }
    }

    /// The runtime upper bound: the dynamic entry, or the whole descriptor
    /// when it is purely static.
    pub(crate) fn dynamic_part(&self) -> Descr {
        match &self.dynamic {
            Some(dynamic) => (**dynamic).clone(),
            None => self.clone(),
        }
    }

    pub(crate) fn has_no_kinds(&self) -> bool {
        self.bitmap.is_empty()
            && self.atoms.is_none()
            && self.maps.is_none()
            && self.dynamic.is_none()
    }

    /// No kinds beyond the map kind (which itself may be absent).
    fn map_only(&self) -> bool {
        self.bitmap.is_empty() && self.atoms.is_none() && self.dynamic.is_none()
    }

    pub fn union(&self, other: &Descr) -> Descr {
        if !self.is_gradual() && !other.is_gradual() {
            return union_static(self, other);
        }
        let dynamic = union_static(&self.dynamic_part(), &other.dynamic_part());
        Descr {
            dynamic: Some(Box::new(dynamic)),
            ..union_static(&self.static_part(), &other.static_part())
        }
    }

    pub fn intersection(&self, other: &Descr) -> Descr {
        if !self.is_gradual() && !other.is_gradual() {
            return inter_static(self, other);
        }
        let dynamic = inter_static(&self.dynamic_part(), &other.dynamic_part());
        Descr {
            dynamic: Some(Box::new(dynamic)),
            ..inter_static(&self.static_part(), &other.static_part())
        }
    }

    /// Difference. For gradual operands the bounds cross — upper minus the
    /// other's lower, lower minus the other's upper — which is the reading
    /// that preserves `static ⊆ dynamic`.
    pub fn difference(&self, other: &Descr) -> Descr {
        if !self.is_gradual() && !other.is_gradual() {
            return diff_static(self, other);
        }
        let dynamic = diff_static(&self.dynamic_part(), &other.static_part());
        Descr {
            dynamic: Some(Box::new(dynamic)),
            ..diff_static(&self.static_part(), &other.dynamic_part())
        }
    }

    pub fn negation(&self) -> Descr {
        term().difference(self)
    }

    pub fn is_empty(&self) -> bool {
        let mut seen = Seen::new();
        descr_empty(self, &mut seen)
    }

    pub fn is_term(&self) -> bool {
        term().subtype_of(self)
    }

    /// Set-theoretic subtyping: lower bounds and upper bounds must each be
    /// included. For purely static operands this is plain inclusion; with
    /// one gradual side it reduces to the asymmetric gradual rules.
    pub fn subtype_of(&self, other: &Descr) -> bool {
        if !self.is_gradual() && !other.is_gradual() {
            return subtype_static(self, other);
        }
        subtype_static(&self.static_part(), &other.static_part())
            && subtype_static(&self.dynamic_part(), &other.dynamic_part())
    }

    pub fn equivalent(&self, other: &Descr) -> bool {
        self == other || (self.subtype_of(other) && other.subtype_of(self))
    }

    pub fn intersects(&self, other: &Descr) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Compatibility of an input with an expected type under gradual
    /// typing: a non-empty static part must fit the expected upper bound;
    /// a purely dynamic input only needs overlapping upper bounds.
    pub fn compatible_with(&self, expected: &Descr) -> bool {
        let input_static = self.static_part();
        let expected_dynamic = expected.dynamic_part();
        if input_static.is_empty() {
            let mut seen = Seen::new();
            !descr_empty(
                &inter_static(&self.dynamic_part(), &expected_dynamic),
                &mut seen,
            )
        } else {
            subtype_static(&input_static, &expected_dynamic)
        }
    }

    pub fn to_quoted(&self) -> TypeExpr {
        quote::quote(self)
    }

    pub fn to_quoted_string(&self) -> String {
        self.to_quoted().to_string()
    }

    // -- Map queries --------------------------------------------------------

    /// The value type at `key`, when this type is a map that guarantees the
    /// key. Gradual maps yield a gradual value.
    pub fn map_fetch(&self, key: &Symbol) -> Result<Descr, MapError> {
        match &self.dynamic {
            None => {
                if self.maps.is_none() || !self.map_only() {
                    return Err(MapError::BadMap);
                }
                let (optional, value) = fetch_in(&self.maps, key);
                if optional || value.is_empty() {
                    Err(MapError::BadKey)
                } else {
                    Ok(value)
                }
            }
            Some(dynamic) => {
                let static_part = self.static_part();
                if !(dynamic.map_only() && static_part.map_only()) {
                    return Err(MapError::BadMap);
                }
                let (dynamic_optional, dynamic_value) = fetch_in(&dynamic.maps, key);
                let (static_optional, static_value) = fetch_in(&static_part.maps, key);
                if static_optional
                    || dynamic_optional
                    || (dynamic_value.is_empty() && static_value.is_empty())
                {
                    Err(MapError::BadKey)
                } else {
                    Ok(dynamic_of(dynamic_value).union(&static_value))
                }
            }
        }
    }

    /// Panicking variant of [`Descr::map_fetch`] for callers that have
    /// already established the type is a map with the key present.
    pub fn map_get(&self, key: &Symbol) -> Descr {
        match self.map_fetch(key) {
            Ok(value) => value,
            Err(error) => panic!("map_get(:{key}) on `{self}`: {error}"),
        }
    }

    /// Is `key` present in every map of this type? An uninhabited type
    /// guarantees nothing rather than everything.
    pub fn map_has_key(&self, key: &Symbol) -> bool {
        !self.is_empty() && self.subtype_of(&open_map([(key.clone(), required(term()))]))
    }

    /// Is `key` present in at least one map of this type?
    pub fn map_may_have_key(&self, key: &Symbol) -> bool {
        self.intersects(&open_map([(key.clone(), required(term()))]))
    }

    /// The atom type of keys guaranteed to be present.
    pub fn map_keys(&self) -> Descr {
        // The BDD may survive operations that empty the type semantically
        // (only literal-equal branches collapse structurally), and every
        // key is vacuously guaranteed by an uninhabited type.
        if self.is_empty() {
            return none();
        }
        let mut candidates = BTreeSet::new();
        if let Some(bdd) = &self.maps {
            candidates.extend(map::candidate_keys(bdd));
        }
        if let Some(dynamic) = &self.dynamic {
            if let Some(bdd) = &dynamic.maps {
                candidates.extend(map::candidate_keys(bdd));
            }
        }
        let guaranteed: Vec<Symbol> = candidates
            .into_iter()
            .filter(|key| self.map_has_key(key))
            .collect();
        atoms(guaranteed)
    }
}

fn fetch_in(maps: &Option<Bdd<MapLiteral>>, key: &Symbol) -> (bool, Descr) {
    match maps {
        None => (false, none()),
        Some(bdd) => map::fetch_static(bdd, key),
    }
}

#[cfg(test)]
mod descr_tests;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
