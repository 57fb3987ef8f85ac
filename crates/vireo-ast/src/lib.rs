//! Neutral type-expression AST for vireo.
//!
//! This crate defines the structured form shared by the two public boundaries
//! of the engine: the recursive builder consumes [`TypeExpr`] values as
//! equation bodies, and quoting produces them back from normalized
//! descriptors. The AST is deliberately neutral — it carries no source
//! locations and no host-language syntax, only the set-theoretic shape.
//!
//! Everything here derives [`serde::Serialize`] so external tooling can
//! consume quoted types as structured data.

use std::fmt;

use serde::Serialize;

/// An atom, map key, or recursion-variable name.
///
/// Uses String for now; can switch to interned strings later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Basic types
// ---------------------------------------------------------------------------

/// The indivisible basic types. Each corresponds to one bit of the bitmap
/// kind; the order here is the order quoting enumerates them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Basic {
    Binary,
    EmptyList,
    Integer,
    Float,
    Pid,
    Port,
    Reference,
    NonEmptyList,
    Tuple,
    Fun,
}

impl Basic {
    pub const ALL: [Basic; 10] = [
        Basic::Binary,
        Basic::EmptyList,
        Basic::Integer,
        Basic::Float,
        Basic::Pid,
        Basic::Port,
        Basic::Reference,
        Basic::NonEmptyList,
        Basic::Tuple,
        Basic::Fun,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Basic::Binary => "binary",
            Basic::EmptyList => "empty_list",
            Basic::Integer => "integer",
            Basic::Float => "float",
            Basic::Pid => "pid",
            Basic::Port => "port",
            Basic::Reference => "reference",
            Basic::NonEmptyList => "non_empty_list",
            Basic::Tuple => "tuple",
            Basic::Fun => "fun",
        }
    }
}

// ---------------------------------------------------------------------------
// Type expressions
// ---------------------------------------------------------------------------

/// How a map field participates in a literal.
///
/// `IfSet` marks an optional key (the value type when present); `NotSet`
/// asserts the key is absent. Both render with explicit markers so the
/// quoted form stays unambiguous.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldExpr {
    Value(TypeExpr),
    IfSet(TypeExpr),
    NotSet,
}

/// A set-theoretic type expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    /// The top type.
    Term,
    /// The empty type.
    None,
    /// All atoms.
    AtomTop,
    /// The top gradual type, `dynamic()`.
    DynamicTop,
    /// One indivisible basic type.
    Basic(Basic),
    /// A single atom, e.g. `:ok`.
    Atom(Symbol),
    /// A recursion variable bound by the enclosing equation system.
    Var(Symbol),
    /// Union of two or more members.
    Union(Vec<TypeExpr>),
    /// Intersection of two or more members.
    Inter(Vec<TypeExpr>),
    Negation(Box<TypeExpr>),
    /// A gradual type with the given upper bound.
    Dynamic(Box<TypeExpr>),
    /// A map literal; `open` admits unknown extra keys.
    Map {
        fields: Vec<(Symbol, FieldExpr)>,
        open: bool,
    },
    /// A tuple. Tuples are indivisible in the engine: element expressions
    /// are validated but their types are not tracked.
    Tuple(Vec<TypeExpr>),
}

impl TypeExpr {
    pub fn negation(inner: TypeExpr) -> TypeExpr {
        TypeExpr::Negation(Box::new(inner))
    }

    pub fn dynamic(inner: TypeExpr) -> TypeExpr {
        TypeExpr::Dynamic(Box::new(inner))
    }

    /// Binding strength for rendering: `or` < `and` < `not` < leaf.
    fn precedence(&self) -> u8 {
        match self {
            TypeExpr::Union(_) => 1,
            TypeExpr::Inter(_) => 2,
            TypeExpr::Negation(_) => 3,
            _ => 4,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        if self.precedence() < parent {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Term => write!(f, "term()"),
            TypeExpr::None => write!(f, "none()"),
            TypeExpr::AtomTop => write!(f, "atom()"),
            TypeExpr::DynamicTop => write!(f, "dynamic()"),
            TypeExpr::Basic(basic) => write!(f, "{}()", basic.name()),
            TypeExpr::Atom(name) => write!(f, ":{name}"),
            TypeExpr::Var(name) => write!(f, "{name}"),
            TypeExpr::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    member.fmt_child(f, 2)?;
                }
                Ok(())
            }
            TypeExpr::Inter(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    member.fmt_child(f, 3)?;
                }
                Ok(())
            }
            TypeExpr::Negation(inner) => {
                write!(f, "not ")?;
                inner.fmt_child(f, 4)
            }
            TypeExpr::Dynamic(inner) => write!(f, "dynamic({inner})"),
            TypeExpr::Map { fields, open } => {
                write!(f, "%{{")?;
                for (i, (key, field)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match field {
                        FieldExpr::Value(value) => write!(f, "{key}: {value}")?,
                        FieldExpr::IfSet(value) => write!(f, "{key}: if_set({value})")?,
                        FieldExpr::NotSet => write!(f, "{key}: not_set()")?,
                    }
                }
                if *open {
                    if !fields.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "..")?;
                }
                write!(f, "}}")
            }
            TypeExpr::Tuple(elements) => {
                write!(f, "{{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_display_is_bare() {
        assert_eq!(Symbol::new("ok").to_string(), "ok");
    }

    #[test]
    fn atom_renders_with_colon() {
        assert_eq!(TypeExpr::Atom(Symbol::new("ok")).to_string(), ":ok");
    }

    #[test]
    fn union_renders_infix() {
        let expr = TypeExpr::Union(vec![
            TypeExpr::Basic(Basic::Integer),
            TypeExpr::Basic(Basic::Float),
        ]);
        assert_eq!(expr.to_string(), "integer() or float()");
    }

    #[test]
    fn intersection_parenthesizes_nested_union() {
        let expr = TypeExpr::Inter(vec![
            TypeExpr::AtomTop,
            TypeExpr::negation(TypeExpr::Union(vec![
                TypeExpr::Atom(Symbol::new("a")),
                TypeExpr::Atom(Symbol::new("b")),
            ])),
        ]);
        assert_eq!(expr.to_string(), "atom() and not (:a or :b)");
    }

    #[test]
    fn map_renders_markers_and_openness() {
        let expr = TypeExpr::Map {
            fields: vec![
                (Symbol::new("a"), FieldExpr::Value(TypeExpr::Basic(Basic::Integer))),
                (Symbol::new("b"), FieldExpr::IfSet(TypeExpr::Basic(Basic::Float))),
                (Symbol::new("c"), FieldExpr::NotSet),
            ],
            open: true,
        };
        assert_eq!(
            expr.to_string(),
            "%{a: integer(), b: if_set(float()), c: not_set(), ..}"
        );
    }

    #[test]
    fn closed_empty_map_has_no_dots() {
        let expr = TypeExpr::Map { fields: vec![], open: false };
        assert_eq!(expr.to_string(), "%{}");
        let open = TypeExpr::Map { fields: vec![], open: true };
        assert_eq!(open.to_string(), "%{..}");
    }
}
