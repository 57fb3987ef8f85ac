//! Recursive type construction.
//!
//! `build_recursive` implements the four-step construction for a system of
//! equations `Xᵢ = τᵢ`: translate each body into a generator expression,
//! collect the family into a shared state, materialize one node per
//! equation, and hand the nodes back. Translation pre-evaluates every
//! closed leaf to a constant descriptor; only the recursive structure stays
//! symbolic.
//!
//! Evaluation is one-layer lazy: map fields become embedded nodes carrying
//! the shared state, so a recursion variable guarded by a map constructor
//! never unfolds during `step`. A variable in descriptor position unfolds
//! once, which is why equation bodies must be guarded.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use vireo_ast::{FieldExpr, Symbol, TypeExpr};

use crate::bitmap::Bitmap;
use crate::map::{not_set_descr, MapField, MapLiteral, MapTag, Presence};
use crate::node::{Node, State};
use crate::{atom, atoms, dynamic, dynamic_of, none, term, BuildError, Descr};

/// A type body translated for evaluation against a state.
#[derive(Debug)]
pub(crate) enum GenExpr {
    Const(Descr),
    Var(Symbol),
    Union(Vec<Arc<GenExpr>>),
    Inter(Vec<Arc<GenExpr>>),
    Negation(Arc<GenExpr>),
    Dynamic(Arc<GenExpr>),
    Map {
        tag: MapTag,
        fields: Vec<(Symbol, Presence, Arc<GenExpr>)>,
    },
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Build a system of (mutually) recursive equations, returning one node per
/// equation. Every `Var` in a body must name an equation of the system.
pub fn build_recursive(
    equations: BTreeMap<Symbol, TypeExpr>,
) -> Result<BTreeMap<Symbol, Node>, BuildError> {
    let bound: BTreeSet<Symbol> = equations.keys().cloned().collect();
    for body in equations.values() {
        validate(body, &bound)?;
    }
    let bindings: BTreeMap<Symbol, Arc<GenExpr>> = equations
        .iter()
        .map(|(name, body)| (name.clone(), Arc::new(translate(body))))
        .collect();
    let state = State::with_bindings(bindings);
    let nodes = equations
        .keys()
        .map(|name| {
            let body = state.binding(name).expect("binding was just inserted");
            (name.clone(), state.embedded_node(&body))
        })
        .collect();
    Ok(nodes)
}

/// Evaluate a closed type expression to a descriptor. This is the inverse
/// of quoting for losslessly-rendered types.
pub fn from_quoted(expr: &TypeExpr) -> Result<Descr, BuildError> {
    validate(expr, &BTreeSet::new())?;
    let state = State::with_bindings(BTreeMap::new());
    Ok(eval(&Arc::new(translate(expr)), &state))
}

fn validate(expr: &TypeExpr, bound: &BTreeSet<Symbol>) -> Result<(), BuildError> {
    match expr {
        TypeExpr::Var(name) => {
            if bound.contains(name) {
                Ok(())
            } else {
                Err(BuildError::UnboundVar(name.clone()))
            }
        }
        TypeExpr::Union(members) | TypeExpr::Inter(members) | TypeExpr::Tuple(members) => {
            members.iter().try_for_each(|member| validate(member, bound))
        }
        TypeExpr::Negation(inner) | TypeExpr::Dynamic(inner) => validate(inner, bound),
        TypeExpr::Map { fields, .. } => fields.iter().try_for_each(|(_, field)| match field {
            FieldExpr::Value(value) | FieldExpr::IfSet(value) => validate(value, bound),
            FieldExpr::NotSet => Ok(()),
        }),
        _ => Ok(()),
    }
}

fn translate(expr: &TypeExpr) -> GenExpr {
    match expr {
        TypeExpr::Term => GenExpr::Const(term()),
        TypeExpr::None => GenExpr::Const(none()),
        TypeExpr::AtomTop => GenExpr::Const(atom()),
        TypeExpr::DynamicTop => GenExpr::Const(dynamic()),
        TypeExpr::Basic(basic) => GenExpr::Const(Descr::from_bitmap(Bitmap::bit_of(*basic))),
        TypeExpr::Atom(name) => GenExpr::Const(atoms([name.clone()])),
        TypeExpr::Var(name) => GenExpr::Var(name.clone()),
        TypeExpr::Union(members) => {
            GenExpr::Union(members.iter().map(|m| Arc::new(translate(m))).collect())
        }
        TypeExpr::Inter(members) => {
            GenExpr::Inter(members.iter().map(|m| Arc::new(translate(m))).collect())
        }
        TypeExpr::Negation(inner) => GenExpr::Negation(Arc::new(translate(inner))),
        TypeExpr::Dynamic(inner) => GenExpr::Dynamic(Arc::new(translate(inner))),
        TypeExpr::Map { fields, open } => GenExpr::Map {
            tag: if *open { MapTag::Open } else { MapTag::Closed },
            fields: fields
                .iter()
                .map(|(key, field)| match field {
                    FieldExpr::Value(value) => {
                        (key.clone(), Presence::Required, Arc::new(translate(value)))
                    }
                    FieldExpr::IfSet(value) => {
                        (key.clone(), Presence::Optional, Arc::new(translate(value)))
                    }
                    FieldExpr::NotSet => (
                        key.clone(),
                        Presence::Required,
                        Arc::new(GenExpr::Const(not_set_descr())),
                    ),
                })
                .collect(),
        },
        // Tuples are indivisible: the elements are validated above but not
        // tracked in the type.
        TypeExpr::Tuple(_) => GenExpr::Const(Descr::from_bitmap(Bitmap::TUPLE)),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate one layer of a generator expression. Recursion points become
/// embedded nodes with state-stable ids.
pub(crate) fn eval(expr: &Arc<GenExpr>, state: &State) -> Descr {
    match &**expr {
        GenExpr::Const(descr) => descr.clone(),
        GenExpr::Var(name) => {
            let body = lookup(state, name);
            eval(&body, state)
        }
        GenExpr::Union(members) => members
            .iter()
            .fold(none(), |acc, member| acc.union(&eval(member, state))),
        GenExpr::Inter(members) => members
            .iter()
            .fold(term(), |acc, member| acc.intersection(&eval(member, state))),
        GenExpr::Negation(inner) => eval(inner, state).negation(),
        GenExpr::Dynamic(inner) => dynamic_of(eval(inner, state)),
        GenExpr::Map { tag, fields } => {
            let mut literal_fields = BTreeMap::new();
            for (key, presence, child) in fields {
                let value = embed(state, child);
                literal_fields.insert(
                    key.clone(),
                    MapField {
                        value,
                        presence: *presence,
                    },
                );
            }
            Descr::from_map_literal(MapLiteral {
                tag: *tag,
                fields: literal_fields,
            })
        }
    }
}

fn embed(state: &State, expr: &Arc<GenExpr>) -> Node {
    if let GenExpr::Var(name) = &**expr {
        let body = lookup(state, name);
        return embed(state, &body);
    }
    state.embedded_node(expr)
}

fn lookup(state: &State, name: &Symbol) -> Arc<GenExpr> {
    state
        .binding(name)
        .unwrap_or_else(|| panic!("step on malformed node: unbound recursion variable `{name}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_ast::Basic;

    fn var(name: &str) -> TypeExpr {
        TypeExpr::Var(Symbol::new(name))
    }

    fn atom_expr(name: &str) -> TypeExpr {
        TypeExpr::Atom(Symbol::new(name))
    }

    fn map_of(fields: Vec<(&str, FieldExpr)>, open: bool) -> TypeExpr {
        TypeExpr::Map {
            fields: fields
                .into_iter()
                .map(|(key, field)| (Symbol::new(key), field))
                .collect(),
            open,
        }
    }

    #[test]
    fn unbound_variable_is_rejected() {
        let mut equations = BTreeMap::new();
        equations.insert(
            Symbol::new("x"),
            TypeExpr::Union(vec![var("y"), atom_expr("nil")]),
        );
        assert_eq!(
            build_recursive(equations),
            Err(BuildError::UnboundVar(Symbol::new("y")))
        );
    }

    #[test]
    fn stepping_is_reproducible() {
        let mut equations = BTreeMap::new();
        equations.insert(
            Symbol::new("x"),
            TypeExpr::Union(vec![
                map_of(vec![("a", FieldExpr::Value(var("x")))], false),
                atom_expr("nil"),
            ]),
        );
        let nodes = build_recursive(equations).unwrap();
        let x = &nodes[&Symbol::new("x")];
        // Embedded ids are state-stable, so two steps yield equal layers.
        assert_eq!(x.step(), x.step());
    }

    #[test]
    fn required_self_reference_in_a_closed_map_is_empty() {
        let mut equations = BTreeMap::new();
        equations.insert(
            Symbol::new("x"),
            map_of(vec![("a", FieldExpr::Value(var("x")))], false),
        );
        let nodes = build_recursive(equations).unwrap();
        assert!(nodes[&Symbol::new("x")].is_empty());
    }

    #[test]
    fn optional_self_reference_has_a_finite_witness() {
        let mut equations = BTreeMap::new();
        equations.insert(
            Symbol::new("x"),
            map_of(vec![("a", FieldExpr::IfSet(var("x")))], true),
        );
        let nodes = build_recursive(equations).unwrap();
        assert!(!nodes[&Symbol::new("x")].is_empty());
    }

    #[test]
    fn tuples_evaluate_to_the_indivisible_bit() {
        let descr = from_quoted(&TypeExpr::Tuple(vec![
            TypeExpr::Basic(Basic::Integer),
            TypeExpr::Basic(Basic::Float),
        ]))
        .unwrap();
        assert_eq!(descr, crate::tuple());
    }

    #[test]
    fn from_quoted_rejects_free_variables() {
        assert_eq!(
            from_quoted(&var("x")),
            Err(BuildError::UnboundVar(Symbol::new("x")))
        );
    }
}
