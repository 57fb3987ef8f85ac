//! Rendering normalized descriptors back to the neutral quoted form.
//!
//! Bitmap bits become named basic types, atom sets become unions or
//! negated unions under `atom()`, and the map BDD is rendered from its
//! normalized DNF. Field nodes are stepped under a cycle guard: a node
//! revisited on the current rendering path appears as a synthetic variable,
//! which keeps quoting total on recursive types.

use vireo_ast::{FieldExpr, Symbol, TypeExpr};

use crate::atom::AtomSet;
use crate::map::{map_normal_form, strip_not_set, MapDisjunct};
use crate::node::{Node, Seen};
use crate::{term, Descr};

pub(crate) fn quote(descr: &Descr) -> TypeExpr {
    let mut seen = Seen::new();
    quote_descr(descr, &mut seen)
}

fn quote_descr(descr: &Descr, seen: &mut Seen) -> TypeExpr {
    match &descr.dynamic {
        None => quote_static(descr, seen),
        Some(dynamic) => {
            let dynamic_part = quote_dynamic(dynamic, seen);
            let static_part = descr.static_part();
            if static_part.has_no_kinds() {
                dynamic_part
            } else {
                union_of(vec![dynamic_part, quote_static(&static_part, seen)])
            }
        }
    }
}

/// The dynamic entry: `dynamic` when the bound is top, the bare inner form
/// when it is indivisible, `dynamic(inner)` otherwise.
fn quote_dynamic(bound: &Descr, seen: &mut Seen) -> TypeExpr {
    if *bound == term() {
        return TypeExpr::DynamicTop;
    }
    let inner = quote_static(bound, seen);
    if matches!(
        inner,
        TypeExpr::Basic(_) | TypeExpr::Atom(_) | TypeExpr::AtomTop | TypeExpr::None
    ) {
        inner
    } else {
        TypeExpr::dynamic(inner)
    }
}

fn quote_static(descr: &Descr, seen: &mut Seen) -> TypeExpr {
    if *descr == term() {
        return TypeExpr::Term;
    }
    let mut parts = Vec::new();
    for basic in descr.bitmap.basics() {
        parts.push(TypeExpr::Basic(basic));
    }
    if let Some(atoms) = &descr.atoms {
        parts.push(quote_atoms(atoms));
    }
    if let Some(bdd) = &descr.maps {
        for disjunct in map_normal_form(bdd) {
            parts.extend(quote_map_disjunct(&disjunct, seen));
        }
    }
    union_of(parts)
}

fn quote_atoms(atoms: &AtomSet) -> TypeExpr {
    match atoms {
        AtomSet::Finite(set) => {
            union_of(set.iter().map(|a| TypeExpr::Atom(a.clone())).collect())
        }
        AtomSet::Cofinite(set) if set.is_empty() => TypeExpr::AtomTop,
        AtomSet::Cofinite(set) => TypeExpr::Inter(vec![
            TypeExpr::AtomTop,
            TypeExpr::negation(union_of(
                set.iter().map(|a| TypeExpr::Atom(a.clone())).collect(),
            )),
        ]),
    }
}

fn quote_map_disjunct(disjunct: &MapDisjunct, seen: &mut Seen) -> Option<TypeExpr> {
    let (fields, open, has_empty) = disjunct;
    let rendered: Vec<(Symbol, FieldExpr)> = fields
        .iter()
        .map(|(key, node)| (key.clone(), quote_field(node, seen)))
        .collect();
    let literal = |open: bool| TypeExpr::Map {
        fields: rendered.clone(),
        open,
    };
    match (*open, *has_empty) {
        (true, true) => Some(literal(true)),
        (false, true) => Some(literal(false)),
        // Open, but the declared keys alone are not enough: at least one
        // extra key is required.
        (true, false) => Some(TypeExpr::Inter(vec![
            literal(true),
            TypeExpr::negation(literal(false)),
        ])),
        (false, false) => None,
    }
}

fn quote_field(node: &Node, seen: &mut Seen) -> FieldExpr {
    if !seen.insert(node.id()) {
        return FieldExpr::Value(TypeExpr::Var(Symbol::new(format!("t{}", node.id().as_u64()))));
    }
    let mut value = node.step();
    let optional = strip_not_set(&mut value);
    let field = if optional && value.has_no_kinds() {
        FieldExpr::NotSet
    } else {
        let expr = quote_descr(&value, seen);
        if optional {
            FieldExpr::IfSet(expr)
        } else {
            FieldExpr::Value(expr)
        }
    };
    seen.remove(&node.id());
    field
}

fn union_of(parts: Vec<TypeExpr>) -> TypeExpr {
    let mut flat = Vec::new();
    for part in parts {
        match part {
            TypeExpr::Union(members) => flat.extend(members),
            TypeExpr::None => {}
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => TypeExpr::None,
        1 => flat.into_iter().next().expect("length checked"),
        _ => TypeExpr::Union(flat),
    }
}
