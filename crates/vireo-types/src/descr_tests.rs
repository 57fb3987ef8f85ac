//! End-to-end tests for the descriptor algebra and the node layer.
//!
//! Each test constructs descriptors or equation systems by hand and checks
//! the decided relation. This is verbose but precise — we know exactly what
//! we're testing.

use std::collections::BTreeMap;

use vireo_ast::{FieldExpr, Symbol, TypeExpr};

use crate::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sym(name: &str) -> Symbol {
    Symbol::new(name)
}

fn nil() -> Descr {
    atoms(["nil"])
}

fn var(name: &str) -> TypeExpr {
    TypeExpr::Var(sym(name))
}

fn atom_expr(name: &str) -> TypeExpr {
    TypeExpr::Atom(sym(name))
}

fn map_expr(fields: Vec<(&str, FieldExpr)>, open: bool) -> TypeExpr {
    TypeExpr::Map {
        fields: fields
            .into_iter()
            .map(|(key, field)| (sym(key), field))
            .collect(),
        open,
    }
}

fn build(equations: Vec<(&str, TypeExpr)>) -> BTreeMap<Symbol, Node> {
    let equations: BTreeMap<Symbol, TypeExpr> = equations
        .into_iter()
        .map(|(name, body)| (sym(name), body))
        .collect();
    build_recursive(equations).expect("equation system builds")
}

// ---------------------------------------------------------------------------
// Basic kinds
// ---------------------------------------------------------------------------

#[test]
fn integer_and_atoms_are_disjoint() {
    assert!(integer().intersection(&nil()).is_empty());
    assert!(integer().subtype_of(&integer().union(&nil())));
    assert!(!integer().subtype_of(&nil()));
}

#[test]
fn union_is_commutative_across_kinds() {
    let a = integer().union(&float());
    let b = float().union(&integer());
    assert!(a.equivalent(&b));
}

#[test]
fn complement_laws_hold_for_structured_kinds() {
    let map = closed_map([(sym("a"), required(integer()))]);
    assert!(map.union(&map.negation()).equivalent(&term()));
    assert!(map.intersection(&map.negation()).is_empty());
}

#[test]
fn subtype_is_transitive_along_unions() {
    let a = integer();
    let ab = a.union(&float());
    let abc = ab.union(&nil());
    assert!(a.subtype_of(&ab));
    assert!(ab.subtype_of(&abc));
    assert!(a.subtype_of(&abc));
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

#[test]
fn closed_maps_with_disjoint_values_are_disjoint() {
    let ints = closed_map([(sym("a"), required(integer()))]);
    let ats = closed_map([(sym("a"), required(atom()))]);
    assert!(ints.intersection(&ats).is_empty());
}

#[test]
fn open_map_is_a_supertype_of_extended_closed_map() {
    let closed = closed_map([
        (sym("a"), required(integer())),
        (sym("b"), required(float())),
    ]);
    let open = open_map([(sym("a"), required(integer()))]);
    assert!(closed.subtype_of(&open));
    assert!(!open.subtype_of(&closed));
}

#[test]
fn closed_map_does_not_admit_extra_keys() {
    let wide = closed_map([
        (sym("a"), required(integer())),
        (sym("b"), required(float())),
    ]);
    let narrow = closed_map([(sym("a"), required(integer()))]);
    assert!(!wide.subtype_of(&narrow));
    assert!(!narrow.subtype_of(&wide));
}

#[test]
fn open_map_minus_closed_map_keeps_the_extended_maps() {
    let open = open_map([(sym("a"), required(integer()))]);
    let closed = closed_map([(sym("a"), required(integer()))]);
    assert!(open.difference(&open).is_empty());
    let extended = open.difference(&closed);
    assert!(!extended.is_empty());
    assert!(extended.subtype_of(&open));
    assert!(extended.intersection(&closed).is_empty());
}

#[test]
fn field_value_unions_distribute_over_map_subtyping() {
    let narrow = closed_map([(sym("a"), required(integer()))]);
    let wide = closed_map([(sym("a"), required(integer().union(&float())))]);
    assert!(narrow.subtype_of(&wide));
    assert!(!wide.subtype_of(&narrow));
}

#[test]
fn intersection_of_open_maps_merges_fields() {
    let a = open_map([(sym("a"), required(integer()))]);
    let b = open_map([(sym("b"), required(float()))]);
    let both = a.intersection(&b);
    assert!(!both.is_empty());
    assert_eq!(both.map_fetch(&sym("a")), Ok(integer()));
    assert_eq!(both.map_fetch(&sym("b")), Ok(float()));
}

// ---------------------------------------------------------------------------
// Map queries
// ---------------------------------------------------------------------------

#[test]
fn map_fetch_returns_the_value_type() {
    let map = closed_map([(sym("a"), required(integer()))]);
    assert_eq!(map.map_fetch(&sym("a")), Ok(integer()));
    assert_eq!(map.map_fetch(&sym("b")), Err(MapError::BadKey));
    assert_eq!(integer().map_fetch(&sym("a")), Err(MapError::BadMap));
    assert_eq!(term().map_fetch(&sym("a")), Err(MapError::BadMap));
}

#[test]
fn map_fetch_unions_across_disjuncts() {
    let either = closed_map([(sym("a"), required(integer()))])
        .union(&closed_map([(sym("a"), required(float()))]));
    assert_eq!(either.map_fetch(&sym("a")), Ok(integer().union(&float())));
}

#[test]
fn optional_keys_are_not_guaranteed() {
    let map = open_map([(sym("a"), optional(integer()))]);
    assert_eq!(map.map_fetch(&sym("a")), Err(MapError::BadKey));
    assert!(!map.map_has_key(&sym("a")));
    assert!(map.map_may_have_key(&sym("a")));
}

#[test]
fn map_fetch_on_gradual_map_wraps_the_value() {
    let map = dynamic_of(closed_map([(sym("a"), required(integer()))]));
    let value = map.map_fetch(&sym("a")).expect("key is guaranteed");
    assert!(value.is_gradual());
    assert!(value.equivalent(&dynamic_of(integer())));
}

#[test]
fn map_fetch_on_gradual_non_map_is_rejected() {
    assert_eq!(
        dynamic_of(integer()).map_fetch(&sym("a")),
        Err(MapError::BadMap)
    );
    assert_eq!(dynamic().map_fetch(&sym("a")), Err(MapError::BadMap));
    assert_eq!(
        dynamic_of(integer().union(&closed_map([(sym("a"), required(integer()))])))
            .map_fetch(&sym("a")),
        Err(MapError::BadMap)
    );
}

#[test]
#[should_panic(expected = "not a map type")]
fn map_get_panics_on_non_map() {
    integer().map_get(&sym("a"));
}

#[test]
fn map_key_queries() {
    let map = closed_map([
        (sym("a"), required(integer())),
        (sym("b"), required(float())),
    ]);
    assert!(map.map_has_key(&sym("a")));
    assert!(!map.map_has_key(&sym("c")));
    assert!(!map.map_may_have_key(&sym("c")));
    assert!(map.map_keys().equivalent(&atoms(["a", "b"])));
}

#[test]
fn uninhabited_map_types_guarantee_no_keys() {
    // Semantically empty, but the BDD survives: only literal-equal
    // branches collapse structurally.
    let clash = closed_map([(sym("a"), required(integer()))])
        .intersection(&closed_map([(sym("a"), required(atom()))]));
    assert!(clash.is_empty());
    assert!(clash.map_keys().equivalent(&none()));
    assert!(!clash.map_has_key(&sym("a")));
    assert!(!clash.map_may_have_key(&sym("a")));
    assert!(none().map_keys().equivalent(&none()));
    assert!(!none().map_has_key(&sym("a")));
}

#[test]
fn map_keys_keeps_only_keys_guaranteed_in_every_disjunct() {
    let either = closed_map([
        (sym("a"), required(integer())),
        (sym("b"), required(integer())),
    ])
    .union(&closed_map([(sym("a"), required(integer()))]));
    assert!(either.map_keys().equivalent(&atoms(["a"])));
    assert!(either.map_may_have_key(&sym("b")));
}

// ---------------------------------------------------------------------------
// Recursive types
// ---------------------------------------------------------------------------

#[test]
fn recursive_list_encoding_is_inhabited() {
    let nodes = build(vec![(
        "x",
        TypeExpr::Union(vec![
            TypeExpr::Tuple(vec![TypeExpr::Basic(Basic::Integer), var("x")]),
            atom_expr("nil"),
        ]),
    )]);
    let x = &nodes[&sym("x")];
    assert!(!x.is_empty());
    assert!(Node::fresh(nil()).subtype_of(x));
}

#[test]
fn mutually_recursive_equations_are_inhabited() {
    let nodes = build(vec![
        (
            "x",
            TypeExpr::Union(vec![
                TypeExpr::Tuple(vec![TypeExpr::Basic(Basic::Integer), var("y")]),
                atom_expr("nil"),
            ]),
        ),
        (
            "y",
            TypeExpr::Union(vec![
                TypeExpr::Tuple(vec![TypeExpr::Atom(sym("true")), var("x")]),
                atom_expr("nil"),
            ]),
        ),
    ]);
    let x = &nodes[&sym("x")];
    let y = &nodes[&sym("y")];
    assert!(!x.is_empty());
    assert!(!y.is_empty());
    assert!(x.step().equivalent(&x.step()));
}

#[test]
fn recursion_through_map_fields_is_decided() {
    let nodes = build(vec![(
        "x",
        TypeExpr::Union(vec![
            map_expr(vec![("tail", FieldExpr::Value(var("x")))], false),
            atom_expr("nil"),
        ]),
    )]);
    let x = &nodes[&sym("x")];
    assert!(!x.is_empty());
    assert!(Node::fresh(nil()).subtype_of(x));
}

#[test]
fn recursive_map_subtypes_itself() {
    let nodes = build(vec![(
        "x",
        TypeExpr::Union(vec![
            map_expr(vec![("tail", FieldExpr::Value(var("x")))], false),
            atom_expr("nil"),
        ]),
    )]);
    let x = &nodes[&sym("x")];
    assert!(x.subtype_of(x));
    assert!(!x.subtype_of(&Node::fresh(nil())));
}

#[test]
fn equivalent_recursive_systems_subtype_each_other() {
    let first = build(vec![(
        "x",
        TypeExpr::Union(vec![
            map_expr(vec![("tail", FieldExpr::Value(var("x")))], false),
            atom_expr("nil"),
        ]),
    )]);
    let second = build(vec![(
        "x",
        TypeExpr::Union(vec![
            map_expr(vec![("tail", FieldExpr::Value(var("x")))], false),
            atom_expr("nil"),
        ]),
    )]);
    assert!(first[&sym("x")].subtype_of(&second[&sym("x")]));
    assert!(second[&sym("x")].subtype_of(&first[&sym("x")]));
}

#[test]
fn node_combinators_match_descriptor_operations() {
    let left = Node::fresh(integer());
    let right = Node::fresh(nil());
    assert!(left
        .union(&right)
        .step()
        .equivalent(&integer().union(&nil())));
    assert!(left
        .step()
        .equivalent(&Node::fresh(left.step()).step()));
}

// ---------------------------------------------------------------------------
// Gradual typing
// ---------------------------------------------------------------------------

#[test]
fn dynamic_is_compatible_with_anything_overlapping() {
    assert!(dynamic().compatible_with(&integer()));
    assert!(dynamic_of(integer()).compatible_with(&integer()));
    assert!(!dynamic_of(atom()).compatible_with(&integer()));
}

#[test]
fn static_part_blocks_incompatible_expectations() {
    let mixed = dynamic().union(&atom());
    assert!(mixed.is_gradual());
    assert!(!mixed.compatible_with(&integer()));
    assert!(mixed.compatible_with(&atom()));
}

#[test]
fn gradual_subtyping_is_asymmetric() {
    assert!(dynamic_of(integer()).subtype_of(&integer()));
    assert!(!integer().subtype_of(&dynamic()));
    assert!(dynamic().subtype_of(&term()));
    assert!(dynamic_of(integer()).subtype_of(&dynamic()));
}

#[test]
fn gradual_difference_crosses_the_bounds() {
    let left = dynamic().union(&integer());
    let narrowed = left.difference(&integer());
    assert!(narrowed.static_part().subtype_of(&narrowed.dynamic_part()));
    assert!(narrowed.static_part().is_empty());
    assert!(!narrowed.is_empty());
}

// ---------------------------------------------------------------------------
// Quoting
// ---------------------------------------------------------------------------

#[test]
fn quoting_round_trips_losslessly_rendered_types() {
    let samples = vec![
        none(),
        term(),
        integer(),
        integer().union(&float()),
        boolean(),
        atom(),
        atom().difference(&atoms(["ok", "error"])),
        nil().union(&tuple()),
        closed_map([(sym("a"), required(integer()))]),
        open_map([(sym("a"), optional(integer()))]),
        closed_map([(sym("a"), required(integer()))])
            .union(&closed_map([(sym("a"), required(float()))])),
        open_map([(sym("a"), required(integer()))])
            .difference(&closed_map([(sym("a"), required(integer()))])),
        dynamic(),
        dynamic().union(&atom()),
    ];
    for descr in samples {
        let rebuilt = from_quoted(&descr.to_quoted()).expect("quoted form is closed");
        assert!(
            rebuilt.equivalent(&descr),
            "round trip changed `{}` into `{}`",
            descr.to_quoted_string(),
            rebuilt.to_quoted_string()
        );
    }
}

#[test]
fn quoted_rendering_of_required_extra_keys() {
    let extended = open_map([(sym("a"), required(integer()))])
        .difference(&closed_map([(sym("a"), required(integer()))]));
    assert_eq!(
        extended.to_quoted_string(),
        "%{a: integer(), ..} and not %{a: integer()}"
    );
}

#[test]
fn quoted_rendering_of_optional_fields() {
    let map = closed_map([(sym("a"), optional(integer()))]);
    assert_eq!(map.to_quoted_string(), "%{a: if_set(integer())}");
}

#[test]
fn quoted_rendering_of_gradual_types() {
    assert_eq!(dynamic().to_quoted_string(), "dynamic()");
    assert_eq!(dynamic_of(integer()).to_quoted_string(), "integer()");
    assert_eq!(
        dynamic().union(&atom()).to_quoted_string(),
        "dynamic() or atom()"
    );
}
