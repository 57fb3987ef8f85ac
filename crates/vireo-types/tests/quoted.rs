//! Rendering snapshots for the quoted form.
//!
//! Each case pins the exact human-readable rendering of a normalized
//! descriptor, so any drift in quoting or in the normal form shows up as a
//! snapshot diff.

use insta::assert_snapshot;

use vireo_types::{
    atom, atoms, boolean, closed_map, dynamic, dynamic_of, float, integer, none, open_map,
    optional, required, term, Symbol,
};

fn key(name: &str) -> Symbol {
    Symbol::new(name)
}

#[test]
fn basic_kinds_render_by_name() {
    assert_snapshot!(none().to_quoted_string(), @"none()");
    assert_snapshot!(term().to_quoted_string(), @"term()");
    assert_snapshot!(integer().to_quoted_string(), @"integer()");
    assert_snapshot!(integer().union(&float()).to_quoted_string(), @"integer() or float()");
}

#[test]
fn atom_sets_render_sorted_and_negated() {
    assert_snapshot!(atom().to_quoted_string(), @"atom()");
    assert_snapshot!(boolean().to_quoted_string(), @":false or :true");
    assert_snapshot!(atoms(["ok", "error"]).to_quoted_string(), @":error or :ok");
    assert_snapshot!(atom().difference(&atoms(["ok"])).to_quoted_string(), @"atom() and not :ok");
}

#[test]
fn map_literals_render_with_markers() {
    assert_snapshot!(
        closed_map([(key("a"), required(integer()))]).to_quoted_string(),
        @"%{a: integer()}"
    );
    assert_snapshot!(
        open_map([(key("a"), optional(integer()))]).to_quoted_string(),
        @"%{a: if_set(integer()), ..}"
    );
    assert_snapshot!(open_map::<Symbol, _>([]).to_quoted_string(), @"%{..}");
    let extended = open_map([(key("a"), required(integer()))])
        .difference(&closed_map([(key("a"), required(integer()))]));
    assert_snapshot!(
        extended.to_quoted_string(),
        @"%{a: integer(), ..} and not %{a: integer()}"
    );
}

#[test]
fn gradual_types_render_with_dynamic() {
    assert_snapshot!(dynamic().to_quoted_string(), @"dynamic()");
    assert_snapshot!(dynamic().union(&atom()).to_quoted_string(), @"dynamic() or atom()");
    assert_snapshot!(dynamic_of(integer()).to_quoted_string(), @"integer()");
    assert_snapshot!(
        dynamic_of(integer().union(&float())).to_quoted_string(),
        @"dynamic(integer() or float())"
    );
}
