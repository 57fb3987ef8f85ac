//! The map kind: literals, split-on-key normalization, and emptiness.
//!
//! A map type is a BDD over [`MapLiteral`]s. Deciding emptiness (or
//! extracting the value type at a key) requires normalizing the BDD into a
//! disjoint union of pairs `(value_at_key, rest_of_map)`, one key at a
//! time:
//!
//! 1. pick a key named by any literal on the line;
//! 2. split every literal on that key ([`single_split`]);
//! 3. make the negative pairs disjoint on their first component and
//!    eliminate the negations with
//!    `(F,S) ∖ ⋃(tᵢ,sᵢ) = ⋃(F∩tᵢ, S∖sᵢ) ∪ (F∖⋃tᵢ, S)`;
//! 4. recurse on each rest-of-map, which names one key fewer.
//!
//! Once no keys remain, only empty-field literals are left and a line is
//! inhabited iff it still admits an open map or the empty map. Emptiness of
//! value types re-enters the memoized node traversal with the same `seen`
//! set, which is what closes recursive types.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use vireo_ast::Symbol;

use crate::bdd::Bdd;
use crate::bitmap::Bitmap;
use crate::node::{node_empty, Node, Seen};
use crate::{none, term, Descr};

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum MapTag {
    Open,
    Closed,
}

/// Whether a declared key must be present in matching maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Presence {
    Required,
    Optional,
}

/// A declared field of a map literal.
///
/// Build with [`required`] or [`optional`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MapField {
    pub(crate) value: Node,
    pub(crate) presence: Presence,
}

/// A required key: matching maps carry it, with a value of this type.
pub fn required(value: impl Into<Node>) -> MapField {
    MapField {
        value: value.into(),
        presence: Presence::Required,
    }
}

/// An optional key: matching maps either omit it or carry a value of this
/// type.
pub fn optional(value: impl Into<Node>) -> MapField {
    MapField {
        value: value.into(),
        presence: Presence::Optional,
    }
}

/// One literal of the map BDD. Ordered by content (tag, then fields, with
/// field values ordered by node id), which is stable within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct MapLiteral {
    pub(crate) tag: MapTag,
    pub(crate) fields: BTreeMap<Symbol, MapField>,
}

impl MapLiteral {
    fn without(&self, key: &Symbol) -> MapLiteral {
        let mut fields = self.fields.clone();
        fields.remove(key);
        MapLiteral {
            tag: self.tag,
            fields,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal value markers
// ---------------------------------------------------------------------------

pub(crate) fn not_set_descr() -> Descr {
    Descr::from_bitmap(Bitmap::NOT_SET)
}

fn not_set_node() -> &'static Node {
    static NOT_SET: OnceLock<Node> = OnceLock::new();
    NOT_SET.get_or_init(|| Node::fresh(not_set_descr()))
}

fn term_or_not_set_node() -> &'static Node {
    static TOP: OnceLock<Node> = OnceLock::new();
    TOP.get_or_init(|| Node::fresh(term().union(&not_set_descr())))
}

/// Remove the internal marker everywhere it could hide in a value type.
/// Returns whether it was present — i.e. whether the key may be absent.
pub(crate) fn strip_not_set(descr: &mut Descr) -> bool {
    let mut stripped = descr.bitmap.contains(Bitmap::NOT_SET);
    descr.bitmap.remove(Bitmap::NOT_SET);
    if let Some(dynamic) = descr.dynamic.as_mut() {
        stripped |= strip_not_set(dynamic);
    }
    stripped
}

// ---------------------------------------------------------------------------
// Split on key
// ---------------------------------------------------------------------------

enum Split {
    /// `(value_type_at_key, literal_minus_key)`.
    Pair(Node, MapLiteral),
    /// The universal open literal: no information at any key.
    Top,
}

fn single_split(literal: &MapLiteral, key: &Symbol) -> Split {
    if let Some(field) = literal.fields.get(key) {
        let value = match field.presence {
            Presence::Required => field.value.clone(),
            Presence::Optional => field.value.union(not_set_node()),
        };
        return Split::Pair(value, literal.without(key));
    }
    match literal.tag {
        MapTag::Closed => Split::Pair(not_set_node().clone(), literal.clone()),
        MapTag::Open if literal.fields.is_empty() => Split::Top,
        MapTag::Open => Split::Pair(term_or_not_set_node().clone(), literal.clone()),
    }
}

fn find_key(pos: &[MapLiteral], neg: &[MapLiteral]) -> Option<Symbol> {
    pos.iter()
        .chain(neg.iter())
        .flat_map(|literal| literal.fields.keys())
        .next()
        .cloned()
}

/// Split one DNF line on `key`. Returns the positive pair `(value, rest)`
/// and the negative pairs, or `None` when a negated universal literal
/// empties the whole line.
fn split_line(
    pos: &[MapLiteral],
    neg: &[MapLiteral],
    key: &Symbol,
) -> Option<(Node, Bdd<MapLiteral>, Vec<(Node, Bdd<MapLiteral>)>)> {
    let mut value = term_or_not_set_node().clone();
    let mut rest = Bdd::True;
    for literal in pos {
        match single_split(literal, key) {
            Split::Pair(v, r) => {
                value = value.intersection(&v);
                rest = rest.intersection(&Bdd::single(r));
            }
            // Intersecting with the universal literal adds nothing.
            Split::Top => {}
        }
    }
    let mut negs = Vec::new();
    for literal in neg {
        match single_split(literal, key) {
            Split::Pair(v, r) => negs.push((v, Bdd::single(r))),
            Split::Top => return None,
        }
    }
    Some((value, rest, negs))
}

// ---------------------------------------------------------------------------
// Pair-disjointness normalization
// ---------------------------------------------------------------------------

/// Insert the negative pairs into an accumulator whose first components are
/// pairwise disjoint. An overlapping existing pair `(s₁,s₂)` splits into
/// `(s₁∖t₁, s₂)` and `(t₁∩s₁, t₂∪s₂)`; the part of `t₁` outside `s₁`
/// continues against the remaining pairs.
fn make_disjoint(
    pairs: Vec<(Node, Bdd<MapLiteral>)>,
    seen: &mut Seen,
) -> Vec<(Node, Bdd<MapLiteral>)> {
    let mut disjoint: Vec<(Node, Bdd<MapLiteral>)> = Vec::new();
    for (first, second) in pairs {
        insert_disjoint(&mut disjoint, first, second, seen);
    }
    disjoint
}

fn insert_disjoint(
    disjoint: &mut Vec<(Node, Bdd<MapLiteral>)>,
    mut first: Node,
    second: Bdd<MapLiteral>,
    seen: &mut Seen,
) {
    if node_empty(&first, seen) {
        return;
    }
    let mut i = 0;
    while i < disjoint.len() {
        let (s1, s2) = disjoint[i].clone();
        let common = first.intersection(&s1);
        if node_empty(&common, seen) {
            i += 1;
            continue;
        }
        disjoint.remove(i);
        let s_only = s1.difference(&first);
        if !node_empty(&s_only, seen) {
            disjoint.insert(i, (s_only, s2.clone()));
            i += 1;
        }
        disjoint.insert(i, (common, second.union(&s2)));
        i += 1;
        first = first.difference(&s1);
        if node_empty(&first, seen) {
            return;
        }
    }
    disjoint.push((first, second));
}

// ---------------------------------------------------------------------------
// Emptiness
// ---------------------------------------------------------------------------

/// Which map shapes an empty-field literal admits: `(open, has_empty)` —
/// maps with unknown extra keys, and the empty map itself.
fn empty_cases(literal: &MapLiteral) -> (bool, bool) {
    if !literal.fields.is_empty() {
        panic!("empty_cases on a literal with named fields");
    }
    match literal.tag {
        MapTag::Open => (true, true),
        MapTag::Closed => (false, true),
    }
}

fn line_empty_cases(pos: &[MapLiteral], neg: &[MapLiteral]) -> (bool, bool) {
    let (mut open, mut has_empty) = (true, true);
    for literal in pos {
        let (o, e) = empty_cases(literal);
        open &= o;
        has_empty &= e;
    }
    for literal in neg {
        let (o, e) = empty_cases(literal);
        open &= !o;
        has_empty &= !e;
    }
    (open, has_empty)
}

pub(crate) fn map_not_empty(bdd: &Bdd<MapLiteral>, seen: &mut Seen) -> bool {
    bdd.paths()
        .into_iter()
        .any(|(pos, neg)| line_not_empty(&pos, &neg, seen))
}

fn line_not_empty(pos: &[MapLiteral], neg: &[MapLiteral], seen: &mut Seen) -> bool {
    let Some(key) = find_key(pos, neg) else {
        let (open, has_empty) = line_empty_cases(pos, neg);
        return open || has_empty;
    };
    let Some((value, rest, negs)) = split_line(pos, neg, &key) else {
        return false;
    };
    if node_empty(&value, seen) || !map_not_empty(&rest, seen) {
        return false;
    }
    if negs.is_empty() {
        return true;
    }
    let disjoint = make_disjoint(negs, seen);
    for (t, s) in &disjoint {
        let common = value.intersection(t);
        if !node_empty(&common, seen) && map_not_empty(&rest.difference(s), seen) {
            return true;
        }
    }
    let residue = disjoint
        .iter()
        .fold(value, |acc, (t, _)| acc.difference(t));
    // `rest` is already known non-empty.
    !node_empty(&residue, seen)
}

// ---------------------------------------------------------------------------
// Value extraction
// ---------------------------------------------------------------------------

/// The value type at `key`, unioned across all inhabited disjuncts, plus
/// whether the key may be absent. The internal marker is stripped before
/// the type is returned.
pub(crate) fn fetch_static(bdd: &Bdd<MapLiteral>, key: &Symbol) -> (bool, Descr) {
    let mut optional = false;
    let mut acc = none();
    let mut seen = Seen::new();
    for (pos, neg) in bdd.paths() {
        let Some((value, rest, negs)) = split_line(&pos, &neg, key) else {
            continue;
        };
        if node_empty(&value, &mut seen) || !map_not_empty(&rest, &mut seen) {
            continue;
        }
        let mut values = Vec::new();
        if negs.is_empty() {
            values.push(value);
        } else {
            let disjoint = make_disjoint(negs, &mut seen);
            for (t, s) in &disjoint {
                let common = value.intersection(t);
                if !node_empty(&common, &mut seen)
                    && map_not_empty(&rest.difference(s), &mut seen)
                {
                    values.push(common);
                }
            }
            let residue = disjoint
                .iter()
                .fold(value, |acc_value, (t, _)| acc_value.difference(t));
            if !node_empty(&residue, &mut seen) {
                values.push(residue);
            }
        }
        for node in values {
            let mut value_type = node.step();
            if strip_not_set(&mut value_type) {
                optional = true;
            }
            acc = acc.union(&value_type);
        }
    }
    (optional, acc)
}

/// Every key named by any literal of the BDD.
pub(crate) fn candidate_keys(bdd: &Bdd<MapLiteral>) -> BTreeSet<Symbol> {
    let mut keys = BTreeSet::new();
    for (pos, neg) in bdd.paths() {
        for literal in pos.iter().chain(neg.iter()) {
            keys.extend(literal.fields.keys().cloned());
        }
    }
    keys
}

// ---------------------------------------------------------------------------
// Normal form for quoting
// ---------------------------------------------------------------------------

/// A quotable disjunct: accumulated field values plus the base shape of the
/// remaining keys. `(open=true, has_empty=false)` is the "open with at
/// least one extra key" shape, rendered as `open ∧ ¬closed`.
pub(crate) type MapDisjunct = (BTreeMap<Symbol, Node>, bool, bool);

/// Normalize the BDD into inhabited disjuncts with pairwise-disjoint value
/// types per key. Field values stay as nodes; quoting steps them under its
/// own cycle guard.
pub(crate) fn map_normal_form(bdd: &Bdd<MapLiteral>) -> Vec<MapDisjunct> {
    let mut out = Vec::new();
    let mut seen = Seen::new();
    for (pos, neg) in bdd.paths() {
        normal_lines(&pos, &neg, &BTreeMap::new(), &mut out, &mut seen);
    }
    out
}

fn normal_lines(
    pos: &[MapLiteral],
    neg: &[MapLiteral],
    acc: &BTreeMap<Symbol, Node>,
    out: &mut Vec<MapDisjunct>,
    seen: &mut Seen,
) {
    let Some(key) = find_key(pos, neg) else {
        let (open, has_empty) = line_empty_cases(pos, neg);
        if open || has_empty {
            out.push((acc.clone(), open, has_empty));
        }
        return;
    };
    let Some((value, rest, negs)) = split_line(pos, neg, &key) else {
        return;
    };
    if node_empty(&value, seen) || !map_not_empty(&rest, seen) {
        return;
    }
    if negs.is_empty() {
        descend(&key, &value, &rest, acc, out, seen);
        return;
    }
    let disjoint = make_disjoint(negs, seen);
    for (t, s) in &disjoint {
        let common = value.intersection(t);
        if node_empty(&common, seen) {
            continue;
        }
        let rest_outside = rest.difference(s);
        if map_not_empty(&rest_outside, seen) {
            descend(&key, &common, &rest_outside, acc, out, seen);
        }
    }
    let residue = disjoint
        .iter()
        .fold(value, |acc_value, (t, _)| acc_value.difference(t));
    if !node_empty(&residue, seen) {
        descend(&key, &residue, &rest, acc, out, seen);
    }
}

fn descend(
    key: &Symbol,
    value: &Node,
    rest: &Bdd<MapLiteral>,
    acc: &BTreeMap<Symbol, Node>,
    out: &mut Vec<MapDisjunct>,
    seen: &mut Seen,
) {
    let mut acc = acc.clone();
    acc.insert(key.clone(), value.clone());
    for (pos, neg) in rest.paths() {
        normal_lines(&pos, &neg, &acc, out, seen);
    }
}
