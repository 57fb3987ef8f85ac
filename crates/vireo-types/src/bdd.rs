//! Generic binary decision diagrams over totally ordered literals.
//!
//! A [`Bdd`] is `True`, `False`, or a node carrying a literal and two
//! branches: `hi` applies when the literal holds, `lo` when it does not.
//! Along every root-to-leaf path the literals appear in strictly increasing
//! order, which is what makes the three set operations commutative
//! structural merges: equal roots recurse pairwise, unequal roots put the
//! smaller literal on top and push the other operand into both branches.
//!
//! The engine is opaque to literal semantics; the map kind instantiates it
//! with map literals ordered by their content.

use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bdd<L> {
    True,
    False,
    Node {
        literal: L,
        hi: Arc<Bdd<L>>,
        lo: Arc<Bdd<L>>,
    },
}

impl<L: Clone + Ord> Bdd<L> {
    /// The BDD accepting exactly the sets where `literal` holds.
    pub fn single(literal: L) -> Bdd<L> {
        Bdd::node(literal, Bdd::True, Bdd::False)
    }

    fn node(literal: L, hi: Bdd<L>, lo: Bdd<L>) -> Bdd<L> {
        if hi == lo {
            return hi;
        }
        debug_assert!(
            hi.root_above(&literal) && lo.root_above(&literal),
            "BDD literal order violated"
        );
        Bdd::Node {
            literal,
            hi: Arc::new(hi),
            lo: Arc::new(lo),
        }
    }

    fn root_above(&self, literal: &L) -> bool {
        match self {
            Bdd::Node { literal: root, .. } => root > literal,
            _ => true,
        }
    }

    pub fn union(&self, other: &Bdd<L>) -> Bdd<L> {
        match (self, other) {
            (Bdd::True, _) | (_, Bdd::True) => Bdd::True,
            (Bdd::False, b) | (b, Bdd::False) => b.clone(),
            (
                Bdd::Node { literal: l1, hi: h1, lo: o1 },
                Bdd::Node { literal: l2, hi: h2, lo: o2 },
            ) => match l1.cmp(l2) {
                Ordering::Equal => Bdd::node(l1.clone(), h1.union(h2), o1.union(o2)),
                Ordering::Less => Bdd::node(l1.clone(), h1.union(other), o1.union(other)),
                Ordering::Greater => Bdd::node(l2.clone(), self.union(h2), self.union(o2)),
            },
        }
    }

    pub fn intersection(&self, other: &Bdd<L>) -> Bdd<L> {
        match (self, other) {
            (Bdd::False, _) | (_, Bdd::False) => Bdd::False,
            (Bdd::True, b) | (b, Bdd::True) => b.clone(),
            (
                Bdd::Node { literal: l1, hi: h1, lo: o1 },
                Bdd::Node { literal: l2, hi: h2, lo: o2 },
            ) => match l1.cmp(l2) {
                Ordering::Equal => Bdd::node(l1.clone(), h1.intersection(h2), o1.intersection(o2)),
                Ordering::Less => {
                    Bdd::node(l1.clone(), h1.intersection(other), o1.intersection(other))
                }
                Ordering::Greater => {
                    Bdd::node(l2.clone(), self.intersection(h2), self.intersection(o2))
                }
            },
        }
    }

    pub fn difference(&self, other: &Bdd<L>) -> Bdd<L> {
        match (self, other) {
            (_, Bdd::True) | (Bdd::False, _) => Bdd::False,
            (b, Bdd::False) => b.clone(),
            (Bdd::True, Bdd::Node { literal, hi, lo }) => Bdd::node(
                literal.clone(),
                Bdd::True.difference(hi),
                Bdd::True.difference(lo),
            ),
            (
                Bdd::Node { literal: l1, hi: h1, lo: o1 },
                Bdd::Node { literal: l2, hi: h2, lo: o2 },
            ) => match l1.cmp(l2) {
                Ordering::Equal => Bdd::node(l1.clone(), h1.difference(h2), o1.difference(o2)),
                Ordering::Less => {
                    Bdd::node(l1.clone(), h1.difference(other), o1.difference(other))
                }
                Ordering::Greater => {
                    Bdd::node(l2.clone(), self.difference(h2), self.difference(o2))
                }
            },
        }
    }

    /// All root-to-leaf paths ending in `True`, as
    /// `(positive_literals, negative_literals)` — the DNF of the diagram.
    pub fn paths(&self) -> Vec<(Vec<L>, Vec<L>)> {
        let mut out = Vec::new();
        let mut pos = Vec::new();
        let mut neg = Vec::new();
        self.walk(&mut pos, &mut neg, &mut out);
        out
    }

    fn walk(&self, pos: &mut Vec<L>, neg: &mut Vec<L>, out: &mut Vec<(Vec<L>, Vec<L>)>) {
        match self {
            Bdd::True => out.push((pos.clone(), neg.clone())),
            Bdd::False => {}
            Bdd::Node { literal, hi, lo } => {
                pos.push(literal.clone());
                hi.walk(pos, neg, out);
                pos.pop();
                neg.push(literal.clone());
                lo.walk(pos, neg, out);
                neg.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_literal_order() {
        let b = Bdd::single(2u32).union(&Bdd::single(1));
        match &b {
            Bdd::Node { literal, .. } => assert_eq!(*literal, 1),
            other => panic!("expected node, got {other:?}"),
        }
        assert_eq!(b, Bdd::single(1).union(&Bdd::single(2)));
    }

    #[test]
    fn complement_collapses_to_leaves() {
        let b = Bdd::single(1u32).union(&Bdd::single(2));
        let not_b = Bdd::True.difference(&b);
        assert_eq!(b.union(&not_b), Bdd::True);
        assert_eq!(b.intersection(&not_b), Bdd::False);
    }

    #[test]
    fn intersection_of_disjoint_branches() {
        let b = Bdd::single(1u32).intersection(&Bdd::True.difference(&Bdd::single(1)));
        assert_eq!(b, Bdd::False);
    }

    #[test]
    fn paths_enumerate_the_dnf() {
        let b = Bdd::single(1u32).union(&Bdd::single(2));
        let paths = b.paths();
        assert_eq!(paths, vec![(vec![1], vec![]), (vec![2], vec![1])]);
    }

    #[test]
    fn difference_from_true_is_complement() {
        let b = Bdd::True.difference(&Bdd::single(3u32));
        assert_eq!(b.paths(), vec![(vec![], vec![3])]);
    }
}
