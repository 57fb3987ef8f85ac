//! The atom kind: finite and cofinite sets of atoms.
//!
//! `Finite(S)` means "exactly the atoms in S"; `Cofinite(S)` means "every
//! atom except those in S". All three set operations reduce to one of four
//! cases on the tags. An operation that produces the empty finite set
//! returns `None` so the caller drops the kind entirely, keeping the
//! descriptor normalized.

use std::collections::BTreeSet;

use vireo_ast::Symbol;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtomSet {
    Finite(BTreeSet<Symbol>),
    Cofinite(BTreeSet<Symbol>),
}

impl AtomSet {
    /// All atoms.
    pub fn top() -> AtomSet {
        AtomSet::Cofinite(BTreeSet::new())
    }

    pub fn finite<I, S>(atoms: I) -> Option<AtomSet>
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let set: BTreeSet<Symbol> = atoms.into_iter().map(Into::into).collect();
        if set.is_empty() { None } else { Some(AtomSet::Finite(set)) }
    }

    pub fn contains(&self, atom: &Symbol) -> bool {
        match self {
            AtomSet::Finite(set) => set.contains(atom),
            AtomSet::Cofinite(set) => !set.contains(atom),
        }
    }

    pub fn union(&self, other: &AtomSet) -> AtomSet {
        use AtomSet::*;
        match (self, other) {
            (Finite(s1), Finite(s2)) => Finite(s1.union(s2).cloned().collect()),
            (Cofinite(s1), Cofinite(s2)) => Cofinite(s1.intersection(s2).cloned().collect()),
            (Finite(s1), Cofinite(s2)) => Cofinite(s2.difference(s1).cloned().collect()),
            (Cofinite(s1), Finite(s2)) => Cofinite(s1.difference(s2).cloned().collect()),
        }
    }

    pub fn intersection(&self, other: &AtomSet) -> Option<AtomSet> {
        use AtomSet::*;
        let result = match (self, other) {
            (Finite(s1), Finite(s2)) => Finite(s1.intersection(s2).cloned().collect()),
            (Cofinite(s1), Cofinite(s2)) => Cofinite(s1.union(s2).cloned().collect()),
            (Finite(s1), Cofinite(s2)) => Finite(s1.difference(s2).cloned().collect()),
            (Cofinite(s1), Finite(s2)) => Finite(s2.difference(s1).cloned().collect()),
        };
        normalize(result)
    }

    pub fn difference(&self, other: &AtomSet) -> Option<AtomSet> {
        use AtomSet::*;
        let result = match (self, other) {
            (Finite(s1), Finite(s2)) => Finite(s1.difference(s2).cloned().collect()),
            (Cofinite(s1), Cofinite(s2)) => Finite(s2.difference(s1).cloned().collect()),
            (Finite(s1), Cofinite(s2)) => Finite(s1.intersection(s2).cloned().collect()),
            (Cofinite(s1), Finite(s2)) => Cofinite(s1.union(s2).cloned().collect()),
        };
        normalize(result)
    }
}

fn normalize(set: AtomSet) -> Option<AtomSet> {
    match &set {
        AtomSet::Finite(s) if s.is_empty() => None,
        _ => Some(set),
    }
}
