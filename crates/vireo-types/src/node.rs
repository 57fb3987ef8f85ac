//! Reference-identified lazy type nodes.
//!
//! A [`Node`] is an `(id, state, generator)` triple. The id comes from a
//! process-wide monotonic counter and is the only thing compared, ordered,
//! or hashed — node equality is O(1) and never structural. The state holds
//! the recursion bindings of the equation system the node was built from;
//! stepping applies the generator to the state and yields one layer of
//! descriptor in which embedded recursion points are again self-contained
//! nodes sharing the same state.
//!
//! Two caches keep derived identities stable, which is what lets the
//! memoized traversals detect cycles:
//!
//! - each state assigns one node id per embedded sub-expression, so stepping
//!   the same node twice re-produces identical field node ids;
//! - the results of `union`/`intersection`/`difference` on nodes are
//!   hash-consed per `(op, left, right)` id pair process-wide.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use vireo_ast::Symbol;

use crate::builder::{eval, GenExpr};
use crate::{descr_empty, term, Descr};

/// Every node id in the process comes from this counter.
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn fresh() -> NodeId {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ids already assumed on the current derivation path. Membership means
/// "assume success" — the coinductive unit.
pub(crate) type Seen = BTreeSet<NodeId>;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct StateInner {
    bindings: BTreeMap<Symbol, Arc<GenExpr>>,
    /// Stable node per embedded sub-expression, keyed by the address of its
    /// shared `Arc` allocation (unique for the lifetime of the state).
    embedded: Mutex<HashMap<usize, Node>>,
}

/// The shared recursion state of an equation system.
#[derive(Clone)]
pub struct State {
    inner: Arc<StateInner>,
}

impl State {
    /// The state of non-recursive nodes. Shared: constant generators never
    /// consult it.
    pub fn empty() -> State {
        static EMPTY: OnceLock<State> = OnceLock::new();
        EMPTY
            .get_or_init(|| State::with_bindings(BTreeMap::new()))
            .clone()
    }

    pub(crate) fn with_bindings(bindings: BTreeMap<Symbol, Arc<GenExpr>>) -> State {
        State {
            inner: Arc::new(StateInner {
                bindings,
                embedded: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn binding(&self, name: &Symbol) -> Option<Arc<GenExpr>> {
        self.inner.bindings.get(name).cloned()
    }

    /// The node embedding `expr` at a recursion point, created on first use.
    pub(crate) fn embedded_node(&self, expr: &Arc<GenExpr>) -> Node {
        let key = Arc::as_ptr(expr) as usize;
        let mut embedded = self.inner.embedded.lock().expect("embedded-node cache poisoned");
        if let Some(node) = embedded.get(&key) {
            return node.clone();
        }
        let node = Node {
            id: NodeId::fresh(),
            state: self.clone(),
            gen: Gen::expr(expr.clone()),
        };
        embedded.insert(key, node.clone());
        node
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

enum GenKind {
    Const(Arc<Descr>),
    Expr(Arc<GenExpr>),
}

/// A node's generator: stepping applies it to the node's state.
#[derive(Clone)]
pub struct Gen {
    kind: Arc<GenKind>,
}

impl Gen {
    /// A generator that always yields `descr`.
    pub fn constant(descr: Descr) -> Gen {
        Gen {
            kind: Arc::new(GenKind::Const(Arc::new(descr))),
        }
    }

    pub(crate) fn expr(expr: Arc<GenExpr>) -> Gen {
        Gen {
            kind: Arc::new(GenKind::Expr(expr)),
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Node {
    id: NodeId,
    state: State,
    gen: Gen,
}

impl Node {
    pub fn new(state: State, gen: Gen) -> Node {
        Node {
            id: NodeId::fresh(),
            state,
            gen,
        }
    }

    /// Wrap a descriptor in a node with a constant generator.
    pub fn fresh(descr: Descr) -> Node {
        Node::new(State::empty(), Gen::constant(descr))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Evaluate one layer: recursion points in the result are fresh
    /// self-contained nodes sharing this node's state.
    pub fn step(&self) -> Descr {
        match &*self.gen.kind {
            GenKind::Const(descr) => (**descr).clone(),
            GenKind::Expr(expr) => eval(expr, &self.state),
        }
    }

    pub fn union(&self, other: &Node) -> Node {
        combine(CombineOp::Union, self, other)
    }

    pub fn intersection(&self, other: &Node) -> Node {
        combine(CombineOp::Inter, self, other)
    }

    pub fn difference(&self, other: &Node) -> Node {
        combine(CombineOp::Diff, self, other)
    }

    pub fn negation(&self) -> Node {
        combine(CombineOp::Diff, term_node(), self)
    }

    pub fn is_empty(&self) -> bool {
        let mut seen = Seen::new();
        node_empty(self, &mut seen)
    }

    pub fn subtype_of(&self, other: &Node) -> bool {
        self.difference(other).is_empty()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Node) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Node) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.id)
    }
}

impl From<Descr> for Node {
    fn from(descr: Descr) -> Node {
        Node::fresh(descr)
    }
}

/// Accept either a descriptor or a node where a node is expected.
pub fn to_node(value: impl Into<Node>) -> Node {
    value.into()
}

// ---------------------------------------------------------------------------
// Hash-consed combinators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CombineOp {
    Union,
    Inter,
    Diff,
}

fn term_node() -> &'static Node {
    static TERM: OnceLock<Node> = OnceLock::new();
    TERM.get_or_init(|| Node::fresh(term()))
}

fn combine(op: CombineOp, left: &Node, right: &Node) -> Node {
    static CACHE: OnceLock<Mutex<HashMap<(CombineOp, NodeId, NodeId), Node>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let key = (op, left.id, right.id);
    if let Some(node) = cache.lock().expect("combine cache poisoned").get(&key) {
        return node.clone();
    }
    // Step both operands outside the lock; one layer each, so this is
    // bounded even for recursive operands.
    let (l, r) = (left.step(), right.step());
    let descr = match op {
        CombineOp::Union => l.union(&r),
        CombineOp::Inter => l.intersection(&r),
        CombineOp::Diff => l.difference(&r),
    };
    let node = Node::fresh(descr);
    cache
        .lock()
        .expect("combine cache poisoned")
        .entry(key)
        .or_insert(node)
        .clone()
}

// ---------------------------------------------------------------------------
// Memoized traversals
// ---------------------------------------------------------------------------

/// Emptiness over nodes. A node already on the path is assumed empty; the
/// id is removed on the way out so assumptions never leak across sibling
/// branches.
pub(crate) fn node_empty(node: &Node, seen: &mut Seen) -> bool {
    if !seen.insert(node.id) {
        return true;
    }
    let result = descr_empty(&node.step(), seen);
    seen.remove(&node.id);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{atoms, integer, none};

    #[test]
    fn ids_are_unique_and_equality_is_by_id() {
        let a = Node::fresh(integer());
        let b = Node::fresh(integer());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn step_of_fresh_node_returns_the_descriptor() {
        let node = Node::fresh(integer());
        assert_eq!(node.step(), integer());
    }

    #[test]
    fn combinators_are_hash_consed() {
        let a = Node::fresh(integer());
        let b = Node::fresh(atoms(["ok"]));
        assert_eq!(a.union(&b).id(), a.union(&b).id());
        assert_ne!(a.union(&b).id(), b.union(&a).id());
    }

    #[test]
    fn combinators_apply_descriptor_operations() {
        let a = Node::fresh(integer());
        let b = Node::fresh(atoms(["ok"]));
        assert_eq!(a.union(&b).step(), integer().union(&atoms(["ok"])));
        assert_eq!(a.intersection(&b).step(), none());
        assert!(a.intersection(&b).is_empty());
        assert!(!a.union(&b).is_empty());
    }

    #[test]
    fn negation_complements_against_term() {
        let a = Node::fresh(integer());
        assert!(a.intersection(&a.negation()).is_empty());
        assert!(a.subtype_of(&a.negation().negation()));
    }

    #[test]
    fn to_node_accepts_both() {
        let from_descr = to_node(integer());
        let node = Node::fresh(integer());
        let same = to_node(node.clone());
        assert_eq!(from_descr.step(), integer());
        assert_eq!(same, node);
    }
}
