//! An index over many [`NodeMatcher`]s, used to find the matchers that could match a node
//! without trying every one of them.
//!
//! # Paths
//!
//! When a matcher is registered, it is linearized into a **path**: a pre-order list of steps,
//! each with the depth of the step in the tree and a [`Key`]. Structural matchers contribute a
//! [`Key::Fixed`] step for their signature, followed by the steps of their children one level
//! deeper. Permutation-invariant matchers contribute a [`Key::Fixed`] step for their signature,
//! followed by one [`Key::Variable`] step per distinct signature of their child patterns, all one
//! level deeper, since each child pattern can match any child. Wildcards and variables
//! contribute [`Key::Any`] steps. Trailing [`Key::Any`] steps constrain nothing and are dropped.
//!
//! Paths are stored in a trie of [`DispatchNode`]s, with each step keyed by its key and by its
//! depth relative to the previous step. Matchers that share a prefix share the nodes of that
//! prefix.
//!
//! # Dispatch
//!
//! Dispatching walks the trie and the node being dispatched on in lockstep. A frontier of trie
//! nodes, each paired with the position in the tree it continues from, is kept in a priority
//! queue that visits the deepest positions first. Every payload found on the way is passed to the
//! callback.
//!
//! The dispatcher only prunes matchers that cannot match; the payloads it reports must still be
//! confirmed by running their matchers.

use crate::{matcher::NodeMatcher, node::{Node, NodeSig}};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BinaryHeap},
};
use tracing::trace;

/// The key of one step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Any node.
    Any,

    /// The node at this position must have the signature.
    Fixed(NodeSig),

    /// Some child of the node at the previous position must have the signature.
    Variable(NodeSig),
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    depth: usize,
    key: Key,
}

/// Linearizes a matcher into its path.
fn path(matcher: &NodeMatcher) -> Vec<Step> {
    fn walk(matcher: &NodeMatcher, depth: usize, out: &mut Vec<Step>) {
        match matcher {
            NodeMatcher::Any | NodeMatcher::Ref(_) => out.push(Step { depth, key: Key::Any }),
            NodeMatcher::Named(_, inner) => walk(inner, depth, out),
            NodeMatcher::Kind(_) | NodeMatcher::Fixed(_) => {
                if let Some(sig) = matcher.sig() {
                    out.push(Step { depth, key: Key::Fixed(sig) });
                }
            },
            NodeMatcher::Ordered(ordered) => {
                out.push(Step { depth, key: Key::Fixed(ordered.sig()) });
                for child in ordered.children() {
                    walk(child, depth + 1, out);
                }
            },
            NodeMatcher::Npo(npo) => {
                out.push(Step { depth, key: Key::Fixed(npo.sig()) });
                let mut sigs = npo.children()
                    .iter()
                    .filter_map(NodeMatcher::sig)
                    .collect::<Vec<_>>();
                sigs.sort();
                sigs.dedup();
                out.extend(sigs.into_iter().map(|sig| Step { depth: depth + 1, key: Key::Variable(sig) }));
            },
        }
    }

    let mut out = Vec::new();
    walk(matcher, 0, &mut out);
    while matches!(out.last(), Some(Step { key: Key::Any, .. })) {
        out.pop();
    }
    out
}

/// The payloads whose path ends at a step, and the trie nodes continuing the paths that go on,
/// keyed by the depth of their next step relative to this one.
#[derive(Debug)]
pub struct Bucket<P> {
    payloads: Vec<P>,
    next: BTreeMap<isize, DispatchNode<P>>,
}

impl<P> Default for Bucket<P> {
    fn default() -> Self {
        Self {
            payloads: Vec::new(),
            next: BTreeMap::new(),
        }
    }
}

/// A node of the dispatch trie, with one bucket per [`Key`].
#[derive(Debug)]
pub struct DispatchNode<P> {
    any: Bucket<P>,
    fixed: BTreeMap<NodeSig, Bucket<P>>,
    variable: BTreeMap<NodeSig, Bucket<P>>,
}

impl<P> Default for DispatchNode<P> {
    fn default() -> Self {
        Self {
            any: Bucket::default(),
            fixed: BTreeMap::new(),
            variable: BTreeMap::new(),
        }
    }
}

impl<P> DispatchNode<P> {
    fn bucket_mut(&mut self, key: Key) -> &mut Bucket<P> {
        match key {
            Key::Any => &mut self.any,
            Key::Fixed(sig) => self.fixed.entry(sig).or_default(),
            Key::Variable(sig) => self.variable.entry(sig).or_default(),
        }
    }
}

/// A node of the tree being dispatched on, flattened in pre-order.
struct Slot<'a> {
    node: &'a Node,
    depth: usize,

    /// The index of the first slot after this node's subtree.
    end: usize,
}

/// Flattens a tree into slots in pre-order, down to the given depth.
fn flatten<'a>(node: &'a Node, depth: usize, max_depth: usize, slots: &mut Vec<Slot<'a>>) {
    let idx = slots.len();
    slots.push(Slot { node, depth, end: idx + 1 });
    if depth < max_depth {
        for child in node.children() {
            flatten(child, depth + 1, max_depth, slots);
        }
    }
    slots[idx].end = slots.len();
}

/// The position in the tree a frontier entry continues from.
#[derive(Debug, Clone, Copy)]
enum At {
    /// Nothing matched yet.
    Start,

    /// The previous step matched the slot at `pos`.
    Positional { pos: usize, depth: usize },

    /// The previous step matched some child of the slot at `anchor`.
    Variable { anchor: usize, depth: usize },
}

impl At {
    /// The slot (and its depth) the next positional step at the given relative depth must
    /// match.
    fn positional(self, offset: isize, slots: &[Slot]) -> Option<(usize, usize)> {
        let (idx, depth) = match self {
            At::Start => (0, 0),
            At::Positional { pos, depth } if offset == 1 => (pos + 1, depth + 1),
            At::Positional { pos, depth } if offset <= 0 => {
                (slots[pos].end, depth.checked_add_signed(offset)?)
            },
            At::Variable { anchor, depth } if offset < 0 => {
                (slots[anchor].end, depth.checked_add_signed(offset)?)
            },
            _ => return None,
        };
        (slots.get(idx)?.depth == depth).then_some((idx, depth))
    }

    /// The slot whose children the next variable step at the given relative depth looks at.
    fn anchor(self, offset: isize) -> Option<(usize, usize)> {
        match self {
            At::Positional { pos, depth } if offset == 1 => Some((pos, depth + 1)),
            At::Variable { anchor, depth } if offset == 0 => Some((anchor, depth)),
            _ => None,
        }
    }

    fn depth(self) -> usize {
        match self {
            At::Start => 0,
            At::Positional { depth, .. } | At::Variable { depth, .. } => depth,
        }
    }
}

/// An entry of the dispatch frontier.
struct Entry<'d, P> {
    node: &'d DispatchNode<P>,
    offset: isize,
    from: At,

    /// The depth of the steps of `node`, used to order the frontier.
    depth: isize,

    /// Insertion order, to break ties first in, first out.
    seq: usize,
}

impl<P> PartialEq for Entry<'_, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<P> Eq for Entry<'_, P> {}

impl<P> PartialOrd for Entry<'_, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Entry<'_, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// An index of [`NodeMatcher`]s, each registered with a payload, that reports the payloads of
/// the matchers that could match a given node.
///
/// For more information, see the [module-level documentation](self).
///
/// ```
/// use cas_rewrite::{dispatch::TreeDispatcher, matcher::NodeMatcher, node::Node};
///
/// let mut dispatcher = TreeDispatcher::new();
/// dispatcher.register(&NodeMatcher::unary("sin", NodeMatcher::any()), "sin");
/// dispatcher.register(&NodeMatcher::unary("cos", NodeMatcher::any()), "cos");
///
/// let node = Node::unary("cos", Node::symbol("x"));
/// assert_eq!(dispatcher.candidates(&node), vec![&"cos"]);
/// ```
#[derive(Debug)]
pub struct TreeDispatcher<P> {
    root: DispatchNode<P>,
    len: usize,

    /// The depth of the deepest step of any registered path.
    max_depth: usize,
}

impl<P> Default for TreeDispatcher<P> {
    fn default() -> Self {
        Self {
            root: DispatchNode::default(),
            len: 0,
            max_depth: 0,
        }
    }
}

impl<P> TreeDispatcher<P> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered matchers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no matcher is registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Indexes a matcher, reporting the payload whenever the matcher could match a dispatched
    /// node.
    pub fn register(&mut self, matcher: &NodeMatcher, payload: P) {
        let path = path(matcher);
        trace!(matcher = %matcher, steps = path.len(), "registering matcher");

        let mut steps = path.into_iter();
        let first = steps.next().unwrap_or(Step { depth: 0, key: Key::Any });
        let mut depth = first.depth;
        let mut deepest = depth;
        let mut bucket = self.root.bucket_mut(first.key);
        for step in steps {
            let offset = step.depth as isize - depth as isize;
            depth = step.depth;
            deepest = deepest.max(depth);
            bucket = bucket.next.entry(offset).or_default().bucket_mut(step.key);
        }

        bucket.payloads.push(payload);
        self.len += 1;
        self.max_depth = self.max_depth.max(deepest);
    }

    /// Passes the payload of every matcher that could match `root` to `callback`, until the
    /// callback returns `true`. Returns the payload that stopped the dispatch, if any.
    ///
    /// Each payload is passed at most once. Payloads whose matchers fix more of the tree are
    /// generally reported later than those that fix less.
    pub fn dispatch_until<'a, F>(&'a self, root: &Node, mut callback: F) -> Option<&'a P>
    where
        F: FnMut(&'a P) -> bool,
    {
        let mut slots = Vec::new();
        flatten(root, 0, self.max_depth, &mut slots);

        let mut seq = 0;
        let mut frontier = BinaryHeap::new();
        frontier.push(Entry { node: &self.root, offset: 0, from: At::Start, depth: 0, seq });

        let mut reached = Vec::new();
        while let Some(entry) = frontier.pop() {
            reached.clear();

            if let Some((idx, depth)) = entry.from.positional(entry.offset, &slots) {
                let at = At::Positional { pos: idx, depth };
                reached.push((&entry.node.any, at));
                if let Some(bucket) = entry.node.fixed.get(&slots[idx].node.sig()) {
                    reached.push((bucket, at));
                }
            }

            if let Some((anchor, depth)) = entry.from.anchor(entry.offset) {
                let at = At::Variable { anchor, depth };
                let children = slots[anchor].node.children();
                for (sig, bucket) in &entry.node.variable {
                    if children.iter().any(|child| child.has_sig(sig)) {
                        reached.push((bucket, at));
                    }
                }
            }

            for &(bucket, at) in &reached {
                if let Some(payload) = bucket.payloads.iter().find(|&payload| callback(payload)) {
                    return Some(payload);
                }

                for (&offset, node) in &bucket.next {
                    seq += 1;
                    frontier.push(Entry {
                        node,
                        offset,
                        from: at,
                        depth: at.depth() as isize + offset,
                        seq,
                    });
                }
            }
        }

        None
    }

    /// Returns the payload of every matcher that could match `root`, in dispatch order.
    pub fn candidates(&self, root: &Node) -> Vec<&P> {
        let mut out = Vec::new();
        self.dispatch_until(root, |payload| {
            out.push(payload);
            false
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::{matcher::MatchCtx, node::{Arity, LeafKind}};
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::collections::BTreeSet;
    use super::*;

    fn sym(name: &str) -> Node {
        Node::symbol(name)
    }

    #[test]
    fn linearize() {
        let matcher = NodeMatcher::binary(
            "f",
            NodeMatcher::npo(
                "+",
                vec![
                    NodeMatcher::unary("sin", NodeMatcher::any()),
                    NodeMatcher::reference("a"),
                    NodeMatcher::kind(LeafKind::Rational),
                    NodeMatcher::unary("sin", NodeMatcher::fixed(Node::int(1))),
                ],
                Some(NodeMatcher::reference("r")),
            ),
            NodeMatcher::any(),
        );
        assert_eq!(path(&matcher), vec![
            Step { depth: 0, key: Key::Fixed(NodeSig::op("f", Arity::Binary)) },
            Step { depth: 1, key: Key::Fixed(NodeSig::op("+", Arity::Variadic)) },
            Step { depth: 2, key: Key::Variable(NodeSig::leaf(LeafKind::Rational)) },
            Step { depth: 2, key: Key::Variable(NodeSig::op("sin", Arity::Unary)) },
        ]);
        assert!(path(&NodeMatcher::named("x", NodeMatcher::any())).is_empty());
    }

    #[test]
    fn arity_class_is_respected() {
        let mut dispatcher = TreeDispatcher::new();
        dispatcher.register(&NodeMatcher::binary("+", NodeMatcher::any(), NodeMatcher::any()), "R1");
        let node = Node::variadic("+", [Node::int(1), Node::int(2), Node::int(3)]);
        assert!(dispatcher.candidates(&node).is_empty());
        assert_eq!(dispatcher.dispatch_until(&node, |_| true), None);

        let binary = Node::binary("+", Node::int(1), Node::int(2));
        assert_eq!(dispatcher.candidates(&binary), vec![&"R1"]);
    }

    #[test]
    fn wildcard_root() {
        let mut dispatcher = TreeDispatcher::new();
        dispatcher.register(&NodeMatcher::reference("x"), 0);
        dispatcher.register(&NodeMatcher::kind(LeafKind::Symbol), 1);
        assert_eq!(dispatcher.len(), 2);
        assert_eq!(dispatcher.candidates(&sym("y")), vec![&0, &1]);
        assert_eq!(dispatcher.candidates(&Node::int(4)), vec![&0]);
    }

    #[test]
    fn positional_children() {
        let mut dispatcher = TreeDispatcher::new();
        dispatcher.register(
            &NodeMatcher::binary("^", NodeMatcher::any(), NodeMatcher::fixed(Node::int(0))),
            "pow0",
        );
        dispatcher.register(
            &NodeMatcher::binary("^", NodeMatcher::unary("sin", NodeMatcher::any()), NodeMatcher::any()),
            "sin_pow",
        );

        let node = Node::binary("^", Node::unary("sin", sym("x")), Node::int(0));
        let found = dispatcher.candidates(&node).into_iter().copied().collect::<BTreeSet<_>>();
        assert_eq!(found, BTreeSet::from(["pow0", "sin_pow"]));

        // the subtree of the first child is skipped, so `0` is found as the second child
        let node = Node::binary("^", Node::unary("cos", Node::unary("sin", sym("x"))), Node::int(0));
        assert_eq!(dispatcher.candidates(&node), vec![&"pow0"]);
        let node = Node::binary("^", Node::int(0), sym("x"));
        assert!(dispatcher.candidates(&node).is_empty());
    }

    #[test]
    fn variable_children() {
        let mut dispatcher = TreeDispatcher::new();
        dispatcher.register(
            &NodeMatcher::npo(
                "+",
                vec![NodeMatcher::unary("sin", NodeMatcher::any()), NodeMatcher::unary("cos", NodeMatcher::any())],
                Some(NodeMatcher::any()),
            ),
            "pythagoras",
        );
        dispatcher.register(
            &NodeMatcher::ordered("g", vec![
                NodeMatcher::npo("+", vec![NodeMatcher::kind(LeafKind::Rational)], None),
                NodeMatcher::fixed(sym("y")),
            ]),
            "nested",
        );

        let node = Node::variadic("+", [sym("x"), Node::unary("cos", sym("t")), Node::unary("sin", sym("t"))]);
        assert_eq!(dispatcher.candidates(&node), vec![&"pythagoras"]);
        let node = Node::variadic("+", [sym("x"), Node::unary("sin", sym("t"))]);
        assert!(dispatcher.candidates(&node).is_empty());

        // after the children of `+`, the next positional step continues after its subtree
        let node = Node::variadic("g", [Node::variadic("+", [Node::int(1)]), sym("y")]);
        assert_eq!(dispatcher.candidates(&node), vec![&"nested"]);
        let node = Node::variadic("g", [Node::variadic("+", [sym("z")]), sym("y")]);
        assert!(dispatcher.candidates(&node).is_empty());
    }

    #[test]
    fn stops_at_callback() {
        let mut dispatcher = TreeDispatcher::new();
        for i in 0..4 {
            dispatcher.register(&NodeMatcher::any(), i);
        }
        let mut seen = Vec::new();
        let found = dispatcher.dispatch_until(&sym("x"), |&i| {
            seen.push(i);
            i == 2
        });
        assert_eq!(found, Some(&2));
        assert_eq!(seen, vec![0, 1, 2]);
    }

    fn random_node(rng: &mut StdRng, depth: usize) -> Node {
        let choice = if depth == 0 { rng.gen_range(0..2) } else { rng.gen_range(0..7) };
        match choice {
            0 => Node::int(rng.gen_range(0..3)),
            1 => sym(["x", "y"][rng.gen_range(0..2)]),
            2 => Node::unary("g", random_node(rng, depth - 1)),
            3 => Node::binary("f", random_node(rng, depth - 1), random_node(rng, depth - 1)),
            4 => Node::ternary(
                "h",
                random_node(rng, depth - 1),
                random_node(rng, depth - 1),
                random_node(rng, depth - 1),
            ),
            _ => {
                let op = if choice == 5 { "+" } else { "*" };
                let len = rng.gen_range(0..4);
                let children = (0..len).map(|_| random_node(rng, depth - 1)).collect::<Vec<_>>();
                Node::variadic(op, children)
            },
        }
    }

    fn random_matcher(rng: &mut StdRng, depth: usize) -> NodeMatcher {
        let choice = if depth == 0 { rng.gen_range(0..4) } else { rng.gen_range(0..10) };
        match choice {
            0 => NodeMatcher::any(),
            1 => NodeMatcher::reference(["a", "b"][rng.gen_range(0..2)]),
            2 => NodeMatcher::kind([LeafKind::Rational, LeafKind::Symbol][rng.gen_range(0..2)]),
            3 => NodeMatcher::fixed(random_node(rng, 1)),
            4 => NodeMatcher::named("n", random_matcher(rng, depth - 1)),
            5 => NodeMatcher::unary("g", random_matcher(rng, depth - 1)),
            6 => NodeMatcher::binary("f", random_matcher(rng, depth - 1), random_matcher(rng, depth - 1)),
            7 => NodeMatcher::ordered(
                "*",
                (0..rng.gen_range(0..3)).map(|_| random_matcher(rng, depth - 1)).collect(),
            ),
            _ => {
                let children = (0..rng.gen_range(0..3))
                    .map(|_| random_matcher(rng, depth - 1))
                    .collect();
                let rest = rng.gen_bool(0.5).then(|| NodeMatcher::reference("r"));
                NodeMatcher::npo("+", children, rest)
            },
        }
    }

    #[test]
    fn agrees_with_brute_force() {
        let mut rng = StdRng::seed_from_u64(0xd15a7c4);
        let matchers = (0..80).map(|_| random_matcher(&mut rng, 3)).collect::<Vec<_>>();
        let mut dispatcher = TreeDispatcher::new();
        for (idx, matcher) in matchers.iter().enumerate() {
            dispatcher.register(matcher, idx);
        }

        let matches = |idx: usize, node: &Node| matchers[idx].matches(node, &mut MatchCtx::new()).is_some();
        for _ in 0..60 {
            let tree = random_node(&mut rng, 4);
            for node in tree.post_order_iter() {
                let brute = (0..matchers.len())
                    .filter(|&idx| matches(idx, node))
                    .collect::<BTreeSet<_>>();

                let candidates = dispatcher.candidates(node);
                let unique = candidates.iter().copied().collect::<BTreeSet<_>>();
                assert_eq!(unique.len(), candidates.len(), "payload reported twice for {}", node);

                let dispatched = unique.into_iter()
                    .copied()
                    .filter(|&idx| matches(idx, node))
                    .collect::<BTreeSet<_>>();
                assert_eq!(dispatched, brute, "disagreement on {}", node);
            }
        }
    }
}
