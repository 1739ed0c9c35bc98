use crate::node::{Arity, Node, NodeSig, Op};
use super::{match_seq, MatchCtx, NodeMatcher, Then};
use std::rc::Rc;

/// One step of the search plan of an [`NpoMatcher`].
#[derive(Debug, Clone, PartialEq)]
struct Link {
    /// Index of the pattern to match in this step.
    pattern: usize,

    /// The step that matched the previous, identical pattern, if any. This step only considers
    /// children after the child chosen there.
    prev: Option<usize>,
}

/// A permutation-invariant matcher for variadic nodes of a commutative operator.
///
/// The child patterns form a multiset: a node matches if each pattern can be assigned to a
/// distinct child such that every pattern matches its child. The children left unassigned form
/// the **remainder**, which is packaged into a new variadic node of the same operator (keeping
/// the original order) and matched against the rest pattern. Without a rest pattern, no child may
/// be left over.
///
/// # Search
///
/// The patterns are grouped into **chains** of identical patterns. Assigning identical patterns
/// to the same set of children in a different order always gives the same result, so within a
/// chain, each pattern only considers children after the one its predecessor in the chain
/// consumed. Chains are then tried most specific first (see [`NodeMatcher::specificity`]), so
/// the children that can only go to one pattern are claimed before wildcards get a chance to
/// claim them.
///
/// Assignments are explored depth-first. A child pattern that can match its child in more than
/// one way (such as a nested permutation-invariant matcher) is asked for its next way whenever
/// the patterns after it fail, so the result never depends on the order of the children.
#[derive(Debug, Clone, PartialEq)]
pub struct NpoMatcher {
    op: Op,
    children: Vec<NodeMatcher>,
    rest: Option<Box<NodeMatcher>>,
    plan: Vec<Link>,
}

impl NpoMatcher {
    /// Creates a permutation-invariant matcher, planning the order in which the child patterns
    /// are tried.
    pub fn new(op: Op, children: Vec<NodeMatcher>, rest: Option<NodeMatcher>) -> Self {
        let mut chains: Vec<Vec<usize>> = Vec::new();
        for (idx, child) in children.iter().enumerate() {
            match chains.iter_mut().find(|chain| children[chain[0]] == *child) {
                Some(chain) => chain.push(idx),
                None => chains.push(vec![idx]),
            }
        }

        // stable, so equally ranked chains keep declaration order
        chains.sort_by_key(|chain| {
            std::cmp::Reverse((children[chain[0]].specificity(), chain.len()))
        });

        let mut plan = Vec::with_capacity(children.len());
        for chain in chains {
            let mut prev = None;
            for pattern in chain {
                plan.push(Link { pattern, prev });
                prev = Some(plan.len() - 1);
            }
        }

        Self {
            op,
            children,
            rest: rest.map(Box::new),
            plan,
        }
    }

    /// The operator of matched nodes.
    pub fn op(&self) -> &Op {
        &self.op
    }

    /// The child patterns, in declaration order.
    pub fn children(&self) -> &[NodeMatcher] {
        &self.children
    }

    /// The pattern the remainder is matched against, if any.
    pub fn rest(&self) -> Option<&NodeMatcher> {
        self.rest.as_deref()
    }

    /// The signature of matched nodes.
    pub fn sig(&self) -> NodeSig {
        NodeSig::op(Rc::clone(&self.op), Arity::Variadic)
    }

    /// Tries every assignment of the child patterns to the children of the node, until `then`
    /// accepts one.
    pub(super) fn matches_with(&self, node: &Node, ctx: &mut MatchCtx, then: &mut Then) -> bool {
        if node.op() != Some(&self.op) || node.arity() != Arity::Variadic {
            return false;
        }

        let actual = node.children();
        if self.children.len() > actual.len()
            || (self.rest.is_none() && self.children.len() != actual.len()) {
            return false;
        }

        // commonly, the children are already in pattern order
        if self.rest.is_none() && match_seq(&self.children, actual, ctx, &mut *then) {
            return true;
        }

        let mut search = Search {
            used: vec![false; actual.len()],
            chosen: vec![0; self.plan.len()],
        };
        self.search(0, node, &mut search, ctx, then)
    }

    /// Tries every assignment of the child pattern at the given plan step, and recursively every
    /// assignment of the steps after it.
    fn search(
        &self,
        step: usize,
        node: &Node,
        search: &mut Search,
        ctx: &mut MatchCtx,
        then: &mut Then,
    ) -> bool {
        let Some(link) = self.plan.get(step) else {
            return self.match_remainder(node, &search.used, ctx, then);
        };

        let actual = node.children();
        let pattern = &self.children[link.pattern];
        let start = link.prev.map(|prev| search.chosen[prev] + 1).unwrap_or(0);

        for idx in start..actual.len() {
            if search.used[idx] {
                continue;
            }

            let found = pattern.matches_with(&actual[idx], ctx, &mut |ctx| {
                search.used[idx] = true;
                search.chosen[step] = idx;
                let found = self.search(step + 1, node, search, ctx, &mut *then);
                search.used[idx] = false;
                found
            });
            if found {
                return true;
            }
        }

        false
    }

    /// Matches the unused children against the rest pattern, or checks that there are none.
    fn match_remainder(
        &self,
        node: &Node,
        used: &[bool],
        ctx: &mut MatchCtx,
        then: &mut Then,
    ) -> bool {
        let Some(rest) = &self.rest else {
            return used.iter().all(|&used| used) && then(ctx);
        };

        let remainder = if used.iter().any(|&used| used) {
            Node::variadic(
                Rc::clone(&self.op),
                node.children()
                    .iter()
                    .zip(used)
                    .filter(|(_, used)| !**used)
                    .map(|(child, _)| child.clone()),
            )
        } else {
            node.clone()
        };
        rest.matches_with(&remainder, ctx, then)
    }
}

/// State of one assignment search.
struct Search {
    /// Whether each actual child is consumed by a pattern.
    used: Vec<bool>,

    /// The child chosen by each plan step.
    chosen: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use crate::node::LeafKind;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
    use super::*;

    fn sym(name: &str) -> Node {
        Node::symbol(name)
    }

    fn sum(children: impl IntoIterator<Item = Node>) -> Node {
        Node::variadic("+", children)
    }

    fn reference(name: &str) -> NodeMatcher {
        NodeMatcher::reference(name)
    }

    /// Sorted string forms of the children of a node, to compare them as a multiset.
    fn multiset(node: &Node) -> Vec<String> {
        let mut children = node.children().iter().map(|c| c.to_string()).collect::<Vec<_>>();
        children.sort();
        children
    }

    #[test]
    fn fixed_and_reference() {
        let matcher = NodeMatcher::npo("+", vec![NodeMatcher::fixed(Node::int(2)), reference("x")], None);

        for node in [sum([Node::int(2), Node::int(5)]), sum([Node::int(5), Node::int(2)])] {
            let mut ctx = MatchCtx::new();
            assert!(matcher.matches(&node, &mut ctx).is_some());
            assert_eq!(ctx.get("x"), Some(&Node::int(5)));
        }

        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&sum([Node::int(2), Node::int(5), Node::int(7)]), &mut ctx).is_none());
        assert!(ctx.is_empty());
    }

    #[test]
    fn operator_and_arity() {
        let matcher = NodeMatcher::npo("+", vec![NodeMatcher::any(), NodeMatcher::any()], None);
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&sum([sym("a"), sym("b")]), &mut ctx).is_some());
        assert!(matcher.matches(&Node::variadic("*", [sym("a"), sym("b")]), &mut ctx).is_none());
        assert!(matcher.matches(&Node::binary("+", sym("a"), sym("b")), &mut ctx).is_none());
        assert!(matcher.matches(&sym("a"), &mut ctx).is_none());
    }

    #[test]
    fn permutation_invariance() {
        let matcher = NodeMatcher::npo(
            "+",
            vec![
                NodeMatcher::binary("^", reference("x"), NodeMatcher::fixed(Node::int(2))),
                NodeMatcher::named("n", NodeMatcher::kind(LeafKind::Rational)),
                NodeMatcher::unary("sin", reference("x")),
            ],
            Some(reference("rest")),
        );
        let mut children = vec![
            sym("a"),
            Node::unary("sin", sym("t")),
            Node::binary("^", sym("u"), Node::int(2)),
            Node::int(4),
            Node::binary("^", sym("t"), Node::int(2)),
            sym("b"),
        ];

        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..50 {
            children.shuffle(&mut rng);
            let node = sum(children.iter().cloned());
            let mut ctx = MatchCtx::new();
            assert!(matcher.matches(&node, &mut ctx).is_some(), "no match for {}", node);
            assert_eq!(ctx.get("x"), Some(&sym("t")));
            assert_eq!(ctx.get("n"), Some(&Node::int(4)));
            let rest = ctx.get("rest").unwrap();
            assert_eq!(multiset(rest), vec!["^(u, 2)", "a", "b"]);
        }
    }

    #[test]
    fn remainder_completeness() {
        let matcher = NodeMatcher::npo(
            "+",
            vec![
                NodeMatcher::unary("sin", reference("p")),
                NodeMatcher::unary("cos", reference("q")),
            ],
            Some(reference("r")),
        );

        for i in 0..4 {
            for j in (0..4).filter(|&j| j != i) {
                let children = (0..4)
                    .map(|k| {
                        if k == i {
                            Node::unary("sin", sym("p"))
                        } else if k == j {
                            Node::unary("cos", sym("q"))
                        } else {
                            sym(&format!("c{}", k))
                        }
                    })
                    .collect::<Vec<_>>();
                let leftover = (0..4)
                    .filter(|&k| k != i && k != j)
                    .map(|k| sym(&format!("c{}", k)));

                let mut ctx = MatchCtx::new();
                assert!(matcher.matches(&sum(children), &mut ctx).is_some());
                assert_eq!(ctx.get("r"), Some(&sum(leftover)));
            }
        }
    }

    #[test]
    fn empty_multiset_with_rest() {
        let matcher = NodeMatcher::npo("+", vec![], Some(reference("r")));
        let node = sum([sym("a"), Node::int(1)]);
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&node, &mut ctx).is_some());
        assert!(ctx.get("r").unwrap().ptr_eq(&node));

        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&sum([]), &mut ctx).is_some());
        assert_eq!(ctx.get("r"), Some(&sum([])));
    }

    #[test]
    fn empty_multiset_without_rest() {
        let matcher = NodeMatcher::npo("+", vec![], None);
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&sum([]), &mut ctx).is_some());
        assert!(matcher.matches(&sum([sym("a")]), &mut ctx).is_none());
    }

    #[test]
    fn everything_consumed_gives_empty_remainder() {
        let matcher = NodeMatcher::npo("*", vec![reference("a")], Some(reference("r")));
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&Node::variadic("*", [sym("z")]), &mut ctx).is_some());
        assert_eq!(ctx.get("r"), Some(&Node::variadic("*", [])));
    }

    #[test]
    fn leftover_without_rest() {
        let matcher = NodeMatcher::npo("+", vec![reference("a"), reference("b")], None);
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&sum([sym("x"), sym("y"), sym("z")]), &mut ctx).is_none());
        assert!(ctx.is_empty());
    }

    #[test]
    fn repeated_reference() {
        let matcher = NodeMatcher::npo("+", vec![reference("x"), reference("x")], Some(reference("r")));
        let node = sum([sym("a"), sym("b"), Node::int(3), sym("b")]);
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&node, &mut ctx).is_some());
        assert_eq!(ctx.get("x"), Some(&sym("b")));
        assert_eq!(ctx.get("r"), Some(&sum([sym("a"), Node::int(3)])));

        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&sum([sym("a"), sym("b"), sym("c")]), &mut ctx).is_none());
        assert!(ctx.is_empty());
    }

    #[test]
    fn identical_patterns() {
        let sin_any = NodeMatcher::unary("sin", NodeMatcher::any());
        let matcher = NodeMatcher::npo("+", vec![sin_any.clone(), NodeMatcher::any(), sin_any], None);
        let mut ctx = MatchCtx::new();
        let node = sum([Node::unary("sin", Node::int(1)), sym("y"), Node::unary("sin", Node::int(2))]);
        assert!(matcher.matches(&node, &mut ctx).is_some());

        let node = sum([Node::unary("sin", Node::int(1)), sym("y"), sym("z")]);
        assert!(matcher.matches(&node, &mut ctx).is_none());
    }

    #[test]
    fn wildcard_does_not_steal() {
        // the wildcard would claim `2` first if patterns were tried in declaration order
        let matcher = NodeMatcher::npo(
            "+",
            vec![NodeMatcher::named("a", NodeMatcher::any()), NodeMatcher::fixed(Node::int(2))],
            Some(reference("r")),
        );
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&sum([Node::int(2), sym("q"), sym("s")]), &mut ctx).is_some());
        assert_eq!(ctx.get("a"), Some(&sym("q")));
        assert_eq!(ctx.get("r"), Some(&sum([sym("s")])));
    }

    #[test]
    fn nested() {
        // x * y + x * z, with a common factor `x`
        let product = |other: &str| NodeMatcher::npo(
            "*",
            vec![reference("x"), reference(other)],
            None,
        );
        let matcher = NodeMatcher::npo("+", vec![product("y"), product("z")], None);
        let node = sum([
            Node::variadic("*", [sym("b"), sym("a")]),
            Node::variadic("*", [sym("a"), sym("c")]),
        ]);
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&node, &mut ctx).is_some());
        assert_eq!(ctx.get("x"), Some(&sym("a")));
    }

    #[test]
    fn nested_alternatives() {
        // the inner product can bind `x` to either factor; only one choice lets the outer `x` match
        let matcher = NodeMatcher::npo(
            "+",
            vec![
                reference("x"),
                NodeMatcher::npo("*", vec![reference("x"), reference("y")], None),
            ],
            None,
        );

        for product in [[sym("a"), sym("b")], [sym("b"), sym("a")]] {
            let product = Node::variadic("*", product);
            for node in [sum([sym("b"), product.clone()]), sum([product.clone(), sym("b")])] {
                let mut ctx = MatchCtx::new();
                assert!(matcher.matches(&node, &mut ctx).is_some(), "no match for {}", node);
                assert_eq!(ctx.get("x"), Some(&sym("b")));
                assert_eq!(ctx.get("y"), Some(&sym("a")));
            }
        }
    }

    #[test]
    fn nested_alternatives_with_rest() {
        let matcher = NodeMatcher::npo(
            "+",
            vec![NodeMatcher::npo("*", vec![reference("x"), reference("y")], None)],
            Some(NodeMatcher::npo("+", vec![reference("x")], None)),
        );
        let node = sum([Node::variadic("*", [sym("a"), sym("b")]), sym("b")]);
        let mut ctx = MatchCtx::new();
        assert!(matcher.matches(&node, &mut ctx).is_some());
        assert_eq!(ctx.get("x"), Some(&sym("b")));
        assert_eq!(ctx.get("y"), Some(&sym("a")));

        let mut ctx = MatchCtx::new();
        let node = sum([Node::variadic("*", [sym("a"), sym("b")]), sym("c")]);
        assert!(matcher.matches(&node, &mut ctx).is_none());
        assert!(ctx.is_empty());
    }
}
