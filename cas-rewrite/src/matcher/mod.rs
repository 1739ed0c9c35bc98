//! Compiled patterns over [`Node`]s.
//!
//! A [`NodeMatcher`] is a tree of matcher variants mirroring the shape of [`Node`], plus a few
//! pattern-specific ones: wildcards, references to pattern variables, named captures, and the
//! permutation-invariant [`NpoMatcher`] used for commutative and associative operators.
//!
//! Matching never fails loudly: a matcher either matches a node, returning it and recording any
//! new bindings in the [`MatchCtx`], or it does not, returning [`None`] and leaving the context
//! exactly as it was.
//!
//! ```
//! use cas_rewrite::{matcher::{MatchCtx, NodeMatcher}, node::Node};
//!
//! // x + x, in any order, with any other terms captured in `rest`
//! let matcher = NodeMatcher::npo(
//!     "+",
//!     vec![NodeMatcher::reference("x"), NodeMatcher::reference("x")],
//!     Some(NodeMatcher::reference("rest")),
//! );
//!
//! let node = Node::variadic("+", [Node::symbol("y"), Node::int(1), Node::symbol("y")]);
//! let mut ctx = MatchCtx::new();
//! assert!(matcher.matches(&node, &mut ctx).is_some());
//! assert_eq!(ctx.get("x"), Some(&Node::symbol("y")));
//! assert_eq!(ctx.get("rest"), Some(&Node::variadic("+", [Node::int(1)])));
//! ```

mod compile;
mod ctx;
mod npo;

pub use compile::PatternCompiler;
pub use ctx::MatchCtx;
pub use npo::NpoMatcher;

use crate::node::{Arity, LeafKind, Node, NodeSig, Op};
use std::{fmt, rc::Rc};

/// A compiled pattern.
///
/// For more information, see the [module-level documentation](self).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeMatcher {
    /// Matches any node, binding nothing.
    Any,

    /// Matches any leaf of the given kind, binding nothing.
    Kind(LeafKind),

    /// Matches nodes structurally equal to the given node.
    Fixed(Node),

    /// A pattern variable. The first occurrence binds the name to the node it is matched
    /// against; later occurrences only match nodes equal to that binding.
    Ref(Rc<str>),

    /// Matches whatever the inner matcher matches, and binds the name to it.
    Named(Rc<str>, Box<NodeMatcher>),

    /// Matches nodes with the given signature whose children match, in order.
    Ordered(OrderedMatcher),

    /// Matches variadic nodes of an operator whose children match in any order.
    Npo(NpoMatcher),
}

impl NodeMatcher {
    /// A wildcard.
    pub fn any() -> Self {
        Self::Any
    }

    /// A typed wildcard.
    pub fn kind(kind: LeafKind) -> Self {
        Self::Kind(kind)
    }

    /// A literal embedded in the pattern.
    pub fn fixed(node: Node) -> Self {
        Self::Fixed(node)
    }

    /// A pattern variable.
    pub fn reference(name: impl Into<Rc<str>>) -> Self {
        Self::Ref(name.into())
    }

    /// Binds a name to whatever `inner` matches.
    pub fn named(name: impl Into<Rc<str>>, inner: NodeMatcher) -> Self {
        Self::Named(name.into(), Box::new(inner))
    }

    /// Matches unary nodes of the given operator.
    pub fn unary(op: impl Into<Op>, child: NodeMatcher) -> Self {
        Self::Ordered(OrderedMatcher::new(op.into(), Arity::Unary, vec![child]))
    }

    /// Matches binary nodes of the given operator.
    pub fn binary(op: impl Into<Op>, lhs: NodeMatcher, rhs: NodeMatcher) -> Self {
        Self::Ordered(OrderedMatcher::new(op.into(), Arity::Binary, vec![lhs, rhs]))
    }

    /// Matches ternary nodes of the given operator.
    pub fn ternary(op: impl Into<Op>, a: NodeMatcher, b: NodeMatcher, c: NodeMatcher) -> Self {
        Self::Ordered(OrderedMatcher::new(op.into(), Arity::Ternary, vec![a, b, c]))
    }

    /// Matches variadic nodes of the given operator with exactly these children, in order.
    pub fn ordered(op: impl Into<Op>, children: Vec<NodeMatcher>) -> Self {
        Self::Ordered(OrderedMatcher::new(op.into(), Arity::Variadic, children))
    }

    /// Matches variadic nodes of the given operator whose children match `children` in any
    /// order.
    ///
    /// If `rest` is given, the children left over after each pattern in `children` consumed one
    /// child are packaged into a new variadic node of the same operator, which must match
    /// `rest`. Otherwise, every child must be consumed.
    pub fn npo(op: impl Into<Op>, children: Vec<NodeMatcher>, rest: Option<NodeMatcher>) -> Self {
        Self::Npo(NpoMatcher::new(op.into(), children, rest))
    }

    /// Returns the signature every matched node must have, if the matcher fixes one.
    pub fn sig(&self) -> Option<NodeSig> {
        match self {
            Self::Any | Self::Ref(_) => None,
            Self::Kind(kind) => Some(NodeSig::leaf(*kind)),
            Self::Fixed(node) => Some(node.sig()),
            Self::Named(_, inner) => inner.sig(),
            Self::Ordered(ordered) => Some(ordered.sig()),
            Self::Npo(npo) => Some(npo.sig()),
        }
    }

    /// Returns the names bound by a successful match, in the order they first appear in the
    /// pattern.
    pub fn bound_names(&self) -> Vec<Rc<str>> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<Rc<str>>) {
        fn push(names: &mut Vec<Rc<str>>, name: &Rc<str>) {
            if !names.contains(name) {
                names.push(Rc::clone(name));
            }
        }

        match self {
            Self::Any | Self::Kind(_) | Self::Fixed(_) => (),
            Self::Ref(name) => push(names, name),
            Self::Named(name, inner) => {
                push(names, name);
                inner.collect_names(names);
            },
            Self::Ordered(ordered) => ordered.children.iter()
                .for_each(|child| child.collect_names(names)),
            Self::Npo(npo) => npo.children().iter()
                .chain(npo.rest())
                .for_each(|child| child.collect_names(names)),
        }
    }

    /// A rough measure of how constraining this matcher is; the higher, the fewer nodes it
    /// matches.
    ///
    /// If every node matched by `a` passes the signature checks of `b` (for example, `a` is
    /// `sin(2)` and `b` is `sin(_)` or `_`), then `a.specificity() >= b.specificity()`.
    pub fn specificity(&self) -> usize {
        match self {
            Self::Any | Self::Ref(_) => 0,
            Self::Kind(_) => 1,
            Self::Named(_, inner) => inner.specificity(),
            Self::Fixed(node) => 2 + 2 * node.size(),
            Self::Ordered(ordered) => {
                2 + ordered.children.iter().map(Self::specificity).sum::<usize>()
            },
            Self::Npo(npo) => {
                let exact = if npo.rest().is_none() { 1 } else { 0 };
                2 + exact + npo.children().iter().map(Self::specificity).sum::<usize>()
            },
        }
    }

    /// Attempts to match the given node.
    ///
    /// On success, returns the matched node and leaves any new bindings in `ctx`. On failure,
    /// returns [`None`] and leaves `ctx` exactly as it was passed in.
    pub fn matches(&self, node: &Node, ctx: &mut MatchCtx) -> Option<Node> {
        self.matches_with(node, ctx, &mut |_| true).then(|| node.clone())
    }

    /// Tries every way of matching the given node, in turn, until `then` accepts one.
    ///
    /// `then` is called with the bindings of each match. If it returns `false`, it must leave
    /// `ctx` as it found it, and the next way is tried. Returns `false` when no way is accepted;
    /// `ctx` is then left as it was passed in.
    pub(crate) fn matches_with(&self, node: &Node, ctx: &mut MatchCtx, then: &mut Then) -> bool {
        match self {
            Self::Any => then(ctx),
            Self::Kind(kind) => node.leaf_kind() == Some(*kind) && then(ctx),
            Self::Fixed(fixed) => fixed == node && then(ctx),
            Self::Ref(name) => bind_then(name, node, ctx, then),
            Self::Named(name, inner) => {
                inner.matches_with(node, ctx, &mut |ctx| bind_then(name, node, ctx, &mut *then))
            },
            Self::Ordered(ordered) => ordered.matches_with(node, ctx, then),
            Self::Npo(npo) => npo.matches_with(node, ctx, then),
        }
    }
}

/// The rest of a match, called with the bindings made so far.
pub(crate) type Then<'a> = dyn FnMut(&mut MatchCtx) -> bool + 'a;

/// Binds `name` to `node` and continues with `then`, undoing the binding if `then` rejects it.
fn bind_then(name: &Rc<str>, node: &Node, ctx: &mut MatchCtx, then: &mut Then) -> bool {
    let checkpoint = ctx.checkpoint();
    if ctx.bind(name, node) && then(ctx) {
        return true;
    }
    ctx.rollback(checkpoint);
    false
}

/// Matches `children` against `patterns` pairwise, in order, then continues with `then`.
fn match_seq(
    patterns: &[NodeMatcher],
    children: &[Node],
    ctx: &mut MatchCtx,
    then: &mut Then,
) -> bool {
    match (patterns.split_first(), children.split_first()) {
        (Some((pattern, patterns)), Some((child, children))) => {
            pattern.matches_with(child, ctx, &mut |ctx| match_seq(patterns, children, ctx, &mut *then))
        },
        (None, None) => then(ctx),
        _ => false,
    }
}

/// Matchers print like the templates they are usually compiled from: `_` for a wildcard, `?x`
/// for a variable, `x@m` for a named capture, `<rational>` for a typed wildcard, and
/// `+{a, b, ..rest}` for a permutation-invariant matcher.
impl fmt::Display for NodeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "_"),
            Self::Kind(kind) => write!(f, "<{}>", kind),
            Self::Fixed(node) => write!(f, "{}", node),
            Self::Ref(name) => write!(f, "?{}", name),
            Self::Named(name, inner) => write!(f, "{}@{}", name, inner),
            Self::Ordered(ordered) => {
                write!(f, "{}(", ordered.op)?;
                fmt_list(f, ordered.children.iter(), None)?;
                write!(f, ")")
            },
            Self::Npo(npo) => {
                write!(f, "{}{{", npo.op())?;
                fmt_list(f, npo.children().iter(), npo.rest())?;
                write!(f, "}}")
            },
        }
    }
}

/// Writes a comma separated list of matchers, followed by `..rest` if given.
fn fmt_list<'a>(
    f: &mut fmt::Formatter<'_>,
    mut iter: impl Iterator<Item = &'a NodeMatcher>,
    rest: Option<&NodeMatcher>,
) -> fmt::Result {
    let mut first = true;
    if let Some(item) = iter.next() {
        write!(f, "{}", item)?;
        first = false;
        for item in iter {
            write!(f, ", {}", item)?;
        }
    }
    if let Some(rest) = rest {
        if !first {
            write!(f, ", ")?;
        }
        write!(f, "..{}", rest)?;
    }
    Ok(())
}

/// Matches nodes of a fixed operator and arity class whose children match pairwise, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMatcher {
    op: Op,
    arity: Arity,
    children: Vec<NodeMatcher>,
}

impl OrderedMatcher {
    fn new(op: Op, arity: Arity, children: Vec<NodeMatcher>) -> Self {
        Self { op, arity, children }
    }

    /// The operator of matched nodes.
    pub fn op(&self) -> &Op {
        &self.op
    }

    /// The child patterns, in order.
    pub fn children(&self) -> &[NodeMatcher] {
        &self.children
    }

    /// The signature of matched nodes.
    pub fn sig(&self) -> NodeSig {
        NodeSig::op(Rc::clone(&self.op), self.arity)
    }

    fn matches_with(&self, node: &Node, ctx: &mut MatchCtx, then: &mut Then) -> bool {
        node.op() == Some(&self.op)
            && node.arity() == self.arity
            && match_seq(&self.children, node.children(), ctx, then)
    }
}
