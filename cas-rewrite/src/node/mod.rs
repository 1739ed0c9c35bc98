//! The expression tree.
//!
//! A [`Node`] is an immutable, reference-counted expression tree value. It is one of a closed
//! set of variants, described by [`NodeKind`]:
//!
//! - an exact rational number,
//! - a symbol,
//! - a unary, binary or ternary operator application,
//! - a variadic operator application with an ordered list of children.
//!
//! # Structural equality
//!
//! The [`PartialEq`], [`Eq`] and [`Hash`] implementations for [`Node`] implement **structural
//! equality**: two nodes are equal if they are the same variant, with the same operator name
//! (or value) and pairwise equal children, **in the same order**. Commutativity is a property of
//! patterns, not of values; `+(x, y)` and `+(y, x)` are different nodes.
//!
//! Each node caches its structural hash on first use, so comparing two unequal nodes is usually
//! a single integer comparison, and comparing a node with itself (or a clone of itself) is a
//! pointer comparison.
//!
//! # Side table
//!
//! Every node carries a [`Meta`] side table of cached facts, keyed by type. The side table is
//! mutable through a shared reference and is not part of the node's identity: it never
//! participates in equality or hashing. Because nodes are shared, a fact stored on a node is
//! visible through every tree that contains it.

mod iter;
pub mod meta;

pub use iter::NodeIter;
pub use meta::{Meta, MetaKey, SimplifiedBy};

use once_cell::unsync::OnceCell;
use rug::Rational;
use std::{
    cell::RefCell,
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// The name of an operator.
pub type Op = Rc<str>;

/// The kind of a leaf node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeafKind {
    /// An exact rational number.
    Rational,

    /// A named symbol.
    Symbol,
}

impl fmt::Display for LeafKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rational => write!(f, "rational"),
            Self::Symbol => write!(f, "symbol"),
        }
    }
}

/// The arity class of a node.
///
/// Variadic nodes form their own class regardless of how many children they have; a variadic
/// node with two children does **not** have the same arity class as a binary node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arity {
    Leaf,
    Unary,
    Binary,
    Ternary,
    Variadic,
}

/// The name part of a [`NodeSig`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SigName {
    /// Any rational number.
    Rational,

    /// Any symbol.
    Symbol,

    /// An operator with the given name.
    Op(Op),
}

/// The structural signature of a node: its operator name and arity class.
///
/// Signatures are totally ordered, by name and then by arity class. Two nodes with different
/// signatures can never be matched by the same signature-fixed matcher, which makes the
/// signature both a cheap pre-check before full matching and the key of the
/// [`TreeDispatcher`](crate::TreeDispatcher) index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeSig {
    pub name: SigName,
    pub arity: Arity,
}

impl NodeSig {
    /// The signature of every leaf of the given kind.
    pub fn leaf(kind: LeafKind) -> Self {
        let name = match kind {
            LeafKind::Rational => SigName::Rational,
            LeafKind::Symbol => SigName::Symbol,
        };
        Self { name, arity: Arity::Leaf }
    }

    /// The signature of an operator node.
    pub fn op(name: impl Into<Op>, arity: Arity) -> Self {
        Self { name: SigName::Op(name.into()), arity }
    }
}

impl fmt::Display for NodeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            SigName::Rational => write!(f, "<rational>"),
            SigName::Symbol => write!(f, "<symbol>"),
            SigName::Op(op) => match self.arity {
                Arity::Leaf => write!(f, "{}/0", op),
                Arity::Unary => write!(f, "{}/1", op),
                Arity::Binary => write!(f, "{}/2", op),
                Arity::Ternary => write!(f, "{}/3", op),
                Arity::Variadic => write!(f, "{}/N", op),
            },
        }
    }
}

/// The variant of a [`Node`], holding its value or operator and children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An exact rational number, such as `3` or `-1/2`.
    Rational(Rational),

    /// A named symbol, such as `x`.
    Symbol(Rc<str>),

    /// An operator applied to one child.
    Unary(Op, [Node; 1]),

    /// An operator applied to two children.
    Binary(Op, [Node; 2]),

    /// An operator applied to three children.
    Ternary(Op, [Node; 3]),

    /// An operator applied to any number of children.
    Variadic(Op, Vec<Node>),
}

struct NodeData {
    kind: NodeKind,
    meta: RefCell<Meta>,
    hash: OnceCell<u64>,
}

/// An immutable expression tree.
///
/// For more information about this type, see the [module-level documentation](self).
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    /// Creates a node from its variant.
    pub fn new(kind: NodeKind) -> Self {
        Self(Rc::new(NodeData {
            kind,
            meta: RefCell::new(Meta::default()),
            hash: OnceCell::new(),
        }))
    }

    /// Creates a rational constant.
    pub fn rational(value: impl Into<Rational>) -> Self {
        Self::new(NodeKind::Rational(value.into()))
    }

    /// Creates an integer constant.
    pub fn int(value: i64) -> Self {
        Self::rational(Rational::from(value))
    }

    /// Creates a symbol.
    pub fn symbol(name: impl Into<Rc<str>>) -> Self {
        Self::new(NodeKind::Symbol(name.into()))
    }

    /// Applies a unary operator.
    pub fn unary(op: impl Into<Op>, child: Node) -> Self {
        Self::new(NodeKind::Unary(op.into(), [child]))
    }

    /// Applies a binary operator.
    pub fn binary(op: impl Into<Op>, lhs: Node, rhs: Node) -> Self {
        Self::new(NodeKind::Binary(op.into(), [lhs, rhs]))
    }

    /// Applies a ternary operator.
    pub fn ternary(op: impl Into<Op>, a: Node, b: Node, c: Node) -> Self {
        Self::new(NodeKind::Ternary(op.into(), [a, b, c]))
    }

    /// Applies a variadic operator.
    pub fn variadic(op: impl Into<Op>, children: impl IntoIterator<Item = Node>) -> Self {
        Self::new(NodeKind::Variadic(op.into(), children.into_iter().collect()))
    }

    /// Returns the variant of this node.
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// Returns the children of this node, in order. Leaves have no children.
    pub fn children(&self) -> &[Node] {
        match self.kind() {
            NodeKind::Rational(_) | NodeKind::Symbol(_) => &[],
            NodeKind::Unary(_, children) => children,
            NodeKind::Binary(_, children) => children,
            NodeKind::Ternary(_, children) => children,
            NodeKind::Variadic(_, children) => children,
        }
    }

    /// Returns the operator of this node, if it is not a leaf.
    pub fn op(&self) -> Option<&Op> {
        match self.kind() {
            NodeKind::Rational(_) | NodeKind::Symbol(_) => None,
            NodeKind::Unary(op, _)
                | NodeKind::Binary(op, _)
                | NodeKind::Ternary(op, _)
                | NodeKind::Variadic(op, _) => Some(op),
        }
    }

    /// Returns the arity class of this node.
    pub fn arity(&self) -> Arity {
        match self.kind() {
            NodeKind::Rational(_) | NodeKind::Symbol(_) => Arity::Leaf,
            NodeKind::Unary(..) => Arity::Unary,
            NodeKind::Binary(..) => Arity::Binary,
            NodeKind::Ternary(..) => Arity::Ternary,
            NodeKind::Variadic(..) => Arity::Variadic,
        }
    }

    /// Returns the kind of this node if it is a leaf.
    pub fn leaf_kind(&self) -> Option<LeafKind> {
        match self.kind() {
            NodeKind::Rational(_) => Some(LeafKind::Rational),
            NodeKind::Symbol(_) => Some(LeafKind::Symbol),
            _ => None,
        }
    }

    /// Returns the structural signature of this node.
    pub fn sig(&self) -> NodeSig {
        match self.kind() {
            NodeKind::Rational(_) => NodeSig::leaf(LeafKind::Rational),
            NodeKind::Symbol(_) => NodeSig::leaf(LeafKind::Symbol),
            NodeKind::Unary(op, _)
                | NodeKind::Binary(op, _)
                | NodeKind::Ternary(op, _)
                | NodeKind::Variadic(op, _) => NodeSig::op(op.clone(), self.arity()),
        }
    }

    /// Returns true if the node has the given operator and arity class, without building a
    /// [`NodeSig`].
    pub fn has_sig(&self, sig: &NodeSig) -> bool {
        match (&sig.name, self.kind()) {
            (SigName::Rational, NodeKind::Rational(_)) => true,
            (SigName::Symbol, NodeKind::Symbol(_)) => true,
            (SigName::Op(op), _) => {
                self.op().map(|own| own == op).unwrap_or(false) && self.arity() == sig.arity
            },
            _ => false,
        }
    }

    /// If the node is a rational constant, returns a reference to its value.
    pub fn as_rational(&self) -> Option<&Rational> {
        match self.kind() {
            NodeKind::Rational(value) => Some(value),
            _ => None,
        }
    }

    /// If the node is a symbol, returns its name.
    pub fn as_symbol(&self) -> Option<&str> {
        match self.kind() {
            NodeKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Returns true if the node is a leaf (a rational or a symbol).
    pub fn is_leaf(&self) -> bool {
        self.leaf_kind().is_some()
    }

    /// Returns true if both nodes are the very same allocation.
    ///
    /// This is stronger than equality: it also implies that both share one side table.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Rebuilds this node with the same operator and arity class, but different children.
    ///
    /// Returns [`None`] if the number of children does not fit the arity class. Leaves accept
    /// only an empty list, and return themselves.
    pub fn with_children(&self, children: Vec<Node>) -> Option<Node> {
        let kind = match self.kind() {
            NodeKind::Rational(_) | NodeKind::Symbol(_) => {
                return children.is_empty().then(|| self.clone());
            },
            NodeKind::Unary(op, _) => NodeKind::Unary(op.clone(), children.try_into().ok()?),
            NodeKind::Binary(op, _) => NodeKind::Binary(op.clone(), children.try_into().ok()?),
            NodeKind::Ternary(op, _) => NodeKind::Ternary(op.clone(), children.try_into().ok()?),
            NodeKind::Variadic(op, _) => NodeKind::Variadic(op.clone(), children),
        };
        Some(Node::new(kind))
    }

    /// Returns the number of nodes in this tree, including itself.
    pub fn size(&self) -> usize {
        self.post_order_iter().count()
    }

    /// Returns an iterator that traverses the tree in left-to-right post-order (i.e.
    /// depth-first).
    pub fn post_order_iter(&self) -> NodeIter<'_> {
        NodeIter::new(self)
    }

    /// Returns the value stored under `K` in the side table, if any.
    pub fn meta_get<K: MetaKey>(&self) -> Option<K::Value> {
        self.0.meta.borrow().get::<K>().cloned()
    }

    /// Stores a value under `K` in the side table, replacing any previous value.
    pub fn meta_set<K: MetaKey>(&self, value: K::Value) {
        self.0.meta.borrow_mut().insert::<K>(value);
    }

    /// Returns true if the side table holds a value under `K`.
    pub fn meta_contains<K: MetaKey>(&self) -> bool {
        self.0.meta.borrow().contains::<K>()
    }

    /// Removes and returns the value stored under `K`, if any.
    pub fn meta_remove<K: MetaKey>(&self) -> Option<K::Value> {
        self.0.meta.borrow_mut().remove::<K>()
    }

    /// Returns the cached structural hash of this node.
    fn structural_hash(&self) -> u64 {
        *self.0.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.0.kind.hash(&mut hasher);
            hasher.finish()
        })
    }
}

/// Checks if two nodes are **structurally** equal. The side tables are ignored.
///
/// For more information about structural equality, see the [module-level documentation](self).
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.structural_hash() == other.structural_hash() && self.kind() == other.kind())
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

/// Nodes are printed in prefix form, such as `+(x, *(2, y))`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Rational(value) => write!(f, "{}", value),
            NodeKind::Symbol(name) => write!(f, "{}", name),
            NodeKind::Unary(op, _)
                | NodeKind::Binary(op, _)
                | NodeKind::Ternary(op, _)
                | NodeKind::Variadic(op, _) => {
                write!(f, "{}(", op)?;
                let mut iter = self.children().iter();
                if let Some(child) = iter.next() {
                    write!(f, "{}", child)?;
                    for child in iter {
                        write!(f, ", {}", child)?;
                    }
                }
                write!(f, ")")
            },
        }
    }
}

impl From<Rational> for Node {
    fn from(value: Rational) -> Self {
        Self::rational(value)
    }
}
