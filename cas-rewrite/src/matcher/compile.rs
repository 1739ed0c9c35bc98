use cas_error::Error;
use crate::{
    error::{word_spans, DuplicateRest},
    node::{Arity, LeafKind, Node, NodeKind, Op},
};
use super::{MatchCtx, NodeMatcher};
use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

/// What a reserved symbol stands for in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    /// A pattern variable.
    Var,

    /// A pattern variable that captures the remainder of a commutative node.
    Rest,

    /// Anything, binding nothing.
    Wildcard,

    /// Any leaf of the given kind, bound to the placeholder's name.
    Typed(LeafKind),
}

/// Compiles ordinary [`Node`] templates into [`NodeMatcher`]s, and fills templates in with the
/// bindings of a match.
///
/// A template is a normal expression tree in which some symbols are reserved as placeholders.
/// The compiler is configured by chaining builder methods:
///
/// ```
/// use cas_rewrite::{matcher::{MatchCtx, PatternCompiler}, node::Node};
///
/// let compiler = PatternCompiler::new()
///     .var("a")
///     .rest("rest")
///     .commutative("+");
///
/// // a + a + ...
/// let template = Node::variadic("+", [Node::symbol("a"), Node::symbol("a"), Node::symbol("rest")]);
/// let matcher = compiler.compile(&template).unwrap();
/// assert_eq!(matcher.to_string(), "+{?a, ?a, ..?rest}");
/// ```
///
/// Compilation follows the shape of the template:
///
/// - `.var(name)` and `.rest(name)` placeholders become pattern variables,
/// - `.wildcard(name)` placeholders match anything without binding it,
/// - `.rational(name)` and `.symbol(name)` placeholders match (and bind) any leaf of that kind,
/// - other leaves must be matched exactly,
/// - unary, binary and ternary nodes match nodes of the same operator, child by child,
/// - variadic nodes of a `.commutative(op)` operator match their children in any order, and a
///   `.rest(name)` placeholder among them captures the leftover children,
/// - other variadic nodes match child by child.
#[derive(Debug, Clone, Default)]
pub struct PatternCompiler {
    placeholders: HashMap<Rc<str>, Placeholder>,
    commutative: HashSet<Op>,
}

impl PatternCompiler {
    /// Creates a compiler with no placeholders and no commutative operators.
    pub fn new() -> Self {
        Self::default()
    }

    fn reserve(mut self, name: &str, placeholder: Placeholder) -> Self {
        self.placeholders.insert(Rc::from(name), placeholder);
        self
    }

    /// Reserves a pattern variable.
    pub fn var(self, name: &str) -> Self {
        self.reserve(name, Placeholder::Var)
    }

    /// Reserves a pattern variable that captures the leftover children of a commutative node.
    pub fn rest(self, name: &str) -> Self {
        self.reserve(name, Placeholder::Rest)
    }

    /// Reserves a symbol that matches anything without binding it.
    pub fn wildcard(self, name: &str) -> Self {
        self.reserve(name, Placeholder::Wildcard)
    }

    /// Reserves a pattern variable that only matches rational numbers.
    pub fn rational(self, name: &str) -> Self {
        self.reserve(name, Placeholder::Typed(LeafKind::Rational))
    }

    /// Reserves a pattern variable that only matches symbols.
    pub fn symbol(self, name: &str) -> Self {
        self.reserve(name, Placeholder::Typed(LeafKind::Symbol))
    }

    /// Declares an operator as commutative, so variadic nodes of it are matched in any order.
    pub fn commutative(mut self, op: &str) -> Self {
        self.commutative.insert(Rc::from(op));
        self
    }

    /// Returns true if the operator was declared commutative.
    pub fn is_commutative(&self, op: &str) -> bool {
        self.commutative.contains(op)
    }

    /// Returns the placeholder a node stands for, if it is a reserved symbol.
    fn placeholder(&self, node: &Node) -> Option<Placeholder> {
        node.as_symbol().and_then(|name| self.placeholders.get(name).copied())
    }

    /// Compiles a template into a matcher.
    ///
    /// Fails if a commutative node contains more than one rest placeholder.
    pub fn compile(&self, template: &Node) -> Result<NodeMatcher, Error> {
        self.compile_node(template)
            .map_err(|(kind, names)| {
                let src = template.to_string();
                let spans = names.iter()
                    .flat_map(|name| word_spans(&src, name))
                    .take(2)
                    .collect();
                Error::new(src, spans, kind)
            })
    }

    fn compile_node(&self, node: &Node) -> Result<NodeMatcher, (DuplicateRest, [Rc<str>; 2])> {
        let compile_all = |children: &[Node]| {
            children.iter()
                .map(|child| self.compile_node(child))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(match node.kind() {
            NodeKind::Symbol(name) => match self.placeholder(node) {
                Some(Placeholder::Var | Placeholder::Rest) => NodeMatcher::Ref(Rc::clone(name)),
                Some(Placeholder::Wildcard) => NodeMatcher::Any,
                Some(Placeholder::Typed(kind)) => NodeMatcher::named(Rc::clone(name), NodeMatcher::kind(kind)),
                None => NodeMatcher::fixed(node.clone()),
            },
            NodeKind::Rational(_) => NodeMatcher::fixed(node.clone()),
            NodeKind::Unary(op, [child]) => NodeMatcher::unary(Rc::clone(op), self.compile_node(child)?),
            NodeKind::Binary(op, [lhs, rhs]) => NodeMatcher::binary(
                Rc::clone(op),
                self.compile_node(lhs)?,
                self.compile_node(rhs)?,
            ),
            NodeKind::Ternary(op, [a, b, c]) => NodeMatcher::ternary(
                Rc::clone(op),
                self.compile_node(a)?,
                self.compile_node(b)?,
                self.compile_node(c)?,
            ),
            NodeKind::Variadic(op, children) if self.commutative.contains(op) => {
                let mut rest: Option<Rc<str>> = None;
                let mut patterns = Vec::with_capacity(children.len());
                for child in children {
                    match (self.placeholder(child), child.as_symbol()) {
                        (Some(Placeholder::Rest), Some(name)) => {
                            if let Some(first) = rest {
                                let kind = DuplicateRest { op: op.to_string() };
                                return Err((kind, [first, Rc::from(name)]));
                            }
                            rest = Some(Rc::from(name));
                        },
                        _ => patterns.push(self.compile_node(child)?),
                    }
                }
                NodeMatcher::npo(Rc::clone(op), patterns, rest.map(NodeMatcher::Ref))
            },
            NodeKind::Variadic(op, children) => NodeMatcher::ordered(Rc::clone(op), compile_all(children)?),
        })
    }

    /// Fills in a template with the bindings in `ctx`.
    ///
    /// Every placeholder is replaced by the node it is bound to. A remainder placeholder bound to
    /// a variadic node with the same operator as the variadic node it appears in has its children
    /// spliced into the parent instead, so the captured remainder rejoins the node it was taken
    /// from. Other placeholders always fill exactly one child.
    ///
    /// Returns [`None`] if a placeholder in the template is not bound.
    pub fn substitute(&self, template: &Node, ctx: &MatchCtx) -> Option<Node> {
        if self.placeholder(template).is_some() {
            return template.as_symbol().and_then(|name| ctx.get(name)).cloned();
        }

        let children = template.children();
        match template.kind() {
            NodeKind::Rational(_) | NodeKind::Symbol(_) => Some(template.clone()),
            NodeKind::Variadic(op, _) => {
                let mut out = Vec::with_capacity(children.len());
                for child in children {
                    let filled = self.substitute(child, ctx)?;
                    let splice = self.placeholder(child) == Some(Placeholder::Rest)
                        && filled.op() == Some(op)
                        && filled.arity() == Arity::Variadic;
                    if splice {
                        out.extend(filled.children().iter().cloned());
                    } else {
                        out.push(filled);
                    }
                }
                Some(Node::variadic(Rc::clone(op), out))
            },
            _ => {
                let filled = children.iter()
                    .map(|child| self.substitute(child, ctx))
                    .collect::<Option<Vec<_>>>()?;
                template.with_children(filled)
            },
        }
    }

    /// Returns the names of the placeholders in a template that [`PatternCompiler::substitute`]
    /// needs bindings for, in the order they first appear.
    pub fn placeholders_in(&self, template: &Node) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = Vec::new();
        for node in template.post_order_iter() {
            if let (Some(_), Some(name)) = (self.placeholder(node), node.as_symbol()) {
                if !names.iter().any(|seen| &**seen == name) {
                    names.push(Rc::from(name));
                }
            }
        }
        names
    }
}
