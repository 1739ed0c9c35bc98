//! The rewriting core of the `cas-rs` computer algebra system.
//!
//! # Expression representation
//!
//! Expressions are trees of [`Node`]s. A node is an exact rational number, a symbol, or an
//! operator applied to one, two, three or any number of children. Nodes are immutable and cheap
//! to clone (they are reference counted), so sub-expressions are freely shared between trees.
//! Every node additionally carries a side table of cached facts ([`node::Meta`]) that is **not**
//! part of its identity: two nodes with the same operator and children are equal, whatever their
//! side tables contain.
//!
//! ```
//! use cas_rewrite::node::Node;
//!
//! // x + 2 + x, as a single variadic `+` node
//! let expr = Node::variadic("+", [Node::symbol("x"), Node::int(2), Node::symbol("x")]);
//! assert_eq!(expr.to_string(), "+(x, 2, x)");
//! assert_eq!(expr.size(), 4);
//! ```
//!
//! # Rewriting
//!
//! Rewrite rules are `(pattern, replacement)` pairs. Patterns are compiled into
//! [`NodeMatcher`]s, usually from an ordinary node template with the [`PatternCompiler`].
//! Variadic nodes of a **commutative** operator compile to permutation-invariant matchers, which
//! match the children of a node in any order and can capture the unmatched children in a
//! remainder.
//!
//! A [`Simplifier`] holds a set of [`Rule`]s, indexed in a [`TreeDispatcher`] so only rules that
//! could possibly apply to a node are tried, and rewrites a tree bottom-up until no rule applies.
//!
//! ```
//! use cas_rewrite::{node::Node, PatternCompiler, Rule, Simplifier};
//!
//! let compiler = PatternCompiler::new().var("a").rest("rest").commutative("+");
//! let rule = Rule::from_templates(
//!     "a + a = 2 * a",
//!     &compiler,
//!     &Node::variadic("+", [Node::symbol("a"), Node::symbol("a"), Node::symbol("rest")]),
//!     &Node::variadic("+", [
//!         Node::variadic("*", [Node::int(2), Node::symbol("a")]),
//!         Node::symbol("rest"),
//!     ]),
//! ).unwrap();
//!
//! let simplifier = Simplifier::with_rules([rule]);
//! let expr = Node::variadic("+", [Node::symbol("y"), Node::symbol("x"), Node::symbol("x")]);
//! assert_eq!(simplifier.simplify_full(&expr).to_string(), "+(*(2, x), y)");
//! ```

pub mod consts;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod node;
pub mod primitive;
pub mod simplify;

pub use dispatch::TreeDispatcher;
pub use matcher::{MatchCtx, NodeMatcher, PatternCompiler};
pub use node::{Node, NodeSig};
pub use simplify::{rule::{Replacement, Rule}, Outcome, Simplification, Simplifier};
