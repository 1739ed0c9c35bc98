//! Built-in arithmetic rules.
//!
//! These cover the identities every rule set over `+`, `*` and `^` needs to keep trees small:
//! flattening nested sums and products, folding rational constants, dropping identity elements,
//! and collapsing sums and products with fewer than two terms. Constant folding uses exact
//! [`rug::Rational`] arithmetic.
//!
//! `+` and `*` are treated as commutative: their patterns match terms in any order.

pub mod add;
pub mod multiply;
pub mod power;

use cas_error::Error;
use crate::{
    consts::{ADD, MUL},
    matcher::{NodeMatcher, PatternCompiler},
    node::{Arity, Node},
};
use rug::Rational;
use super::rule::{Replacement, Rule};

/// The placeholders used by the built-in rules: variables `a` and `b`, rational constants `n`
/// and `m`, and the remainder `rest`.
pub(crate) fn compiler() -> PatternCompiler {
    PatternCompiler::new()
        .var("a")
        .var("b")
        .rational("n")
        .rational("m")
        .rest("rest")
        .commutative(ADD)
        .commutative(MUL)
}

/// Shorthand for a placeholder in a template.
pub(crate) fn var(name: &str) -> Node {
    Node::symbol(name)
}

/// Returns true if the node is a variadic node of the given operator.
fn is_variadic(node: &Node, op: &str) -> bool {
    node.arity() == Arity::Variadic && node.op().map(|own| &**own == op).unwrap_or(false)
}

/// Creates a rule that splices the children of nested variadic `op` nodes into their parent.
///
/// `a+(b+c) = a+b+c`
pub(crate) fn flatten(op: &'static str) -> Result<Rule, Error> {
    let nested = NodeMatcher::npo(op, vec![], Some(NodeMatcher::any()));
    let matcher = NodeMatcher::npo(op, vec![nested], Some(NodeMatcher::any()));
    Rule::new(
        format!("flatten nested {}", op),
        matcher,
        Replacement::builder(&[], move |node, _| {
            let mut children = Vec::with_capacity(node.children().len());
            for child in node.children() {
                if is_variadic(child, op) {
                    children.extend(child.children().iter().cloned());
                } else {
                    children.push(child.clone());
                }
            }
            Some(Node::variadic(op, children))
        }),
    )
}

/// Creates a rule that folds every rational constant term of a variadic `op` node into one, using
/// `combine`. The folded constant becomes the first term.
pub(crate) fn fold_constants(
    description: &str,
    op: &'static str,
    combine: fn(Rational, &Rational) -> Rational,
) -> Result<Rule, Error> {
    let compiler = compiler();
    let pattern = Node::variadic(op, [var("n"), var("m"), var("rest")]);
    let matcher = compiler.compile(&pattern)?;
    Rule::new(description, matcher, Replacement::builder(&["n", "m", "rest"], move |node, _| {
        let mut constant: Option<Rational> = None;
        let mut others = Vec::new();
        for child in node.children() {
            match (child.as_rational(), constant.take()) {
                (Some(value), Some(acc)) => constant = Some(combine(acc, value)),
                (Some(value), None) => constant = Some(value.clone()),
                (None, acc) => {
                    constant = acc;
                    others.push(child.clone());
                },
            }
        }

        let constant = Node::rational(constant?);
        Some(Node::variadic(op, std::iter::once(constant).chain(others)))
    }))
}

/// Creates the rules that collapse variadic `op` nodes with no children into `identity`, and
/// with one child into that child.
pub(crate) fn collapse(op: &'static str, identity: i64) -> Result<Vec<Rule>, Error> {
    let compiler = compiler();
    Ok(vec![
        Rule::from_templates(
            format!("empty {} = {}", op, identity),
            &compiler,
            &Node::variadic(op, []),
            &Node::int(identity),
        )?,
        Rule::from_templates(
            format!("single {} = a", op),
            &compiler,
            &Node::variadic(op, [var("a")]),
            &var("a"),
        )?,
    ])
}

/// Returns all built-in rules.
pub fn all() -> Result<Vec<Rule>, Error> {
    let mut rules = add::all()?;
    rules.extend(multiply::all()?);
    rules.extend(power::all()?);
    Ok(rules)
}
