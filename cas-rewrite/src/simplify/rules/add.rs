//! Rules for sums.

use cas_error::Error;
use crate::{consts::{ADD, MUL, TWO, ZERO}, node::Node};
use super::{collapse, compiler, flatten, fold_constants, var, Rule};

/// `n+m = n+m`, evaluated.
pub fn add_constants() -> Result<Rule, Error> {
    fold_constants("add constants", ADD, |acc, value| acc + value)
}

/// `0+a = a`
pub fn add_zero() -> Result<Rule, Error> {
    Rule::from_templates(
        "0+a = a",
        &compiler(),
        &Node::variadic(ADD, [Node::rational(ZERO.clone()), var("rest")]),
        &var("rest"),
    )
}

/// Combines equal terms.
///
/// `a+a = 2a`
pub fn combine_equal_terms() -> Result<Rule, Error> {
    Rule::from_templates(
        "a+a = 2a",
        &compiler(),
        &Node::variadic(ADD, [var("a"), var("a"), var("rest")]),
        &Node::variadic(ADD, [Node::variadic(MUL, [Node::rational(TWO.clone()), var("a")]), var("rest")]),
    )
}

/// Returns all rules for sums.
pub fn all() -> Result<Vec<Rule>, Error> {
    let mut rules = vec![
        flatten(ADD)?,
        add_constants()?,
        add_zero()?,
        combine_equal_terms()?,
    ];
    rules.extend(collapse(ADD, 0)?);
    Ok(rules)
}
