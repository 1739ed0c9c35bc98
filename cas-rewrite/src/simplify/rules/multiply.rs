//! Rules for products.

use cas_error::Error;
use crate::{consts::{MUL, ONE, ZERO}, node::Node};
use super::{collapse, compiler, flatten, fold_constants, var, Rule};

/// `n*m = n*m`, evaluated.
pub fn multiply_constants() -> Result<Rule, Error> {
    fold_constants("multiply constants", MUL, |acc, value| acc * value)
}

/// `1*a = a`
pub fn multiply_one() -> Result<Rule, Error> {
    Rule::from_templates(
        "1*a = a",
        &compiler(),
        &Node::variadic(MUL, [Node::rational(ONE.clone()), var("rest")]),
        &var("rest"),
    )
}

/// `0*a = 0`
pub fn multiply_zero() -> Result<Rule, Error> {
    Rule::from_templates(
        "0*a = 0",
        &compiler(),
        &Node::variadic(MUL, [Node::rational(ZERO.clone()), var("rest")]),
        &Node::rational(ZERO.clone()),
    )
}

/// Returns all rules for products.
pub fn all() -> Result<Vec<Rule>, Error> {
    let mut rules = vec![
        flatten(MUL)?,
        multiply_constants()?,
        multiply_zero()?,
        multiply_one()?,
    ];
    rules.extend(collapse(MUL, 1)?);
    Ok(rules)
}
