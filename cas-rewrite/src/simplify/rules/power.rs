//! Rules for powers.

use cas_error::Error;
use crate::{consts::{ONE, POW, ZERO}, node::Node};
use super::{compiler, var, Rule};

/// `a^1 = a`
pub fn power_one() -> Result<Rule, Error> {
    Rule::from_templates(
        "a^1 = a",
        &compiler(),
        &Node::binary(POW, var("a"), Node::rational(ONE.clone())),
        &var("a"),
    )
}

/// `a^0 = 1`
pub fn power_zero() -> Result<Rule, Error> {
    Rule::from_templates(
        "a^0 = 1",
        &compiler(),
        &Node::binary(POW, var("a"), Node::rational(ZERO.clone())),
        &Node::rational(ONE.clone()),
    )
}

/// Returns all rules for powers.
pub fn all() -> Result<Vec<Rule>, Error> {
    Ok(vec![power_one()?, power_zero()?])
}
