//! Constant values and operator names shared by the built-in rules.

use crate::primitive::int;
use once_cell::sync::Lazy;
use rug::Rational;

/// The name of the addition operator.
pub const ADD: &str = "+";

/// The name of the multiplication operator.
pub const MUL: &str = "*";

/// The name of the exponentiation operator.
pub const POW: &str = "^";

pub static ZERO: Lazy<Rational> = Lazy::new(|| int(0));

pub static ONE: Lazy<Rational> = Lazy::new(|| int(1));

pub static TWO: Lazy<Rational> = Lazy::new(|| int(2));
