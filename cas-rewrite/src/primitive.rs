//! Functions to construct exact [`Rational`] numbers from various types.

use rug::{Integer, Rational};

/// Creates a [`Rational`] holding the given integer.
pub fn int<T>(n: T) -> Rational
where
    Integer: From<T>,
{
    Rational::from(Integer::from(n))
}

/// Creates a [`Rational`] from a numerator and denominator, reduced to lowest terms.
///
/// Returns [`None`] if the denominator is zero.
pub fn rational<N, D>(numer: N, denom: D) -> Option<Rational>
where
    Integer: From<N> + From<D>,
{
    let denom = Integer::from(denom);
    if denom == 0 {
        return None;
    }
    Some(Rational::from((Integer::from(numer), denom)))
}
