//! Recording the rewrites made by a simplifier.

use crate::node::Node;
use std::rc::Rc;

/// A single rewrite applied by a [`Simplifier`](super::Simplifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The description of the rule that was applied.
    pub rule: Rc<str>,

    /// The node the rule matched.
    pub before: Node,

    /// The node the rule produced.
    pub after: Node,
}

/// Something that collects the [`Step`]s of a simplification, or any other sequence of steps.
///
/// Implemented for `()`, which throws every step away, and for [`Vec`], which keeps them in
/// order.
pub trait StepCollector<S> {
    /// Records a step.
    fn push(&mut self, step: S);
}

impl<S> StepCollector<S> for () {
    #[inline]
    fn push(&mut self, _: S) {}
}

impl<S> StepCollector<S> for Vec<S> {
    #[inline]
    fn push(&mut self, step: S) {
        Vec::push(self, step);
    }
}
