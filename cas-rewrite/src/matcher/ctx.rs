use crate::node::Node;
use std::rc::Rc;

/// A position in a [`MatchCtx`]'s binding log, to roll back to if a branch of the search fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint(usize);

/// The bindings of pattern variables made during one match attempt.
///
/// Bindings are kept in the order they were made. This makes the context cheap to copy (a
/// shallow copy of a short list of reference-counted nodes), and lets the matcher explore an
/// alternative by noting the length of the log and rolling back to it if the alternative fails,
/// which is observably the same as exploring on a copy and discarding it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCtx {
    bindings: Vec<(Rc<str>, Node)>,
}

impl MatchCtx {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node bound to the given name.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.bindings.iter()
            .find(|(bound, _)| &**bound == name)
            .map(|(_, node)| node)
    }

    /// Returns true if the given name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Binds `name` to `node`.
    ///
    /// If `name` is already bound, nothing is added, and the result is whether the existing
    /// binding is structurally equal to `node`. This is what makes a repeated variable in a
    /// pattern (such as `x + x`) require equal sub-expressions.
    pub fn bind(&mut self, name: &Rc<str>, node: &Node) -> bool {
        match self.get(name) {
            Some(bound) => bound == node,
            None => {
                self.bindings.push((Rc::clone(name), node.clone()));
                true
            },
        }
    }

    /// Returns the number of bound names.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns an iterator over the bindings, in the order they were made.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.bindings.iter().map(|(name, node)| (&**name, node))
    }

    /// Marks the current state of the context.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.bindings.len())
    }

    /// Discards every binding made since the given checkpoint.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.bindings.truncate(checkpoint.0);
    }
}
