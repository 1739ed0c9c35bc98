//! Typed side tables of cached facts attached to nodes.

use std::{any::{Any, TypeId}, collections::HashMap, fmt};

/// A key into a node's [`Meta`] side table.
///
/// Keys are types; usually a unit `struct` per kind of cached fact. The associated
/// [`MetaKey::Value`] is the type of the fact stored under the key.
///
/// ```
/// use cas_rewrite::node::{MetaKey, Node};
///
/// struct NormalForm;
///
/// impl MetaKey for NormalForm {
///     type Value = Node;
/// }
///
/// let node = Node::symbol("x");
/// node.meta_set::<NormalForm>(Node::int(1));
/// assert_eq!(node.meta_get::<NormalForm>(), Some(Node::int(1)));
/// ```
pub trait MetaKey: 'static {
    /// The type of the value stored under this key.
    type Value: Clone + 'static;
}

/// Marks a node as a fixed point of a [`Simplifier`](crate::Simplifier).
///
/// The value is the id of the simplifier, so that one rule set's fixed point is never trusted
/// by a simplifier with different rules.
pub struct SimplifiedBy;

impl MetaKey for SimplifiedBy {
    type Value = u64;
}

/// A side table mapping [`MetaKey`]s to values.
#[derive(Default)]
pub struct Meta {
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl Meta {
    /// Returns a reference to the value stored under `K`, if any.
    pub fn get<K: MetaKey>(&self) -> Option<&K::Value> {
        self.entries.get(&TypeId::of::<K>())?.downcast_ref::<K::Value>()
    }

    /// Stores a value under `K`, returning the previous value, if any.
    pub fn insert<K: MetaKey>(&mut self, value: K::Value) -> Option<K::Value> {
        self.entries
            .insert(TypeId::of::<K>(), Box::new(value))
            .and_then(|old| old.downcast::<K::Value>().ok())
            .map(|old| *old)
    }

    /// Returns true if a value is stored under `K`.
    pub fn contains<K: MetaKey>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<K>())
    }

    /// Removes and returns the value stored under `K`, if any.
    pub fn remove<K: MetaKey>(&mut self) -> Option<K::Value> {
        self.entries
            .remove(&TypeId::of::<K>())
            .and_then(|old| old.downcast::<K::Value>().ok())
            .map(|old| *old)
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Count;

    impl MetaKey for Count {
        type Value = usize;
    }

    #[test]
    fn typed_keys_are_independent() {
        let mut meta = Meta::default();
        assert_eq!(meta.insert::<Count>(3), None);
        assert_eq!(meta.insert::<SimplifiedBy>(7), None);
        assert_eq!(meta.get::<Count>(), Some(&3));
        assert_eq!(meta.get::<SimplifiedBy>(), Some(&7));
        assert_eq!(meta.len(), 2);

        assert_eq!(meta.insert::<Count>(4), Some(3));
        assert_eq!(meta.remove::<SimplifiedBy>(), Some(7));
        assert!(!meta.contains::<SimplifiedBy>());
        assert_eq!(meta.get::<Count>(), Some(&4));
    }
}
