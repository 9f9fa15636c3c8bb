//! Ordered collections of shared scene entities.

use std::cell::RefCell;
use std::rc::Rc;

/// A shared, mutable handle to a registered value.
pub type Handle<T> = Rc<RefCell<T>>;

/// An ordered list of shared values, identified by pointer.
#[derive(Debug)]
pub struct Registry<T> {
    items: Vec<Handle<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry { items: Vec::new() }
    }
}

impl<T> Registry<T> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` and returns its handle.
    pub fn add(&mut self, value: T) -> Handle<T> {
        let handle = Rc::new(RefCell::new(value));
        self.items.push(handle.clone());
        handle
    }

    /// Removes the value `handle` points to, and clears `handle`.
    ///
    /// Does nothing if `handle` is `None` or points to a value of another registry.
    pub fn remove(&mut self, handle: &mut Option<Handle<T>>) {
        if let Some(target) = handle.take() {
            self.items.retain(|item| !Rc::ptr_eq(item, &target));
        }
    }

    /// Whether `handle` belongs to this registry.
    pub fn contains(&self, handle: &Handle<T>) -> bool {
        self.items.iter().any(|item| Rc::ptr_eq(item, handle))
    }

    /// The handles, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Handle<T>> {
        self.items.iter()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = &'a Handle<T>;
    type IntoIter = std::slice::Iter<'a, Handle<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_clears_the_handle() {
        let mut registry = Registry::new();
        let kept = registry.add(1);
        let mut removed = Some(registry.add(2));

        registry.remove(&mut removed);

        assert!(removed.is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&kept));
    }

    #[test]
    fn removing_nothing_is_a_no_op() {
        let mut registry = Registry::new();
        registry.add("a");

        let mut none = None;
        registry.remove(&mut none);
        assert_eq!(registry.len(), 1);

        let mut foreign = Some(Rc::new(RefCell::new("a")));
        registry.remove(&mut foreign);
        assert_eq!(registry.len(), 1);
        assert!(foreign.is_none());
    }

    #[test]
    fn identity_not_equality() {
        let mut registry = Registry::new();
        let first = registry.add(7);
        let mut second = Some(registry.add(7));

        registry.remove(&mut second);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&first));
        assert_eq!(*registry.iter().next().unwrap().borrow(), 7);
    }
}
