//! The ordered set of observer registrations owned by a dispatcher.

use crate::{DispatchOrder, ErrorKind, Observer, Result};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicU64};

static NEXT_DISPATCHER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a single dispatcher instance within the process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatcherId(u64);

/// Returned from `register`; the only way to remove an observer again.
///
/// Handles are never reused, even after the observer is removed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationHandle {
    dispatcher: DispatcherId,
    sequence: u64,
}

/// The dispatch priority of an observer. Lower values run first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

/// A single registered observer.
pub struct Registration {
    pub handle: RegistrationHandle,
    pub priority: Priority,
    pub observer: Arc<dyn Observer>,
}

/// Registrations kept sorted in dispatch order.
pub struct Registry {
    id: DispatcherId,
    ordering: DispatchOrder,
    next_sequence: u64,
    entries: Vec<Arc<Registration>>,
}

impl DispatcherId {
    fn next() -> Self {
        DispatcherId(NEXT_DISPATCHER_ID.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

impl Priority {
    pub const FIRST: Priority = Priority(std::i32::MIN);
    pub const NORMAL: Priority = Priority(0);
    pub const LAST: Priority = Priority(std::i32::MAX);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

impl Registration {
    pub fn name(&self) -> &str {
        self.observer.name()
    }
}

impl Registry {
    pub fn new(ordering: DispatchOrder) -> Self {
        Registry {
            id: DispatcherId::next(),
            ordering,
            next_sequence: 0,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> DispatcherId {
        self.id
    }

    /// Adds an observer at its place in dispatch order.
    pub fn insert(&mut self, observer: Arc<dyn Observer>, priority: Priority) -> RegistrationHandle {
        let handle = RegistrationHandle { dispatcher: self.id, sequence: self.next_sequence };
        self.next_sequence += 1;

        // Inserting after every entry of equal priority keeps ties in
        // insertion order.
        let position = match self.ordering {
            DispatchOrder::PriorityThenInsertion => {
                self.entries.iter().position(|e| e.priority > priority).unwrap_or(self.entries.len())
            },
            DispatchOrder::Insertion => self.entries.len(),
        };

        self.entries.insert(position, Arc::new(Registration { handle, priority, observer }));
        handle
    }

    /// Removes the registration for a handle.
    ///
    /// Returns `false` if the handle was issued here but already removed.
    pub fn remove(&mut self, handle: RegistrationHandle) -> Result<bool> {
        if !self.issued(handle) {
            return Err(ErrorKind::UnknownHandle(handle).into());
        }

        match self.entries.iter().position(|e| e.handle == handle) {
            Some(index) => {
                self.entries.remove(index);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Whether a handle was ever issued by this registry.
    pub fn issued(&self, handle: RegistrationHandle) -> bool {
        handle.dispatcher == self.id && handle.sequence < self.next_sequence
    }

    /// The registrations in dispatch order, independent of later changes.
    pub fn snapshot(&self) -> Vec<Arc<Registration>> {
        self.entries.clone()
    }

    /// Takes every registration out, in dispatch order.
    pub fn drain(&mut self) -> Vec<Arc<Registration>> {
        std::mem::replace(&mut self.entries, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for DispatcherId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "#{}.{}", self.dispatcher, self.sequence)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::observer;

    fn noop(name: &'static str) -> Arc<dyn Observer> {
        Arc::new(observer::from_fn(name, |_| Ok(())))
    }

    fn names(registry: &Registry) -> Vec<String> {
        registry.snapshot().iter().map(|r| r.name().to_owned()).collect()
    }

    #[test]
    fn priority_ties_keep_insertion_order() {
        let mut registry = Registry::new(DispatchOrder::PriorityThenInsertion);
        registry.insert(noop("a"), Priority::NORMAL);
        registry.insert(noop("b"), Priority(10));
        registry.insert(noop("c"), Priority::NORMAL);
        registry.insert(noop("d"), Priority(-5));
        registry.insert(noop("e"), Priority(10));

        assert_eq!(names(&registry), vec!["d", "a", "c", "b", "e"]);
    }

    #[test]
    fn insertion_ordering_ignores_priority() {
        let mut registry = Registry::new(DispatchOrder::Insertion);
        registry.insert(noop("a"), Priority::LAST);
        registry.insert(noop("b"), Priority::FIRST);

        assert_eq!(names(&registry), vec!["a", "b"]);
    }

    #[test]
    fn handles_are_not_reused() {
        let mut registry = Registry::new(DispatchOrder::PriorityThenInsertion);
        let first = registry.insert(noop("a"), Priority::NORMAL);
        assert!(registry.remove(first).unwrap());
        let second = registry.insert(noop("a"), Priority::NORMAL);

        assert_ne!(first, second);
        assert!(!registry.remove(first).unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn foreign_handles_are_unknown() {
        let mut ours = Registry::new(DispatchOrder::PriorityThenInsertion);
        let mut theirs = Registry::new(DispatchOrder::PriorityThenInsertion);
        let handle = theirs.insert(noop("a"), Priority::NORMAL);

        match ours.remove(handle) {
            Err(crate::Error(ErrorKind::UnknownHandle(h), _)) => assert_eq!(h, handle),
            _ => panic!("expected an unknown handle error"),
        }
    }

    #[test]
    fn snapshot_is_unaffected_by_later_changes() {
        let mut registry = Registry::new(DispatchOrder::PriorityThenInsertion);
        let a = registry.insert(noop("a"), Priority::NORMAL);
        let snapshot = registry.snapshot();

        registry.remove(a).unwrap();
        registry.insert(noop("b"), Priority::NORMAL);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name(), "a");
    }
}
