use crate::{Event, EventKind, Result, util};

use std::sync::Mutex;

/// Keeps every event it receives, in delivery order.
#[derive(Default)]
pub struct Recorder {
    name: Option<String>,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder::default()
    }

    /// Creates a recorder that reports itself under `name`.
    pub fn named<S>(name: S) -> Self
        where S: Into<String> {
        Recorder { name: Some(name.into()), events: Mutex::new(Vec::new()) }
    }

    /// A copy of every event seen so far.
    pub fn events(&self) -> Vec<Event> {
        util::lock(&self.events).clone()
    }

    pub fn len(&self) -> usize {
        util::lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events seen of a given kind.
    pub fn count(&self, kind: EventKind) -> usize {
        util::lock(&self.events).iter().filter(|e| e.kind() == kind).count()
    }
}

impl super::Observer for Recorder {
    fn handle(&self, event: &Event) -> Result<()> {
        util::lock(&self.events).push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        self.name.as_ref().map(|n| &n[..]).unwrap_or("recorder")
    }
}
