use crate::{Event, EventKind, Result};

use itertools::Itertools;

/// Writes one log record per event through the `log` facade.
pub struct Log {
    target: String,
}

impl Log {
    pub fn new() -> Self {
        Log::with_target("herald::events")
    }

    /// Creates a logging observer that logs under a custom target.
    pub fn with_target<S>(target: S) -> Self
        where S: Into<String> {
        Log { target: target.into() }
    }

    fn level(kind: EventKind) -> ::log::Level {
        match kind {
            EventKind::Start | EventKind::Success => ::log::Level::Info,
            EventKind::Skipped => ::log::Level::Warn,
            EventKind::Failure => ::log::Level::Error,
        }
    }
}

impl std::default::Default for Log {
    fn default() -> Self {
        Log::new()
    }
}

impl super::Observer for Log {
    fn handle(&self, event: &Event) -> Result<()> {
        let attributes = event.attributes().iter().map(|(k, v)| format!("{}={}", k, v)).join(" ");

        log!(target: self.target.as_str(), Log::level(event.kind()), "{}{}{}",
             event,
             if attributes.is_empty() { "" } else { " " },
             attributes);

        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
