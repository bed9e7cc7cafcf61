//! Reactions to test-lifecycle events.
//!
//! All reporting logic is driven through the `Observer` trait. An observer is
//! registered on a `Dispatcher` and receives every event published to it.

pub use self::console::Console;
pub use self::durations::Durations;
pub use self::log::Log;
pub use self::recorder::Recorder;
pub use self::report::Report;

use crate::{Event, Result};

mod console;
mod durations;
mod log;
mod recorder;
mod report;

/// An object which listens to events that occur during a test run.
///
/// Observers are shared between the dispatcher and the runner, so state that
/// changes in `handle` must live behind interior mutability.
pub trait Observer: Send + Sync {
    /// Called once for every published event, in dispatch order.
    ///
    /// An error returned here is reported by the dispatcher and never stops
    /// other observers from seeing the event.
    fn handle(&self, event: &Event) -> Result<()>;

    /// Called once when the dispatcher shuts down, so that buffered state can
    /// be flushed.
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// A name used to identify this observer in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// An observer built from a closure.
pub struct FnObserver<F> {
    name: String,
    func: F,
}

/// Wraps a closure so that it can be registered as an observer.
pub fn from_fn<S, F>(name: S, func: F) -> FnObserver<F>
    where S: Into<String>, F: Fn(&Event) -> Result<()> + Send + Sync {
    FnObserver { name: name.into(), func }
}

impl<F> Observer for FnObserver<F>
    where F: Fn(&Event) -> Result<()> + Send + Sync {
    fn handle(&self, event: &Event) -> Result<()> {
        (self.func)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
