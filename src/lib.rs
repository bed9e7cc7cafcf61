//! A synchronous dispatcher for test-lifecycle events.
//!
//! A test runner builds an `Event` at each lifecycle point (a test started,
//! passed, failed or was skipped) and hands it to a `Dispatcher`, which
//! invokes every registered `Observer` in a stable order. A failing observer
//! is logged and skipped; it never aborts the run or hides the results of
//! other observers.
//!
//! ```
//! use herald::{Dispatcher, Event, FailureDetail, observer::Recorder};
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::new();
//! let recorder = Arc::new(Recorder::new());
//! dispatcher.register(recorder.clone()).unwrap();
//!
//! dispatcher.publish(&Event::start("LoginTest").unwrap()).unwrap();
//! dispatcher.publish(&Event::failure("LoginTest", FailureDetail::new("element not found")).unwrap()).unwrap();
//! dispatcher.shutdown().unwrap();
//!
//! assert_eq!(recorder.len(), 2);
//! ```

pub use self::config::{Config, DispatchOrder, FailurePolicy};
pub use self::dispatcher::{Delivery, Dispatcher, ObserverFailure, Priority, RegistrationHandle};
pub use self::errors::*;
pub use self::event::{Event, EventBuilder, EventKind, FailureDetail};
pub use self::observer::Observer;

pub mod config;
pub mod dispatcher;
mod errors;
pub mod event;
pub mod observer;
pub mod replay;
pub mod script;
mod util;

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

/// The file extensions used by the event scripts in `integration-tests/`.
pub const INTEGRATION_TEST_FILE_EXTENSIONS: &'static [&'static str] = &[
    config::DEFAULT_SCRIPT_EXTENSION,
];
