//! Fans test-lifecycle events out to registered observers.
//!
//! Publishing is synchronous: the runner does not continue until every
//! observer has seen the event. Observers are isolated from each other and
//! from the runner, so a failing (or panicking) observer is reported and
//! skipped rather than aborting the run.
//!
//! ```text
//! runner ──► publish(&event) ──► snapshot registry (lock released)
//!                                  ├─► observer 1 .handle(&event)
//!                                  ├─► observer 2 .handle(&event)  ✗ logged, skipped
//!                                  └─► observer N .handle(&event)
//! ```

pub use self::registry::{DispatcherId, Priority, RegistrationHandle};

use self::registry::{Registration, Registry};
use crate::{Config, ErrorKind, Event, EventKind, FailurePolicy, Observer, Result, util};

use itertools::Itertools;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod registry;
#[cfg(test)] mod dispatcher_tests;

/// The lifecycle of a dispatcher.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Accepting registrations and events.
    Open,
    /// `shutdown` is closing observers.
    ShuttingDown,
    /// Terminal; every further call fails.
    Closed,
}

/// Which observer callback failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Handle,
    Close,
}

/// A failure inside a single observer, recovered by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObserverFailure {
    pub observer: String,
    pub handle: RegistrationHandle,
    pub stage: Stage,
    /// The kind and subject of the event being handled, if any.
    pub event: Option<(EventKind, String)>,
    pub cause: String,
    /// Whether the observer panicked rather than returning an error.
    pub panicked: bool,
}

/// The outcome of a single `publish` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// How many observers were invoked, including those that failed.
    pub invoked: usize,
    pub failures: Vec<ObserverFailure>,
}

/// Owns the observer registry for one test run.
pub struct Dispatcher {
    failure_policy: FailurePolicy,
    inner: Mutex<Inner>,
}

struct Inner {
    state: State,
    registry: Registry,
}

impl Dispatcher {
    /// Creates a dispatcher with the default policies.
    pub fn new() -> Self {
        Dispatcher::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Dispatcher {
            failure_policy: config.failure_policy,
            inner: Mutex::new(Inner {
                state: State::Open,
                registry: Registry::new(config.ordering),
            }),
        }
    }

    /// Registers an observer with the default priority.
    ///
    /// The same observer may be registered more than once, in which case it
    /// sees every event once per registration.
    pub fn register(&self, observer: Arc<dyn Observer>) -> Result<RegistrationHandle> {
        self.register_with_priority(observer, Priority::default())
    }

    pub fn register_with_priority(&self,
                                  observer: Arc<dyn Observer>,
                                  priority: Priority) -> Result<RegistrationHandle> {
        let mut inner = self.lock();
        inner.ensure_open()?;

        let handle = inner.registry.insert(observer, priority);
        debug!("registered observer {} with priority {}", handle, priority.0);

        Ok(handle)
    }

    /// Removes an observer.
    ///
    /// Removing an already removed observer does nothing. Handles issued by
    /// another dispatcher are rejected.
    pub fn unregister(&self, handle: RegistrationHandle) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_open()?;

        if inner.registry.remove(handle)? {
            debug!("unregistered observer {}", handle);
        } else {
            trace!("observer {} was already unregistered", handle);
        }

        Ok(())
    }

    /// Delivers an event to every registered observer, in dispatch order.
    ///
    /// Observers registered or removed while this call is running only
    /// affect later calls. If an observer shuts the dispatcher down, the
    /// remaining observers do not see the event.
    pub fn publish(&self, event: &Event) -> Result<Delivery> {
        let registrations = {
            let inner = self.lock();
            inner.ensure_open()?;
            inner.registry.snapshot()
        };

        trace!("publishing {} to {} observer(s)", event, registrations.len());

        let mut delivery = Delivery::default();
        for registration in registrations {
            // An earlier observer may have shut the dispatcher down.
            if self.state() != State::Open {
                debug!("dispatcher closed while publishing {}, skipping remaining observers", event);
                break;
            }

            delivery.invoked += 1;

            let outcome = invoke(&registration, Stage::Handle, Some(event), || registration.observer.handle(event));
            if let Err(failure) = outcome {
                error!("{}", failure);

                if self.failure_policy == FailurePolicy::Abort {
                    return Err(ErrorKind::ObserverFailed(failure.observer, failure.cause).into());
                }

                delivery.failures.push(failure);
            }
        }

        Ok(delivery)
    }

    /// Closes every observer, in reverse dispatch order, and closes the
    /// dispatcher.
    ///
    /// Close failures are always isolated, whatever the failure policy.
    pub fn shutdown(&self) -> Result<Vec<ObserverFailure>> {
        let registrations = {
            let mut inner = self.lock();
            inner.ensure_open()?;
            inner.state = State::ShuttingDown;
            inner.registry.drain()
        };

        debug!("shutting down, closing {} observer(s)", registrations.len());
        let failures = close_all(registrations);

        self.lock().state = State::Closed;
        Ok(failures)
    }

    pub fn state(&self) -> State {
        self.lock().state
    }

    pub fn is_closed(&self) -> bool {
        self.state() != State::Open
    }

    pub fn id(&self) -> DispatcherId {
        self.lock().registry.id()
    }

    /// The number of live registrations.
    pub fn len(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<Inner> {
        util::lock(&self.inner)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if inner.state != State::Open {
            return;
        }

        inner.state = State::Closed;
        let registrations = inner.registry.drain();

        if !registrations.is_empty() {
            warn!("dispatcher dropped without shutdown, closing {} observer(s)", registrations.len());
            close_all(registrations);
        }
    }
}

impl Inner {
    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::ShuttingDown | State::Closed => Err(ErrorKind::DispatcherClosed.into()),
        }
    }
}

impl Delivery {
    /// Whether every observer handled the event without failing.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn close_all(registrations: Vec<Arc<Registration>>) -> Vec<ObserverFailure> {
    registrations.iter().rev().filter_map(|registration| {
        invoke(registration, Stage::Close, None, || registration.observer.close())
            .err()
            .map(|failure| {
                error!("{}", failure);
                failure
            })
    }).collect()
}

/// Runs one observer callback, turning errors and panics into a failure
/// record.
fn invoke<F>(registration: &Registration,
             stage: Stage,
             event: Option<&Event>,
             call: F) -> std::result::Result<(), ObserverFailure>
    where F: FnOnce() -> Result<()> {
    let (cause, panicked) = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => (e.iter().map(|e| e.to_string()).join(": "), false),
        Err(payload) => (panic_message(payload.as_ref()), true),
    };

    Err(ObserverFailure {
        observer: registration.name().to_owned(),
        handle: registration.handle,
        stage,
        event: event.map(|e| (e.kind(), e.subject_name().to_owned())),
        cause,
        panicked,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

impl fmt::Display for ObserverFailure {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let what = if self.panicked { "panicked" } else { "failed" };

        match (self.stage, &self.event) {
            (Stage::Handle, Some((kind, subject))) => {
                write!(fmt, "observer '{}' {} processing {} event for '{}': {}",
                       self.observer, what, kind, subject, self.cause)
            },
            _ => write!(fmt, "observer '{}' {} while closing: {}", self.observer, what, self.cause),
        }
    }
}
