//! Tests for publishing, registration and shutdown.

use super::*;
use crate::{DispatchOrder, Error, FailureDetail, observer::{self, Recorder}};

use std::sync::Mutex;

/// Appends its name to a shared journal on every call.
struct Journaled {
    name: &'static str,
    journal: Arc<Mutex<Vec<String>>>,
    fail_on_close: bool,
}

impl Observer for Journaled {
    fn handle(&self, event: &Event) -> Result<()> {
        util::lock(&self.journal).push(format!("{}:{}", self.name, event.subject_name()));
        Ok(())
    }

    fn close(&self) -> Result<()> {
        util::lock(&self.journal).push(format!("{}:close", self.name));

        if self.fail_on_close {
            Err("flush failed".into())
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn journaled(name: &'static str, journal: &Arc<Mutex<Vec<String>>>) -> Arc<Journaled> {
    Arc::new(Journaled { name, journal: journal.clone(), fail_on_close: false })
}

fn always_failing() -> Arc<dyn Observer> {
    Arc::new(observer::from_fn("broken", |_| Err("screenshot directory missing".into())))
}

fn always_panicking() -> Arc<dyn Observer> {
    Arc::new(observer::from_fn("panicky", |_| panic!("observer blew up")))
}

fn login_started() -> Event {
    Event::start("LoginTest").unwrap()
}

fn is_closed_error(error: &Error) -> bool {
    match error.kind() {
        ErrorKind::DispatcherClosed => true,
        _ => false,
    }
}

#[test]
fn observers_are_invoked_once_in_registration_order() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new();

    dispatcher.register(journaled("a", &journal)).unwrap();
    dispatcher.register(journaled("b", &journal)).unwrap();
    dispatcher.register(journaled("c", &journal)).unwrap();

    let delivery = dispatcher.publish(&login_started()).unwrap();

    assert_eq!(delivery, Delivery { invoked: 3, failures: Vec::new() });
    assert_eq!(*util::lock(&journal), vec!["a:LoginTest", "b:LoginTest", "c:LoginTest"]);
}

#[test]
fn every_observer_sees_the_same_event() {
    let dispatcher = Dispatcher::new();
    let first = Arc::new(Recorder::new());
    let second = Arc::new(Recorder::new());
    dispatcher.register(first.clone()).unwrap();
    dispatcher.register(second.clone()).unwrap();

    let event = Event::builder(EventKind::Success, "LoginTest").attribute("retries", "1").build().unwrap();
    dispatcher.publish(&event).unwrap();

    assert_eq!(first.events(), vec![event.clone()]);
    assert_eq!(second.events(), vec![event]);
}

#[test]
fn failing_observer_does_not_stop_later_observers() {
    let dispatcher = Dispatcher::new();
    let recorder = Arc::new(Recorder::new());
    dispatcher.register(always_failing()).unwrap();
    dispatcher.register(recorder.clone()).unwrap();

    let event = Event::failure("CheckoutTest", FailureDetail::new("element not found")).unwrap();
    let delivery = dispatcher.publish(&event).unwrap();

    assert_eq!(recorder.events(), vec![event]);
    assert_eq!(delivery.invoked, 2);
    assert_eq!(delivery.failures.len(), 1);

    let failure = &delivery.failures[0];
    assert_eq!(failure.observer, "broken");
    assert_eq!(failure.stage, Stage::Handle);
    assert_eq!(failure.event, Some((EventKind::Failure, "CheckoutTest".to_owned())));
    assert_eq!(failure.cause, "screenshot directory missing");
    assert!(!failure.panicked);
    assert_eq!(failure.to_string(),
               "observer 'broken' failed processing failure event for 'CheckoutTest': screenshot directory missing");
}

#[test]
fn panicking_observer_is_isolated() {
    let dispatcher = Dispatcher::new();
    let recorder = Arc::new(Recorder::new());
    dispatcher.register(always_panicking()).unwrap();
    dispatcher.register(recorder.clone()).unwrap();

    let delivery = dispatcher.publish(&login_started()).unwrap();

    assert_eq!(recorder.len(), 1);
    assert_eq!(delivery.failures.len(), 1);
    assert!(delivery.failures[0].panicked);
    assert_eq!(delivery.failures[0].cause, "observer blew up");

    // The dispatcher stays usable afterwards.
    dispatcher.publish(&login_started()).unwrap();
    assert_eq!(recorder.len(), 2);
}

#[test]
fn abort_policy_returns_the_first_failure() {
    let mut config = Config::default();
    config.failure_policy = FailurePolicy::Abort;

    let dispatcher = Dispatcher::with_config(&config);
    let before = Arc::new(Recorder::new());
    let after = Arc::new(Recorder::new());
    dispatcher.register(before.clone()).unwrap();
    dispatcher.register(always_failing()).unwrap();
    dispatcher.register(after.clone()).unwrap();

    match dispatcher.publish(&login_started()) {
        Err(Error(ErrorKind::ObserverFailed(observer, cause), _)) => {
            assert_eq!(observer, "broken");
            assert_eq!(cause, "screenshot directory missing");
        },
        r => panic!("expected the observer failure to propagate: {:?}", r),
    }

    assert_eq!(before.len(), 1);
    assert!(after.is_empty());
}

#[test]
fn unregistered_observer_receives_nothing() {
    let dispatcher = Dispatcher::new();
    let recorder = Arc::new(Recorder::new());
    let handle = dispatcher.register(recorder.clone()).unwrap();

    dispatcher.unregister(handle).unwrap();
    let delivery = dispatcher.publish(&login_started()).unwrap();

    assert!(recorder.is_empty());
    assert_eq!(delivery.invoked, 0);
    assert!(dispatcher.is_empty());
}

#[test]
fn unregister_is_idempotent() {
    let dispatcher = Dispatcher::new();
    let handle = dispatcher.register(Arc::new(Recorder::new())).unwrap();

    dispatcher.unregister(handle).unwrap();
    dispatcher.unregister(handle).unwrap();
}

#[test]
fn unregister_rejects_foreign_handles() {
    let ours = Dispatcher::new();
    let theirs = Dispatcher::new();
    let handle = theirs.register(Arc::new(Recorder::new())).unwrap();

    match ours.unregister(handle) {
        Err(Error(ErrorKind::UnknownHandle(h), _)) => assert_eq!(h, handle),
        r => panic!("expected an unknown handle error: {:?}", r),
    }

    // The issuing dispatcher is unaffected.
    assert_eq!(theirs.len(), 1);
}

#[test]
fn duplicate_registrations_are_invoked_twice() {
    let dispatcher = Dispatcher::new();
    let recorder = Arc::new(Recorder::new());
    let first = dispatcher.register(recorder.clone()).unwrap();
    dispatcher.register(recorder.clone()).unwrap();

    dispatcher.publish(&login_started()).unwrap();
    assert_eq!(recorder.len(), 2);

    dispatcher.unregister(first).unwrap();
    dispatcher.publish(&login_started()).unwrap();
    assert_eq!(recorder.len(), 3);
}

#[test]
fn priority_decides_order_and_ties_keep_insertion_order() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new();

    dispatcher.register(journaled("report", &journal)).unwrap();
    dispatcher.register_with_priority(journaled("screenshot", &journal), Priority(-10)).unwrap();
    dispatcher.register(journaled("metrics", &journal)).unwrap();
    dispatcher.register_with_priority(journaled("upload", &journal), Priority::LAST).unwrap();

    dispatcher.publish(&login_started()).unwrap();
    dispatcher.publish(&Event::success("LoginTest").unwrap()).unwrap();

    let expected_once = vec!["screenshot:LoginTest", "report:LoginTest", "metrics:LoginTest", "upload:LoginTest"];
    let expected: Vec<_> = expected_once.iter().chain(expected_once.iter()).cloned().collect();
    assert_eq!(*util::lock(&journal), expected);
}

#[test]
fn insertion_order_can_be_configured() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let mut config = Config::default();
    config.ordering = DispatchOrder::Insertion;
    let dispatcher = Dispatcher::with_config(&config);

    dispatcher.register(journaled("a", &journal)).unwrap();
    dispatcher.register_with_priority(journaled("b", &journal), Priority::FIRST).unwrap();
    dispatcher.publish(&login_started()).unwrap();

    assert_eq!(*util::lock(&journal), vec!["a:LoginTest", "b:LoginTest"]);
}

#[test]
fn shutdown_closes_in_reverse_order_and_isolates_failures() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new();

    dispatcher.register(journaled("a", &journal)).unwrap();
    dispatcher.register(Arc::new(Journaled { name: "b", journal: journal.clone(), fail_on_close: true })).unwrap();
    dispatcher.register(journaled("c", &journal)).unwrap();

    let failures = dispatcher.shutdown().unwrap();

    assert_eq!(*util::lock(&journal), vec!["c:close", "b:close", "a:close"]);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].observer, "b");
    assert_eq!(failures[0].stage, Stage::Close);
    assert_eq!(failures[0].to_string(), "observer 'b' failed while closing: flush failed");
    assert_eq!(dispatcher.state(), State::Closed);
}

#[test]
fn closed_dispatcher_rejects_everything() {
    let dispatcher = Dispatcher::new();
    let handle = dispatcher.register(Arc::new(Recorder::new())).unwrap();
    dispatcher.shutdown().unwrap();

    assert!(is_closed_error(&dispatcher.publish(&login_started()).unwrap_err()));
    assert!(is_closed_error(&dispatcher.register(Arc::new(Recorder::new())).unwrap_err()));
    assert!(is_closed_error(&dispatcher.unregister(handle).unwrap_err()));
    assert!(is_closed_error(&dispatcher.shutdown().unwrap_err()));
    assert!(dispatcher.is_closed());
    assert!(dispatcher.is_empty());
}

#[test]
fn observers_may_register_during_publish() {
    let dispatcher = Arc::new(Dispatcher::new());
    let late = Arc::new(Recorder::named("late"));

    let registering = {
        let dispatcher = dispatcher.clone();
        let late = late.clone();
        observer::from_fn("registering", move |event| {
            if event.kind() == EventKind::Start {
                dispatcher.register(late.clone())?;
            }
            Ok(())
        })
    };
    dispatcher.register(Arc::new(registering)).unwrap();

    dispatcher.publish(&login_started()).unwrap();
    assert!(late.is_empty(), "registration only applies to later events");

    dispatcher.publish(&Event::success("LoginTest").unwrap()).unwrap();
    assert_eq!(late.count(EventKind::Success), 1);

    // Break the Arc cycle through the closure.
    dispatcher.shutdown().unwrap();
}

#[test]
fn shutdown_during_publish_stops_delivery() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Arc::new(Dispatcher::new());

    let closer = {
        let dispatcher = dispatcher.clone();
        observer::from_fn("closer", move |_| dispatcher.shutdown().map(|_| ()))
    };
    dispatcher.register(Arc::new(closer)).unwrap();
    dispatcher.register(journaled("report", &journal)).unwrap();

    let delivery = dispatcher.publish(&login_started()).unwrap();

    assert_eq!(delivery, Delivery { invoked: 1, failures: Vec::new() });
    assert_eq!(*util::lock(&journal), vec!["report:close"]);
    assert_eq!(dispatcher.state(), State::Closed);
    assert!(is_closed_error(&dispatcher.publish(&login_started()).unwrap_err()));
}

#[test]
fn dropping_an_open_dispatcher_closes_observers() {
    let journal = Arc::new(Mutex::new(Vec::new()));

    {
        let dispatcher = Dispatcher::new();
        dispatcher.register(journaled("a", &journal)).unwrap();
        dispatcher.register(journaled("b", &journal)).unwrap();
    }

    assert_eq!(*util::lock(&journal), vec!["b:close", "a:close"]);
}

#[test]
fn publishing_from_many_threads() {
    let dispatcher = Arc::new(Dispatcher::new());
    let recorder = Arc::new(Recorder::new());
    dispatcher.register(recorder.clone()).unwrap();

    let threads: Vec<_> = (0..4).map(|i| {
        let dispatcher = dispatcher.clone();
        std::thread::spawn(move || {
            for j in 0..25 {
                dispatcher.publish(&Event::start(format!("Test{}_{}", i, j)).unwrap()).unwrap();
            }
        })
    }).collect();

    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(recorder.count(EventKind::Start), 100);
}
