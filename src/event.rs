//! The test-lifecycle event model.
//!
//! An `Event` is built once by the runner at a lifecycle transition and is
//! never modified afterwards. Observers only ever see it by reference.

use crate::{Error, ErrorKind, Result};

use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// The lifecycle point an event describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Start,
    Success,
    Failure,
    Skipped,
}

/// Structured description of why a test failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureDetail {
    message: String,
    /// The cause chain, outermost cause first.
    causes: Vec<String>,
}

/// An immutable record of a single lifecycle occurrence.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    kind: EventKind,
    subject_name: String,
    timestamp: SystemTime,
    failure_detail: Option<FailureDetail>,
    attributes: BTreeMap<String, String>,
}

/// Collects the optional parts of an event before validating it.
#[derive(Clone, Debug)]
pub struct EventBuilder {
    kind: EventKind,
    subject_name: String,
    timestamp: Option<SystemTime>,
    failure_detail: Option<FailureDetail>,
    attributes: BTreeMap<String, String>,
}

impl EventKind {
    /// Whether this kind marks the end of a test.
    pub fn is_terminal(&self) -> bool {
        match *self {
            EventKind::Start => false,
            EventKind::Success | EventKind::Failure | EventKind::Skipped => true,
        }
    }
}

impl FailureDetail {
    pub fn new<S>(message: S) -> Self
        where S: Into<String> {
        FailureDetail { message: message.into(), causes: Vec::new() }
    }

    /// Appends a cause to the end of the chain.
    pub fn caused_by<S>(mut self, cause: S) -> Self
        where S: Into<String> {
        self.causes.push(cause.into());
        self
    }

    /// Builds a failure detail from an error and its `source()` chain.
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let mut detail = FailureDetail::new(error.to_string());

        let mut source = error.source();
        while let Some(cause) = source {
            detail.causes.push(cause.to_string());
            source = cause.source();
        }

        detail
    }

    pub fn message(&self) -> &str { &self.message }

    pub fn causes(&self) -> &[String] { &self.causes }
}

impl Event {
    /// Creates an event with the current time and no attributes.
    pub fn new<S>(kind: EventKind,
                  subject_name: S,
                  failure_detail: Option<FailureDetail>) -> Result<Self>
        where S: Into<String> {
        let mut builder = Event::builder(kind, subject_name);
        builder.failure_detail = failure_detail;
        builder.build()
    }

    pub fn builder<S>(kind: EventKind, subject_name: S) -> EventBuilder
        where S: Into<String> {
        EventBuilder {
            kind,
            subject_name: subject_name.into(),
            timestamp: None,
            failure_detail: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn start<S>(subject_name: S) -> Result<Self> where S: Into<String> {
        Event::new(EventKind::Start, subject_name, None)
    }

    pub fn success<S>(subject_name: S) -> Result<Self> where S: Into<String> {
        Event::new(EventKind::Success, subject_name, None)
    }

    pub fn skipped<S>(subject_name: S) -> Result<Self> where S: Into<String> {
        Event::new(EventKind::Skipped, subject_name, None)
    }

    pub fn failure<S>(subject_name: S, detail: FailureDetail) -> Result<Self>
        where S: Into<String> {
        Event::new(EventKind::Failure, subject_name, Some(detail))
    }

    pub fn kind(&self) -> EventKind { self.kind }

    pub fn subject_name(&self) -> &str { &self.subject_name }

    pub fn timestamp(&self) -> SystemTime { self.timestamp }

    pub fn failure_detail(&self) -> Option<&FailureDetail> { self.failure_detail.as_ref() }

    pub fn attributes(&self) -> &BTreeMap<String, String> { &self.attributes }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| &v[..])
    }
}

impl EventBuilder {
    pub fn failure(mut self, detail: FailureDetail) -> Self {
        self.failure_detail = Some(detail);
        self
    }

    pub fn attribute<K, V>(mut self, key: K, value: V) -> Self
        where K: Into<String>, V: Into<String> {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validates the collected parts and produces the event.
    pub fn build(self) -> Result<Event> {
        if self.subject_name.trim().is_empty() {
            return Err(validation("subject name must not be empty"));
        }

        match (self.kind, self.failure_detail.is_some()) {
            (EventKind::Failure, false) => {
                return Err(validation(format!("'{}' failure event requires a failure detail", self.subject_name)));
            },
            (kind, true) if kind != EventKind::Failure => {
                return Err(validation(format!("'{}' {} event must not carry a failure detail", self.subject_name, kind)));
            },
            _ => (),
        }

        Ok(Event {
            kind: self.kind,
            subject_name: self.subject_name,
            timestamp: self.timestamp.unwrap_or_else(SystemTime::now),
            failure_detail: self.failure_detail,
            attributes: self.attributes,
        })
    }
}

fn validation<S>(reason: S) -> Error
    where S: Into<String> {
    ErrorKind::Validation(reason.into()).into()
}

impl fmt::Display for EventKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            EventKind::Start => "start",
            EventKind::Success => "success",
            EventKind::Failure => "failure",
            EventKind::Skipped => "skipped",
        };

        write!(fmt, "{}", s)
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.message)?;

        if !self.causes.is_empty() {
            write!(fmt, " (caused by: {})", self.causes.iter().join(": "))?;
        }

        Ok(())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} '{}'", self.kind, self.subject_name)?;

        if let Some(ref detail) = self.failure_detail {
            write!(fmt, ": {}", detail)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn is_validation_error(result: Result<Event>) -> bool {
        match result {
            Err(Error(ErrorKind::Validation(..), _)) => true,
            _ => false,
        }
    }

    #[test]
    fn failure_without_detail_is_rejected() {
        assert!(is_validation_error(Event::new(EventKind::Failure, "X", None)));
    }

    #[test]
    fn success_with_detail_is_rejected() {
        let detail = FailureDetail::new("boom");
        assert!(is_validation_error(Event::new(EventKind::Success, "X", Some(detail))));
    }

    #[test]
    fn start_and_skipped_with_detail_are_rejected() {
        for kind in [EventKind::Start, EventKind::Skipped].iter().cloned() {
            let result = Event::builder(kind, "X").failure(FailureDetail::new("boom")).build();
            assert!(is_validation_error(result), "{} should reject failure detail", kind);
        }
    }

    #[test]
    fn empty_subject_is_rejected() {
        assert!(is_validation_error(Event::start("")));
        assert!(is_validation_error(Event::start("   ")));
    }

    #[test]
    fn failure_with_detail_is_accepted() {
        let event = Event::failure("LoginTest", FailureDetail::new("element not found").caused_by("timeout")).unwrap();

        assert_eq!(event.kind(), EventKind::Failure);
        assert_eq!(event.subject_name(), "LoginTest");
        assert_eq!(event.failure_detail().unwrap().causes(), &["timeout".to_owned()]);
        assert_eq!(event.to_string(), "failure 'LoginTest': element not found (caused by: timeout)");
    }

    #[test]
    fn builder_keeps_attributes_and_timestamp() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        let event = Event::builder(EventKind::Success, "LoginTest")
            .attribute("retries", "2")
            .attribute("duration_ms", "120")
            .timestamp(at)
            .build()
            .unwrap();

        assert_eq!(event.timestamp(), at);
        assert_eq!(event.attribute("retries"), Some("2"));
        assert_eq!(event.attributes().keys().collect::<Vec<_>>(), vec!["duration_ms", "retries"]);
    }

    #[derive(Debug)]
    struct Wrapped(&'static str, Option<Box<Wrapped>>);

    impl fmt::Display for Wrapped {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result { write!(fmt, "{}", self.0) }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_ref().map(|e| &**e as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn detail_from_error_walks_source_chain() {
        let err = Wrapped("could not save screenshot",
                          Some(Box::new(Wrapped("io error", Some(Box::new(Wrapped("disk full", None)))))));

        let detail = FailureDetail::from_error(&err);
        assert_eq!(detail.message(), "could not save screenshot");
        assert_eq!(detail.causes(), &["io error".to_owned(), "disk full".to_owned()]);
    }
}
