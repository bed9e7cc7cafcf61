//! Parsing of event scripts.
//!
//! An event script lists the lifecycle events of a recorded run, one
//! directive per line:
//!
//! ``` text
//! # comment
//! START LoginTest
//! PASS LoginTest duration_ms=120
//! START CheckoutTest
//! FAIL CheckoutTest retries=2: element not found
//! CAUSE: timed out after 30s
//! SKIP PaymentTest
//! ```

use crate::{ErrorKind, Event, EventKind, FailureDetail, Result, ResultExt};

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref DIRECTIVE_REGEX: Regex = Regex::new(r"^([A-Z]+)(:?)(?:\s+(.*))?$").unwrap();
    static ref ATTRIBUTE_REGEX: Regex = Regex::new(r"^([A-Za-z_][A-Za-z0-9_.-]*)=(\S*)$").unwrap();
}

/// A parsed event script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Script {
    pub path: PathBuf,
    pub steps: Vec<Step>,
}

/// A single event to replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub kind: EventKind,
    pub subject_name: String,
    pub attributes: BTreeMap<String, String>,
    pub failure_detail: Option<FailureDetail>,
    /// The line the step was declared on.
    pub line: usize,
}

impl Step {
    /// Builds the event for this step, stamped with the current time.
    pub fn to_event(&self) -> Result<Event> {
        let mut builder = Event::builder(self.kind, self.subject_name.clone());

        for (key, value) in self.attributes.iter() {
            builder = builder.attribute(key.clone(), value.clone());
        }
        if let Some(ref detail) = self.failure_detail {
            builder = builder.failure(detail.clone());
        }

        builder.build().chain_err(|| ErrorKind::Script(self.line, format!("invalid {} event", self.kind)))
    }
}

/// Parses an event script.
pub fn script<P>(path: P, text: &str) -> Result<Script>
    where P: AsRef<Path> {
    let mut steps: Vec<Step> = Vec::new();

    for (line_idx, line) in text.lines().enumerate() {
        let line_number = line_idx + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let captures = match DIRECTIVE_REGEX.captures(line) {
            Some(c) => c,
            None => return Err(script_error(line_number, format!("expected a directive but got '{}'", line))),
        };

        let directive = captures.get(1).map(|m| m.as_str()).unwrap_or("");
        let has_colon = captures.get(2).map(|m| !m.as_str().is_empty()).unwrap_or(false);
        let rest = captures.get(3).map(|m| m.as_str().trim()).unwrap_or("");

        match (directive, has_colon) {
            ("CAUSE", true) => {
                let detail = steps.last_mut()
                    .filter(|s| s.kind == EventKind::Failure)
                    .and_then(|s| s.failure_detail.take());

                match detail {
                    Some(detail) => {
                        if let Some(step) = steps.last_mut() {
                            step.failure_detail = Some(detail.caused_by(rest));
                        }
                    },
                    None => return Err(script_error(line_number, "CAUSE must directly follow a FAIL directive")),
                }
            },
            ("START", false) => steps.push(self::step(EventKind::Start, rest, None, line_number)?),
            ("PASS", false) => steps.push(self::step(EventKind::Success, rest, None, line_number)?),
            ("SKIP", false) => steps.push(self::step(EventKind::Skipped, rest, None, line_number)?),
            ("FAIL", false) => {
                let colon = match message_separator(rest) {
                    Some(idx) => idx,
                    None => return Err(script_error(line_number, "FAIL requires a message, as in 'FAIL <name>: <message>'")),
                };

                let message = rest[colon + 1..].trim();
                if message.is_empty() {
                    return Err(script_error(line_number, "FAIL message must not be empty"));
                }

                let detail = FailureDetail::new(message);
                steps.push(self::step(EventKind::Failure, &rest[..colon], Some(detail), line_number)?);
            },
            ("CAUSE", false) => return Err(script_error(line_number, "CAUSE must be followed by a colon, as in 'CAUSE: <message>'")),
            ("START", true) | ("PASS", true) | ("SKIP", true) | ("FAIL", true) => {
                return Err(script_error(line_number, format!("{} must not be followed by a colon", directive)));
            },
            (name, _) => return Err(script_error(line_number, format!("directive '{}' not known", name))),
        }
    }

    Ok(Script { path: path.as_ref().to_owned(), steps })
}

/// Finds the colon that ends the `<subject> [key=value]...` part of a FAIL
/// line. Colons inside attribute values are not followed by whitespace.
fn message_separator(text: &str) -> Option<usize> {
    text.char_indices()
        .find(|&(idx, c)| c == ':' && text[idx + 1..].chars().next().map_or(true, char::is_whitespace))
        .map(|(idx, _)| idx)
}

/// Parses `<subject> [key=value]...`.
fn step(kind: EventKind,
        text: &str,
        failure_detail: Option<FailureDetail>,
        line: usize) -> Result<Step> {
    let mut words = text.split_whitespace();

    let subject_name = match words.next() {
        Some(name) => name.to_owned(),
        None => return Err(script_error(line, format!("{} requires a test name", kind))),
    };

    let mut attributes = BTreeMap::new();
    for word in words {
        match ATTRIBUTE_REGEX.captures(word) {
            Some(captures) => {
                attributes.insert(captures[1].to_owned(), captures[2].to_owned());
            },
            None => return Err(script_error(line, format!("expected 'key=value' but got '{}'", word))),
        }
    }

    Ok(Step { kind, subject_name, attributes, failure_detail, line })
}

fn script_error<S>(line: usize, message: S) -> crate::Error
    where S: Into<String> {
    ErrorKind::Script(line, message.into()).into()
}
