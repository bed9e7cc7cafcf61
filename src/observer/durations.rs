use crate::{Event, EventKind, Result, util};

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Measures how long each test took, from its start event to its
/// terminal event.
#[derive(Default)]
pub struct Durations {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    started_at: HashMap<String, SystemTime>,
    finished: Vec<(String, Duration)>,
}

impl Durations {
    pub fn new() -> Self {
        Durations::default()
    }

    /// Durations of every finished test, in the order they finished.
    pub fn durations(&self) -> Vec<(String, Duration)> {
        util::lock(&self.state).finished.clone()
    }

    pub fn duration_of(&self, subject_name: &str) -> Option<Duration> {
        util::lock(&self.state).finished.iter()
            .rev()
            .find(|(name, _)| name == subject_name)
            .map(|&(_, d)| d)
    }

    /// Subjects that started but have not finished yet.
    pub fn in_flight(&self) -> Vec<String> {
        let mut names: Vec<_> = util::lock(&self.state).started_at.keys().cloned().collect();
        names.sort();
        names
    }
}

impl super::Observer for Durations {
    fn handle(&self, event: &Event) -> Result<()> {
        let mut state = util::lock(&self.state);

        match event.kind() {
            kind if !kind.is_terminal() => {
                state.started_at.insert(event.subject_name().to_owned(), event.timestamp());
            },
            _ => {
                // A skip can be reported without a start.
                if let Some(started_at) = state.started_at.remove(event.subject_name()) {
                    // Clocks can step backwards; treat that as zero.
                    let elapsed = event.timestamp().duration_since(started_at).unwrap_or_default();
                    state.finished.push((event.subject_name().to_owned(), elapsed));
                } else if event.kind() != EventKind::Skipped {
                    warn!("'{}' finished without a start event", event.subject_name());
                }
            },
        }

        Ok(())
    }

    fn close(&self) -> Result<()> {
        let state = util::lock(&self.state);

        for name in state.started_at.keys() {
            warn!("'{}' started but never finished", name);
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "durations"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{FailureDetail, Observer};

    fn at(event: crate::event::EventBuilder, millis: u64) -> Event {
        event.timestamp(SystemTime::UNIX_EPOCH + Duration::from_millis(millis)).build().unwrap()
    }

    #[test]
    fn measures_from_start_to_terminal_event() {
        let durations = Durations::new();

        durations.handle(&at(Event::builder(EventKind::Start, "A"), 1000)).unwrap();
        durations.handle(&at(Event::builder(EventKind::Start, "B"), 1100)).unwrap();
        durations.handle(&at(Event::builder(EventKind::Success, "A"), 1250)).unwrap();
        durations.handle(&at(Event::builder(EventKind::Failure, "B").failure(FailureDetail::new("x")), 2100)).unwrap();

        assert_eq!(durations.durations(), vec![
            ("A".to_owned(), Duration::from_millis(250)),
            ("B".to_owned(), Duration::from_millis(1000)),
        ]);
        assert!(durations.in_flight().is_empty());
    }

    #[test]
    fn skip_without_start_is_ignored() {
        let durations = Durations::new();

        durations.handle(&Event::skipped("C").unwrap()).unwrap();

        assert_eq!(durations.duration_of("C"), None);
        assert!(durations.durations().is_empty());
    }

    #[test]
    fn backwards_clock_yields_zero() {
        let durations = Durations::new();

        durations.handle(&at(Event::builder(EventKind::Start, "A"), 5000)).unwrap();
        durations.handle(&at(Event::builder(EventKind::Success, "A"), 4000)).unwrap();

        assert_eq!(durations.duration_of("A"), Some(Duration::from_millis(0)));
    }
}
