use crate::{Event, EventKind, Result, util};

use std::io;
use std::io::prelude::*;
use std::sync::Mutex;

/// Reports finished tests to the terminal, in colour where supported.
pub struct Console {
    verbose: bool,
    tally: Mutex<Tally>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Tally {
    passed: usize,
    failed: usize,
    skipped: usize,
}

impl Console {
    /// Creates a new console reporter.
    pub fn new(verbose: bool) -> Self {
        Console { verbose, tally: Mutex::new(Tally::default()) }
    }
}

impl std::default::Default for Console {
    fn default() -> Self {
        Console::new(true)
    }
}

impl super::Observer for Console {
    fn handle(&self, event: &Event) -> Result<()> {
        {
            let mut tally = util::lock(&self.tally);
            match event.kind() {
                EventKind::Start => (),
                EventKind::Success => tally.passed += 1,
                EventKind::Failure => tally.failed += 1,
                EventKind::Skipped => tally.skipped += 1,
            }
        }

        self::event(event, self.verbose)
    }

    fn close(&self) -> Result<()> {
        let tally = util::lock(&self.tally).clone();

        print::line()?;
        print::text(format!("{} passed, {} failed, {} skipped", tally.passed, tally.failed, tally.skipped))?;

        if tally.failed == 0 {
            print::success("all tests succeeded")?;
        } else {
            print::error("error: tests failed")?;
        }

        // Later output would otherwise inherit the last colour we emitted.
        print::reset_colors()
    }

    fn name(&self) -> &str {
        "console"
    }
}

pub fn event(event: &Event, verbose: bool) -> Result<()> {
    match event.kind() {
        EventKind::Start => {
            if verbose {
                print::text(format!("START :: {}", event.subject_name()))?;
            }
        },
        EventKind::Success => {
            print::success(format!("PASS :: {}", event.subject_name()))?;
        },
        EventKind::Skipped => {
            print::warning(format!("SKIP :: {}", event.subject_name()))?;
        },
        EventKind::Failure => {
            if verbose { print::line()?; }

            print::failure(format!("FAIL :: {}", event.subject_name()))?;

            if let (true, Some(detail)) = (verbose, event.failure_detail()) {
                print::text(util::indent(&format!("reason: {}", detail.message()), 1))?;

                for cause in detail.causes() {
                    print::text(util::indent(&format!("caused by: {}", cause), 2))?;
                }

                print::line()?;
            }
        },
    }

    Ok(())
}

mod print {
    use super::*;

    #[derive(Copy, Clone)]
    pub enum StdStream { Out, Err }

    pub fn line() -> Result<()> {
        with("\n",
             StdStream::Out,
             term::color::WHITE)
    }

    pub fn text<S>(msg: S) -> Result<()>
        where S: Into<String> {
        with(format!("{}\n", msg.into().trim_end()),
             StdStream::Out,
             term::color::WHITE)
    }

    pub fn success<S>(msg: S) -> Result<()>
        where S: Into<String> {
        with(format!("{}\n", msg.into()),
             StdStream::Out,
             term::color::GREEN)
    }

    pub fn warning<S>(msg: S) -> Result<()>
        where S: Into<String> {
        with(format!("{}\n", msg.into()),
             StdStream::Err,
             term::color::YELLOW)
    }

    pub fn error<S>(msg: S) -> Result<()>
        where S: Into<String> {
        with(format!("{}\n", msg.into()),
             StdStream::Err,
             term::color::RED)
    }

    pub fn failure<S>(msg: S) -> Result<()>
        where S: Into<String> {
        with(format!("{}\n", msg.into()),
             StdStream::Err,
             term::color::MAGENTA)
    }

    pub fn with<S>(msg: S,
                   stream: StdStream,
                   color: term::color::Color) -> Result<()>
        where S: Into<String> {
        let msg = msg.into();

        match stream {
            StdStream::Out => {
                if let Some(color_term) = term::stdout().as_mut() {
                    // Not every terminal supports colour; plain text is fine.
                    let _ = color_term.fg(color);
                    write!(color_term, "{}", msg)?;
                } else {
                    write!(io::stdout(), "{}", msg)?;
                }
            },
            StdStream::Err => {
                if let Some(color_term) = term::stderr().as_mut() {
                    let _ = color_term.fg(color);
                    write!(color_term, "{}", msg)?;
                } else {
                    write!(io::stderr(), "{}", msg)?;
                }
            },
        }

        Ok(())
    }

    pub fn reset_colors() -> Result<()> {
        for stream in [StdStream::Out, StdStream::Err].iter().cloned() {
            with("", stream, term::color::WHITE)?;
        }

        Ok(())
    }
}
