//! Routines for replaying event scripts through a dispatcher.

use crate::{Config, Dispatcher, EventKind, Result, ResultExt, script::{self, Script}};

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A summary of a replayed run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub scripts: usize,
    pub events: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Observer failures that the dispatcher isolated along the way.
    pub observer_failures: usize,
}

impl Outcome {
    /// A run is successful if no test failed.
    ///
    /// Observer failures do not count against the run.
    pub fn is_successful(&self) -> bool {
        self.failed == 0
    }
}

/// Replays every script found according to a given config.
///
/// The dispatcher is left open; shutting it down is up to the caller.
pub fn scripts(dispatcher: &Dispatcher, config: &Config) -> Result<Outcome> {
    if config.script_paths.is_empty() {
        bail!("no script paths given");
    }

    let paths = find_scripts(config)?;
    if paths.is_empty() {
        bail!("could not find any event scripts");
    }

    info!("replaying {} event script(s)", paths.len());

    let mut outcome = Outcome::default();
    for path in paths {
        let text = fs::read_to_string(&path)
            .chain_err(|| format!("could not read '{}'", path.display()))?;
        let script = script::script(&path, &text)
            .chain_err(|| format!("could not parse '{}'", path.display()))?;

        self::script(dispatcher, &script, &mut outcome)?;
    }

    Ok(outcome)
}

/// Publishes the events of a single script, in order.
pub fn script(dispatcher: &Dispatcher,
              script: &Script,
              outcome: &mut Outcome) -> Result<()> {
    debug!("replaying {} ({} events)", script.path.display(), script.steps.len());

    for step in script.steps.iter() {
        let event = step.to_event()
            .chain_err(|| format!("in '{}'", script.path.display()))?;
        let delivery = dispatcher.publish(&event)?;

        outcome.events += 1;
        outcome.observer_failures += delivery.failures.len();
        match event.kind() {
            EventKind::Start => (),
            EventKind::Success => outcome.passed += 1,
            EventKind::Failure => outcome.failed += 1,
            EventKind::Skipped => outcome.skipped += 1,
        }
    }

    outcome.scripts += 1;
    Ok(())
}

/// Recursively finds event scripts for the configured paths, sorted.
pub fn find_scripts(config: &Config) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for path in config.script_paths.iter() {
        paths.extend(in_path(path, config)?);
    }

    paths.sort();
    paths.dedup();
    Ok(paths)
}

fn in_path(path: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(path)
        .chain_err(|| format!("failed to open '{}'", path.display()))?;

    if !metadata.is_dir() {
        return Ok(vec![path.to_owned()]);
    }

    let mut scripts = Vec::new();
    for entry in WalkDir::new(path).min_depth(1) {
        let entry = entry.chain_err(|| format!("failed to walk '{}'", path.display()))?;

        let is_script = entry.file_type().is_file() &&
            entry.path().extension()
                 .and_then(|ext| ext.to_str())
                 .map(|ext| config.is_extension_supported(ext))
                 .unwrap_or(false);

        if is_script {
            scripts.push(entry.into_path());
        }
    }

    Ok(scripts)
}
