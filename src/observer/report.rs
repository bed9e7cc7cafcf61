use crate::{Event, EventKind, Result, ResultExt, util};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Buffers one line per finished test and writes them to a plain text
/// report when the dispatcher shuts down.
pub struct Report {
    path: PathBuf,
    lines: Mutex<Vec<String>>,
}

impl Report {
    pub fn new<P>(path: P) -> Self
        where P: Into<PathBuf> {
        Report { path: path.into(), lines: Mutex::new(Vec::new()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(lines: &[String]) -> String {
        let failed = lines.iter().filter(|l| l.starts_with("FAIL")).count();
        let status = if failed == 0 { "successful" } else { "failed" };

        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&format!("\nsuite: {} ({} tests, {} failed)\n", status, lines.len(), failed));
        text
    }
}

impl super::Observer for Report {
    fn handle(&self, event: &Event) -> Result<()> {
        let line = match event.kind() {
            EventKind::Start => return Ok(()),
            EventKind::Success => format!("PASS :: {}", event.subject_name()),
            EventKind::Skipped => format!("SKIP :: {}", event.subject_name()),
            EventKind::Failure => match event.failure_detail() {
                Some(detail) => format!("FAIL :: {} :: {}", event.subject_name(), detail),
                None => format!("FAIL :: {}", event.subject_name()),
            },
        };

        util::lock(&self.lines).push(line);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let text = Report::render(&util::lock(&self.lines));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .chain_err(|| format!("could not create report directory '{}'", parent.display()))?;
        }

        fs::write(&self.path, text)
            .chain_err(|| format!("could not write report to '{}'", self.path.display()))?;

        debug!("wrote report to {}", self.path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "report"
    }
}
