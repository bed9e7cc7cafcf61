//! Dispatcher and replay configuration.

use std::path::PathBuf;

#[cfg(feature = "clap")] pub mod clap;

/// The default extension of event script files.
pub const DEFAULT_SCRIPT_EXTENSION: &'static str = "events";

/// What `publish` does when an observer fails.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure and keep delivering to the remaining observers.
    Continue,
    /// Stop delivering and return the failure to the publisher.
    Abort,
}

/// How observers with equal or differing priorities are ordered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispatchOrder {
    /// Ascending priority, ties broken by insertion order.
    PriorityThenInsertion,
    /// Insertion order only, priorities are ignored.
    Insertion,
}

/// The configuration of a dispatcher and of the replay runner.
#[derive(Clone, Debug)]
pub struct Config
{
    pub failure_policy: FailurePolicy,
    pub ordering: DispatchOrder,
    /// A list of file extensions which contain event scripts.
    pub supported_file_extensions: Vec<String>,
    /// Paths to scripts or folders containing scripts.
    pub script_paths: Vec<PathBuf>,
    /// Where the report observer writes to, if enabled.
    pub report_path: Option<PathBuf>,
    /// Whether reporters should print failure details.
    pub verbose: bool,
}

impl Config
{
    /// Adds a supported script file extension.
    ///
    /// The extension can be specified with or without the leading dot.
    pub fn add_extension<S>(&mut self, ext: S) where S: AsRef<str> {
        let ext = ext.as_ref().trim_start_matches('.').to_owned();

        if !self.is_extension_supported(&ext) {
            self.supported_file_extensions.push(ext);
        }
    }

    /// Adds a path to the script search pathset.
    pub fn add_search_path<P>(&mut self, path: P) where P: Into<String> {
        self.script_paths.push(PathBuf::from(path.into()));
    }

    pub fn is_extension_supported(&self, extension: &str) -> bool {
        self.supported_file_extensions.iter().any(|ext| &ext[..] == extension)
    }
}

impl Default for Config
{
    fn default() -> Self {
        Config {
            failure_policy: FailurePolicy::Continue,
            ordering: DispatchOrder::PriorityThenInsertion,
            supported_file_extensions: vec![DEFAULT_SCRIPT_EXTENSION.to_owned()],
            script_paths: Vec::new(),
            report_path: None,
            verbose: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extensions_are_normalized_and_deduplicated() {
        let mut config = Config::default();
        config.add_extension(".events");
        config.add_extension("txt");
        config.add_extension(".txt");

        assert_eq!(config.supported_file_extensions, vec!["events".to_owned(), "txt".to_owned()]);
        assert!(config.is_extension_supported("txt"));
        assert!(!config.is_extension_supported(".txt"));
    }
}
