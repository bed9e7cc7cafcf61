//! Utility functions for internal use.

use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_INDENT_ATOM: &'static str = "  ";

/// Locks a mutex, carrying on with the inner data if a panicking observer
/// poisoned it.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Indents a piece of text.
pub fn indent(text: &str, level: usize) -> String {
    indent_ext(text, level, DEFAULT_INDENT_ATOM)
}

pub fn indent_ext(text: &str, level: usize, indentation_atom: &str) -> String {
    let indent = (0..level).map(|_| indentation_atom).collect::<Vec<_>>().join("");
    text.lines().map(|l| format!("{}{}", indent, l.trim())).collect::<Vec<_>>().join("\n") + "\n"
}
