//! Explicit logging capability
//!
//! Engine components never log through a hard-coded target. They hold a [`Logger`] handed
//! to them at construction time, so an embedding application decides where revision
//! output goes (and can tell two migrators apart) without touching process-wide state
//! beyond the `log` facade it already configured.

use log::Level;
use std::fmt;
use std::sync::Arc;

/// A cheap-to-clone handle that tags every record with a fixed `log` target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Logger {
    target: Arc<str>,
}

impl Logger {
    /// Create a logger writing under `target`
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: Arc::from(target.into()),
        }
    }

    /// Derive a logger for a sub-component (`parent::name`)
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self::new(format!("{}::{}", self.target, name))
    }

    /// The `log` target records are written under
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: &*self.target, level, "{}", args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("revisions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_target() {
        let logger = Logger::new("app");
        assert_eq!(logger.child("revisions").target(), "app::revisions");
        assert_eq!(Logger::default().target(), "revisions");
    }
}
