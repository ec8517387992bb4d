//! Revision status reporting (`list`)

use crate::revision::{Revision, RevisionModule};
use serde::Serialize;
use std::fmt;

/// Where a revision stands relative to the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionState {
    Applied,
    Current,
    Pending,
}

impl fmt::Display for RevisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionState::Applied => f.write_str("applied"),
            RevisionState::Current => f.write_str("current"),
            RevisionState::Pending => f.write_str("pending"),
        }
    }
}

/// One revision of the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionEntry {
    /// Position in the chain, 0 for the root
    pub index: usize,
    pub file: String,
    pub version: String,
    pub previous_version: Option<String>,
    pub state: RevisionState,
}

/// The whole chain with the current position of one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionStatus {
    pub namespace: String,
    pub current: Option<Revision>,
    pub entries: Vec<RevisionEntry>,
}

impl RevisionStatus {
    /// Build the status of `sorted` (root-to-tip) given the current revision
    ///
    /// Entries before the current one are applied, entries after it pending. With no
    /// current revision everything is pending.
    #[must_use]
    pub fn new<C: ?Sized>(
        namespace: impl Into<String>,
        current: Option<Revision>,
        sorted: &[RevisionModule<C>],
    ) -> Self {
        let current_index = current
            .as_ref()
            .and_then(|current| sorted.iter().position(|m| m.file() == current.file));

        let entries = sorted
            .iter()
            .enumerate()
            .map(|(index, module)| RevisionEntry {
                index,
                file: module.file().to_string(),
                version: module.version().to_string(),
                previous_version: module.previous_version().map(str::to_string),
                state: match current_index {
                    Some(current) if index < current => RevisionState::Applied,
                    Some(current) if index == current => RevisionState::Current,
                    _ => RevisionState::Pending,
                },
            })
            .collect();

        Self {
            namespace: namespace.into(),
            current,
            entries,
        }
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending_count() == 0
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == RevisionState::Pending)
            .count()
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.entries.len() - self.pending_count()
    }
}
