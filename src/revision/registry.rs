//! In-process revisions written as Rust closures
//!
//! A registered revision is still backed by a file on disk (conventionally the `.rs`
//! source that defines it): the loader hashes that file, so editing the code of an
//! applied revision is detected exactly like editing a TOML script.
//!
//! ```no_run
//! use revisions::{OperationError, RegistrySource, Transaction, Executor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = RegistrySource::<Transaction>::new();
//! registry.register(
//!     "20240120120000_create_users.revision.rs",
//!     None,
//!     |tx: &Transaction| -> Result<(), OperationError> {
//!         tx.batch_execute("CREATE TABLE users (id SERIAL PRIMARY KEY)")?;
//!         Ok(())
//!     },
//!     |tx: &Transaction| -> Result<(), OperationError> {
//!         tx.batch_execute("DROP TABLE users")?;
//!         Ok(())
//!     },
//! )?;
//! # Ok(())
//! # }
//! ```

use crate::revision::source::{Operation, RevisionDefinition, RevisionSource};
use crate::revision::RevisionError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

struct RegisteredRevision<C: ?Sized> {
    previous_version: Option<String>,
    up: Arc<dyn Operation<C>>,
    down: Arc<dyn Operation<C>>,
}

/// Explicit registry of closure-backed revisions, keyed by file name
pub struct RegistrySource<C: ?Sized> {
    extension: String,
    revisions: HashMap<String, RegisteredRevision<C>>,
}

impl<C: ?Sized> RegistrySource<C> {
    pub const DEFAULT_EXTENSION: &'static str = "rs";

    pub fn new() -> Self {
        Self {
            extension: Self::DEFAULT_EXTENSION.to_string(),
            revisions: HashMap::new(),
        }
    }

    /// Match `*.revision.<extension>` instead of `*.revision.rs`
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Register the operations of revision file `file`
    ///
    /// # Errors
    ///
    /// Returns `RevisionError::AlreadyRegistered` if `file` already has a registration.
    pub fn register<U, D>(
        &mut self,
        file: impl Into<String>,
        previous_version: Option<&str>,
        up: U,
        down: D,
    ) -> Result<&mut Self, RevisionError>
    where
        U: Operation<C> + 'static,
        D: Operation<C> + 'static,
    {
        let file = file.into();
        if self.revisions.contains_key(&file) {
            return Err(RevisionError::AlreadyRegistered { file });
        }
        self.revisions.insert(
            file,
            RegisteredRevision {
                previous_version: previous_version.map(str::to_string),
                up: Arc::new(up),
                down: Arc::new(down),
            },
        );
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl<C: ?Sized> Default for RegistrySource<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> RevisionSource<C> for RegistrySource<C> {
    fn extensions(&self) -> Vec<String> {
        vec![self.extension.clone()]
    }

    fn load(&self, path: &Path, _contents: &[u8]) -> Result<RevisionDefinition<C>, RevisionError> {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let registered = self
            .revisions
            .get(&file)
            .ok_or_else(|| RevisionError::malformed(&file, "no revision registered for this file"))?;

        Ok(RevisionDefinition {
            previous_version: registered.previous_version.clone(),
            up: Arc::clone(&registered.up),
            down: Arc::clone(&registered.down),
        })
    }
}
