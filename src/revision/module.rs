//! `RevisionModule` - one loaded revision file

use crate::revision::hash::{compute_version, HashAlgorithm};
use crate::revision::source::{Operation, OperationError, RevisionDefinition};
use crate::revision::Revision;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A revision file with its content hash, derived version and operations
///
/// Modules are built once by the loader and never mutated. The version is derived from
/// the file hash and the *declared* previous version when the module is built.
pub struct RevisionModule<C: ?Sized> {
    file: String,
    path: PathBuf,
    file_hash: String,
    version: String,
    previous_version: Option<String>,
    algorithm: HashAlgorithm,
    up: Arc<dyn Operation<C>>,
    down: Arc<dyn Operation<C>>,
}

impl<C: ?Sized> RevisionModule<C> {
    /// Build a module from a source definition and the hash of the file it came from
    pub fn new(
        path: impl Into<PathBuf>,
        file_hash: impl Into<String>,
        definition: RevisionDefinition<C>,
        algorithm: HashAlgorithm,
    ) -> Self {
        let path = path.into();
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file_hash = file_hash.into();
        let version = compute_version(
            definition.previous_version.as_deref(),
            &file_hash,
            algorithm,
        );

        Self {
            file,
            path,
            file_hash,
            version,
            previous_version: definition.previous_version,
            algorithm,
            up: definition.up,
            down: definition.down,
        }
    }

    /// File name, without directory
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_hash(&self) -> &str {
        &self.file_hash
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn previous_version(&self) -> Option<&str> {
        self.previous_version.as_deref()
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn is_root(&self) -> bool {
        self.previous_version.is_none()
    }

    pub fn up(&self, client: &C) -> Result<(), OperationError> {
        self.up.run(client)
    }

    pub fn down(&self, client: &C) -> Result<(), OperationError> {
        self.down.run(client)
    }

    /// The record persisted once this module is the current revision
    pub fn to_revision(&self) -> Revision {
        Revision::new(
            self.file.clone(),
            self.version.clone(),
            self.previous_version.clone(),
        )
    }
}

impl<C: ?Sized> Clone for RevisionModule<C> {
    fn clone(&self) -> Self {
        Self {
            file: self.file.clone(),
            path: self.path.clone(),
            file_hash: self.file_hash.clone(),
            version: self.version.clone(),
            previous_version: self.previous_version.clone(),
            algorithm: self.algorithm,
            up: Arc::clone(&self.up),
            down: Arc::clone(&self.down),
        }
    }
}

impl<C: ?Sized> fmt::Debug for RevisionModule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionModule")
            .field("file", &self.file)
            .field("version", &self.version)
            .field("previous_version", &self.previous_version)
            .field("file_hash", &self.file_hash)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::module;
    use super::*;
    use crate::revision::hash::hash;

    #[test]
    fn test_root_version_is_file_hash() {
        let root: RevisionModule<()> = module("001_a.revision.toml", None);
        assert_eq!(root.version(), root.file_hash());
        assert!(root.is_root());
    }

    #[test]
    fn test_linked_version_commits_to_previous() {
        let root: RevisionModule<()> = module("001_a.revision.toml", None);
        let next: RevisionModule<()> = module("002_b.revision.toml", Some(root.version()));

        let expected = hash(
            format!("{}{}", next.file_hash(), root.version()),
            HashAlgorithm::Sha256,
        );
        assert_eq!(next.version(), expected);
    }

    #[test]
    fn test_file_is_name_without_directory() {
        let m: RevisionModule<()> = module("/srv/app/revisions/001_a.revision.toml", None);
        assert_eq!(m.file(), "001_a.revision.toml");
        assert_eq!(m.path(), Path::new("/srv/app/revisions/001_a.revision.toml"));
    }

    #[test]
    fn test_to_revision_drops_operations() {
        let root: RevisionModule<()> = module("001_a.revision.toml", None);
        let revision = root.to_revision();
        assert_eq!(revision.file, "001_a.revision.toml");
        assert_eq!(revision.version, root.version());
        assert!(revision.is_root());
    }

    #[test]
    fn test_operations_run_against_client() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = AtomicUsize::new(0);
        let up = |client: &AtomicUsize| -> Result<(), OperationError> {
            client.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let down = |_: &AtomicUsize| -> Result<(), OperationError> { Err("boom".into()) };
        let m: RevisionModule<AtomicUsize> = RevisionModule::new(
            "001_a.revision.toml",
            "h",
            RevisionDefinition {
                previous_version: None,
                up: Arc::new(up),
                down: Arc::new(down),
            },
            HashAlgorithm::Sha256,
        );

        m.up(&calls).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(m.down(&calls).unwrap_err().to_string(), "boom");
    }
}
