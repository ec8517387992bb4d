//! Upgrade and downgrade planning

use crate::revision::chain::{sort_and_verify_trusted, verify};
use crate::revision::{Revision, RevisionError, RevisionModule};
use std::fmt;

/// Revisions to apply, in order, to reach the tip
pub struct UpgradePath<C: ?Sized> {
    /// Current revision before the upgrade; `None` for base
    pub initial_revision: Option<Revision>,
    /// Root-to-tip order
    pub pending: Vec<RevisionModule<C>>,
}

/// The single revision to revert and what becomes current afterwards
pub struct DowngradePath<C: ?Sized> {
    /// Current revision after the downgrade; `None` for base
    pub final_revision: Option<Revision>,
    /// Zero or one module
    pub pending: Vec<RevisionModule<C>>,
}

impl<C: ?Sized> UpgradePath<C> {
    pub fn is_noop(&self) -> bool {
        self.pending.is_empty()
    }

    /// Revision that is current once every pending module is applied
    pub fn target_revision(&self) -> Option<Revision> {
        self.pending
            .last()
            .map(RevisionModule::to_revision)
            .or_else(|| self.initial_revision.clone())
    }
}

impl<C: ?Sized> DowngradePath<C> {
    pub fn is_noop(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<C: ?Sized> Clone for UpgradePath<C> {
    fn clone(&self) -> Self {
        Self {
            initial_revision: self.initial_revision.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<C: ?Sized> Clone for DowngradePath<C> {
    fn clone(&self) -> Self {
        Self {
            final_revision: self.final_revision.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<C: ?Sized> fmt::Debug for UpgradePath<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradePath")
            .field("initial_revision", &self.initial_revision)
            .field("pending", &self.pending)
            .finish()
    }
}

impl<C: ?Sized> fmt::Debug for DowngradePath<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DowngradePath")
            .field("final_revision", &self.final_revision)
            .field("pending", &self.pending)
            .finish()
    }
}

/// Plan an upgrade from `current` to the tip of `modules`
///
/// `modules` may be in any order; they are sorted against `current` first.
///
/// # Errors
///
/// - Any chain resolution error
/// - `NoUpgradePath` if `current.file` is not among `modules`
/// - `PreviousVersionMismatch` / `VersionMismatch` if the current module drifted
pub fn resolve_upgrade_path<C: ?Sized>(
    modules: Vec<RevisionModule<C>>,
    current: Option<&Revision>,
) -> Result<UpgradePath<C>, RevisionError> {
    let mut sorted = sort_and_verify_trusted(modules, current)?;

    let Some(current) = current else {
        return Ok(UpgradePath {
            initial_revision: None,
            pending: sorted,
        });
    };

    let position = sorted
        .iter()
        .position(|m| m.file() == current.file)
        .ok_or_else(|| RevisionError::NoUpgradePath {
            file: current.file.clone(),
        })?;
    verify(current, &sorted[position])?;

    Ok(UpgradePath {
        initial_revision: Some(current.clone()),
        pending: sorted.split_off(position + 1),
    })
}

/// Plan a one-step downgrade of `current`
///
/// # Errors
///
/// - Any chain resolution error
/// - `CurrentRevisionModuleNotFound` if `current.file` is not among `modules`
/// - `PreviousVersionMismatch` / `VersionMismatch` if the current module drifted
/// - `MissingRevisionDependency` if no module carries the current previous version
pub fn resolve_downgrade_path<C: ?Sized>(
    modules: Vec<RevisionModule<C>>,
    current: Option<&Revision>,
) -> Result<DowngradePath<C>, RevisionError> {
    let Some(current) = current else {
        return Ok(DowngradePath {
            final_revision: None,
            pending: Vec::new(),
        });
    };

    let sorted = sort_and_verify_trusted(modules, Some(current))?;

    let module = sorted
        .iter()
        .find(|m| m.file() == current.file)
        .ok_or_else(|| RevisionError::CurrentRevisionModuleNotFound {
            file: current.file.clone(),
        })?;
    verify(current, module)?;

    let final_revision = match module.previous_version() {
        None => None,
        Some(previous) => {
            let predecessor = sorted
                .iter()
                .find(|m| m.version() == previous)
                .ok_or_else(|| RevisionError::MissingRevisionDependency {
                    file: module.file().to_string(),
                    previous_version: previous.to_string(),
                })?;
            Some(predecessor.to_revision())
        }
    };

    Ok(DowngradePath {
        final_revision,
        pending: vec![module.clone()],
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::revision::module::fixtures::{chain, module};

    type Module = RevisionModule<()>;

    const FILES: [&str; 4] = [
        "001.revision.toml",
        "002.revision.toml",
        "003.revision.toml",
        "004.revision.toml",
    ];

    fn files(modules: &[Module]) -> Vec<&str> {
        modules.iter().map(RevisionModule::file).collect()
    }

    #[test]
    fn test_upgrade_from_base_is_whole_chain() {
        let modules: Vec<Module> = chain(&FILES);
        let mut reversed = modules.clone();
        reversed.reverse();

        let path = resolve_upgrade_path(reversed, None).unwrap();
        assert!(path.initial_revision.is_none());
        assert_eq!(files(&path.pending), FILES.to_vec());
        assert_eq!(
            path.target_revision().map(|r| r.file),
            Some("004.revision.toml".to_string())
        );
    }

    #[test]
    fn test_upgrade_of_empty_chain_is_noop() {
        let path = resolve_upgrade_path::<()>(Vec::new(), None).unwrap();
        assert!(path.is_noop());
        assert!(path.target_revision().is_none());
    }

    #[test]
    fn test_upgrade_from_each_revision_is_the_rest_of_the_chain() {
        let modules: Vec<Module> = chain(&FILES);
        for k in 0..modules.len() {
            let current = modules[k].to_revision();
            let path = resolve_upgrade_path(modules.clone(), Some(&current)).unwrap();

            assert_eq!(path.initial_revision.as_ref(), Some(&current));
            assert_eq!(files(&path.pending), FILES[k + 1..].to_vec());
        }
    }

    #[test]
    fn test_upgrade_at_tip_is_noop() {
        let modules: Vec<Module> = chain(&FILES);
        let tip = modules[3].to_revision();
        let path = resolve_upgrade_path(modules, Some(&tip)).unwrap();
        assert!(path.is_noop());
        assert_eq!(path.target_revision(), Some(tip));
    }

    #[test]
    fn test_upgrade_unknown_current_file() {
        let modules: Vec<Module> = chain(&FILES);
        let mut current = modules[1].to_revision();
        current.file = "gone.revision.toml".to_string();

        let err = resolve_upgrade_path(modules, Some(&current)).unwrap_err();
        assert!(matches!(err, RevisionError::NoUpgradePath { ref file } if file == "gone.revision.toml"));
    }

    #[test]
    fn test_upgrade_detects_drift_of_current() {
        let modules: Vec<Module> = chain(&FILES);
        let mut current = modules[1].to_revision();
        current.version = "recorded-before-edit".to_string();

        let err = resolve_upgrade_path(modules, Some(&current)).unwrap_err();
        assert!(matches!(err, RevisionError::VersionMismatch { .. }));
    }

    #[test]
    fn test_downgrade_from_base_is_noop() {
        let modules: Vec<Module> = chain(&FILES);
        let path = resolve_downgrade_path(modules, None).unwrap();
        assert!(path.is_noop());
        assert!(path.final_revision.is_none());
    }

    #[test]
    fn test_downgrade_of_root_reaches_base() {
        let modules: Vec<Module> = chain(&FILES);
        let root = modules[0].to_revision();
        let path = resolve_downgrade_path(modules, Some(&root)).unwrap();

        assert!(path.final_revision.is_none());
        assert_eq!(files(&path.pending), vec!["001.revision.toml"]);
    }

    #[test]
    fn test_downgrade_of_non_root_reaches_predecessor() {
        let modules: Vec<Module> = chain(&FILES);
        let current = modules[2].to_revision();
        let path = resolve_downgrade_path(modules.clone(), Some(&current)).unwrap();

        assert_eq!(path.final_revision, Some(modules[1].to_revision()));
        assert_eq!(files(&path.pending), vec!["003.revision.toml"]);
    }

    #[test]
    fn test_downgrade_unknown_current_file() {
        let modules: Vec<Module> = chain(&FILES);
        let mut current = modules[2].to_revision();
        current.file = "gone.revision.toml".to_string();

        let err = resolve_downgrade_path(modules, Some(&current)).unwrap_err();
        assert!(matches!(err, RevisionError::CurrentRevisionModuleNotFound { .. }));
    }

    #[test]
    fn test_downgrade_current_outside_loaded_chain() {
        let root: Module = module("001.revision.toml", None);
        let current = Revision::new("002.revision.toml", "v2", Some("v1".to_string()));
        let err = resolve_downgrade_path(vec![root], Some(&current)).unwrap_err();
        assert!(matches!(err, RevisionError::CurrentRevisionModuleNotFound { .. }));
    }

    #[test]
    fn test_upgrade_then_repeated_downgrade_walks_chain_back() {
        let modules: Vec<Module> = chain(&FILES);

        let upgrade = resolve_upgrade_path(modules.clone(), None).unwrap();
        let mut current = upgrade.target_revision();
        let mut reverted = Vec::new();

        while current.is_some() {
            let path = resolve_downgrade_path(modules.clone(), current.as_ref()).unwrap();
            reverted.push(path.pending[0].file().to_string());
            current = path.final_revision;
        }

        let mut expected: Vec<String> = FILES.iter().map(|f| f.to_string()).collect();
        expected.reverse();
        assert_eq!(reverted, expected);
    }
}
