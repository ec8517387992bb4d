//! Revision file discovery and loading

use crate::revision::chain::sort_and_verify;
use crate::revision::hash::{hash, HashAlgorithm};
use crate::revision::source::RevisionSource;
use crate::revision::{RevisionError, RevisionModule};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Pattern for `<anything>.revision.<ext>` over the given extensions
fn revision_file_regex(extensions: &[String]) -> Option<Regex> {
    if extensions.is_empty() {
        return None;
    }
    let alternatives = extensions
        .iter()
        .map(|ext| regex::escape(ext.trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"^.+\.revision\.({alternatives})$")).ok()
}

/// Whether `file_name` is a revision file for one of `extensions`
///
/// # Example
/// - `20240120120000_add_users.revision.toml` with `["toml"]` → `true`
/// - `.revision.toml` → `false` (no stem)
/// - `notes.toml` → `false`
pub fn is_revision_file(file_name: &str, extensions: &[String]) -> bool {
    revision_file_regex(extensions).is_some_and(|re| re.is_match(file_name))
}

/// Discover and parse every revision file in `directory`
///
/// Each matching file is read, hashed with `algorithm` and handed to `source`. The result
/// is ordered by file name for deterministic diagnostics only; chain order comes from
/// [`sort_and_verify`].
///
/// # Errors
///
/// Returns errors if:
/// - The directory doesn't exist (`DirectoryNotFound`) or isn't one (`NotADirectory`)
/// - A file can't be read (`Io`)
/// - The source rejects a file (`MalformedRevisionFile`)
pub fn discover<C: ?Sized>(
    directory: &Path,
    source: &dyn RevisionSource<C>,
    algorithm: HashAlgorithm,
) -> Result<Vec<RevisionModule<C>>, RevisionError> {
    if !directory.exists() {
        return Err(RevisionError::DirectoryNotFound(directory.to_path_buf()));
    }
    if !directory.is_dir() {
        return Err(RevisionError::NotADirectory(directory.to_path_buf()));
    }

    let Some(pattern) = revision_file_regex(&source.extensions()) else {
        return Ok(Vec::new());
    };

    let entries = fs::read_dir(directory).map_err(|e| RevisionError::io(directory, e))?;
    let mut modules = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| RevisionError::io(directory, e))?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !pattern.is_match(file_name) {
            continue;
        }

        let contents = fs::read(&path).map_err(|e| RevisionError::io(&path, e))?;
        let file_hash = hash(&contents, algorithm);
        let definition = source.load(&path, &contents)?;

        modules.push(RevisionModule::new(path, file_hash, definition, algorithm));
    }

    modules.sort_by(|a, b| a.file().cmp(b.file()));
    Ok(modules)
}

/// [`discover`] followed by [`sort_and_verify`]: the chain in root-to-tip order
///
/// An empty directory yields an empty chain.
///
/// # Errors
///
/// Any error of [`discover`] or [`sort_and_verify`].
pub fn load_directory<C: ?Sized>(
    directory: &Path,
    source: &dyn RevisionSource<C>,
    algorithm: HashAlgorithm,
) -> Result<Vec<RevisionModule<C>>, RevisionError> {
    sort_and_verify(discover(directory, source, algorithm)?)
}
