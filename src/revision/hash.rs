//! Content hashing for revision files
//!
//! Every persisted version string is a digest produced here, so the default algorithm is
//! part of the on-disk/in-database compatibility contract.

use crate::revision::RevisionError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Hash algorithm used to derive file hashes and versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

/// Algorithm used when nothing is configured.
///
/// Compatibility-critical: switching it changes every version string, so every
/// namespace already recorded in a database would fail verification.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

impl HashAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(format!("unsupported hash algorithm: {other}")),
        }
    }
}

/// Hash `content` and return the lowercase hexadecimal digest
pub fn hash(content: impl AsRef<[u8]>, algorithm: HashAlgorithm) -> String {
    let content = content.as_ref();
    match algorithm {
        HashAlgorithm::Sha224 => format!("{:x}", Sha224::digest(content)),
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(content)),
        HashAlgorithm::Sha384 => format!("{:x}", Sha384::digest(content)),
        HashAlgorithm::Sha512 => format!("{:x}", Sha512::digest(content)),
    }
}

/// Hash the raw bytes of the file at `path`
///
/// # Errors
///
/// Returns `RevisionError::Io` if the file cannot be read.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<String, RevisionError> {
    let content = fs::read(path).map_err(|e| RevisionError::io(path, e))?;
    Ok(hash(content, algorithm))
}

/// Derive a chain version
///
/// The root's version is its file hash; every other version also commits to the version
/// it extends, so editing any revision changes the version of everything after it.
pub fn compute_version(
    previous_version: Option<&str>,
    file_hash: &str,
    algorithm: HashAlgorithm,
) -> String {
    match previous_version {
        None => file_hash.to_string(),
        Some(previous) => hash(format!("{file_hash}{previous}"), algorithm),
    }
}
