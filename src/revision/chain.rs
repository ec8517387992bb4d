//! Chain resolution: ordering loaded modules root-to-tip and checking them against the
//! trusted, persisted revision

use crate::revision::{Revision, RevisionError, RevisionModule};
use std::collections::HashMap;

/// Order `modules` root-to-tip
///
/// # Errors
///
/// - `MissingRootRevision` if no module omits its previous version
/// - `AmbiguousRoot` if more than one does
/// - `DisjointChain` if the walk from the root does not reach every module (fork, cycle
///   or dangling link), naming the last file that was linked
pub fn sort_and_verify<C: ?Sized>(
    modules: Vec<RevisionModule<C>>,
) -> Result<Vec<RevisionModule<C>>, RevisionError> {
    let order = link(&modules)?;
    Ok(reorder(modules, &order))
}

/// [`sort_and_verify`], attributing a broken chain to content drift when possible
///
/// When a trusted revision exists and the chain is disjoint, the trusted module itself is
/// checked first: if it was edited, pending files still extend its old version and the
/// break is reported through [`verify`]. Otherwise the walk back from the trusted module
/// may reach a module whose declared previous version no longer belongs to any file. The
/// trusted version commits to that declaration, so the module at the head of the forward
/// walk changed after being applied: this is reported as `VersionMismatch` for that
/// module rather than as a disjoint chain.
///
/// # Errors
///
/// Same as [`sort_and_verify`], with the drift case above reported as `VersionMismatch`.
pub fn sort_and_verify_trusted<C: ?Sized>(
    modules: Vec<RevisionModule<C>>,
    trusted: Option<&Revision>,
) -> Result<Vec<RevisionModule<C>>, RevisionError> {
    match link(&modules) {
        Ok(order) => Ok(reorder(modules, &order)),
        Err(err @ RevisionError::DisjointChain { .. }) => match trusted {
            Some(trusted) => Err(attribute_drift(&modules, trusted).unwrap_or(err)),
            None => Err(err),
        },
        Err(err) => Err(err),
    }
}

/// Check an on-disk module against the revision persisted for it
///
/// The module's version was derived from the file content read when it was loaded, so an
/// edit since the revision was applied shows up as a different previous version or
/// version.
///
/// # Errors
///
/// `PreviousVersionMismatch` or `VersionMismatch` when the module drifted.
pub fn verify<C: ?Sized>(
    trusted: &Revision,
    untrusted: &RevisionModule<C>,
) -> Result<(), RevisionError> {
    if trusted.previous_version.as_deref() != untrusted.previous_version() {
        return Err(RevisionError::PreviousVersionMismatch {
            file: untrusted.file().to_string(),
            expected: trusted.previous_version.clone(),
            actual: untrusted.previous_version().map(str::to_string),
        });
    }

    if trusted.version != untrusted.version() {
        return Err(RevisionError::VersionMismatch {
            file: untrusted.file().to_string(),
            expected: trusted.version.clone(),
            actual: untrusted.version().to_string(),
        });
    }

    Ok(())
}

/// Indices of `modules` in chain order
fn link<C: ?Sized>(modules: &[RevisionModule<C>]) -> Result<Vec<usize>, RevisionError> {
    if modules.is_empty() {
        return Ok(Vec::new());
    }

    let mut root = None;
    let mut roots = Vec::new();
    let mut successors: HashMap<&str, usize> = HashMap::with_capacity(modules.len());

    for (index, module) in modules.iter().enumerate() {
        match module.previous_version() {
            None => {
                root = Some(index);
                roots.push(module.file().to_string());
            }
            Some(previous) => {
                successors.insert(previous, index);
            }
        }
    }

    let root = match (root, roots.len()) {
        (Some(root), 1) => root,
        (None, _) => return Err(RevisionError::MissingRootRevision),
        (Some(_), _) => {
            roots.sort();
            return Err(RevisionError::AmbiguousRoot { files: roots });
        }
    };

    let mut visited = vec![false; modules.len()];
    let mut order = Vec::with_capacity(modules.len());
    let mut current = root;
    visited[root] = true;
    order.push(root);

    while let Some(&next) = successors.get(modules[current].version()) {
        if visited[next] {
            break;
        }
        visited[next] = true;
        order.push(next);
        current = next;
    }

    if order.len() < modules.len() {
        return Err(RevisionError::DisjointChain {
            file: modules[current].file().to_string(),
        });
    }

    Ok(order)
}

fn reorder<C: ?Sized>(modules: Vec<RevisionModule<C>>, order: &[usize]) -> Vec<RevisionModule<C>> {
    let mut slots: Vec<Option<RevisionModule<C>>> = modules.into_iter().map(Some).collect();
    order.iter().filter_map(|&index| slots[index].take()).collect()
}

/// `VersionMismatch` for the forward walk's last module if the trusted chain shows it drifted
fn attribute_drift<C: ?Sized>(
    modules: &[RevisionModule<C>],
    trusted: &Revision,
) -> Option<RevisionError> {
    let by_version: HashMap<&str, &RevisionModule<C>> =
        modules.iter().map(|m| (m.version(), m)).collect();
    let successors: HashMap<&str, &RevisionModule<C>> = modules
        .iter()
        .filter_map(|m| m.previous_version().map(|previous| (previous, m)))
        .collect();

    let mut module = modules.iter().find(|m| m.file() == trusted.file)?;
    if let Err(drift) = verify(trusted, module) {
        return Some(drift);
    }

    // Walk back from the trusted module to the first declaration nobody satisfies
    let mut steps = 0;
    let dangling = loop {
        let previous = module.previous_version()?;
        match by_version.get(previous) {
            Some(&found) if steps < modules.len() => {
                module = found;
                steps += 1;
            }
            Some(_) => return None,
            None => break previous,
        }
    };

    // Forward walk from the root to its last linked module
    let mut anchor = modules.iter().find(|m| m.is_root())?;
    let mut steps = 0;
    while let Some(&next) = successors.get(anchor.version()) {
        if steps >= modules.len() {
            return None;
        }
        anchor = next;
        steps += 1;
    }

    Some(RevisionError::VersionMismatch {
        file: anchor.file().to_string(),
        expected: dangling.to_string(),
        actual: anchor.version().to_string(),
    })
}
