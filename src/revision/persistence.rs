//! Persistence facade: where the current revision of each namespace lives
//!
//! The engine never branches on the storage backend; it only talks to this trait.
//! Backends shipped with the crate:
//!
//! - [`PostgresPersistence`](crate::revision::PostgresPersistence): a state table in PostgreSQL
//! - [`MemoryPersistence`](crate::revision::MemoryPersistence): an in-process map

use crate::revision::{Revision, RevisionError};

/// Storage of the current revision per namespace, used from inside a transaction
///
/// Every method receives the transactional client `C` the surrounding
/// [`ConnectionManager`](crate::connection::ConnectionManager) handed out, so all reads
/// and writes of one upgrade or downgrade commit or roll back together.
pub trait PersistenceFacade<C: ?Sized>: Send + Sync {
    /// Create whatever storage the backend needs (idempotent)
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn initialize(&self, client: &C) -> Result<(), RevisionError>;

    /// Block other writers until released or until the transaction ends
    ///
    /// # Errors
    ///
    /// `LockUnavailable` or a backend failure.
    fn acquire_exclusive_lock(&self, client: &C) -> Result<(), RevisionError>;

    /// # Errors
    ///
    /// Backend failure.
    fn release_exclusive_lock(&self, client: &C) -> Result<(), RevisionError>;

    /// The current revision of `namespace`, `None` at base
    ///
    /// # Errors
    ///
    /// `MultipleRevisionsFound` if the backend holds more than one record for the
    /// namespace, or a backend failure.
    fn fetch_current_revision(
        &self,
        client: &C,
        namespace: &str,
    ) -> Result<Option<Revision>, RevisionError>;

    /// Make `revision` the current revision of `namespace` (upsert)
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn set_current_revision(
        &self,
        client: &C,
        namespace: &str,
        revision: &Revision,
    ) -> Result<(), RevisionError>;

    /// Forget `namespace`, returning it to base
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn remove_namespace(&self, client: &C, namespace: &str) -> Result<(), RevisionError>;
}
