//! In-memory backend: persistence facade and connection manager
//!
//! Used by tests and by applications that keep revision state in process. Transactions
//! are emulated by snapshotting the state before the callback and restoring it when the
//! callback fails.

use crate::connection::ConnectionManager;
use crate::revision::persistence::PersistenceFacade;
use crate::revision::{Revision, RevisionError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    revisions: HashMap<String, Revision>,
    initialized: bool,
    locked: bool,
}

/// Opaque copy of a [`MemoryPersistence`] state
#[derive(Debug, Clone)]
pub struct MemorySnapshot(MemoryState);

/// [`PersistenceFacade`] backed by a mutex-protected map
///
/// Works with any client type; the client argument is ignored.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    state: Mutex<MemoryState>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RevisionError> {
        self.state.lock().map_err(poison_err)
    }

    /// # Errors
    ///
    /// `StatePoisoned` if a holder of the state panicked.
    pub fn snapshot(&self) -> Result<MemorySnapshot, RevisionError> {
        Ok(MemorySnapshot(self.state()?.clone()))
    }

    /// # Errors
    ///
    /// `StatePoisoned` if a holder of the state panicked.
    pub fn restore(&self, snapshot: MemorySnapshot) -> Result<(), RevisionError> {
        *self.state()? = snapshot.0;
        Ok(())
    }

    pub fn is_initialized(&self) -> Result<bool, RevisionError> {
        Ok(self.state()?.initialized)
    }

    pub fn is_locked(&self) -> Result<bool, RevisionError> {
        Ok(self.state()?.locked)
    }

    /// Current revision of `namespace` without going through a client
    ///
    /// # Errors
    ///
    /// `StatePoisoned` if a holder of the state panicked.
    pub fn current(&self, namespace: &str) -> Result<Option<Revision>, RevisionError> {
        Ok(self.state()?.revisions.get(namespace).cloned())
    }
}

fn poison_err<T>(_: PoisonError<T>) -> RevisionError {
    RevisionError::StatePoisoned
}

impl<C: ?Sized> PersistenceFacade<C> for MemoryPersistence {
    fn initialize(&self, _client: &C) -> Result<(), RevisionError> {
        self.state()?.initialized = true;
        Ok(())
    }

    fn acquire_exclusive_lock(&self, _client: &C) -> Result<(), RevisionError> {
        let mut state = self.state()?;
        if state.locked {
            return Err(RevisionError::LockUnavailable);
        }
        state.locked = true;
        Ok(())
    }

    fn release_exclusive_lock(&self, _client: &C) -> Result<(), RevisionError> {
        self.state()?.locked = false;
        Ok(())
    }

    fn fetch_current_revision(
        &self,
        _client: &C,
        namespace: &str,
    ) -> Result<Option<Revision>, RevisionError> {
        self.current(namespace)
    }

    fn set_current_revision(
        &self,
        _client: &C,
        namespace: &str,
        revision: &Revision,
    ) -> Result<(), RevisionError> {
        let now = Utc::now();
        let mut state = self.state()?;
        let created_at = state
            .revisions
            .get(namespace)
            .and_then(|existing| existing.created_at)
            .unwrap_or(now);

        state.revisions.insert(
            namespace.to_string(),
            Revision {
                created_at: Some(created_at),
                updated_at: Some(now),
                ..revision.clone()
            },
        );
        Ok(())
    }

    fn remove_namespace(&self, _client: &C, namespace: &str) -> Result<(), RevisionError> {
        self.state()?.revisions.remove(namespace);
        Ok(())
    }
}

/// [`ConnectionManager`] handing out a fixed client over [`MemoryPersistence`]
///
/// A failed callback restores the persistence state captured when the transaction began.
/// Side effects the callback had on the client itself are not undone.
#[derive(Debug)]
pub struct MemoryConnectionManager<C> {
    client: C,
    persistence: Arc<MemoryPersistence>,
    closed: AtomicBool,
}

impl<C> MemoryConnectionManager<C> {
    pub fn new(client: C, persistence: Arc<MemoryPersistence>) -> Self {
        Self {
            client,
            persistence,
            closed: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn persistence(&self) -> &Arc<MemoryPersistence> {
        &self.persistence
    }

    fn ensure_open(&self) -> Result<(), RevisionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RevisionError::ConnectionClosed);
        }
        Ok(())
    }
}

impl<C> ConnectionManager for MemoryConnectionManager<C> {
    type Client = C;

    fn transaction<T, F>(&self, callback: F) -> Result<T, RevisionError>
    where
        F: FnOnce(&Self::Client) -> Result<T, RevisionError>,
    {
        self.ensure_open()?;
        let snapshot = self.persistence.snapshot()?;

        match callback(&self.client) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.persistence.restore(snapshot)?;
                Err(err)
            }
        }
    }

    fn shutdown(&self) -> Result<(), RevisionError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn ping(&self) -> Result<(), RevisionError> {
        self.ensure_open()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn revision(file: &str, version: &str) -> Revision {
        Revision::new(file, version, None)
    }

    #[test]
    fn test_set_fetch_remove() {
        let persistence = MemoryPersistence::new();
        assert_eq!(persistence.fetch_current_revision(&(), "default").unwrap(), None);

        persistence
            .set_current_revision(&(), "default", &revision("001.revision.toml", "v1"))
            .unwrap();
        let stored = persistence.fetch_current_revision(&(), "default").unwrap().unwrap();
        assert_eq!(stored.version, "v1");
        assert!(stored.created_at.is_some());
        assert_eq!(persistence.fetch_current_revision(&(), "other").unwrap(), None);

        persistence.remove_namespace(&(), "default").unwrap();
        assert_eq!(persistence.current("default").unwrap(), None);
    }

    #[test]
    fn test_upsert_keeps_created_at() {
        let persistence = MemoryPersistence::new();
        persistence
            .set_current_revision(&(), "default", &revision("001.revision.toml", "v1"))
            .unwrap();
        let first = persistence.current("default").unwrap().unwrap();

        persistence
            .set_current_revision(&(), "default", &revision("002.revision.toml", "v2"))
            .unwrap();
        let second = persistence.current("default").unwrap().unwrap();

        assert_eq!(second.file, "002.revision.toml");
        assert_eq!(second.created_at, first.created_at);
    }

    #[test]
    fn test_lock_contention() {
        let persistence = MemoryPersistence::new();
        PersistenceFacade::<()>::acquire_exclusive_lock(&persistence, &()).unwrap();
        let err = PersistenceFacade::<()>::acquire_exclusive_lock(&persistence, &()).unwrap_err();
        assert!(matches!(err, RevisionError::LockUnavailable));

        PersistenceFacade::<()>::release_exclusive_lock(&persistence, &()).unwrap();
        PersistenceFacade::<()>::acquire_exclusive_lock(&persistence, &()).unwrap();
    }

    #[test]
    fn test_failed_transaction_restores_state() {
        let persistence = Arc::new(MemoryPersistence::new());
        let manager = MemoryConnectionManager::new((), Arc::clone(&persistence));

        manager
            .transaction(|client| {
                persistence.set_current_revision(client, "default", &revision("a", "v1"))
            })
            .unwrap();

        let result: Result<(), RevisionError> = manager.transaction(|client| {
            persistence.acquire_exclusive_lock(client)?;
            persistence.set_current_revision(client, "default", &revision("b", "v2"))?;
            Err(RevisionError::MissingRootRevision)
        });

        assert!(matches!(result, Err(RevisionError::MissingRootRevision)));
        assert_eq!(persistence.current("default").unwrap().unwrap().version, "v1");
        assert!(!persistence.is_locked().unwrap());
    }

    #[test]
    fn test_poisoned_state_is_an_error() {
        let persistence = Arc::new(MemoryPersistence::new());
        let writer = Arc::clone(&persistence);
        let _ = std::thread::spawn(move || {
            let _guard = writer.state.lock().unwrap();
            panic!("writer crashed while holding the state");
        })
        .join();

        let err =
            PersistenceFacade::<()>::fetch_current_revision(persistence.as_ref(), &(), "default")
                .unwrap_err();
        assert!(matches!(err, RevisionError::StatePoisoned));

        let manager = MemoryConnectionManager::new((), Arc::clone(&persistence));
        let result = manager.transaction(|_| Ok(()));
        assert!(matches!(result, Err(RevisionError::StatePoisoned)));
    }

    #[test]
    fn test_shutdown_closes_manager() {
        let manager = MemoryConnectionManager::new((), Arc::new(MemoryPersistence::new()));
        manager.ping().unwrap();
        manager.shutdown().unwrap();

        assert!(matches!(manager.ping(), Err(RevisionError::ConnectionClosed)));
        let result = manager.transaction(|_| Ok(()));
        assert!(matches!(result, Err(RevisionError::ConnectionClosed)));
    }
}
