//! Exclusive revision lock

use crate::revision::persistence::PersistenceFacade;
use crate::revision::RevisionError;

/// Lock guard that releases the exclusive lock when dropped
///
/// Call [`release`](Self::release) on the success path to see release errors; dropping
/// the guard releases on a best-effort basis, which covers early returns through `?`.
pub struct ExclusiveLock<'a, C: ?Sized> {
    facade: &'a dyn PersistenceFacade<C>,
    client: &'a C,
    released: bool,
}

impl<'a, C: ?Sized> ExclusiveLock<'a, C> {
    /// Acquire the facade's exclusive lock
    ///
    /// # Errors
    ///
    /// Whatever `acquire_exclusive_lock` returns, e.g. `LockUnavailable`.
    pub fn acquire(
        facade: &'a dyn PersistenceFacade<C>,
        client: &'a C,
    ) -> Result<Self, RevisionError> {
        facade.acquire_exclusive_lock(client)?;
        Ok(Self {
            facade,
            client,
            released: false,
        })
    }

    /// # Errors
    ///
    /// Whatever `release_exclusive_lock` returns.
    pub fn release(mut self) -> Result<(), RevisionError> {
        self.released = true;
        self.facade.release_exclusive_lock(self.client)
    }
}

impl<C: ?Sized> Drop for ExclusiveLock<'_, C> {
    fn drop(&mut self) {
        if !self.released {
            // Ignore errors during drop - we can't propagate them
            let _ = self.facade.release_exclusive_lock(self.client);
        }
    }
}
