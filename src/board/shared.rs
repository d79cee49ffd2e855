use std::sync::{Arc, Mutex, PoisonError};

use super::cache::BoardCache;

/// Handle to the board cache shared between the view, the move
/// coordinator and the event loop.
///
/// Access goes through synchronous closures, so the lock can never be held
/// across an `.await`.
#[derive(Clone, Default)]
pub struct SharedBoard {
    inner: Arc<Mutex<BoardCache>>,
}

impl SharedBoard {
    pub fn new(cache: BoardCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Run `f` with exclusive access to the cache.
    pub fn with<R>(&self, f: impl FnOnce(&mut BoardCache) -> R) -> R {
        // Cache operations cannot leave it half-updated, so a poisoned lock
        // still guards a consistent value.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    pub fn read<R>(&self, f: impl FnOnce(&BoardCache) -> R) -> R {
        self.with(|cache| f(&*cache))
    }

    /// Copy of the current cache contents.
    pub fn snapshot(&self) -> BoardCache {
        self.read(BoardCache::clone)
    }
}
