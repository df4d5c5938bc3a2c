use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted value with read-write locking.
///
/// Clones share the same underlying value. A writer that panicked while
/// holding the lock does not poison readers: the guard is recovered and the
/// last written value is handed out, since every value stored here is
/// overwritten wholesale rather than mutated in steps.
///
/// # Examples
///
/// ```
/// use voxel_streamer::core::MtResource;
///
/// let counter = MtResource::new(0);
/// let shared = counter.clone();
///
/// std::thread::spawn(move || *shared.get_mut() += 1)
///     .join()
///     .unwrap();
///
/// assert_eq!(*counter.get(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync> MtResource<T> {
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Shared read access.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive write access.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the stored value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.get_mut(), value)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
