// Insertion-ordered, de-duplicating set of monitored entities

use crate::display::Frame;
use crate::error::EntityError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A monitored entity: a stable key plus a record guarded by the entity's own lock.
pub trait MonitoredEntity: Send + Sync + 'static {
    /// Table header shared by every row of this kind; empty for block layouts.
    const HEADER: &'static [&'static str] = &[];

    fn key(&self) -> &str;

    fn last_error(&self) -> Option<EntityError>;

    /// Append this entity's row(s) to `frame` under its own lock and return the error
    /// observed in the same critical section.
    fn render(&self, frame: &mut Frame) -> Option<EntityError>;
}

/// The single source of truth for what is currently monitored. The lock covers
/// membership only; entity records are never read or written under it.
pub struct Registry<T> {
    entries: Mutex<Vec<Arc<T>>>,
}

impl<T: MonitoredEntity> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append `entity` unless its key is already present. Returns whether it was added;
    /// the caller pairs a `true` with spawning the entity's collector.
    pub fn add(&self, entity: Arc<T>) -> bool {
        let mut entries = self.lock();
        if entries.iter().any(|e| e.key() == entity.key()) {
            return false;
        }
        entries.push(entity);
        true
    }

    /// Delete by key, keeping the order of the rest. Absent keys are a no-op.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|e| e.key() == key) {
            Some(i) => {
                entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Delete this exact handle. A different entity admitted under the same key since
    /// the handle was taken is left in place.
    pub fn remove_entry(&self, entity: &Arc<T>) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|e| Arc::ptr_eq(e, entity)) {
            Some(i) => {
                entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Handles in display order, for iterating without holding the registry lock.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.lock().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.key().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: MonitoredEntity> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
