// Pairs registry admission with collector spawning.

use crate::latch::{FirstPaintLatch, FirstResult};
use crate::registry::{MonitoredEntity, Registry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

/// Starts the background task that keeps one entity's record current.
pub trait Collector<T>: Send + Sync + 'static {
    fn spawn(&self, entity: Arc<T>, first: FirstResult) -> JoinHandle<()>;
}

/// Admits entities into the registry and runs exactly one collector per admitted key.
pub struct Fleet<T, C> {
    registry: Arc<Registry<T>>,
    latch: Arc<FirstPaintLatch>,
    collector: C,
    tasks: Mutex<HashMap<String, AbortHandle>>,
}

impl<T: MonitoredEntity, C: Collector<T>> Fleet<T, C> {
    pub fn new(registry: Arc<Registry<T>>, latch: Arc<FirstPaintLatch>, collector: C) -> Self {
        Self {
            registry,
            latch,
            collector,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Add `entity` and start its collector. A key that is already monitored is left
    /// alone, so overlapping discovery paths never double-subscribe.
    pub fn admit(&self, entity: T) -> bool {
        let entity = Arc::new(entity);
        let key = entity.key().to_string();
        let mut tasks = self.tasks();
        if !self.registry.add(entity.clone()) {
            return false;
        }
        debug!(key = %key, "monitoring");
        let handle = self.collector.spawn(entity, self.latch.register());
        tasks.insert(key, handle.abort_handle());
        true
    }

    /// Remove `key` and stop its collector. Absent keys are a no-op.
    pub fn evict(&self, key: &str) -> bool {
        let mut tasks = self.tasks();
        if let Some(handle) = tasks.remove(key) {
            handle.abort();
        }
        let removed = self.registry.remove(key);
        if removed {
            debug!(key = %key, "no longer monitoring");
        }
        removed
    }

    /// Drop an entity whose collector has already finished. Only this exact handle is
    /// removed; a newer entity re-admitted under the same key keeps its row and task.
    pub fn forget(&self, entity: &Arc<T>) -> bool {
        let mut tasks = self.tasks();
        if !self.registry.remove_entry(entity) {
            return false;
        }
        tasks.remove(entity.key());
        debug!(key = %entity.key(), "no longer monitoring");
        true
    }

    /// Stop every collector; the registry keeps its last state.
    pub fn shutdown(&self) {
        for (_, handle) in self.tasks().drain() {
            handle.abort();
        }
    }

    pub fn registry(&self) -> &Arc<Registry<T>> {
        &self.registry
    }

    pub fn latch(&self) -> &Arc<FirstPaintLatch> {
        &self.latch
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, AbortHandle>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Frame;
    use crate::error::EntityError;

    struct Ended(String);

    impl MonitoredEntity for Ended {
        fn key(&self) -> &str {
            &self.0
        }

        fn last_error(&self) -> Option<EntityError> {
            Some(EntityError::EndOfStream)
        }

        fn render(&self, _frame: &mut Frame) -> Option<EntityError> {
            self.last_error()
        }
    }

    /// Collector whose stream ends straight away.
    struct Finishes;

    impl Collector<Ended> for Finishes {
        fn spawn(&self, _entity: Arc<Ended>, first: FirstResult) -> JoinHandle<()> {
            tokio::spawn(async move { drop(first) })
        }
    }

    fn fleet() -> Fleet<Ended, Finishes> {
        Fleet::new(Arc::new(Registry::new()), FirstPaintLatch::new(), Finishes)
    }

    #[tokio::test]
    async fn forget_clears_registry_and_task_map() {
        let fleet = fleet();
        for i in 0..100 {
            assert!(fleet.admit(Ended(format!("c{}", i))));
        }
        fleet.latch().wait().await;
        for entity in fleet.registry().snapshot() {
            assert!(fleet.forget(&entity));
        }
        assert!(fleet.registry().is_empty());
        assert!(fleet.tasks().is_empty());
    }

    #[tokio::test]
    async fn forget_of_stale_handle_keeps_readmitted_entity() {
        let fleet = fleet();
        fleet.admit(Ended("a".into()));
        let stale = fleet.registry().snapshot().remove(0);
        assert!(fleet.evict("a"));
        assert!(fleet.admit(Ended("a".into())));

        assert!(!fleet.forget(&stale));
        assert_eq!(fleet.registry().keys(), vec!["a"]);
        assert!(fleet.tasks().contains_key("a"));
    }

    #[tokio::test]
    async fn evict_of_absent_key_is_a_no_op() {
        let fleet = fleet();
        assert!(!fleet.evict("missing"));
        assert!(fleet.tasks().is_empty());
    }
}
