// Domain models

mod container;
mod event;
mod volume;

pub use container::{ContainerMetrics, ContainerSummary, VolumeMount};
pub use event::{LifecycleAction, LifecycleEvent};
pub use volume::{StatMap, VolumeStatus, VolumeUsage};

/// Length of the short container id used as a registry key.
pub const SHORT_ID_LEN: usize = 12;

/// Truncate a full container id to its display/registry key.
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}
