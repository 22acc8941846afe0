// Engine API boundary consumed by the collectors and the lifecycle watcher

mod docker;

pub use docker::DockerEngine;

use crate::error::EngineError;
use crate::models::{ContainerSummary, LifecycleEvent, VolumeMount, VolumeStatus};
use async_trait::async_trait;
use bollard::models::ContainerStatsResponse;
use futures_util::stream::BoxStream;

/// Stats frames for one container. `None` from the stream is a normal end of data;
/// an `Err(EngineError::Decode)` item is recoverable and the stream may continue.
pub type MetricStream = BoxStream<'static, Result<ContainerStatsResponse, EngineError>>;

pub type LifecycleStream = BoxStream<'static, Result<LifecycleEvent, EngineError>>;

#[async_trait]
pub trait EngineClient: Send + Sync {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, EngineError>;

    /// Resolves once the subscription has been issued. Callers list containers only
    /// after this returns.
    async fn subscribe_events(&self) -> Result<LifecycleStream, EngineError>;

    /// Open the stats stream for `key`; `continuous = false` yields a single frame.
    async fn open_stats(&self, key: &str, continuous: bool) -> Result<MetricStream, EngineError>;

    async fn inspect_mounts(&self, key: &str) -> Result<Vec<VolumeMount>, EngineError>;

    async fn inspect_volume(&self, name: &str) -> Result<VolumeStatus, EngineError>;
}
