// Per-container stats collector and the record it publishes.

use super::decode::decode;
use crate::config::CollectorConfig;
use crate::display::Frame;
use crate::display::units::{bytes_size, human_size};
use crate::engine::{EngineClient, MetricStream};
use crate::error::EntityError;
use crate::fleet::Collector;
use crate::latch::FirstResult;
use crate::models::ContainerMetrics;
use crate::registry::MonitoredEntity;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const PLACEHOLDER: &str = "--";

/// Latest values for one container. Read and written only under the entity lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerRecord {
    pub metrics: ContainerMetrics,
    pub error: Option<EntityError>,
}

pub struct ContainerEntity {
    key: String,
    record: Mutex<ContainerRecord>,
}

impl ContainerEntity {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            record: Mutex::new(ContainerRecord::default()),
        }
    }

    /// Copy of the record taken under the lock.
    pub fn record(&self) -> ContainerRecord {
        self.lock().clone()
    }

    fn apply(&self, metrics: ContainerMetrics) {
        let mut record = self.lock();
        record.metrics = metrics;
        record.error = None;
    }

    fn fail(&self, error: EntityError) {
        self.lock().error = Some(error);
    }

    /// No frame arrived in time: zero everything rather than show stale numbers.
    fn mark_stale(&self) {
        let mut record = self.lock();
        record.metrics = ContainerMetrics::default();
        record.error = Some(EntityError::Timeout);
    }

    fn lock(&self) -> MutexGuard<'_, ContainerRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MonitoredEntity for ContainerEntity {
    const HEADER: &'static [&'static str] = &[
        "CONTAINER",
        "CPU %",
        "MEM USAGE / LIMIT",
        "MEM %",
        "NET I/O",
        "BLOCK I/O",
        "PIDS",
    ];

    fn key(&self) -> &str {
        &self.key
    }

    fn last_error(&self) -> Option<EntityError> {
        self.lock().error.clone()
    }

    fn render(&self, frame: &mut Frame) -> Option<EntityError> {
        let record = self.lock();
        if let Some(err) = &record.error {
            let pair = format!("{} / {}", PLACEHOLDER, PLACEHOLDER);
            frame.push_cells(vec![
                self.key.clone(),
                PLACEHOLDER.to_string(),
                pair.clone(),
                PLACEHOLDER.to_string(),
                pair.clone(),
                pair,
                PLACEHOLDER.to_string(),
            ]);
            return Some(err.clone());
        }

        let m = &record.metrics;
        frame.push_cells(vec![
            self.key.clone(),
            format!("{:.2}%", m.cpu_percent),
            format!(
                "{} / {}",
                bytes_size(m.memory_usage_bytes),
                bytes_size(m.memory_limit_bytes)
            ),
            format!("{:.2}%", m.memory_percent),
            format!(
                "{} / {}",
                human_size(m.network_rx_bytes),
                human_size(m.network_tx_bytes)
            ),
            format!(
                "{} / {}",
                human_size(m.block_read_bytes),
                human_size(m.block_write_bytes)
            ),
            m.pids.to_string(),
        ]);
        None
    }
}

/// Streams stats frames into a `ContainerEntity`.
#[derive(Clone)]
pub struct ContainerCollector {
    engine: Arc<dyn EngineClient>,
    config: CollectorConfig,
    continuous: bool,
    cancel: CancellationToken,
}

impl ContainerCollector {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        config: CollectorConfig,
        continuous: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            config,
            continuous,
            cancel,
        }
    }

    /// Collect until the stream ends, the run is cancelled, or (single-shot) the
    /// first result is in. `first` is released on the first snapshot or failure.
    pub async fn collect(&self, entity: Arc<ContainerEntity>, mut first: FirstResult) {
        let key = entity.key().to_string();
        debug!(key = %key, continuous = self.continuous, "collecting stats");

        let Some(mut stream) = self.open(&entity, &mut first).await else {
            return;
        };

        let timeout = self.config.stats_timeout();
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = tokio::time::timeout(timeout, stream.next()) => next,
            };
            match next {
                Err(_) => {
                    debug!(key = %key, "timeout waiting for stats");
                    entity.mark_stale();
                    first.release();
                    if !self.continuous {
                        break;
                    }
                }
                Ok(Some(Ok(frame))) => {
                    entity.apply(decode(&frame));
                    first.release();
                    if !self.continuous {
                        break;
                    }
                }
                Ok(Some(Err(e))) => {
                    debug!(key = %key, error = %e, "stats frame error");
                    entity.fail(e.into());
                    if !self.continuous {
                        break;
                    }
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.retry_backoff()) => {}
                    }
                }
                Ok(None) => {
                    debug!(key = %key, "stats stream ended");
                    entity.fail(EntityError::EndOfStream);
                    break;
                }
            }
        }
        // Dropping `first` releases the latch on any path that has not yet.
    }

    /// Open the stream, marking the row stale for every timeout window the open
    /// takes. `None` when the open failed or the run was cancelled.
    async fn open(&self, entity: &ContainerEntity, first: &mut FirstResult) -> Option<MetricStream> {
        let mut open = self.engine.open_stats(entity.key(), self.continuous);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                r = &mut open => match r {
                    Ok(stream) => return Some(stream),
                    Err(e) => {
                        debug!(key = %entity.key(), error = %e, "opening stats stream failed");
                        entity.fail(e.into());
                        first.release();
                        return None;
                    }
                },
                _ = tokio::time::sleep(self.config.stats_timeout()) => {
                    entity.mark_stale();
                    first.release();
                }
            }
        }
    }
}

impl Collector<ContainerEntity> for ContainerCollector {
    fn spawn(&self, entity: Arc<ContainerEntity>, first: FirstResult) -> JoinHandle<()> {
        let collector = self.clone();
        tokio::spawn(async move { collector.collect(entity, first).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_formats_metrics_row() {
        let e = ContainerEntity::new("a1b2c3d4e5f6");
        e.apply(ContainerMetrics {
            cpu_percent: 40.0,
            memory_usage_bytes: 256 * 1024 * 1024,
            memory_limit_bytes: 1024 * 1024 * 1024,
            memory_percent: 25.0,
            network_rx_bytes: 1500,
            network_tx_bytes: 0,
            block_read_bytes: 0,
            block_write_bytes: 2_000_000,
            pids: 4,
        });
        let mut frame = Frame::new(ContainerEntity::HEADER);
        assert!(e.render(&mut frame).is_none());
        let lines = frame.lines();
        let row: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(
            row,
            vec![
                "a1b2c3d4e5f6",
                "40.00%",
                "256MiB",
                "/",
                "1GiB",
                "25.00%",
                "1.5kB",
                "/",
                "0B",
                "0B",
                "/",
                "2MB",
                "4"
            ]
        );
    }

    #[test]
    fn render_on_error_keeps_key_and_dashes_numbers() {
        let e = ContainerEntity::new("web");
        e.apply(ContainerMetrics {
            cpu_percent: 12.0,
            ..Default::default()
        });
        e.fail(EntityError::EndOfStream);
        let mut frame = Frame::new(ContainerEntity::HEADER);
        assert_eq!(e.render(&mut frame), Some(EntityError::EndOfStream));
        let lines = frame.lines();
        assert!(lines[2].starts_with("web"));
        assert!(!lines[2].contains('%'));
        assert_eq!(lines[2].matches("--").count(), 9);
    }

    #[test]
    fn stale_mark_zeroes_metrics_and_next_snapshot_clears_error() {
        let e = ContainerEntity::new("web");
        e.apply(ContainerMetrics {
            cpu_percent: 12.0,
            pids: 3,
            ..Default::default()
        });
        e.mark_stale();
        let r = e.record();
        assert_eq!(r.metrics, ContainerMetrics::default());
        assert_eq!(r.error, Some(EntityError::Timeout));
        e.apply(ContainerMetrics::default());
        assert!(e.last_error().is_none());
    }
}
