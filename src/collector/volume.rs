// Per-container volume statistics collector.

use crate::config::CollectorConfig;
use crate::display::{Frame, fixed_cells, truncate};
use crate::drivers::DriverTable;
use crate::engine::EngineClient;
use crate::error::{EngineError, EntityError};
use crate::fleet::Collector;
use crate::latch::FirstResult;
use crate::models::{StatMap, VolumeMount, VolumeUsage};
use crate::registry::MonitoredEntity;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Volume names are shown by this many leading characters.
const VOLUME_NAME_LEN: usize = 12;
const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeRecord {
    pub volumes: Vec<VolumeUsage>,
    pub error: Option<EntityError>,
}

/// A container whose attached volumes are monitored.
pub struct VolumeEntity {
    key: String,
    drivers: Arc<DriverTable>,
    record: Mutex<VolumeRecord>,
}

impl VolumeEntity {
    pub fn new(key: impl Into<String>, drivers: Arc<DriverTable>) -> Self {
        Self {
            key: key.into(),
            drivers,
            record: Mutex::new(VolumeRecord::default()),
        }
    }

    pub fn record(&self) -> VolumeRecord {
        self.lock().clone()
    }

    fn set_volumes(&self, mounts: &[VolumeMount]) {
        self.lock().volumes = mounts
            .iter()
            .map(|m| VolumeUsage::new(&m.volume_name, &m.driver_name))
            .collect();
    }

    /// `stats` is index-aligned with the discovered volumes.
    fn apply(&self, stats: Vec<StatMap>) {
        let mut record = self.lock();
        for (volume, stats) in record.volumes.iter_mut().zip(stats) {
            volume.stats = stats;
        }
        record.error = None;
    }

    fn fail(&self, error: EntityError) {
        self.lock().error = Some(error);
    }

    fn lock(&self) -> MutexGuard<'_, VolumeRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MonitoredEntity for VolumeEntity {
    fn key(&self) -> &str {
        &self.key
    }

    fn last_error(&self) -> Option<EntityError> {
        self.lock().error.clone()
    }

    fn render(&self, frame: &mut Frame) -> Option<EntityError> {
        let record = self.lock();
        if let Some(err) = &record.error {
            frame.push_line(format!("Container:{}", self.key));
            frame.push_line(format!("Volume:{}", PLACEHOLDER));
            frame.push_line(format!("Driver:{}", PLACEHOLDER));
            frame.push_line(fixed_cells(&[PLACEHOLDER]));
            return Some(err.clone());
        }

        for volume in &record.volumes {
            frame.push_line(format!("Container:{}", self.key));
            frame.push_line(format!("Volume:{}", truncate(&volume.name, VOLUME_NAME_LEN)));
            frame.push_line(format!("Driver:{}", volume.driver));
            let columns = self.drivers.get(&volume.driver).format(&volume.stats);
            if columns.is_empty() {
                frame.push_line(fixed_cells(&[PLACEHOLDER]));
                frame.push_line(fixed_cells(&[PLACEHOLDER]));
                continue;
            }
            let (names, values): (Vec<String>, Vec<String>) = columns.into_iter().unzip();
            frame.push_line(fixed_cells(&names));
            frame.push_line(fixed_cells(&values));
        }
        None
    }
}

/// Discovers a container's volumes once, then polls their driver statistics.
#[derive(Clone)]
pub struct VolumeCollector {
    engine: Arc<dyn EngineClient>,
    drivers: Arc<DriverTable>,
    config: CollectorConfig,
    continuous: bool,
    cancel: CancellationToken,
}

impl VolumeCollector {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        drivers: Arc<DriverTable>,
        config: CollectorConfig,
        continuous: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            drivers,
            config,
            continuous,
            cancel,
        }
    }

    /// Every engine call is bounded by the stats timeout: a call that overruns marks
    /// the entity timed out and releases `first`, so first paint never waits on a
    /// hung daemon or driver.
    pub async fn collect(&self, entity: Arc<VolumeEntity>, mut first: FirstResult) {
        let key = entity.key().to_string();
        debug!(key = %key, "collecting volume names");

        let Some(mounts) = self.discover(&entity, &mut first).await else {
            return;
        };
        entity.set_volumes(&mounts);

        let timeout = self.config.stats_timeout();
        loop {
            let polled = tokio::select! {
                _ = self.cancel.cancelled() => break,
                r = tokio::time::timeout(timeout, self.poll_once(&mounts)) => r,
            };
            match polled {
                Ok(Ok(stats)) => entity.apply(stats),
                Ok(Err(e)) => {
                    debug!(key = %key, error = %e, "volume stats failed");
                    entity.fail(e.into());
                }
                Err(_) => {
                    debug!(key = %key, "timeout waiting for volume stats");
                    entity.fail(EntityError::Timeout);
                }
            }
            first.release();
            if !self.continuous {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.volume_poll_interval()) => {}
            }
        }
    }

    /// Inspect the container's mounts, marking the entity timed out for every timeout
    /// window the call takes. `None` when inspection failed or the run was cancelled.
    async fn discover(
        &self,
        entity: &VolumeEntity,
        first: &mut FirstResult,
    ) -> Option<Vec<VolumeMount>> {
        let mut inspect = self.engine.inspect_mounts(entity.key());
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                r = &mut inspect => match r {
                    Ok(mounts) => return Some(mounts),
                    Err(e) => {
                        debug!(key = %entity.key(), error = %e, "inspecting container failed");
                        entity.fail(e.into());
                        first.release();
                        return None;
                    }
                },
                _ = tokio::time::sleep(self.config.stats_timeout()) => {
                    entity.fail(EntityError::Timeout);
                    first.release();
                }
            }
        }
    }

    async fn poll_once(&self, mounts: &[VolumeMount]) -> Result<Vec<StatMap>, EngineError> {
        let mut out = Vec::with_capacity(mounts.len());
        for m in mounts {
            let driver = self.drivers.get(&m.driver_name);
            out.push(driver.collect(self.engine.as_ref(), &m.volume_name).await?);
        }
        Ok(out)
    }
}

impl Collector<VolumeEntity> for VolumeCollector {
    fn spawn(&self, entity: Arc<VolumeEntity>, first: FirstResult) -> JoinHandle<()> {
        let collector = self.clone();
        tokio::spawn(async move { collector.collect(entity, first).await })
    }
}
