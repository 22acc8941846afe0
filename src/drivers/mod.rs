// Volume driver strategies: how to collect and lay out one driver's I/O statistics.

mod vmdk;

pub use vmdk::VmdkDriver;

use crate::engine::EngineClient;
use crate::error::EngineError;
use crate::models::StatMap;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Status key under which volume drivers publish I/O statistics.
pub const IOSTATS_KEY: &str = "iostats";

#[async_trait]
pub trait VolumeDriver: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the latest statistics for `volume`. A status document without a
    /// usable `iostats` map is an empty map, not an error.
    async fn collect(&self, engine: &dyn EngineClient, volume: &str) -> Result<StatMap, EngineError> {
        let status = engine.inspect_volume(volume).await?;
        Ok(iostats(&status.status))
    }

    /// (column, value) pairs in display order. The default prints sorted keys as-is.
    fn format(&self, stats: &StatMap) -> Vec<(String, String)> {
        stats.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Drivers without a dedicated strategy.
pub struct DefaultDriver;

#[async_trait]
impl VolumeDriver for DefaultDriver {
    fn name(&self) -> &str {
        "default"
    }
}

/// Driver name -> strategy, handed to the volume collector at construction.
pub struct DriverTable {
    drivers: HashMap<String, Arc<dyn VolumeDriver>>,
    fallback: Arc<dyn VolumeDriver>,
}

impl DriverTable {
    /// Only the default strategy.
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
            fallback: Arc::new(DefaultDriver),
        }
    }

    /// Default strategy plus the drivers with known statistic vocabularies.
    pub fn with_builtin() -> Self {
        Self::new().register(Arc::new(VmdkDriver))
    }

    pub fn register(mut self, driver: Arc<dyn VolumeDriver>) -> Self {
        self.drivers.insert(driver.name().to_string(), driver);
        self
    }

    pub fn get(&self, driver_name: &str) -> Arc<dyn VolumeDriver> {
        self.drivers
            .get(driver_name)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for DriverTable {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Extract the `iostats` sub-map; absent or non-object means no statistics.
pub fn iostats(status: &Map<String, Value>) -> StatMap {
    match status.get(IOSTATS_KEY) {
        Some(Value::Object(stats)) => stats
            .iter()
            .map(|(k, v)| (k.clone(), stat_value(v)))
            .collect(),
        _ => StatMap::new(),
    }
}

fn stat_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "--".to_string(),
        other => other.to_string(),
    }
}
