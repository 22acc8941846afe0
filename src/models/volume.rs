// Volume I/O statistics models

use std::collections::BTreeMap;

/// Driver-reported statistic name -> value. Sorted so default rendering is stable.
pub type StatMap = BTreeMap<String, String>;

/// Latest statistics of one volume attached to a monitored container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeUsage {
    pub name: String,
    pub driver: String,
    /// Empty when the driver exposes no recognised statistics.
    pub stats: StatMap,
}

impl VolumeUsage {
    pub fn new(name: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: driver.into(),
            stats: StatMap::new(),
        }
    }
}

/// The driver's raw status document from a volume inspect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeStatus {
    pub status: serde_json::Map<String, serde_json::Value>,
}
