// Container resource usage models

/// One decoded stats reading for a container, normalised for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerMetrics {
    pub cpu_percent: f64,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    pub memory_percent: f64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub block_read_bytes: u64,
    pub block_write_bytes: u64,
    pub pids: u64,
}

/// Minimal listing entry for a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
}

/// A mounted volume as reported by container inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub volume_name: String,
    pub driver_name: String,
}
