use super::VolumeDriver;
use crate::models::StatMap;
use async_trait::async_trait;

/// (column, driver key) pairs published by the vSphere (vmdk) volume plugin.
const COLUMNS: [(&str, &str); 12] = [
    ("AvgRdsPerSec", "avgRd/s"),
    ("AvgWrsPerSec", "avgWr/s"),
    ("AvgInProgRds", "avgInProgRds"),
    ("AvgInProgWrs", "avgInProgWrs"),
    ("AvgRdLat(ms)", "avgRdLat(ms)"),
    ("AvgWrLat(ms)", "avgWrLat(ms)"),
    ("AvgRdReqSz(B)", "avgRdRqSz(bytes)"),
    ("AvgWrReqSz(B)", "avgWrRqSz(bytes)"),
    ("RdLatency(µs)", "rdLat(µs)"),
    ("WrLatency(µs)", "wrLat(µs)"),
    ("RdRate", "volRdRate(KBps)"),
    ("WrRate", "volWrRate(KBps)"),
];

pub struct VmdkDriver;

#[async_trait]
impl VolumeDriver for VmdkDriver {
    fn name(&self) -> &str {
        "vmdk"
    }

    fn format(&self, stats: &StatMap) -> Vec<(String, String)> {
        if stats.is_empty() {
            return Vec::new();
        }
        COLUMNS
            .iter()
            .map(|(column, key)| {
                let value = stats.get(*key).cloned().unwrap_or_else(|| "--".to_string());
                (column.to_string(), value)
            })
            .collect()
    }
}
