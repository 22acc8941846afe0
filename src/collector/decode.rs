// Normalise a raw Docker stats frame into ContainerMetrics.

use crate::models::ContainerMetrics;
use bollard::models::{ContainerBlkioStats, ContainerCpuStats, ContainerStatsResponse};

/// Decode one frame. Missing sections read as zero; the CPU delta is taken against
/// the frame's own `precpu_stats`, which the daemon fills from the previous reading.
pub(crate) fn decode(s: &ContainerStatsResponse) -> ContainerMetrics {
    let memory_usage_bytes = s.memory_stats.as_ref().and_then(|m| m.usage).unwrap_or(0);
    let memory_limit_bytes = s.memory_stats.as_ref().and_then(|m| m.limit).unwrap_or(0);

    let (network_rx_bytes, network_tx_bytes) =
        s.networks.as_ref().map_or((0u64, 0u64), |n| {
            n.values().fold((0u64, 0u64), |(rx, tx), v| {
                (
                    rx.saturating_add(v.rx_bytes.unwrap_or(0)),
                    tx.saturating_add(v.tx_bytes.unwrap_or(0)),
                )
            })
        });

    let (block_read_bytes, block_write_bytes) = block_io(s.blkio_stats.as_ref());

    ContainerMetrics {
        cpu_percent: cpu_percent(s.cpu_stats.as_ref(), s.precpu_stats.as_ref()),
        memory_usage_bytes,
        memory_limit_bytes,
        memory_percent: memory_percent(memory_usage_bytes, memory_limit_bytes),
        network_rx_bytes,
        network_tx_bytes,
        block_read_bytes,
        block_write_bytes,
        pids: s.pids_stats.as_ref().and_then(|p| p.current).unwrap_or(0),
    }
}

fn cpu_percent(cpu: Option<&ContainerCpuStats>, precpu: Option<&ContainerCpuStats>) -> f64 {
    let total = |c: Option<&ContainerCpuStats>| {
        c.and_then(|c| c.cpu_usage.as_ref())
            .and_then(|u| u.total_usage)
            .unwrap_or(0)
    };
    let system = |c: Option<&ContainerCpuStats>| c.and_then(|c| c.system_cpu_usage).unwrap_or(0);

    let cpu_delta = total(cpu) as f64 - total(precpu) as f64;
    let system_delta = system(cpu) as f64 - system(precpu) as f64;
    compute_cpu_percent(cpu_delta, system_delta, online_cpus(cpu))
}

fn online_cpus(cpu: Option<&ContainerCpuStats>) -> u32 {
    let Some(cpu) = cpu else { return 1 };
    match cpu.online_cpus {
        Some(n) if n > 0 => n as u32,
        _ => cpu
            .cpu_usage
            .as_ref()
            .and_then(|u| u.percpu_usage.as_ref())
            .map(|p| p.len() as u32)
            .filter(|n| *n > 0)
            .unwrap_or(1),
    }
}

/// `(cpu_delta / system_delta) * n_cpus * 100`, 0 when either delta is not positive,
/// never above `100 * n_cpus`.
pub fn compute_cpu_percent(cpu_delta: f64, system_delta: f64, n_cpus: u32) -> f64 {
    if cpu_delta <= 0.0 || system_delta <= 0.0 {
        return 0.0;
    }
    let n = f64::from(n_cpus.max(1));
    ((cpu_delta / system_delta) * n * 100.0).min(100.0 * n)
}

pub fn memory_percent(usage: u64, limit: u64) -> f64 {
    // The limit is only 0 when the cgroup has not reported yet.
    if limit == 0 {
        return 0.0;
    }
    usage as f64 / limit as f64 * 100.0
}

fn block_io(blkio: Option<&ContainerBlkioStats>) -> (u64, u64) {
    let Some(entries) = blkio.and_then(|b| b.io_service_bytes_recursive.as_ref()) else {
        return (0, 0);
    };
    entries.iter().fold((0u64, 0u64), |(read, write), e| {
        let value = e.value.unwrap_or(0);
        match e.op.as_deref() {
            Some(op) if op.eq_ignore_ascii_case("read") => (read.saturating_add(value), write),
            Some(op) if op.eq_ignore_ascii_case("write") => (read, write.saturating_add(value)),
            _ => (read, write),
        }
    })
}
