// Shared test helpers: a scripted engine and stats frame builders

#![allow(dead_code)]

use async_trait::async_trait;
use bollard::models::{
    ContainerCpuStats, ContainerCpuUsage, ContainerMemoryStats, ContainerPidsStats,
    ContainerStatsResponse,
};
use futures_util::{StreamExt, stream};
use statwatch::engine::{EngineClient, LifecycleStream, MetricStream};
use statwatch::error::EngineError;
use statwatch::models::{
    ContainerSummary, LifecycleAction, LifecycleEvent, VolumeMount, VolumeStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;

type Item = Result<ContainerStatsResponse, EngineError>;

enum StatsScript {
    /// Yield the items, then end (or stay open forever when `hang`).
    Frames { items: Vec<Item>, hang: bool },
    OpenError(EngineError),
    /// The open call itself never resolves.
    HangOpen,
}

/// In-memory engine. Unknown containers answer like the daemon does for a missing name.
pub struct FakeEngine {
    stats: Mutex<HashMap<String, StatsScript>>,
    opened: Mutex<Vec<String>>,
    containers: Mutex<Result<Vec<ContainerSummary>, EngineError>>,
    subscribe_error: Mutex<Option<EngineError>>,
    events_tx: mpsc::UnboundedSender<Result<LifecycleEvent, EngineError>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<Result<LifecycleEvent, EngineError>>>>,
    mounts: Mutex<HashMap<String, Vec<VolumeMount>>>,
    hung_mounts: Mutex<HashSet<String>>,
    volumes: Mutex<HashMap<String, VolumeStatus>>,
    hung_volumes: Mutex<HashSet<String>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            stats: Mutex::new(HashMap::new()),
            opened: Mutex::new(Vec::new()),
            containers: Mutex::new(Ok(Vec::new())),
            subscribe_error: Mutex::new(None),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            mounts: Mutex::new(HashMap::new()),
            hung_mounts: Mutex::new(HashSet::new()),
            volumes: Mutex::new(HashMap::new()),
            hung_volumes: Mutex::new(HashSet::new()),
        }
    }

    /// Stream `items` for `key`, then end.
    pub fn frames(self, key: &str, items: Vec<Item>) -> Self {
        self.script(key, StatsScript::Frames { items, hang: false })
    }

    /// Stream `items` for `key`, then go quiet without closing.
    pub fn frames_then_hang(self, key: &str, items: Vec<Item>) -> Self {
        self.script(key, StatsScript::Frames { items, hang: true })
    }

    pub fn open_error(self, key: &str, err: EngineError) -> Self {
        self.script(key, StatsScript::OpenError(err))
    }

    pub fn hang_open(self, key: &str) -> Self {
        self.script(key, StatsScript::HangOpen)
    }

    pub fn containers(self, ids: &[&str]) -> Self {
        *self.containers.lock().unwrap() = Ok(ids
            .iter()
            .map(|id| ContainerSummary { id: id.to_string() })
            .collect());
        self
    }

    pub fn list_error(self, err: EngineError) -> Self {
        *self.containers.lock().unwrap() = Err(err);
        self
    }

    pub fn subscribe_error(self, err: EngineError) -> Self {
        *self.subscribe_error.lock().unwrap() = Some(err);
        self
    }

    pub fn mounts(self, key: &str, mounts: &[(&str, &str)]) -> Self {
        self.mounts.lock().unwrap().insert(
            key.to_string(),
            mounts
                .iter()
                .map(|(volume, driver)| VolumeMount {
                    volume_name: volume.to_string(),
                    driver_name: driver.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn volume(self, name: &str, status: serde_json::Value) -> Self {
        let status = status["status"].as_object().cloned().unwrap_or_default();
        self.volumes
            .lock()
            .unwrap()
            .insert(name.to_string(), VolumeStatus { status });
        self
    }

    /// Inspecting `key`'s mounts never completes.
    pub fn hang_mounts(self, key: &str) -> Self {
        self.hung_mounts.lock().unwrap().insert(key.to_string());
        self
    }

    /// Inspecting volume `name` never completes.
    pub fn hang_volume(self, name: &str) -> Self {
        self.hung_volumes.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn send_event(&self, action: LifecycleAction, id: &str) {
        let _ = self.events_tx.send(Ok(LifecycleEvent {
            action,
            id: id.to_string(),
        }));
    }

    pub fn send_event_error(&self, err: EngineError) {
        let _ = self.events_tx.send(Err(err));
    }

    /// Keys passed to `open_stats`, in call order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    fn script(self, key: &str, script: StatsScript) -> Self {
        self.stats.lock().unwrap().insert(key.to_string(), script);
        self
    }
}

pub fn no_such_container(key: &str) -> EngineError {
    EngineError::Api {
        status: 404,
        message: format!("No such container: {}", key),
    }
}

#[async_trait]
impl EngineClient for FakeEngine {
    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerSummary>, EngineError> {
        self.containers.lock().unwrap().clone()
    }

    async fn subscribe_events(&self) -> Result<LifecycleStream, EngineError> {
        if let Some(err) = self.subscribe_error.lock().unwrap().clone() {
            return Err(err);
        }
        let rx = self
            .events_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribed twice");
        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }

    async fn open_stats(&self, key: &str, continuous: bool) -> Result<MetricStream, EngineError> {
        self.opened.lock().unwrap().push(key.to_string());
        let script = self.stats.lock().unwrap().remove(key);
        match script {
            None => Err(no_such_container(key)),
            Some(StatsScript::OpenError(err)) => Err(err),
            Some(StatsScript::HangOpen) => std::future::pending().await,
            Some(StatsScript::Frames { mut items, hang }) => {
                if !continuous {
                    items.truncate(1);
                }
                let frames = stream::iter(items);
                if hang {
                    Ok(frames.chain(stream::pending()).boxed())
                } else {
                    Ok(frames.boxed())
                }
            }
        }
    }

    async fn inspect_mounts(&self, key: &str) -> Result<Vec<VolumeMount>, EngineError> {
        let hung = self.hung_mounts.lock().unwrap().contains(key);
        if hung {
            return std::future::pending().await;
        }
        self.mounts
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| no_such_container(key))
    }

    async fn inspect_volume(&self, name: &str) -> Result<VolumeStatus, EngineError> {
        let hung = self.hung_volumes.lock().unwrap().contains(name);
        if hung {
            return std::future::pending().await;
        }
        self.volumes
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Api {
                status: 404,
                message: format!("get {}: no such volume", name),
            })
    }
}

fn cpu(total_usage: u64, system_cpu_usage: u64, online: u32) -> ContainerCpuStats {
    ContainerCpuStats {
        cpu_usage: Some(ContainerCpuUsage {
            total_usage: Some(total_usage),
            ..Default::default()
        }),
        system_cpu_usage: Some(system_cpu_usage),
        online_cpus: Some(online),
        throttling_data: None,
    }
}

/// A frame worth 40% CPU on 4 cores, 256MiB of 1GiB memory and `pids` processes.
pub fn busy_frame(pids: u64) -> Item {
    Ok(ContainerStatsResponse {
        cpu_stats: Some(cpu(1_200_000_000, 12_000_000_000, 4)),
        precpu_stats: Some(cpu(1_000_000_000, 10_000_000_000, 4)),
        memory_stats: Some(ContainerMemoryStats {
            usage: Some(256 * 1024 * 1024),
            limit: Some(1024 * 1024 * 1024),
            ..Default::default()
        }),
        pids_stats: Some(ContainerPidsStats {
            current: Some(pids),
            ..Default::default()
        }),
        ..Default::default()
    })
}

pub fn bad_frame() -> Item {
    Err(EngineError::Decode("expected value at line 1 column 1".into()))
}
