// Top-level run: pick the mode, wire registry, collectors and watcher, then render.

use crate::collector::{ContainerCollector, ContainerEntity, VolumeCollector, VolumeEntity};
use crate::config::AppConfig;
use crate::display::{DisplayLoop, DisplayOptions, StopReason, TerminalSink};
use crate::drivers::DriverTable;
use crate::engine::EngineClient;
use crate::error::MonitorError;
use crate::fleet::Fleet;
use crate::latch::FirstPaintLatch;
use crate::registry::{MonitoredEntity, Registry};
use crate::watcher::LifecycleWatcher;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What to monitor and how.
#[derive(Debug, Clone, Default)]
pub struct MonitorOptions {
    /// Explicit targets; empty means watch every container.
    pub containers: Vec<String>,
    /// Include non-running containers (watch-all mode).
    pub all: bool,
    /// Render one pass and exit.
    pub no_stream: bool,
    /// Show attached volume statistics instead of container metrics.
    pub volume: bool,
}

impl MonitorOptions {
    pub fn watch_all(&self) -> bool {
        self.containers.is_empty()
    }
}

pub struct Monitor {
    engine: Arc<dyn EngineClient>,
    options: MonitorOptions,
    config: AppConfig,
    drivers: Arc<DriverTable>,
}

impl Monitor {
    pub fn new(engine: Arc<dyn EngineClient>, options: MonitorOptions, config: AppConfig) -> Self {
        Self {
            engine,
            options,
            config,
            drivers: Arc::new(DriverTable::with_builtin()),
        }
    }

    pub fn with_drivers(mut self, drivers: DriverTable) -> Self {
        self.drivers = Arc::new(drivers);
        self
    }

    /// Run until a stop condition. Every collector is stopped before returning.
    pub async fn run<S: TerminalSink>(
        &self,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<StopReason, MonitorError> {
        let cancel = cancel.child_token();
        let result = if self.options.volume {
            self.run_volumes(sink, &cancel).await
        } else {
            self.run_containers(sink, &cancel).await
        };
        cancel.cancel();
        if let Ok(reason) = &result {
            info!(?reason, "monitor stopped");
        }
        result
    }

    async fn run_containers<S: TerminalSink>(
        &self,
        sink: S,
        cancel: &CancellationToken,
    ) -> Result<StopReason, MonitorError> {
        let continuous = !self.options.no_stream;
        let collector = ContainerCollector::new(
            self.engine.clone(),
            self.config.collector.clone(),
            continuous,
            cancel.clone(),
        );
        let fleet = Arc::new(Fleet::new(
            Arc::new(Registry::new()),
            FirstPaintLatch::new(),
            collector,
        ));
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let _watcher = if self.options.watch_all() {
            LifecycleWatcher::new(self.engine.clone(), fleet.clone(), self.options.all)
                .start(errors_tx, cancel.clone())
                .await
        } else {
            for name in &self.options.containers {
                fleet.admit(ContainerEntity::new(name.clone()));
            }
            drop(errors_tx);
            if let Err(e) = self.preflight(fleet.registry(), fleet.latch()).await {
                fleet.shutdown();
                return Err(e);
            }
            None
        };

        fleet.latch().wait().await;
        debug!(entities = fleet.registry().len(), "first results in, rendering");

        let mut display = DisplayLoop::new(
            fleet.registry().clone(),
            sink,
            DisplayOptions {
                interval: self.config.display.stats_interval(),
                continuous,
                watch_all: self.options.watch_all(),
            },
            errors_rx,
        )
        .with_remove_hook({
            let fleet = fleet.clone();
            move |entity| {
                fleet.forget(entity);
            }
        });
        let result = display.run(cancel).await;
        fleet.shutdown();
        result
    }

    async fn run_volumes<S: TerminalSink>(
        &self,
        mut sink: S,
        cancel: &CancellationToken,
    ) -> Result<StopReason, MonitorError> {
        if self.options.containers.is_empty() {
            sink.write_line("Please provide container name(s)")?;
            sink.flush()?;
            return Ok(StopReason::Empty);
        }

        let continuous = !self.options.no_stream;
        let collector = VolumeCollector::new(
            self.engine.clone(),
            self.drivers.clone(),
            self.config.collector.clone(),
            continuous,
            cancel.clone(),
        );
        let fleet = Arc::new(Fleet::new(
            Arc::new(Registry::new()),
            FirstPaintLatch::new(),
            collector,
        ));
        for name in &self.options.containers {
            fleet.admit(VolumeEntity::new(name.clone(), self.drivers.clone()));
        }
        if let Err(e) = self.preflight(fleet.registry(), fleet.latch()).await {
            fleet.shutdown();
            return Err(e);
        }
        fleet.latch().wait().await;

        // Nothing reports run-level errors in this mode.
        let (_, errors_rx) = mpsc::unbounded_channel();
        let mut display = DisplayLoop::new(
            fleet.registry().clone(),
            sink,
            DisplayOptions {
                interval: self.config.display.volume_interval(),
                continuous,
                watch_all: false,
            },
            errors_rx,
        )
        .with_remove_hook({
            let fleet = fleet.clone();
            move |entity| {
                fleet.forget(entity);
            }
        });
        let result = display.run(cancel).await;
        fleet.shutdown();
        result
    }

    /// Give explicitly named entities a short window to fail, then abort the run with
    /// every failure joined into one message.
    async fn preflight<T: MonitoredEntity>(
        &self,
        registry: &Registry<T>,
        latch: &FirstPaintLatch,
    ) -> Result<(), MonitorError> {
        latch.wait_for(self.config.preflight.probe_window()).await;
        let errs: Vec<String> = registry
            .snapshot()
            .iter()
            .filter_map(|e| e.last_error().map(|err| format!("{}: {}", e.key(), err)))
            .collect();
        if errs.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::Preflight(errs.join(", ")))
        }
    }
}
