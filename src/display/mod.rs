// Fixed-cadence renderer over the registry.

mod table;
mod terminal;
pub mod units;

pub use table::{fixed_cells, truncate};
pub use terminal::{AnsiTerminal, CaptureSink, TerminalSink};

use crate::error::{EngineError, MonitorError};
use crate::registry::{MonitoredEntity, Registry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

enum Row {
    Cells(Vec<String>),
    Line(String),
}

/// One rendering pass: an optional tab-aligned header, then rows in entity order.
pub struct Frame {
    header: Option<Vec<String>>,
    rows: Vec<Row>,
}

impl Frame {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: (!header.is_empty()).then(|| header.iter().map(|h| h.to_string()).collect()),
            rows: Vec::new(),
        }
    }

    /// A table row, aligned with the header and the other table rows.
    pub fn push_cells(&mut self, cells: Vec<String>) {
        self.rows.push(Row::Cells(cells));
    }

    /// A free-form line, written as-is.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.rows.push(Row::Line(line.into()));
    }

    pub fn lines(&self) -> Vec<String> {
        let table: Vec<Vec<String>> = self
            .header
            .iter()
            .cloned()
            .chain(self.rows.iter().filter_map(|r| match r {
                Row::Cells(c) => Some(c.clone()),
                Row::Line(_) => None,
            }))
            .collect();
        let mut aligned = table::align(&table).into_iter();

        let mut out = Vec::with_capacity(self.rows.len() + 2);
        if self.header.is_some() {
            out.push(String::new());
            out.extend(aligned.next());
        }
        for row in &self.rows {
            match row {
                Row::Cells(_) => out.extend(aligned.next()),
                Row::Line(l) => out.push(l.clone()),
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub interval: Duration,
    /// Streaming mode: clear the screen per frame and keep going. Off for `--no-stream`.
    pub continuous: bool,
    /// Discovery mode: an empty registry is not a reason to stop.
    pub watch_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every explicitly named entity is gone.
    Empty,
    /// The single pass of a `--no-stream` run is done.
    SingleShot,
    /// The daemon connection dropped; treated as a clean stop.
    Disconnected,
    Cancelled,
}

/// Called for each entity whose stream ended, after the pass that showed it.
pub type RemoveHook<T> = Box<dyn Fn(&Arc<T>) + Send>;

pub struct DisplayLoop<T, S> {
    registry: Arc<Registry<T>>,
    sink: S,
    options: DisplayOptions,
    errors: mpsc::UnboundedReceiver<EngineError>,
    on_removed: RemoveHook<T>,
}

impl<T: MonitoredEntity, S: TerminalSink> DisplayLoop<T, S> {
    pub fn new(
        registry: Arc<Registry<T>>,
        sink: S,
        options: DisplayOptions,
        errors: mpsc::UnboundedReceiver<EngineError>,
    ) -> Self {
        let on_removed: RemoveHook<T> = {
            let registry = registry.clone();
            Box::new(move |entity| {
                registry.remove_entry(entity);
            })
        };
        Self {
            registry,
            sink,
            options,
            errors,
            on_removed,
        }
    }

    /// Route end-of-stream removals somewhere other than the bare registry, e.g. a
    /// fleet that also tracks the collector task.
    pub fn with_remove_hook(mut self, hook: impl Fn(&Arc<T>) + Send + 'static) -> Self {
        self.on_removed = Box::new(hook);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<StopReason, MonitorError> {
        let mut tick = interval(self.options.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = cancel.cancelled() => return Ok(StopReason::Cancelled),
            }
            self.render_pass()?;
            if let Some(stop) = self.check_stop() {
                return Ok(stop);
            }
            if let Some(stop) = self.drain_error()? {
                return Ok(stop);
            }
        }
    }

    /// Render every entity once and drop those whose stream has ended.
    pub fn render_pass(&mut self) -> std::io::Result<()> {
        if self.options.continuous {
            self.sink.clear_screen()?;
        }

        let mut frame = Frame::new(T::HEADER);
        let mut ended = Vec::new();
        for entity in self.registry.snapshot() {
            if let Some(err) = entity.render(&mut frame)
                && self.options.continuous
            {
                tracing::debug!(key = %entity.key(), error = %err, "stats: got error");
                if err.is_end_of_stream() {
                    ended.push(entity);
                }
            }
        }

        for line in frame.lines() {
            self.sink.write_line(&line)?;
        }
        self.sink.flush()?;

        // By handle, not key: the key may have been re-admitted during the pass.
        for entity in &ended {
            (self.on_removed)(entity);
        }
        Ok(())
    }

    pub fn check_stop(&self) -> Option<StopReason> {
        if self.registry.is_empty() && !self.options.watch_all {
            return Some(StopReason::Empty);
        }
        if !self.options.continuous {
            return Some(StopReason::SingleShot);
        }
        None
    }

    /// Take at most one pending run-level error without blocking.
    fn drain_error(&mut self) -> Result<Option<StopReason>, MonitorError> {
        match self.errors.try_recv() {
            Ok(e) if e.is_disconnect() => Ok(Some(StopReason::Disconnected)),
            Ok(e) => Err(e.into()),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(None),
        }
    }
}
