use serde::Deserialize;
use std::time::Duration;

/// Env var naming the config file; defaults to `statwatch.toml` in the working directory.
pub const CONFIG_ENV: &str = "STATWATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "statwatch.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub display: DisplayConfig,
    pub collector: CollectorConfig,
    pub preflight: PreflightConfig,
}

/// Render cadences: fast for container metrics, slower for volume statistics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub stats_interval_ms: u64,
    pub volume_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            stats_interval_ms: 500,
            volume_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// No frame within this window zeroes the row and marks it timed out.
    pub stats_timeout_ms: u64,
    /// Pause before decoding again after a bad frame.
    pub retry_backoff_ms: u64,
    pub volume_poll_interval_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            stats_timeout_ms: 2000,
            retry_backoff_ms: 100,
            volume_poll_interval_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    /// How long named containers get to report an error before the first render.
    pub probe_window_ms: u64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            probe_window_ms: 1500,
        }
    }
}

impl DisplayConfig {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub fn volume_interval(&self) -> Duration {
        Duration::from_millis(self.volume_interval_ms)
    }
}

impl CollectorConfig {
    pub fn stats_timeout(&self) -> Duration {
        Duration::from_millis(self.stats_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn volume_poll_interval(&self) -> Duration {
        Duration::from_millis(self.volume_poll_interval_ms)
    }
}

impl PreflightConfig {
    pub fn probe_window(&self) -> Duration {
        Duration::from_millis(self.probe_window_ms)
    }
}

impl AppConfig {
    /// Load from `$STATWATCH_CONFIG` (or `statwatch.toml`); a missing file means defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::load_from_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path, "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!("reading {}: {}", path, e)),
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.display.stats_interval_ms > 0,
            "display.stats_interval_ms must be > 0, got {}",
            self.display.stats_interval_ms
        );
        anyhow::ensure!(
            self.display.volume_interval_ms > 0,
            "display.volume_interval_ms must be > 0, got {}",
            self.display.volume_interval_ms
        );
        anyhow::ensure!(
            self.collector.stats_timeout_ms > 0,
            "collector.stats_timeout_ms must be > 0, got {}",
            self.collector.stats_timeout_ms
        );
        anyhow::ensure!(
            self.collector.retry_backoff_ms > 0,
            "collector.retry_backoff_ms must be > 0, got {}",
            self.collector.retry_backoff_ms
        );
        anyhow::ensure!(
            self.collector.volume_poll_interval_ms > 0,
            "collector.volume_poll_interval_ms must be > 0, got {}",
            self.collector.volume_poll_interval_ms
        );
        anyhow::ensure!(
            self.preflight.probe_window_ms > 0,
            "preflight.probe_window_ms must be > 0, got {}",
            self.preflight.probe_window_ms
        );
        Ok(())
    }
}
