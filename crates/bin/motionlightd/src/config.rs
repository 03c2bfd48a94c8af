//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `motionlight.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;
use std::time::Duration;

use motionlight_app::light_controller::{ControllerConfig, DEFAULT_MAILBOX_CAPACITY};
use motionlight_domain::dedup::DEFAULT_CAPACITY;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which device to automate.
    pub device: DeviceConfig,
    /// Light timing.
    pub light: LightConfig,
    /// Day/night admission gate.
    pub gate: GateConfig,
    /// Event de-duplication window.
    pub dedup: DedupConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Simulated device and motion source.
    #[serde(rename = "virtual")]
    pub simulation: VirtualConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name of the floodlight, as known to the remote service.
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Seconds the light stays on after the last motion.
    pub duration_secs: u64,
    /// Seconds between a write and its read-back.
    pub settle_delay_secs: u64,
    /// Seconds before re-issuing a turn-off that did not stick.
    pub recheck_delay_secs: u64,
    pub mailbox_capacity: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Only turn the light on while it is dark.
    pub enabled: bool,
    /// IANA timezone whose calendar day the sunrise/sunset lookup uses.
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Soft bound on remembered motion identities.
    pub capacity: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
    /// Directory for daily-rolling log files; no file output when unset.
    pub directory: Option<PathBuf>,
    /// Also log to stderr.
    pub stderr: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VirtualConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Reads after a write that still report the previous light state.
    pub state_lag_reads: u32,
    /// Seconds between simulated motions; `0` disables the simulator.
    pub motion_interval_secs: u64,
}

impl Config {
    /// Load configuration from `motionlight.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("motionlight.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("MOTIONLIGHT_DEVICE") {
            self.device.name = val;
        }
        if let Some(secs) = var("MOTIONLIGHT_LIGHT_DURATION_SECS").and_then(|v| v.parse().ok()) {
            self.light.duration_secs = secs;
        }
        if let Some(secs) = var("MOTIONLIGHT_SETTLE_DELAY_SECS").and_then(|v| v.parse().ok()) {
            self.light.settle_delay_secs = secs;
        }
        if let Some(secs) = var("MOTIONLIGHT_RECHECK_DELAY_SECS").and_then(|v| v.parse().ok()) {
            self.light.recheck_delay_secs = secs;
        }
        if let Some(enabled) = var("MOTIONLIGHT_GATE_ENABLED").and_then(|v| v.parse().ok()) {
            self.gate.enabled = enabled;
        }
        if let Some(val) = var("MOTIONLIGHT_TIMEZONE") {
            self.gate.timezone = val;
        }
        if let Some(capacity) = var("MOTIONLIGHT_DEDUP_CAPACITY").and_then(|v| v.parse().ok()) {
            self.dedup.capacity = capacity;
        }
        if let Some(val) = var("MOTIONLIGHT_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("MOTIONLIGHT_LOG_DIR") {
            self.logging.directory = Some(PathBuf::from(val));
        }
        if let Some(secs) = var("MOTIONLIGHT_MOTION_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.simulation.motion_interval_secs = secs;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.device.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "device.name must not be empty".to_string(),
            ));
        }
        if self.light.duration_secs == 0 {
            return Err(ConfigError::Validation(
                "light.duration_secs must be non-zero".to_string(),
            ));
        }
        if self.light.recheck_delay_secs == 0 {
            return Err(ConfigError::Validation(
                "light.recheck_delay_secs must be non-zero".to_string(),
            ));
        }
        if self.light.mailbox_capacity == 0 {
            return Err(ConfigError::Validation(
                "light.mailbox_capacity must be non-zero".to_string(),
            ));
        }
        if self.dedup.capacity == 0 {
            return Err(ConfigError::Validation(
                "dedup.capacity must be non-zero".to_string(),
            ));
        }
        if self.gate.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::Validation(format!(
                "unknown gate.timezone {:?}",
                self.gate.timezone
            )));
        }
        Ok(())
    }

    /// Timing and sizing of the light controller.
    #[must_use]
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            light_duration: self.light_duration(),
            settle_delay: Duration::from_secs(self.light.settle_delay_secs),
            recheck_delay: Duration::from_secs(self.light.recheck_delay_secs),
            mailbox_capacity: self.light.mailbox_capacity,
        }
    }

    #[must_use]
    pub fn light_duration(&self) -> Duration {
        Duration::from_secs(self.light.duration_secs)
    }

    /// Interval of the motion simulator, if enabled.
    #[must_use]
    pub fn motion_interval(&self) -> Option<Duration> {
        (self.simulation.motion_interval_secs > 0)
            .then(|| Duration::from_secs(self.simulation.motion_interval_secs))
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "Drive".to_string(),
        }
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            settle_delay_secs: 3,
            recheck_delay_secs: 10,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: "UTC".to_string(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "motionlightd=info,motionlight_app=info,motionlight_adapter_virtual=info"
                .to_string(),
            directory: None,
            stderr: true,
        }
    }
}

impl Default for VirtualConfig {
    fn default() -> Self {
        Self {
            latitude: 59.33,
            longitude: 18.07,
            state_lag_reads: 0,
            motion_interval_secs: 0,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
