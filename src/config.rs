//! Controller configuration
//!
//! Loaded once at start-up from a JSON file.  Every field has a default so
//! a partial file (or none at all) still yields a runnable controller.
//! Zones keep file order; that order breaks ties in aggregation.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::sensors::averaging::DEFAULT_STRATEGY;

pub const DEFAULT_HEATING_PARAMETER: f64 = 15.0;
pub const DEFAULT_ROOM_COMPENSATION: f64 = 1.5;

/// Longest accepted quiet period.
pub const MAX_DEBOUNCE_MS: u64 = 60_000;
/// Longest accepted heartbeat period (one day).
pub const MAX_HEARTBEAT_SECS: u64 = 86_400;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Initial log verbosity (`error` .. `trace`, or `off`)
    pub log_level: String,
    /// Prefix for all control and diagnostic topics
    pub control_topic: String,
    /// Heating parameter for zones without their own
    pub default_heating_parameter: f64,
    /// Directory backing the persistent store
    pub storage_dir: String,
    pub boiler: BoilerConfig,
    pub outside: OutsideConfig,
    pub zones: Vec<ZoneConfig>,
    pub timing: TimingConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            control_topic: "zonetherm/control".into(),
            default_heating_parameter: DEFAULT_HEATING_PARAMETER,
            storage_dir: "zonetherm-state".into(),
            boiler: BoilerConfig::default(),
            outside: OutsideConfig::default(),
            zones: Vec::new(),
            timing: TimingConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::ValidationFailed("log_level must be off, error, warn, info, debug or trace"))
    }
}

/// Boiler gateway topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoilerConfig {
    pub tset_topic: String,
    pub ch_enable_topic: String,
}

impl Default for BoilerConfig {
    fn default() -> Self {
        Self {
            tset_topic: "boiler/tset/set".into(),
            ch_enable_topic: "boiler/ch_enable/set".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutsideConfig {
    pub temperature_sensors: Vec<SensorConfig>,
    pub temperature_average_type: String,
}

impl Default for OutsideConfig {
    fn default() -> Self {
        Self {
            temperature_sensors: Vec::new(),
            temperature_average_type: DEFAULT_STRATEGY.into(),
        }
    }
}

/// One heating zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Unique, stable zone name
    pub name: String,
    /// Overrides the controller default when set
    pub heating_parameter: Option<f64>,
    /// Heating-parameter correction per degree of room error
    pub room_compensation: f64,
    pub sensors_average_type: String,
    /// Weight in cross-zone aggregation
    pub weight: f64,
    pub setpoint: SetpointConfig,
    pub sensors: Vec<SensorConfig>,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            heating_parameter: None,
            room_compensation: DEFAULT_ROOM_COMPENSATION,
            sensors_average_type: DEFAULT_STRATEGY.into(),
            weight: 1.0,
            setpoint: SetpointConfig::default(),
            sensors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetpointConfig {
    pub topic: String,
    pub json_entry: Option<String>,
    pub offset: f64,
    pub scale: f64,
}

impl Default for SetpointConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            json_entry: None,
            offset: 0.0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Optional suffix for the stable sensor name; index+1 otherwise
    pub name: Option<String>,
    pub topic: String,
    pub json_entry: Option<String>,
    pub offset: f64,
    pub scale: f64,
    pub weight: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            name: None,
            topic: String::new(),
            json_entry: None,
            offset: 0.0,
            scale: 1.0,
            weight: 1.0,
        }
    }
}

/// Decision-loop timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Quiet period after the last change signal
    pub debounce_ms: u64,
    /// Unconditional republish period
    pub heartbeat_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,    // 50 ms
            heartbeat_secs: 30, // 30 s
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

// ── Loading and validation ────────────────────────────────────

/// Read, parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound,
        _ => ConfigError::IoError,
    })?;
    let cfg: ControllerConfig =
        serde_json::from_str(&text).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
    validate_config(&cfg)?;
    Ok(cfg)
}

fn valid_weight(w: f64) -> bool {
    w.is_finite() && w >= 0.0
}

fn valid_sensor(s: &SensorConfig) -> bool {
    valid_weight(s.weight) && s.offset.is_finite() && s.scale.is_finite()
}

/// Reject structurally impossible configurations.  Unknown averaging
/// names are accepted here; entities degrade them to `mean`.
pub fn validate_config(cfg: &ControllerConfig) -> Result<(), ConfigError> {
    cfg.log_level_filter()?;
    if cfg.control_topic.is_empty() {
        return Err(ConfigError::ValidationFailed("control_topic must not be empty"));
    }
    if !cfg.default_heating_parameter.is_finite() {
        return Err(ConfigError::ValidationFailed(
            "default_heating_parameter must be finite",
        ));
    }
    if !(1..=MAX_DEBOUNCE_MS).contains(&cfg.timing.debounce_ms) {
        return Err(ConfigError::ValidationFailed(
            "timing.debounce_ms must be between 1 and 60000",
        ));
    }
    if !(1..=MAX_HEARTBEAT_SECS).contains(&cfg.timing.heartbeat_secs) {
        return Err(ConfigError::ValidationFailed(
            "timing.heartbeat_secs must be between 1 and 86400",
        ));
    }
    if !cfg.outside.temperature_sensors.iter().all(valid_sensor) {
        return Err(ConfigError::ValidationFailed(
            "outside sensors need finite offset/scale and weight >= 0",
        ));
    }

    let mut names = HashSet::new();
    for zone in &cfg.zones {
        if zone.name.is_empty() {
            return Err(ConfigError::ValidationFailed("zone name must not be empty"));
        }
        if zone.name.contains('/') {
            return Err(ConfigError::ValidationFailed("zone name must not contain '/'"));
        }
        if !names.insert(zone.name.as_str()) {
            return Err(ConfigError::ValidationFailed("zone names must be unique"));
        }
        if !valid_weight(zone.weight) {
            return Err(ConfigError::ValidationFailed("zone weight must be finite and >= 0"));
        }
        if zone.heating_parameter.is_some_and(|hp| !hp.is_finite())
            || !zone.room_compensation.is_finite()
        {
            return Err(ConfigError::ValidationFailed(
                "zone heating_parameter and room_compensation must be finite",
            ));
        }
        if !zone.setpoint.offset.is_finite() || !zone.setpoint.scale.is_finite() {
            return Err(ConfigError::ValidationFailed(
                "zone setpoint offset/scale must be finite",
            ));
        }
        if !zone.sensors.iter().all(valid_sensor) {
            return Err(ConfigError::ValidationFailed(
                "zone sensors need finite offset/scale and weight >= 0",
            ));
        }
    }
    Ok(())
}
