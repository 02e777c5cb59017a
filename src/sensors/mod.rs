//! Sensor aggregates: the latest transformed value of one sensor.
//!
//! A [`Sensor`] is owned by exactly one zone or by the outside entity and
//! is only ever mutated on that owner's task.  Its state still sits behind
//! its own mutex so strategy reads and live parameter overrides see a
//! consistent copy.
//!
//! `update` reports whether the owner must recompute its average; the
//! owner folds that into its own pending flag.

pub mod averaging;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::debug;

use crate::app::commands::SensorParameter;
use crate::config::SensorConfig;
use crate::context::{Context, NS_SENSOR};
use crate::error::PayloadError;
use crate::payload::extract_f64;

pub use averaging::{Aggregate, AveragingStrategy, SensorReading};

/// Stable sensor name: `<prefix><name>` or `<prefix><index+1>`.
pub fn sensor_name(prefix: &str, name: Option<&str>, index: usize) -> String {
    match name {
        Some(n) if !n.is_empty() => format!("{prefix}{n}"),
        _ => format!("{prefix}{}", index + 1),
    }
}

#[derive(Debug, Clone, Copy)]
struct SensorState {
    value: f64,
    timestamp: Option<Instant>,
    offset: f64,
    scale: f64,
    weight: f64,
}

pub struct Sensor {
    name: String,
    json_entry: Option<String>,
    ctx: Context,
    state: Mutex<SensorState>,
}

impl Sensor {
    /// Build from configuration, seeding the last persisted value.  A seeded
    /// sensor counts as observed at `now`.
    pub fn new(name: String, cfg: &SensorConfig, ctx: Context, now: Instant) -> Self {
        let restored = ctx.restore::<f64>(NS_SENSOR, &name);
        if let Some(v) = restored {
            debug!("Sensor '{}': restored value {:.2}", name, v);
        }
        let state = SensorState {
            value: restored.unwrap_or(0.0),
            timestamp: restored.map(|_| now),
            offset: cfg.offset,
            scale: cfg.scale,
            weight: cfg.weight,
        };
        Self {
            name,
            json_entry: cfg.json_entry.clone(),
            ctx,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, SensorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply `raw * scale + offset`, stamp it and persist it.
    ///
    /// Returns `true` when the owner should recompute: the value changed,
    /// or this is the first observation.
    pub fn update(&self, raw: f64, now: Instant) -> bool {
        let (value, signal) = {
            let mut s = self.state();
            let value = raw * s.scale + s.offset;
            let signal = s.timestamp.is_none() || value != s.value;
            s.value = value;
            s.timestamp = Some(now);
            (value, signal)
        };

        self.ctx.persist(NS_SENSOR, &self.name, &value);
        debug!("Sensor '{}': value {:.2}", self.name, value);
        signal
    }

    /// Extract the configured field from `payload` and [`update`](Self::update).
    pub fn update_payload(&self, payload: &[u8], now: Instant) -> Result<bool, PayloadError> {
        let raw = extract_f64(payload, self.json_entry.as_deref())?;
        Ok(self.update(raw, now))
    }

    /// Latest `(value, timestamp)`.
    pub fn current_value(&self) -> (f64, Option<Instant>) {
        let s = self.state();
        (s.value, s.timestamp)
    }

    pub fn reading(&self) -> SensorReading {
        let s = self.state();
        SensorReading {
            value: s.value,
            timestamp: s.timestamp,
            weight: s.weight,
        }
    }

    pub fn set_parameter(&self, parameter: SensorParameter, value: f64) {
        let mut s = self.state();
        match parameter {
            SensorParameter::Weight => s.weight = value,
            SensorParameter::Offset => s.offset = value,
            SensorParameter::Scale => s.scale = value,
        }
    }
}

/// Snapshot every sensor for a strategy run.  Each lock is taken and
/// released per sensor.
pub fn readings(sensors: &[Sensor]) -> Vec<SensorReading> {
    sensors.iter().map(Sensor::reading).collect()
}
