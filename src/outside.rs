//! Outside controller: the single shared outside temperature.
//!
//! Same aggregation machinery as a zone, without setpoint or demand.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use crate::app::commands::OutsideInput;
use crate::config::OutsideConfig;
use crate::context::Context;
use crate::sensors::averaging::{self, AveragingStrategy};
use crate::sensors::{self, Sensor, sensor_name};

/// Outside temperatures at or below this are "never observed".
pub const MIN_VALID_OUTSIDE: f64 = -100.0;

pub const OUTSIDE_INBOX_DEPTH: usize = 32;

pub type OutsideInbox = Channel<CriticalSectionRawMutex, OutsideInput, OUTSIDE_INBOX_DEPTH>;

const LABEL: &str = "Outside";

struct OutsideState {
    average: f64,
    average_ts: Option<Instant>,
    strategy: &'static dyn AveragingStrategy,
}

pub struct Outside {
    sensors: Vec<Sensor>,
    state: Mutex<OutsideState>,
    inbox: OutsideInbox,
}

impl Outside {
    pub fn new(cfg: &OutsideConfig, ctx: &Context, now: Instant) -> Self {
        let sensors = cfg
            .temperature_sensors
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let name = sensor_name("outside-temperature-", s.name.as_deref(), i);
                Sensor::new(name, s, ctx.clone(), now)
            })
            .collect();

        let outside = Self {
            sensors,
            state: Mutex::new(OutsideState {
                average: MIN_VALID_OUTSIDE,
                average_ts: None,
                strategy: averaging::resolve(&cfg.temperature_average_type, LABEL),
            }),
            inbox: Channel::new(),
        };
        outside.recompute();
        outside
    }

    fn state(&self) -> MutexGuard<'_, OutsideState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn inbox(&self) -> &OutsideInbox {
        &self.inbox
    }

    /// Current outside temperature, `None` until observed.
    pub fn temperature(&self) -> Option<f64> {
        let s = self.state();
        s.average_ts.map(|_| s.average)
    }

    /// Re-run the strategy.  Returns the new temperature when a valid
    /// result differs from the stored one.
    pub fn recompute(&self) -> Option<f64> {
        let readings = sensors::readings(&self.sensors);
        let strategy = self.state().strategy;
        let agg = strategy.combine(&readings);
        if !agg.is_valid() {
            return None;
        }
        {
            let mut s = self.state();
            if s.average_ts == agg.timestamp && s.average == agg.value {
                return None;
            }
            s.average = agg.value;
            s.average_ts = agg.timestamp;
        }
        debug!("{}: temperature {:.2}", LABEL, agg.value);
        Some(agg.value)
    }

    /// Apply a drained batch.  Returns the temperature to push to the
    /// engine, if any.
    pub fn apply_batch<I>(&self, inputs: I, now: Instant) -> Option<f64>
    where
        I: IntoIterator<Item = OutsideInput>,
    {
        let mut pending = false;
        for input in inputs {
            match input {
                OutsideInput::SensorValue { sensor, payload } => {
                    let Some(s) = self.sensors.get(sensor) else {
                        warn!("{}: no sensor #{}", LABEL, sensor);
                        continue;
                    };
                    match s.update_payload(payload.as_bytes(), now) {
                        Ok(changed) => pending |= changed,
                        Err(e) => warn!("{}: sensor '{}' rejected update: {}", LABEL, s.name(), e),
                    }
                }
                OutsideInput::SensorParameter {
                    sensor,
                    parameter,
                    value,
                } => {
                    let Some(s) = self.sensors.get(sensor) else {
                        warn!("{}: no sensor #{}", LABEL, sensor);
                        continue;
                    };
                    s.set_parameter(parameter, value);
                    info!("Updated {} for sensor '{}' to {}", parameter.as_str(), s.name(), value);
                    pending = true;
                }
                OutsideInput::AverageType(name) => {
                    let strategy = averaging::resolve(&name, LABEL);
                    self.state().strategy = strategy;
                    info!("{}: average type is now `{}`", LABEL, strategy.name());
                    pending = true;
                }
            }
        }

        if pending { self.recompute() } else { None }
    }
}
