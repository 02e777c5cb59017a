//! Zone controller: one heating zone.
//!
//! Owns the zone's sensors, its setpoint and the averaged room
//! temperature.  All mutation happens on the zone's own task, which drains
//! the zone inbox in batches and calls [`Zone::apply_batch`]; the engine
//! only reads through [`Zone::demand_inputs`] and asks the zone to
//! [`compute_demand`](Zone::compute_demand).
//!
//! Setpoint and average are independent validity axes.  A zone can produce
//! demand only once both have been observed.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use crate::app::commands::{ZoneInput, ZoneParameter};
use crate::config::ZoneConfig;
use crate::context::{Context, NS_ZONE};
use crate::control::thermal_model::{FALLBACK_TSET, bound, supply_temperature};
use crate::error::PayloadError;
use crate::outside::MIN_VALID_OUTSIDE;
use crate::payload::extract_f64;
use crate::sensors::averaging::{self, AveragingStrategy};
use crate::sensors::{self, Sensor, sensor_name};

/// Index of a zone in configuration order.
pub type ZoneId = usize;

/// Queue depth for one zone's inbox.
pub const ZONE_INBOX_DEPTH: usize = 32;

pub type ZoneInbox = Channel<CriticalSectionRawMutex, ZoneInput, ZONE_INBOX_DEPTH>;

/// Outside warmer than `setpoint - AMBIENT_MARGIN` heats the zone for free.
pub const AMBIENT_MARGIN: f64 = 3.0;

/// Room warmer than `setpoint + OVERSHOOT_MARGIN` needs no heat.
pub const OVERSHOOT_MARGIN: f64 = 2.0;

/// The engine's read surface on a zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandInputs {
    pub setpoint: f64,
    pub temperature: f64,
    /// Both setpoint and average have been observed.
    pub valid: bool,
}

/// What a processed batch asks of the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ZoneSignal {
    /// Recompute this zone's demand.
    pub dirty: bool,
    /// A tuning parameter changed; recompute everything.
    pub force: bool,
}

struct ZoneState {
    setpoint: f64,
    setpoint_ts: Option<Instant>,
    average: f64,
    average_ts: Option<Instant>,
    weight: f64,
    heating_parameter: Option<f64>,
    room_compensation: f64,
    strategy: &'static dyn AveragingStrategy,
}

struct SetpointSource {
    json_entry: Option<String>,
    offset: f64,
    scale: f64,
}

pub struct Zone {
    id: ZoneId,
    name: String,
    label: String,
    sensors: Vec<Sensor>,
    setpoint_source: SetpointSource,
    ctx: Context,
    state: Mutex<ZoneState>,
    inbox: ZoneInbox,
}

impl Zone {
    /// Build the zone and its sensors, seeding persisted values.
    pub fn new(id: ZoneId, cfg: &ZoneConfig, ctx: Context, now: Instant) -> Self {
        let label = format!("Zone '{}'", cfg.name);
        let prefix = format!("zone-{}-", cfg.name);
        let sensors = cfg
            .sensors
            .iter()
            .enumerate()
            .map(|(i, s)| Sensor::new(sensor_name(&prefix, s.name.as_deref(), i), s, ctx.clone(), now))
            .collect();

        let setpoint = ctx.restore::<f64>(NS_ZONE, &cfg.name);
        if let Some(sp) = setpoint {
            debug!("{}: restored setpoint {:.2}", label, sp);
        }

        let state = ZoneState {
            setpoint: setpoint.unwrap_or(0.0),
            setpoint_ts: setpoint.map(|_| now),
            average: 0.0,
            average_ts: None,
            weight: cfg.weight,
            heating_parameter: cfg.heating_parameter,
            room_compensation: cfg.room_compensation,
            strategy: averaging::resolve(&cfg.sensors_average_type, &label),
        };

        let zone = Self {
            id,
            name: cfg.name.clone(),
            label,
            sensors,
            setpoint_source: SetpointSource {
                json_entry: cfg.setpoint.json_entry.clone(),
                offset: cfg.setpoint.offset,
                scale: cfg.setpoint.scale,
            },
            ctx,
            state: Mutex::new(state),
            inbox: Channel::new(),
        };
        zone.recompute_average();
        zone
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn inbox(&self) -> &ZoneInbox {
        &self.inbox
    }

    /// The zone's own lock.  Never held across a call into a sensor.
    fn state(&self) -> MutexGuard<'_, ZoneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn demand_inputs(&self) -> DemandInputs {
        let s = self.state();
        DemandInputs {
            setpoint: s.setpoint,
            temperature: s.average,
            valid: s.setpoint_ts.is_some() && s.average_ts.is_some(),
        }
    }

    pub fn weight(&self) -> f64 {
        self.state().weight
    }

    pub fn strategy_name(&self) -> &'static str {
        self.state().strategy.name()
    }

    // ── Updates (zone task only) ──────────────────────────────

    /// Extract, scale and store a new setpoint.  Returns `true` if the
    /// engine should recompute this zone.
    pub fn on_setpoint_payload(&self, payload: &[u8], now: Instant) -> Result<bool, PayloadError> {
        let raw = extract_f64(payload, self.setpoint_source.json_entry.as_deref())?;
        let value = raw * self.setpoint_source.scale + self.setpoint_source.offset;

        let changed = {
            let mut s = self.state();
            let changed = s.setpoint_ts.is_none() || s.setpoint != value;
            s.setpoint = value;
            s.setpoint_ts = Some(now);
            changed
        };

        self.ctx.persist(NS_ZONE, &self.name, &value);
        debug!("{}: setpoint {:.2}", self.label, value);
        Ok(changed)
    }

    /// Re-run the averaging strategy.  Returns `true` when a valid result
    /// differs from the stored one (new timestamp or new value).
    pub fn recompute_average(&self) -> bool {
        let readings = sensors::readings(&self.sensors);
        let strategy = self.state().strategy;
        let agg = strategy.combine(&readings);
        if !agg.is_valid() {
            return false;
        }

        {
            let mut s = self.state();
            if s.average_ts == agg.timestamp && s.average == agg.value {
                return false;
            }
            s.average = agg.value;
            s.average_ts = agg.timestamp;
        }
        debug!("{}: average temperature {:.2}", self.label, agg.value);
        true
    }

    /// Apply everything drained from the inbox in one go.  The average is
    /// recomputed at most once per batch.
    pub fn apply_batch<I>(&self, inputs: I, now: Instant) -> ZoneSignal
    where
        I: IntoIterator<Item = ZoneInput>,
    {
        let mut signal = ZoneSignal::default();
        let mut average_pending = false;

        for input in inputs {
            match input {
                ZoneInput::SensorValue { sensor, payload } => {
                    let Some(s) = self.sensors.get(sensor) else {
                        warn!("{}: no sensor #{}", self.label, sensor);
                        continue;
                    };
                    match s.update_payload(payload.as_bytes(), now) {
                        Ok(changed) => average_pending |= changed,
                        Err(e) => warn!("{}: sensor '{}' rejected update: {}", self.label, s.name(), e),
                    }
                }
                ZoneInput::Setpoint(payload) => match self.on_setpoint_payload(payload.as_bytes(), now) {
                    Ok(changed) => signal.dirty |= changed,
                    Err(e) => warn!("{}: setpoint rejected: {}", self.label, e),
                },
                ZoneInput::SensorParameter {
                    sensor,
                    parameter,
                    value,
                } => {
                    let Some(s) = self.sensors.get(sensor) else {
                        warn!("{}: no sensor #{}", self.label, sensor);
                        continue;
                    };
                    s.set_parameter(parameter, value);
                    info!("Updated {} for sensor '{}' to {}", parameter.as_str(), s.name(), value);
                    average_pending = true;
                }
                ZoneInput::Parameter(parameter) => {
                    let recompute = self.set_parameter(parameter);
                    average_pending |= recompute;
                    signal.force |= !recompute;
                }
            }
        }

        if average_pending && self.recompute_average() {
            signal.dirty = true;
        }
        signal
    }

    /// Returns `true` when the change needs an average recompute rather
    /// than a full engine update.
    fn set_parameter(&self, parameter: ZoneParameter) -> bool {
        let strategy = match &parameter {
            ZoneParameter::AverageType(name) => Some(averaging::resolve(name, &self.label)),
            _ => None,
        };
        {
            let mut s = self.state();
            match (&parameter, strategy) {
                (_, Some(strategy)) => s.strategy = strategy,
                (ZoneParameter::Weight(w), _) => s.weight = *w,
                (ZoneParameter::HeatingParameter(hp), _) => s.heating_parameter = Some(*hp),
                (ZoneParameter::RoomCompensation(k), _) => s.room_compensation = *k,
                (ZoneParameter::AverageType(_), None) => {}
            }
        }
        info!("{}: updated {:?}", self.label, parameter);
        strategy.is_some()
    }

    // ── Demand (engine task) ──────────────────────────────────

    /// Candidate boiler temperature for this zone, or `None` while the zone
    /// or the outside temperature is not yet observed.
    pub fn compute_demand(&self, outside: f64, default_heating_parameter: f64) -> Option<f64> {
        let inputs = self.demand_inputs();
        let (hp, k) = {
            let s = self.state();
            (
                s.heating_parameter.unwrap_or(default_heating_parameter),
                s.room_compensation,
            )
        };

        if !inputs.valid || outside <= MIN_VALID_OUTSIDE {
            return None;
        }

        let DemandInputs {
            setpoint: sp,
            temperature: room,
            ..
        } = inputs;
        let hp = hp - (room - sp) * k;
        let mut demand = bound(supply_temperature(hp, sp, outside, room));
        if outside > sp - AMBIENT_MARGIN || room > sp + OVERSHOOT_MARGIN {
            demand = FALLBACK_TSET;
        }

        debug!(
            "{}: SP={:.2} T={:.2} OT={:.2} -> {:.2}",
            self.label, sp, room, outside, demand
        );
        Some(demand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use crate::app::commands::SensorParameter;
    use crate::config::SensorConfig;
    use crate::payload::bounded;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(sensors: usize) -> ZoneConfig {
        ZoneConfig {
            name: "living".into(),
            sensors: (0..sensors).map(|_| SensorConfig::default()).collect(),
            ..ZoneConfig::default()
        }
    }

    fn ctx() -> Context {
        Context::new(Arc::new(MemoryStore::new()))
    }

    fn sensor(i: usize, v: &str) -> ZoneInput {
        ZoneInput::SensorValue {
            sensor: i,
            payload: bounded(v).unwrap(),
        }
    }

    fn setpoint(v: &str) -> ZoneInput {
        ZoneInput::Setpoint(bounded(v).unwrap())
    }

    #[test]
    fn sensors_are_named_after_zone() {
        let z = Zone::new(0, &config(2), ctx(), Instant::now());
        let names: Vec<_> = z.sensors().iter().map(Sensor::name).collect();
        assert_eq!(names, ["zone-living-1", "zone-living-2"]);
    }

    #[test]
    fn validity_needs_both_axes() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        assert!(!z.demand_inputs().valid);

        z.apply_batch([setpoint("21")], now);
        assert!(!z.demand_inputs().valid);

        z.apply_batch([sensor(0, "19.5")], now);
        assert_eq!(
            z.demand_inputs(),
            DemandInputs {
                setpoint: 21.0,
                temperature: 19.5,
                valid: true
            }
        );
    }

    #[test]
    fn batch_recomputes_average_once() {
        let now = Instant::now();
        let z = Zone::new(0, &config(2), ctx(), now);
        let sig = z.apply_batch([sensor(0, "20"), sensor(1, "22"), sensor(0, "21")], now);
        assert!(sig.dirty);
        assert!(!sig.force);
        assert_eq!(z.demand_inputs().temperature, 21.5);
    }

    #[test]
    fn identical_value_is_not_a_signal() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        assert!(z.apply_batch([sensor(0, "20")], now).dirty);
        let later = now + Duration::from_secs(1);
        assert!(!z.apply_batch([sensor(0, "20")], later).dirty);
        assert!(z.apply_batch([setpoint("21")], later).dirty);
        assert!(!z.apply_batch([setpoint("21")], later).dirty);
    }

    #[test]
    fn malformed_inputs_are_dropped() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        z.apply_batch([sensor(0, "20"), setpoint("21")], now);
        let sig = z.apply_batch([sensor(0, "hot"), setpoint("{}"), sensor(7, "1")], now);
        assert_eq!(sig, ZoneSignal::default());
        assert_eq!(z.demand_inputs().temperature, 20.0);
        assert_eq!(z.demand_inputs().setpoint, 21.0);
    }

    #[test]
    fn setpoint_transform_and_persistence() {
        let now = Instant::now();
        let mut cfg = config(0);
        cfg.setpoint.scale = 0.5;
        cfg.setpoint.offset = 1.0;
        cfg.setpoint.json_entry = Some("target".into());
        let ctx = ctx();
        let z = Zone::new(0, &cfg, ctx.clone(), now);
        assert_eq!(z.on_setpoint_payload(br#"{"target": 40}"#, now), Ok(true));
        assert_eq!(z.demand_inputs().setpoint, 21.0);
        assert_eq!(ctx.restore::<f64>(NS_ZONE, "living"), Some(21.0));
    }

    #[test]
    fn restored_state_makes_zone_valid() {
        let now = Instant::now();
        let ctx = ctx();
        ctx.persist(NS_ZONE, "living", &21.0_f64);
        ctx.persist(crate::context::NS_SENSOR, "zone-living-1", &19.0_f64);
        let z = Zone::new(0, &config(1), ctx, now);
        let inputs = z.demand_inputs();
        assert!(inputs.valid);
        assert_eq!(inputs.temperature, 19.0);
    }

    #[test]
    fn zone_locks_are_independent() {
        let now = Instant::now();
        let a = Zone::new(0, &config(1), ctx(), now);
        let b = Zone::new(1, &config(1), ctx(), now);
        b.apply_batch([sensor(0, "20"), setpoint("20")], now);

        let held = a.state();
        let inputs = std::thread::scope(|s| s.spawn(|| b.demand_inputs()).join().unwrap());
        drop(held);
        assert!(inputs.valid);
    }

    #[test]
    fn tuning_parameters_force_an_update() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        let sig = z.apply_batch([ZoneInput::Parameter(ZoneParameter::Weight(2.0))], now);
        assert!(sig.force);
        assert_eq!(z.weight(), 2.0);
    }

    #[test]
    fn strategy_change_recomputes_average() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        let sig = z.apply_batch(
            [ZoneInput::Parameter(ZoneParameter::AverageType("median".into()))],
            now,
        );
        assert!(!sig.force);
        assert_eq!(z.strategy_name(), "mean");
    }

    #[test]
    fn sensor_weight_override_shifts_average() {
        let now = Instant::now();
        let z = Zone::new(0, &config(2), ctx(), now);
        z.apply_batch([sensor(0, "20"), sensor(1, "24")], now);
        assert_eq!(z.demand_inputs().temperature, 22.0);
        let sig = z.apply_batch(
            [ZoneInput::SensorParameter {
                sensor: 1,
                parameter: SensorParameter::Weight,
                value: 3.0,
            }],
            now,
        );
        assert!(sig.dirty);
        assert_eq!(z.demand_inputs().temperature, 23.0);
    }

    #[test]
    fn demand_requires_valid_zone_and_outside() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        assert_eq!(z.compute_demand(0.0, 15.0), None);
        z.apply_batch([sensor(0, "20"), setpoint("20")], now);
        assert_eq!(z.compute_demand(MIN_VALID_OUTSIDE, 15.0), None);
        let d = z.compute_demand(0.0, 15.0).unwrap();
        assert!((d - 51.183).abs() < 1e-3);
    }

    #[test]
    fn zone_override_beats_default_heating_parameter() {
        let now = Instant::now();
        let mut cfg = config(1);
        cfg.heating_parameter = Some(15.0);
        let z = Zone::new(0, &cfg, ctx(), now);
        z.apply_batch([sensor(0, "20"), setpoint("20")], now);
        let d = z.compute_demand(0.0, 3.0).unwrap();
        assert!((d - 51.183).abs() < 1e-3);
    }

    #[test]
    fn satisfied_by_ambient() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        z.apply_batch([sensor(0, "20"), setpoint("20")], now);
        // Raw model gives ~23.05, but outside is within 3 °C of the setpoint.
        assert_eq!(z.compute_demand(17.5, 15.0), Some(FALLBACK_TSET));
        // Too low for the boiler to bother.
        assert_eq!(z.compute_demand(16.5, 5.0), Some(FALLBACK_TSET));
    }

    #[test]
    fn overheated_room_needs_nothing() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        z.apply_batch([sensor(0, "22.5"), setpoint("20")], now);
        assert_eq!(z.compute_demand(-10.0, 15.0), Some(FALLBACK_TSET));
    }

    #[test]
    fn cold_room_raises_heating_parameter() {
        let now = Instant::now();
        let z = Zone::new(0, &config(1), ctx(), now);
        z.apply_batch([sensor(0, "20"), setpoint("20")], now);
        let on_target = z.compute_demand(0.0, 15.0).unwrap();
        z.apply_batch([sensor(0, "18")], now);
        let cold = z.compute_demand(0.0, 15.0).unwrap();
        assert!(cold > on_target);
    }
}
