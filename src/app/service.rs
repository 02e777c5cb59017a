//! Control engine, the hexagonal core.
//!
//! [`ControlEngine`] owns the zone handles, the per-zone demand side table
//! and the decision-loop timers.  It is synchronous and time is injected:
//! the runtime feeds it inbox events and calls [`ControlEngine::poll`] when
//! the next deadline passes, tests do the same with synthetic instants.
//!
//! ```text
//!  EngineEvent ──▶ ┌──────────────────────────────┐ ──▶ BoilerPort
//!                  │        ControlEngine         │
//!  poll(now)   ──▶ │ Debouncer · Heartbeat · Σ    │ ──▶ EventSink
//!                  └──────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::context::{Context, NS_CONTROLLER};
use crate::control::aggregate::{ZoneDemand, aggregate};
use crate::diagnostics::AggregationReport;
use crate::events::EngineEvent;
use crate::outside::MIN_VALID_OUTSIDE;
use crate::scheduler::{Debouncer, Heartbeat};
use crate::zone::Zone;

use super::commands::GlobalCommand;
use super::events::{AppEvent, BoilerCommand, PublishReason};
use super::ports::{BoilerPort, EventSink};

/// Persistence key for the global enable flag.
const ENABLED_KEY: &str = "enabled";

/// Engine tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub debounce: Duration,
    pub heartbeat: Duration,
    pub default_heating_parameter: f64,
}

impl EngineSettings {
    pub fn from_config(cfg: &ControllerConfig) -> Self {
        Self {
            debounce: cfg.timing.debounce(),
            heartbeat: cfg.timing.heartbeat(),
            default_heating_parameter: cfg.default_heating_parameter,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

// ───────────────────────────────────────────────────────────────
// ControlEngine
// ───────────────────────────────────────────────────────────────

pub struct ControlEngine {
    zones: Vec<Arc<Zone>>,
    /// Last computed demand per zone, indexed like `zones`.
    demands: Vec<Option<f64>>,
    dirty: Vec<bool>,
    outside: f64,
    force_update: bool,
    command: BoilerCommand,
    enabled: bool,
    default_heating_parameter: f64,
    debouncer: Debouncer,
    heartbeat: Heartbeat,
    heartbeat_period: Duration,
    ctx: Context,
    cycles: u64,
}

impl ControlEngine {
    /// Build the engine.  The enable flag is restored from storage and
    /// defaults to on.  Call [`start`](Self::start) before polling.
    pub fn new(zones: Vec<Arc<Zone>>, settings: EngineSettings, ctx: Context, now: Instant) -> Self {
        let enabled = ctx.restore::<bool>(NS_CONTROLLER, ENABLED_KEY).unwrap_or(true);
        let n = zones.len();
        Self {
            zones,
            demands: vec![None; n],
            dirty: vec![false; n],
            outside: MIN_VALID_OUTSIDE,
            force_update: false,
            command: BoilerCommand::OFF,
            enabled,
            default_heating_parameter: settings.default_heating_parameter,
            debouncer: Debouncer::new(settings.debounce),
            heartbeat: Heartbeat::new(settings.heartbeat, now),
            heartbeat_period: settings.heartbeat,
            ctx,
            cycles: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Anchor the heartbeat at `now` and request a forced update, so the
    /// first command goes out one quiet period after start.
    pub fn start(&mut self, now: Instant, sink: &mut impl EventSink) {
        self.heartbeat = Heartbeat::new(self.heartbeat_period, now);
        self.force_update = true;
        self.debouncer.trigger(now);
        sink.emit(&AppEvent::Started {
            zones: self.zones.len(),
            enabled: self.enabled,
        });
        info!(
            "Engine: started with {} zone(s), heating {}",
            self.zones.len(),
            if self.enabled { "enabled" } else { "disabled" }
        );
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Fold one inbox event into the engine state.  Change signals (re)arm
    /// the quiet timer; nothing is recomputed here.
    pub fn handle_event(&mut self, event: EngineEvent, now: Instant, sink: &mut impl EventSink) {
        match event {
            EngineEvent::OutsideChanged(t) => {
                if t != self.outside {
                    debug!("Engine: outside {:.2} -> {:.2}", self.outside, t);
                    self.outside = t;
                    self.force_update = true;
                    self.debouncer.trigger(now);
                }
            }
            EngineEvent::ZoneDirty(id) => match self.dirty.get_mut(id) {
                Some(flag) => {
                    *flag = true;
                    self.debouncer.trigger(now);
                }
                None => warn!("Engine: dirty signal for unknown zone #{}", id),
            },
            EngineEvent::ForceUpdate => {
                self.force_update = true;
                self.debouncer.trigger(now);
            }
            EngineEvent::Control(cmd) => self.handle_control(cmd, now, sink),
        }
    }

    fn handle_control(&mut self, cmd: GlobalCommand, now: Instant, sink: &mut impl EventSink) {
        match cmd {
            GlobalCommand::DefaultHeatingParameter(hp) => {
                self.default_heating_parameter = hp;
                info!("Engine: default heating parameter is now {}", hp);
                self.force_update = true;
                self.debouncer.trigger(now);
            }
            GlobalCommand::Enable(on) => {
                self.enabled = on;
                self.ctx.persist(NS_CONTROLLER, ENABLED_KEY, &on);
                info!("Engine: heating {}", if on { "enabled" } else { "disabled" });
                sink.emit(&AppEvent::HeatingEnabled(on));
                self.force_update = true;
                self.debouncer.trigger(now);
            }
            GlobalCommand::LogLevel(level) => {
                log::set_max_level(level);
                info!("Engine: log level is now {}", level);
            }
        }
    }

    // ── Timers ────────────────────────────────────────────────

    /// Run whatever is due at `now`: a recompute cycle if the quiet timer
    /// expired, a republish if the heartbeat ticked.
    pub fn poll(&mut self, now: Instant, boiler: &mut impl BoilerPort, sink: &mut impl EventSink) {
        if self.debouncer.fire(now) {
            self.run_cycle(boiler, sink);
        }
        if self.heartbeat.due(now) {
            self.publish(PublishReason::Heartbeat, boiler, sink);
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Instant {
        match self.debouncer.deadline() {
            Some(d) => d.min(self.heartbeat.next()),
            None => self.heartbeat.next(),
        }
    }

    fn run_cycle(&mut self, boiler: &mut impl BoilerPort, sink: &mut impl EventSink) {
        self.cycles += 1;
        let force = self.force_update;
        if force {
            self.dirty.iter_mut().for_each(|d| *d = true);
        }

        let mut reaggregate = false;
        for (i, zone) in self.zones.iter().enumerate() {
            if !std::mem::take(&mut self.dirty[i]) {
                continue;
            }
            if let Some(demand) = zone.compute_demand(self.outside, self.default_heating_parameter) {
                if self.demands[i] != Some(demand) {
                    self.demands[i] = Some(demand);
                    reaggregate = true;
                }
            }
        }

        if reaggregate || force {
            let report = self.aggregate();
            let next = report.command();
            sink.emit(&AppEvent::Aggregated(report));
            if next != self.command || force {
                info!(
                    "Engine: Tset {:.2} -> {:.2}, CH {} -> {}",
                    self.command.tset, next.tset, self.command.ch_enable, next.ch_enable
                );
                self.command = next;
                self.publish(PublishReason::Changed, boiler, sink);
            }
        }

        self.force_update = false;
    }

    fn aggregate(&self) -> AggregationReport {
        let demands: Vec<ZoneDemand<'_>> = self
            .zones
            .iter()
            .zip(&self.demands)
            .filter_map(|(zone, demand)| {
                let demand = (*demand)?;
                let inputs = zone.demand_inputs();
                Some(ZoneDemand {
                    name: zone.name(),
                    demand,
                    weight: zone.weight(),
                    setpoint: inputs.setpoint,
                    temperature: inputs.temperature,
                })
            })
            .collect();
        aggregate(&demands)
    }

    /// Hand the effective command to the boiler.  Global disable overrides
    /// the computed command here and only here.
    fn publish(&self, reason: PublishReason, boiler: &mut impl BoilerPort, sink: &mut impl EventSink) {
        let command = self.effective_command();
        if let Err(e) = boiler.publish(&command) {
            warn!("Engine: boiler publish failed: {}", e);
        }
        sink.emit(&AppEvent::BoilerCommand { command, reason });
    }

    // ── Queries ───────────────────────────────────────────────

    /// Last aggregated command, regardless of the enable flag.
    pub fn command(&self) -> BoilerCommand {
        self.command
    }

    /// What the boiler is told.
    pub fn effective_command(&self) -> BoilerCommand {
        if self.enabled { self.command } else { BoilerCommand::OFF }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Outside temperature in use; [`MIN_VALID_OUTSIDE`] until observed.
    pub fn outside(&self) -> f64 {
        self.outside
    }

    pub fn demand(&self, zone: usize) -> Option<f64> {
        self.demands.get(zone).copied().flatten()
    }

    pub fn default_heating_parameter(&self) -> f64 {
        self.default_heating_parameter
    }

    /// Recompute cycles run since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn zones(&self) -> &[Arc<Zone>] {
        &self.zones
    }
}
