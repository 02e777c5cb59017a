//! Mock ports and a synchronous harness for integration tests.
//!
//! The harness owns a real [`Plant`] and [`ControlEngine`] and steps them
//! by hand: messages go through `Plant::deliver`, entity inboxes are
//! drained with the runtime's own step functions, and the engine is
//! polled at synthetic instants.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_lite::future;

use zonetherm::adapters::store::MemoryStore;
use zonetherm::app::events::{AppEvent, BoilerCommand, PublishReason};
use zonetherm::app::ports::{BoilerPort, EventSink, PublishError, StoragePort};
use zonetherm::app::service::{ControlEngine, EngineSettings};
use zonetherm::config::{ControllerConfig, OutsideConfig, SensorConfig, SetpointConfig, ZoneConfig};
use zonetherm::context::Context;
use zonetherm::plant::Plant;
use zonetherm::runtime::{outside_step, zone_step};

// ── Boiler ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingBoiler {
    pub commands: Vec<BoilerCommand>,
    pub fail: bool,
}

impl BoilerPort for RecordingBoiler {
    fn publish(&mut self, command: &BoilerCommand) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Transport("gateway offline".into()));
        }
        self.commands.push(*command);
        Ok(())
    }
}

// ── Events ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn publishes(&self, reason: PublishReason) -> Vec<BoilerCommand> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::BoilerCommand { command, reason: r } if *r == reason => Some(*command),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Config builders ───────────────────────────────────────────

pub fn zone(name: &str) -> ZoneConfig {
    ZoneConfig {
        name: name.into(),
        setpoint: SetpointConfig {
            topic: format!("{name}/sp"),
            ..SetpointConfig::default()
        },
        sensors: vec![SensorConfig {
            topic: format!("{name}/t"),
            ..SensorConfig::default()
        }],
        ..ZoneConfig::default()
    }
}

pub fn config(zones: &[&str]) -> ControllerConfig {
    ControllerConfig {
        zones: zones.iter().map(|z| zone(z)).collect(),
        outside: OutsideConfig {
            temperature_sensors: vec![SensorConfig {
                topic: "weather/t".into(),
                ..SensorConfig::default()
            }],
            ..OutsideConfig::default()
        },
        ..ControllerConfig::default()
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Harness {
    pub plant: Plant,
    pub engine: ControlEngine,
    pub boiler: RecordingBoiler,
    pub sink: RecordingSink,
    pub t0: Instant,
    pub now: Instant,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(cfg: &ControllerConfig) -> Self {
        Self::with_store(cfg, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(cfg: &ControllerConfig, store: Arc<dyn StoragePort>) -> Self {
        let t0 = Instant::now();
        let ctx = Context::new(store);
        let plant = Plant::build(cfg, &ctx, t0);
        let engine = ControlEngine::new(
            plant.zones().to_vec(),
            EngineSettings::from_config(cfg),
            ctx,
            t0,
        );
        Self {
            plant,
            engine,
            boiler: RecordingBoiler::default(),
            sink: RecordingSink::default(),
            t0,
            now: t0,
        }
    }

    /// Seed the outside temperature (if already known) and start the engine.
    pub fn start(&mut self) {
        if let Some(t) = self.plant.outside().temperature() {
            self.engine.handle_event(
                zonetherm::events::EngineEvent::OutsideChanged(t),
                self.now,
                &mut self.sink,
            );
        }
        self.engine.start(self.now, &mut self.sink);
    }

    /// Deliver one message and let every entity and the engine react.
    pub fn send(&mut self, topic: &str, payload: &str) {
        self.plant.deliver(topic, payload);
        self.settle();
    }

    /// Drain every entity inbox, then feed the resulting engine events.
    pub fn settle(&mut self) {
        let engine_inbox = self.plant.engine_inbox().clone();
        for zone in self.plant.zones() {
            if !zone.inbox().is_empty() {
                future::block_on(zone_step(zone, &engine_inbox));
            }
        }
        if !self.plant.outside().inbox().is_empty() {
            future::block_on(outside_step(self.plant.outside(), &engine_inbox));
        }
        while let Ok(event) = engine_inbox.try_receive() {
            self.engine.handle_event(event, self.now, &mut self.sink);
        }
    }

    /// Move the clock forward and poll the engine once.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
        self.engine.poll(self.now, &mut self.boiler, &mut self.sink);
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Outside 0 °C and every zone at 20 °C with a 20 °C setpoint.
    pub fn seed_reference(&mut self, zones: &[&str]) {
        self.send("weather/t", "0");
        for z in zones {
            self.send(&format!("{z}/t"), "20");
            self.send(&format!("{z}/sp"), "20");
        }
    }

    pub fn last_command(&self) -> Option<BoilerCommand> {
        self.boiler.commands.last().copied()
    }
}

pub fn cmd(tset: f64, ch_enable: bool) -> BoilerCommand {
    BoilerCommand { tset, ch_enable }
}
