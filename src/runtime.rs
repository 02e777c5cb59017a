//! Async runtime: one task per entity plus the engine task.
//!
//! Runs on the calling thread using `edge-executor` for cooperative
//! scheduling and `async-io-mini` for reactor-driven timers.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │  futures_lite::future::block_on                              │
//!  │  ┌────────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                          │  │
//!  │  │                                                        │  │
//!  │  │  ┌────────────┐ ┌─────────┐        ┌───────────────┐   │  │
//!  │  │  │ Zone tasks │ │ Outside │ ─────▶ │ Engine task   │   │  │
//!  │  │  │ (1 / zone) │ │ task    │ inbox  │ quiet ⏱ + ♥ ⏱ │   │  │
//!  │  │  └────────────┘ └─────────┘        └───────────────┘   │  │
//!  │  └────────────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entity tasks block only on their own inbox.  Each wake drains
//! everything queued and applies it as one batch, so a burst costs one
//! recompute and at most one engine signal.

use std::sync::Arc;
use std::time::Instant;

use futures_lite::future;
use log::info;

use crate::app::ports::{BoilerPort, EventSink};
use crate::app::service::ControlEngine;
use crate::events::{EngineEvent, EngineInbox};
use crate::outside::Outside;
use crate::plant::Plant;
use crate::zone::Zone;

/// Executor run-queue capacity.
const TASK_QUEUE: usize = 64;

/// Wait for one zone message, drain the rest, apply, signal the engine.
pub async fn zone_step(zone: &Zone, engine: &EngineInbox) {
    let mut batch = vec![zone.inbox().receive().await];
    while let Ok(next) = zone.inbox().try_receive() {
        batch.push(next);
    }

    let signal = zone.apply_batch(batch, Instant::now());
    if signal.force {
        engine.send(EngineEvent::ForceUpdate).await;
    }
    if signal.dirty {
        engine.send(EngineEvent::ZoneDirty(zone.id())).await;
    }
}

/// Outside counterpart of [`zone_step`].
pub async fn outside_step(outside: &Outside, engine: &EngineInbox) {
    let mut batch = vec![outside.inbox().receive().await];
    while let Ok(next) = outside.inbox().try_receive() {
        batch.push(next);
    }

    if let Some(t) = outside.apply_batch(batch, Instant::now()) {
        engine.send(EngineEvent::OutsideChanged(t)).await;
    }
}

async fn zone_task(zone: Arc<Zone>, engine: Arc<EngineInbox>) {
    loop {
        zone_step(&zone, &engine).await;
    }
}

async fn outside_task(outside: Arc<Outside>, engine: Arc<EngineInbox>) {
    loop {
        outside_step(&outside, &engine).await;
    }
}

/// Engine loop: sleep until the next inbox event or timer deadline,
/// whichever comes first, then let the engine catch up.
async fn engine_task<B: BoilerPort, S: EventSink>(
    mut engine: ControlEngine,
    inbox: Arc<EngineInbox>,
    outside: Arc<Outside>,
    mut boiler: B,
    mut sink: S,
) {
    let now = Instant::now();
    if let Some(t) = outside.temperature() {
        engine.handle_event(EngineEvent::OutsideChanged(t), now, &mut sink);
    }
    engine.start(now, &mut sink);

    loop {
        let wait = engine
            .next_deadline()
            .saturating_duration_since(Instant::now());
        let event = future::or(async { Some(inbox.receive().await) }, async {
            async_io_mini::Timer::after(wait).await;
            None
        })
        .await;

        let now = Instant::now();
        if let Some(event) = event {
            engine.handle_event(event, now, &mut sink);
            while let Ok(event) = inbox.try_receive() {
                engine.handle_event(event, now, &mut sink);
            }
        }
        engine.poll(now, &mut boiler, &mut sink);
    }
}

/// Spawn every entity task and drive the engine on the calling thread.
/// Does not return.
pub fn run<B: BoilerPort, S: EventSink>(plant: &Plant, engine: ControlEngine, boiler: B, sink: S) {
    let executor: edge_executor::LocalExecutor<'_, TASK_QUEUE> = edge_executor::LocalExecutor::new();

    for zone in plant.zones() {
        executor
            .spawn(zone_task(zone.clone(), plant.engine_inbox().clone()))
            .detach();
    }
    executor
        .spawn(outside_task(plant.outside().clone(), plant.engine_inbox().clone()))
        .detach();

    info!("Runtime: {} entity task(s) started", plant.zones().len() + 1);

    future::block_on(executor.run(engine_task(
        engine,
        plant.engine_inbox().clone(),
        plant.outside().clone(),
        boiler,
        sink,
    )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use crate::app::commands::{OutsideInput, ZoneInput};
    use crate::config::{OutsideConfig, SensorConfig, ZoneConfig};
    use crate::context::Context;
    use crate::payload::bounded;

    fn ctx() -> Context {
        Context::new(Arc::new(MemoryStore::new()))
    }

    fn value(v: &str) -> ZoneInput {
        ZoneInput::SensorValue {
            sensor: 0,
            payload: bounded(v).unwrap(),
        }
    }

    #[test]
    fn burst_becomes_one_dirty_signal() {
        let cfg = ZoneConfig {
            name: "living".into(),
            sensors: vec![SensorConfig::default()],
            ..ZoneConfig::default()
        };
        let zone = Zone::new(3, &cfg, ctx(), Instant::now());
        let engine = EngineInbox::new();
        for v in ["20", "20.5", "21"] {
            zone.inbox().try_send(value(v)).unwrap();
        }

        future::block_on(zone_step(&zone, &engine));

        assert_eq!(engine.try_receive().ok(), Some(EngineEvent::ZoneDirty(3)));
        assert!(engine.try_receive().is_err());
        assert_eq!(zone.demand_inputs().temperature, 21.0);
    }

    #[test]
    fn outside_step_pushes_temperature() {
        let cfg = OutsideConfig {
            temperature_sensors: vec![SensorConfig::default()],
            ..OutsideConfig::default()
        };
        let outside = Outside::new(&cfg, &ctx(), Instant::now());
        let engine = EngineInbox::new();
        outside
            .inbox()
            .try_send(OutsideInput::SensorValue {
                sensor: 0,
                payload: bounded("-4").unwrap(),
            })
            .unwrap();

        future::block_on(outside_step(&outside, &engine));

        assert_eq!(engine.try_receive().ok(), Some(EngineEvent::OutsideChanged(-4.0)));
    }
}
