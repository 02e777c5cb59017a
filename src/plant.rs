//! The heating plant as configured: every entity plus the routing that
//! feeds them.
//!
//! Built once at start-up; the set of zones and sensors never changes.
//! [`Plant::deliver`] is the single entry point for inbound messages and
//! may be called from any thread.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::adapters::topics::{Delivery, TopicRouter};
use crate::config::ControllerConfig;
use crate::context::Context;
use crate::events::EngineInbox;
use crate::outside::Outside;
use crate::zone::Zone;

pub struct Plant {
    zones: Vec<Arc<Zone>>,
    outside: Arc<Outside>,
    engine_inbox: Arc<EngineInbox>,
    router: TopicRouter,
}

impl Plant {
    pub fn build(cfg: &ControllerConfig, ctx: &Context, now: Instant) -> Self {
        let zones: Vec<Arc<Zone>> = cfg
            .zones
            .iter()
            .enumerate()
            .map(|(id, zc)| Arc::new(Zone::new(id, zc, ctx.clone(), now)))
            .collect();
        let outside = Arc::new(Outside::new(&cfg.outside, ctx, now));
        let router = TopicRouter::new(cfg);

        info!(
            "Plant: {} zone(s), {} outside sensor(s), {} data topic(s)",
            zones.len(),
            outside.sensors().len(),
            router.data_topics().count()
        );

        Self {
            zones,
            outside,
            engine_inbox: Arc::new(EngineInbox::new()),
            router,
        }
    }

    pub fn zones(&self) -> &[Arc<Zone>] {
        &self.zones
    }

    pub fn outside(&self) -> &Arc<Outside> {
        &self.outside
    }

    pub fn engine_inbox(&self) -> &Arc<EngineInbox> {
        &self.engine_inbox
    }

    /// Route one inbound message and queue it.  Never blocks: a full inbox
    /// drops the message with a warning.
    pub fn deliver(&self, topic: &str, payload: &str) {
        match self.router.route(topic, payload) {
            Ok(deliveries) if deliveries.is_empty() => {
                debug!("Plant: no route for '{}'", topic);
            }
            Ok(deliveries) => deliveries.into_iter().for_each(|d| self.send(d)),
            Err(e) => warn!("Plant: dropped message on '{}': {}", topic, e),
        }
    }

    fn send(&self, delivery: Delivery) {
        match delivery {
            Delivery::Zone(id, input) => {
                let Some(zone) = self.zones.get(id) else {
                    warn!("Plant: no zone #{}", id);
                    return;
                };
                if zone.inbox().try_send(input).is_err() {
                    warn!("Zone '{}': inbox full, dropping message", zone.name());
                }
            }
            Delivery::Outside(input) => {
                if self.outside.inbox().try_send(input).is_err() {
                    warn!("Outside: inbox full, dropping message");
                }
            }
            Delivery::Engine(event) => {
                if self.engine_inbox.try_send(event).is_err() {
                    warn!("Engine: inbox full, dropping {:?}", event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use crate::app::commands::{GlobalCommand, ZoneInput};
    use crate::config::{SensorConfig, ZoneConfig};
    use crate::events::EngineEvent;
    use crate::zone::ZONE_INBOX_DEPTH;

    fn plant() -> Plant {
        let cfg = ControllerConfig {
            zones: vec![ZoneConfig {
                name: "living".into(),
                sensors: vec![SensorConfig {
                    topic: "living/t".into(),
                    ..SensorConfig::default()
                }],
                ..ZoneConfig::default()
            }],
            ..ControllerConfig::default()
        };
        Plant::build(&cfg, &Context::new(Arc::new(MemoryStore::new())), Instant::now())
    }

    #[test]
    fn data_goes_to_the_zone_inbox() {
        let p = plant();
        p.deliver("living/t", "20.5");
        assert!(matches!(
            p.zones()[0].inbox().try_receive(),
            Ok(ZoneInput::SensorValue { sensor: 0, .. })
        ));
    }

    #[test]
    fn controls_go_to_the_engine_inbox() {
        let p = plant();
        p.deliver("zonetherm/control/enable", "on");
        assert_eq!(
            p.engine_inbox().try_receive().ok(),
            Some(EngineEvent::Control(GlobalCommand::Enable(true)))
        );
    }

    #[test]
    fn full_inbox_drops_instead_of_blocking() {
        let p = plant();
        for _ in 0..ZONE_INBOX_DEPTH + 5 {
            p.deliver("living/t", "20");
        }
        let mut n = 0;
        while p.zones()[0].inbox().try_receive().is_ok() {
            n += 1;
        }
        assert_eq!(n, ZONE_INBOX_DEPTH);
    }
}
