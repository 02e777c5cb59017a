//! Fuzz target: `TopicRouter::route`
//!
//! The input is split at the first space into topic and payload and
//! routed against a small fixed plant.  Routing must never panic, and
//! every delivery must point at a configured entity.
//!
//! cargo fuzz run fuzz_topic_router

#![no_main]

use libfuzzer_sys::fuzz_target;
use zonetherm::adapters::topics::{Delivery, TopicRouter};
use zonetherm::config::{ControllerConfig, OutsideConfig, SensorConfig, ZoneConfig};

fn config() -> ControllerConfig {
    let sensor = |topic: &str| SensorConfig {
        topic: topic.into(),
        ..SensorConfig::default()
    };
    ControllerConfig {
        zones: vec![
            ZoneConfig {
                name: "living".into(),
                sensors: vec![sensor("living/t")],
                ..ZoneConfig::default()
            },
            ZoneConfig {
                name: "bath".into(),
                sensors: vec![sensor("living/t"), sensor("bath/t")],
                ..ZoneConfig::default()
            },
        ],
        outside: OutsideConfig {
            temperature_sensors: vec![sensor("weather/t")],
            ..OutsideConfig::default()
        },
        ..ControllerConfig::default()
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (topic, payload) = text.split_once(' ').unwrap_or((text, ""));
    let router = TopicRouter::new(&config());

    if let Ok(deliveries) = router.route(topic, payload) {
        for d in deliveries {
            if let Delivery::Zone(id, _) = d {
                assert!(id < 2, "delivery to unknown zone {id}");
            }
        }
    }
});
