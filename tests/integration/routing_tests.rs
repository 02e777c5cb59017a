//! Topic routing through the plant into entity state.

use zonetherm::config::{SensorConfig, SetpointConfig};

use crate::mock_ports::{Harness, cmd, config};

#[test]
fn shared_json_topic_feeds_each_zone_its_field() {
    let mut cfg = config(&["living", "bath"]);
    for z in &mut cfg.zones {
        z.sensors = vec![SensorConfig {
            topic: "house/climate".into(),
            json_entry: Some(z.name.clone()),
            ..SensorConfig::default()
        }];
    }
    let mut h = Harness::new(&cfg);
    h.send("house/climate", r#"{"living": 20, "bath": 18.5, "humidity": 40}"#);

    assert_eq!(h.plant.zones()[0].demand_inputs().temperature, 20.0);
    assert_eq!(h.plant.zones()[1].demand_inputs().temperature, 18.5);
}

#[test]
fn setpoint_json_entry_and_scaling() {
    let mut cfg = config(&["living"]);
    cfg.zones[0].setpoint = SetpointConfig {
        topic: "thermostat/living".into(),
        json_entry: Some("target".into()),
        offset: 0.5,
        scale: 0.1,
    };
    let mut h = Harness::new(&cfg);
    h.send("thermostat/living", r#"{"target": 200}"#);
    assert_eq!(h.plant.zones()[0].demand_inputs().setpoint, 20.5);
}

#[test]
fn sensor_offset_applies_to_the_next_reading() {
    let mut h = Harness::new(&config(&["living"]));
    h.start();
    h.seed_reference(&["living"]);
    h.advance_ms(50);

    h.send("zonetherm/control/sensors/zone-living-1/offset", "-1");
    h.send("living/t", "21");
    h.advance_ms(50);

    assert_eq!(h.plant.zones()[0].demand_inputs().temperature, 20.0);
    assert_eq!(h.boiler.commands, [cmd(51.0, true)]);
}

#[test]
fn outside_averages_its_sensors() {
    let mut cfg = config(&["living"]);
    cfg.outside.temperature_sensors.push(SensorConfig {
        topic: "weather/t2".into(),
        ..SensorConfig::default()
    });
    let mut h = Harness::new(&cfg);
    h.send("weather/t", "-2");
    h.send("weather/t2", "4");
    assert_eq!(h.plant.outside().temperature(), Some(1.0));
}

#[test]
fn unknown_topics_and_bad_controls_change_nothing() {
    let mut h = Harness::new(&config(&["living"]));
    h.start();
    h.seed_reference(&["living"]);
    h.advance_ms(50);

    h.send("garage/t", "5");
    h.send("zonetherm/control/enable", "maybe");
    h.send("zonetherm/control/zone/attic/weight", "2");
    h.send("zonetherm/control/zone/living/bogus", "2");
    h.advance_ms(50);

    assert!(h.engine.enabled());
    assert_eq!(h.engine.cycles(), 1);
}
