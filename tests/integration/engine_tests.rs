//! Decision loop end to end: inbound messages → zone demand → aggregation
//! → boiler command.

use std::time::Duration;

use zonetherm::app::events::{AppEvent, BoilerCommand, PublishReason};

use crate::mock_ports::{Harness, cmd, config};

fn reference() -> Harness {
    let mut h = Harness::new(&config(&["living"]));
    h.start();
    h.seed_reference(&["living"]);
    h.advance_ms(50);
    h
}

#[test]
fn start_without_data_publishes_fallback() {
    let mut h = Harness::new(&config(&["living"]));
    h.start();
    h.advance_ms(49);
    assert!(h.boiler.commands.is_empty());
    h.advance_ms(1);
    assert_eq!(h.boiler.commands, [cmd(10.0, false)]);
}

#[test]
fn reference_zone_publishes_once_after_quiet_period() {
    let h = reference();
    assert_eq!(h.boiler.commands, [cmd(51.0, true)]);
    assert_eq!(h.engine.cycles(), 1);
    assert!(matches!(h.sink.events.first(), Some(AppEvent::Started { zones: 1, enabled: true })));
}

#[test]
fn burst_of_updates_runs_one_cycle() {
    let mut h = reference();
    h.send("living/t", "19.5");
    h.advance_ms(20);
    h.send("living/t", "19.0");
    h.advance_ms(20);
    h.send("living/t", "19.2");
    h.advance_ms(49);
    assert_eq!(h.engine.cycles(), 1, "quiet period restarts on every change");

    h.advance_ms(1);
    assert_eq!(h.engine.cycles(), 2);
    assert_eq!(h.boiler.commands.len(), 2);
    let last = h.last_command().unwrap();
    assert!(last.tset > 51.0, "cooler room raises Tset, got {}", last.tset);
}

#[test]
fn heartbeat_republishes_every_period() {
    let mut h = reference();
    h.advance(Duration::from_secs(30) - Duration::from_millis(50));
    h.advance(Duration::from_secs(30));
    h.advance(Duration::from_secs(30));

    let beats = h.sink.publishes(PublishReason::Heartbeat);
    assert_eq!(beats, [cmd(51.0, true); 3]);
    assert_eq!(h.boiler.commands.len(), 4);
}

#[test]
fn unchanged_input_does_not_republish() {
    let mut h = reference();
    h.send("living/t", "20");
    h.send("living/sp", "20");
    h.advance_ms(50);
    assert_eq!(h.boiler.commands.len(), 1);
}

#[test]
fn malformed_payload_is_ignored() {
    let mut h = reference();
    h.send("living/t", "warm");
    h.send("living/sp", "{\"value\": 21}");
    h.advance_ms(50);
    assert_eq!(h.engine.cycles(), 1);
    assert_eq!(h.boiler.commands.len(), 1);
}

#[test]
fn disable_overrides_and_enable_restores() {
    let mut h = reference();
    h.send("zonetherm/control/enable", "off");
    h.advance_ms(50);
    assert_eq!(h.last_command(), Some(BoilerCommand::OFF));
    assert_eq!(h.engine.command(), cmd(51.0, true), "computed command is kept");
    assert!(h.sink.events.iter().any(|e| matches!(e, AppEvent::HeatingEnabled(false))));

    // Heartbeats honour the flag too.
    h.advance(Duration::from_secs(30));
    assert_eq!(h.last_command(), Some(BoilerCommand::OFF));

    // Inputs still flow while disabled.
    h.send("living/t", "19.0");
    h.advance_ms(50);
    assert_eq!(h.last_command(), Some(BoilerCommand::OFF));

    h.send("zonetherm/control/enable", "ON");
    h.advance_ms(50);
    assert!(h.last_command().unwrap().ch_enable);
}

#[test]
fn two_zones_hottest_dominates() {
    let mut h = Harness::new(&config(&["living", "bath"]));
    h.start();
    h.seed_reference(&["living"]);
    h.send("bath/t", "19");
    h.send("bath/sp", "21");
    h.advance_ms(50);

    assert_eq!(h.boiler.commands, [cmd(61.0, true)]);

    let report = h
        .sink
        .events
        .iter()
        .rev()
        .find_map(|e| match e {
            AppEvent::Aggregated(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(report.max.as_ref().unwrap().zone, "bath");
    assert_eq!(report.min.as_ref().unwrap().zone, "living");
    assert_eq!(report.max_gap.as_ref().unwrap().demand_value, 2.0);
}

#[test]
fn default_heating_parameter_forces_recompute() {
    let mut h = reference();
    h.send("zonetherm/control/default_heating_parameter", "10");
    h.advance_ms(50);
    assert_eq!(h.engine.default_heating_parameter(), 10.0);
    assert_eq!(h.last_command(), Some(cmd(39.5, true)));
}

#[test]
fn zone_heating_parameter_overrides_default() {
    let mut h = reference();
    h.send("zonetherm/control/zone/living/heating_parameter", "20");
    h.advance_ms(50);
    assert_eq!(h.last_command(), Some(cmd(62.5, true)));

    // The global default no longer affects this zone.
    h.send("zonetherm/control/default_heating_parameter", "10");
    h.advance_ms(50);
    assert_eq!(h.last_command(), Some(cmd(62.5, true)));
}

#[test]
fn warm_outside_turns_heating_off() {
    let mut h = reference();
    h.send("weather/t", "18");
    h.advance_ms(50);
    assert_eq!(h.last_command(), Some(cmd(10.0, false)));
    assert_eq!(h.engine.outside(), 18.0);
}

#[test]
fn failed_publish_does_not_stop_the_loop() {
    let mut h = Harness::new(&config(&["living"]));
    h.boiler.fail = true;
    h.start();
    h.seed_reference(&["living"]);
    h.advance_ms(50);
    assert!(h.boiler.commands.is_empty());
    assert_eq!(h.engine.command(), cmd(51.0, true));

    h.boiler.fail = false;
    h.advance(Duration::from_secs(30));
    assert_eq!(h.boiler.commands, [cmd(51.0, true)]);
}
