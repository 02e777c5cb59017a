//! Values written by one controller instance seed the next.

use std::sync::Arc;

use zonetherm::adapters::store::MemoryStore;
use zonetherm::app::events::BoilerCommand;

use crate::mock_ports::{Harness, cmd, config};

#[test]
fn restart_restores_inputs_and_enable_flag() {
    let cfg = config(&["living"]);
    let store = Arc::new(MemoryStore::new());

    let mut first = Harness::with_store(&cfg, store.clone());
    first.start();
    first.seed_reference(&["living"]);
    first.send("zonetherm/control/enable", "off");
    first.advance_ms(50);
    assert_eq!(first.last_command(), Some(BoilerCommand::OFF));

    let mut second = Harness::with_store(&cfg, store);
    assert!(!second.engine.enabled());
    second.start();
    second.advance_ms(50);
    assert_eq!(second.last_command(), Some(BoilerCommand::OFF));
    assert_eq!(second.engine.command(), cmd(51.0, true));

    second.send("zonetherm/control/enable", "on");
    second.advance_ms(50);
    assert_eq!(second.last_command(), Some(cmd(51.0, true)));
}

#[test]
fn fresh_store_starts_enabled_and_empty() {
    let mut h = Harness::new(&config(&["living"]));
    assert!(h.engine.enabled());
    assert_eq!(h.plant.outside().temperature(), None);
    h.start();
    h.advance_ms(50);
    assert_eq!(h.engine.demand(0), None);
}
