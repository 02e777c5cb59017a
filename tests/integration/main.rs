//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock ports.  Entities, routing and the engine are the real
//! ones; only the boiler, the event sink, the store and the clock are
//! faked.

mod engine_tests;
mod mock_ports;
mod persistence_tests;
mod routing_tests;
mod write_behind_tests;
