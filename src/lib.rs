//! Zonetherm controller library.
//!
//! Exposes the control logic, entities and adapters for integration
//! testing; `main.rs` wires them to the console transport.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod context;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod outside;
pub mod payload;
pub mod plant;
pub mod runtime;
pub mod scheduler;
pub mod sensors;
pub mod zone;
