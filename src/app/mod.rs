//! Application core: domain logic behind port traits.
//!
//! The [`service::ControlEngine`] runs the decision loop; entities and
//! adapters talk to it through [`commands`], [`events`] and the traits in
//! [`ports`], so the whole loop is testable with mock adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
