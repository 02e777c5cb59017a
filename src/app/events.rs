//! Outbound application events.
//!
//! The [`ControlEngine`](super::service::ControlEngine) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log, print or publish them to
//! broker topics.

use crate::diagnostics::AggregationReport;

/// Target water temperature used whenever heating is off or no zone qualifies.
pub const DEFAULT_TSET: f64 = 10.0;

/// The single command sent to the boiler gateway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoilerCommand {
    /// Target supply-water temperature (°C).
    pub tset: f64,
    /// Central-heating enable.
    pub ch_enable: bool,
}

impl BoilerCommand {
    /// The command published while heating is globally disabled.
    pub const OFF: Self = Self {
        tset: DEFAULT_TSET,
        ch_enable: false,
    };

    /// Tset wire format: one decimal.
    pub fn tset_payload(&self) -> String {
        format!("{:.1}", self.tset)
    }

    /// CH-enable wire format: `"0"` or `"1"`.
    pub fn ch_enable_payload(&self) -> &'static str {
        if self.ch_enable { "1" } else { "0" }
    }
}

impl Default for BoilerCommand {
    fn default() -> Self {
        Self::OFF
    }
}

/// Why a boiler command went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishReason {
    /// A recompute cycle produced a different (or forced) command.
    Changed,
    /// Unconditional periodic republish.
    Heartbeat,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The engine has started with the given number of zones.
    Started { zones: usize, enabled: bool },

    /// A boiler command was handed to the boiler port.
    BoilerCommand {
        command: BoilerCommand,
        reason: PublishReason,
    },

    /// One cross-zone aggregation run finished.
    Aggregated(AggregationReport),

    /// Global heating enable flag was set.
    HeatingEnabled(bool),
}
