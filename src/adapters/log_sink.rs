//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade.  The console adapter wraps it and additionally
//! publishes some events as topic messages.

use log::{debug, info};

use crate::app::events::{AppEvent, PublishReason};
use crate::app::ports::EventSink;
use crate::diagnostics::DemandRecord;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn log_record(kind: &str, r: &DemandRecord) {
    info!(
        "Zone with {} demand `{}`: SP={:.2}, T={:.2} Tset={:.2}",
        kind, r.zone, r.setpoint, r.temperature, r.demand_value
    );
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { zones, enabled } => {
                info!("START | zones={} enabled={}", zones, enabled);
            }
            AppEvent::BoilerCommand { command, reason } => match reason {
                PublishReason::Changed => info!(
                    "BOILER | Tset={} CH={}",
                    command.tset_payload(),
                    command.ch_enable_payload()
                ),
                PublishReason::Heartbeat => debug!(
                    "BOILER | heartbeat Tset={} CH={}",
                    command.tset_payload(),
                    command.ch_enable_payload()
                ),
            },
            AppEvent::Aggregated(report) => {
                if let Some(r) = &report.max {
                    log_record("MAX", r);
                }
                if let Some(r) = &report.min {
                    log_record("MIN", r);
                }
                debug!(
                    "New boiler parameters: Tset={:.2}, chEnable={}",
                    report.tset, report.ch_enable
                );
            }
            AppEvent::HeatingEnabled(on) => {
                info!("HEATING | {}", if *on { "ON" } else { "OFF" });
            }
        }
    }
}
