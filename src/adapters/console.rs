//! Line-oriented console transport.
//!
//! Inbound: one `<topic> <payload>` message per line on stdin; the payload
//! is the remainder of the line.  Blank lines and `#` comments are skipped.
//!
//! Outbound: boiler commands and diagnostics are written as
//! `<topic> <payload>` lines, so the binary can sit behind any pub/sub
//! bridge that speaks lines (e.g. `mosquitto_sub -v | zonetherm | ...`).

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;

use log::{info, warn};

use crate::app::events::{AppEvent, BoilerCommand};
use crate::app::ports::{BoilerPort, EventSink, PublishError};
use crate::config::{BoilerConfig, ControllerConfig};
use crate::plant::Plant;

use super::log_sink::LogEventSink;

/// Split one input line into `(topic, payload)`.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((topic, payload)) => Some((topic, payload.trim_start())),
        None => Some((line, "")),
    }
}

// ── Boiler output ─────────────────────────────────────────────

pub struct ConsoleBoiler<W: Write> {
    out: W,
    tset_topic: String,
    ch_enable_topic: String,
}

impl<W: Write> ConsoleBoiler<W> {
    pub fn new(cfg: &BoilerConfig, out: W) -> Self {
        Self {
            out,
            tset_topic: cfg.tset_topic.clone(),
            ch_enable_topic: cfg.ch_enable_topic.clone(),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BoilerPort for ConsoleBoiler<W> {
    /// Both lines go out in one write so other writers cannot split them.
    fn publish(&mut self, command: &BoilerCommand) -> Result<(), PublishError> {
        let lines = format!(
            "{} {}\n{} {}\n",
            self.tset_topic,
            command.tset_payload(),
            self.ch_enable_topic,
            command.ch_enable_payload()
        );
        self.out
            .write_all(lines.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

// ── Event output ──────────────────────────────────────────────

/// Logs every event and republishes the state topics.
pub struct ConsoleEvents<W: Write> {
    out: W,
    control_topic: String,
    log: LogEventSink,
}

impl<W: Write> ConsoleEvents<W> {
    pub fn new(cfg: &ControllerConfig, out: W) -> Self {
        Self {
            out,
            control_topic: cfg.control_topic.clone(),
            log: LogEventSink::new(),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, suffix: &str, payload: &str) {
        let res = writeln!(self.out, "{}/{} {}", self.control_topic, suffix, payload)
            .and_then(|()| self.out.flush());
        if let Err(e) = res {
            warn!("Console: write failed: {}", e);
        }
    }
}

impl<W: Write> EventSink for ConsoleEvents<W> {
    fn emit(&mut self, event: &AppEvent) {
        self.log.emit(event);
        match event {
            AppEvent::Started { enabled, .. } | AppEvent::HeatingEnabled(enabled) => {
                self.line("active", if *enabled { "ON" } else { "OFF" });
            }
            AppEvent::Aggregated(report) => {
                for (suffix, record) in report.records() {
                    let json = record.to_json();
                    self.line(suffix, &json);
                }
            }
            AppEvent::BoilerCommand { .. } => {}
        }
    }
}

// ── Input ─────────────────────────────────────────────────────

/// Feed stdin lines into the plant from a background thread.
pub fn spawn_stdin_reader(plant: Arc<Plant>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || read_lines(std::io::stdin().lock(), &plant))
}

/// Deliver every message in `input` until EOF or a read error.
pub fn read_lines(input: impl BufRead, plant: &Plant) {
    for line in input.lines() {
        match line {
            Ok(line) => {
                if let Some((topic, payload)) = parse_line(&line) {
                    plant.deliver(topic, payload);
                }
            }
            Err(e) => {
                warn!("Console: read error: {}", e);
                return;
            }
        }
    }
    info!("Console: input closed");
}
