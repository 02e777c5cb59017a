//! Write-behind outboxes.
//!
//! Publishing and persisting can block (a stalled stdout pipe, an fsync).
//! The control loop never waits on either: it posts into a bounded
//! `embassy-sync` channel and a dedicated writer thread drains it into the
//! real adapter.
//!
//! ```text
//! ┌────────────────┐  try_send  ┌─────────┐  receive().await  ┌───────────────┐
//! │ executor thread│───────────▶│ Outbox  │──────────────────▶│ writer thread │
//! │ (never blocks) │            │ channel │                   │ (may block)   │
//! └────────────────┘            └─────────┘                   └───────────────┘
//! ```
//!
//! A full outbox drops the item with a warning.  The heartbeat republishes
//! the boiler command and every persisted value is rewritten on its next
//! change, so a dropped item is recovered without a retry queue.

use std::io;
use std::sync::Arc;
use std::thread;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::events::{AppEvent, BoilerCommand};
use crate::app::ports::{BoilerPort, EventSink, PublishError};

/// Items buffered per outbox before new ones are dropped.
pub const OUTBOX_DEPTH: usize = 32;

pub type OutboxQueue<T> = Channel<CriticalSectionRawMutex, T, OUTBOX_DEPTH>;

/// Producer half.  Never blocks.
pub struct Outbox<T> {
    label: &'static str,
    queue: Arc<OutboxQueue<T>>,
}

impl<T: Send + 'static> Outbox<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            queue: Arc::new(Channel::new()),
        }
    }

    /// Queue `item`.  Returns `false` (and logs) when the outbox is full.
    pub fn post(&self, item: T) -> bool {
        if self.queue.try_send(item).is_err() {
            warn!("Outbox '{}': full, dropping item", self.label);
            return false;
        }
        true
    }

    /// Start the writer thread that feeds every posted item to `handler`.
    pub fn spawn_writer<F>(&self, handler: F) -> io::Result<thread::JoinHandle<()>>
    where
        F: FnMut(T) + Send + 'static,
    {
        let queue = self.queue.clone();
        let label = self.label;
        let handle = thread::Builder::new()
            .name(format!("{label}-writer"))
            .spawn(move || futures_lite::future::block_on(drain_loop(&queue, handler)))?;
        info!("Outbox '{}': writer thread started", label);
        Ok(handle)
    }
}

async fn drain_loop<T>(queue: &OutboxQueue<T>, mut handler: impl FnMut(T)) {
    loop {
        let item = queue.receive().await;
        handler(item);
    }
}

// ── Port impls ────────────────────────────────────────────────

impl BoilerPort for Outbox<BoilerCommand> {
    fn publish(&mut self, command: &BoilerCommand) -> Result<(), PublishError> {
        if self.post(*command) {
            Ok(())
        } else {
            Err(PublishError::QueueFull)
        }
    }
}

impl EventSink for Outbox<AppEvent> {
    fn emit(&mut self, event: &AppEvent) {
        self.post(event.clone());
    }
}

/// Run `port` behind an outbox on its own writer thread.  Publish failures
/// on the writer side are logged there.
pub fn spawn_boiler<B>(mut port: B) -> io::Result<Outbox<BoilerCommand>>
where
    B: BoilerPort + Send + 'static,
{
    let outbox = Outbox::new("boiler");
    outbox.spawn_writer(move |command: BoilerCommand| {
        if let Err(e) = port.publish(&command) {
            warn!("Boiler: publish failed: {}", e);
        }
    })?;
    Ok(outbox)
}

/// Run `sink` behind an outbox on its own writer thread.
pub fn spawn_events<S>(mut sink: S) -> io::Result<Outbox<AppEvent>>
where
    S: EventSink + Send + 'static,
{
    let outbox = Outbox::new("events");
    outbox.spawn_writer(move |event: AppEvent| sink.emit(&event))?;
    Ok(outbox)
}
