//! Engine inbox.
//!
//! Every change signal in the system funnels into one bounded channel
//! consumed by the engine task:
//!
//! ```text
//! ┌──────────────┐ ZoneDirty(id)
//! │ Zone tasks   │──────────────▶┌──────────────┐
//! │ Outside task │──────────────▶│ Engine inbox │────▶ ControlEngine
//! │ Control shim │──────────────▶│  (bounded)   │
//! └──────────────┘ Control(..)   └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::commands::GlobalCommand;
use crate::zone::ZoneId;

/// Maximum number of pending engine events.
pub const ENGINE_INBOX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// The outside controller produced a new temperature.
    OutsideChanged(f64),
    /// A zone's inputs changed; recompute its demand.
    ZoneDirty(ZoneId),
    /// Recompute every zone and republish.
    ForceUpdate,
    /// Controller-wide command from the control topics.
    Control(GlobalCommand),
}

pub type EngineInbox = Channel<CriticalSectionRawMutex, EngineEvent, ENGINE_INBOX_DEPTH>;
