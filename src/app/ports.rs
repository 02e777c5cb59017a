//! Port traits: the hexagonal boundary between the control engine and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlEngine (domain)
//! ```
//!
//! Driven adapters (boiler publisher, event sinks, durable storage) implement
//! these traits.  The [`ControlEngine`](super::service::ControlEngine) and the
//! zone/outside entities consume them, so the domain core never touches a
//! broker connection or a filesystem directly.
//!
//! ## Failure policy
//!
//! - Publishing is fire-and-forget: a failed publish is logged by the caller
//!   and the decision loop continues.
//! - Storage is best-effort: in-memory state stays authoritative for the
//!   life of the process.
//! - Neither may block the decision loop.  Production adapters sit behind
//!   [`Outbox`](crate::adapters::outbox::Outbox) writer threads.

use super::events::{AppEvent, BoilerCommand};

// ───────────────────────────────────────────────────────────────
// Boiler port (driven adapter: domain → boiler gateway)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the engine calls this to command the boiler.
pub trait BoilerPort {
    /// Publish the target water temperature and CH-enable flag.
    fn publish(&mut self, command: &BoilerCommand) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (log, stdout, broker topics).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ durable storage)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for last-known values.
///
/// - Keys are namespaced (`sensor`, `zone`, `controller`) and keyed by the
///   stable entity name.
/// - Write operations MUST be atomic: a reader never observes a partial
///   value.
/// - Implementations are shared between entity tasks, hence `&self`
///   receivers and the `Send + Sync` bound.
pub trait StoragePort: Send + Sync {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration loading and validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No config file at the given path.
    NotFound,
    /// Config file could not be parsed.
    Corrupted(String),
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error while reading the file.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// The write-behind queue is full; the write was dropped.
    QueueFull,
    /// Caller buffer too small for the stored value.
    BufferTooSmall,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`BoilerPort`] operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishError {
    /// The outbound queue is full; the command was dropped.
    QueueFull,
    /// The transport accepted the message but failed to deliver it.
    Transport(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::QueueFull => write!(f, "write queue full"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for PublishError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::QueueFull => write!(f, "outbound queue full"),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}
