//! Unified error types for the controller.
//!
//! Inbound data errors are transient: the offending update is logged and
//! dropped, and the entity state stays untouched.  Port failures (storage,
//! publishing) have their own typed errors in [`crate::app::ports`]; this
//! module covers everything that can go wrong *before* a value reaches an
//! entity.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Why an inbound message was not turned into an entity input.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// An inbound payload could not be turned into a number.
    Payload(PayloadError),
    /// A live parameter override was rejected.
    Parameter(ParameterError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload(e) => write!(f, "payload: {e}"),
            Self::Parameter(e) => write!(f, "parameter: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Payload errors
// ---------------------------------------------------------------------------

/// Why an inbound sensor/setpoint payload was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// Payload is not valid UTF-8.
    NotUtf8,
    /// Plain payload is not a number.
    NotANumber(String),
    /// Payload is not a JSON object.
    InvalidJson(String),
    /// The configured JSON field is absent.
    MissingField(String),
    /// The configured JSON field is not numeric.
    WrongType(String),
    /// Value parsed but is NaN or infinite.
    NonFinite,
    /// Payload exceeds the inbox buffer size.
    TooLong(usize),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotUtf8 => write!(f, "payload is not UTF-8"),
            Self::NotANumber(raw) => write!(f, "cannot parse `{raw}` as a number"),
            Self::InvalidJson(msg) => write!(f, "invalid JSON: {msg}"),
            Self::MissingField(field) => write!(f, "field `{field}` not found"),
            Self::WrongType(field) => write!(f, "field `{field}` is not a number"),
            Self::NonFinite => write!(f, "value is not finite"),
            Self::TooLong(len) => write!(f, "payload too long ({len} bytes)"),
        }
    }
}

impl From<PayloadError> for Error {
    fn from(e: PayloadError) -> Self {
        Self::Payload(e)
    }
}

// ---------------------------------------------------------------------------
// Parameter errors
// ---------------------------------------------------------------------------

/// Why a live parameter override was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// The parameter name is not known for this entity.
    Unknown(String),
    /// The value could not be parsed for this parameter.
    InvalidValue { name: &'static str, raw: String },
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "unknown parameter `{name}`"),
            Self::InvalidValue { name, raw } => {
                write!(f, "invalid value `{raw}` for `{name}`")
            }
        }
    }
}

impl From<ParameterError> for Error {
    fn from(e: ParameterError) -> Self {
        Self::Parameter(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Routing `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
