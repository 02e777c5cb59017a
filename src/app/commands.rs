//! Inbound commands to the application core.
//!
//! Two kinds arrive from the transport shim:
//!
//! - **entity inputs** ([`ZoneInput`], [`OutsideInput`]) queued to the owning
//!   entity's inbox and applied on that entity's task;
//! - **global commands** ([`GlobalCommand`]) delivered to the
//!   [`ControlEngine`](super::service::ControlEngine).
//!
//! Parameter overrides arrive as raw text and are parsed here, so a
//! malformed value is rejected before it is queued anywhere.

use log::LevelFilter;

use crate::error::ParameterError;
use crate::payload::Payload;

/// Parse a raw override value as a finite `f64`.
fn parse_number(name: &'static str, raw: &str) -> Result<f64, ParameterError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParameterError::InvalidValue {
            name,
            raw: raw.to_string(),
        }),
    }
}

// ───────────────────────────────────────────────────────────────
// Per-sensor overrides
// ───────────────────────────────────────────────────────────────

/// Tunable transform parameters of one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorParameter {
    Weight,
    Offset,
    Scale,
}

impl SensorParameter {
    pub fn from_name(name: &str) -> Result<Self, ParameterError> {
        match name {
            "weight" => Ok(Self::Weight),
            "offset" => Ok(Self::Offset),
            "scale" => Ok(Self::Scale),
            other => Err(ParameterError::Unknown(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Offset => "offset",
            Self::Scale => "scale",
        }
    }

    /// Parse `raw` as the new value for this parameter.
    pub fn parse_value(self, raw: &str) -> Result<f64, ParameterError> {
        let value = parse_number(self.as_str(), raw)?;
        if self == Self::Weight && value < 0.0 {
            return Err(ParameterError::InvalidValue {
                name: "weight",
                raw: raw.to_string(),
            });
        }
        Ok(value)
    }
}

// ───────────────────────────────────────────────────────────────
// Per-zone overrides
// ───────────────────────────────────────────────────────────────

/// A live override of one zone parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneParameter {
    /// Zone weight in cross-zone aggregation.
    Weight(f64),
    /// Per-zone heating parameter, replacing the global default.
    HeatingParameter(f64),
    /// Room-feedback factor applied to the heating parameter.
    RoomCompensation(f64),
    /// Averaging strategy name for the zone's sensors.
    AverageType(String),
}

impl ZoneParameter {
    pub fn parse(name: &str, raw: &str) -> Result<Self, ParameterError> {
        match name {
            "weight" => {
                let w = parse_number("weight", raw)?;
                if w < 0.0 {
                    return Err(ParameterError::InvalidValue {
                        name: "weight",
                        raw: raw.to_string(),
                    });
                }
                Ok(Self::Weight(w))
            }
            "heating_parameter" => parse_number("heating_parameter", raw).map(Self::HeatingParameter),
            "room_compensation" => parse_number("room_compensation", raw).map(Self::RoomCompensation),
            "sensors_average_type" => Ok(Self::AverageType(raw.trim().to_string())),
            other => Err(ParameterError::Unknown(other.to_string())),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Entity inbox messages
// ───────────────────────────────────────────────────────────────

/// Work item for a zone task.  `sensor` indexes the zone's sensor list.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneInput {
    SensorValue { sensor: usize, payload: Payload },
    Setpoint(Payload),
    SensorParameter {
        sensor: usize,
        parameter: SensorParameter,
        value: f64,
    },
    Parameter(ZoneParameter),
}

/// Work item for the outside task.
#[derive(Debug, Clone, PartialEq)]
pub enum OutsideInput {
    SensorValue { sensor: usize, payload: Payload },
    SensorParameter {
        sensor: usize,
        parameter: SensorParameter,
        value: f64,
    },
    AverageType(String),
}

// ───────────────────────────────────────────────────────────────
// Controller-wide commands
// ───────────────────────────────────────────────────────────────

/// Commands addressed to the control engine itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlobalCommand {
    /// Heating parameter for zones without their own override.
    DefaultHeatingParameter(f64),
    /// Global heating enable.
    Enable(bool),
    /// Runtime log verbosity.
    LogLevel(LevelFilter),
}

impl GlobalCommand {
    pub fn parse(name: &str, raw: &str) -> Result<Self, ParameterError> {
        match name {
            "default_heating_parameter" => {
                parse_number("default_heating_parameter", raw).map(Self::DefaultHeatingParameter)
            }
            "enable" => parse_enable(raw).map(Self::Enable),
            "log_level" => raw
                .trim()
                .parse::<LevelFilter>()
                .map(Self::LogLevel)
                .map_err(|_| ParameterError::InvalidValue {
                    name: "log_level",
                    raw: raw.to_string(),
                }),
            other => Err(ParameterError::Unknown(other.to_string())),
        }
    }
}

/// `true`/`on` and `false`/`off`, case-insensitive.
pub fn parse_enable(raw: &str) -> Result<bool, ParameterError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" => Ok(true),
        "false" | "off" => Ok(false),
        _ => Err(ParameterError::InvalidValue {
            name: "enable",
            raw: raw.to_string(),
        }),
    }
}
