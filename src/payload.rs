//! Numeric extraction from inbound payloads.
//!
//! Sensors and setpoint sources publish either a bare number (`"21.5"`) or a
//! JSON object from which one configured field is taken
//! (`{"temperature": 21.5, "humidity": 40}` with field `temperature`).

use serde_json::Value;

use crate::error::PayloadError;

/// Upper bound on a queued payload, in bytes.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Bounded payload buffer carried through entity inboxes.
pub type Payload = heapless::String<MAX_PAYLOAD_LEN>;

/// Copy `raw` into a bounded [`Payload`].
pub fn bounded(raw: &str) -> Result<Payload, PayloadError> {
    let mut out = Payload::new();
    out.push_str(raw)
        .map_err(|_| PayloadError::TooLong(raw.len()))?;
    Ok(out)
}

/// Extract a finite `f64` from `raw`.
///
/// With `json_entry == None` the whole payload must be a number; otherwise
/// it must be a JSON object whose `json_entry` member is a number.
pub fn extract_f64(raw: &[u8], json_entry: Option<&str>) -> Result<f64, PayloadError> {
    let text = core::str::from_utf8(raw).map_err(|_| PayloadError::NotUtf8)?;

    let value = match json_entry {
        None => text
            .trim()
            .parse::<f64>()
            .map_err(|_| PayloadError::NotANumber(text.trim().to_string()))?,
        Some(field) => {
            let doc: Value = serde_json::from_str(text)
                .map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
            let object = doc
                .as_object()
                .ok_or_else(|| PayloadError::InvalidJson("not an object".into()))?;
            let member = object
                .get(field)
                .ok_or_else(|| PayloadError::MissingField(field.to_string()))?;
            member
                .as_f64()
                .ok_or_else(|| PayloadError::WrongType(field.to_string()))?
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(PayloadError::NonFinite)
    }
}
