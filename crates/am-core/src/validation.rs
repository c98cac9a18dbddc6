use crate::error::RequestError;
use crate::types::RequestStatus;
use chrono::{DateTime, Utc};

/// The request state machine: open -> in_progress -> completed, with
/// cancellation allowed from any non-completed state. Terminal states are
/// never left.
pub fn validate_transition(
    from: RequestStatus,
    to: RequestStatus,
) -> Result<(), RequestError> {
    use RequestStatus::{Cancelled, Completed, InProgress, Open};

    let valid = match (from, to) {
        (Open, InProgress) => true,
        (InProgress, Completed) => true,
        (Open | InProgress | Cancelled, Cancelled) => true,
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(RequestError::InvalidState {
            message: format!("cannot move request from {from} to {to}"),
        })
    }
}

/// Deadlines arrive as free-form client strings. Missing or unparseable
/// values fall back to "now" instead of rejecting the request; existing
/// clients depend on this.
pub fn parse_deadline(value: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = value else {
        return Utc::now();
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Utc::now();
    }
    let normalized = raw.replace('Z', "+00:00");
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return parsed.with_timezone(&Utc);
    }
    // Datetime-local inputs come without an offset.
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return naive.and_utc();
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return naive.and_utc();
    }
    Utc::now()
}
