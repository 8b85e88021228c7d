use crate::model::{DeviceId, Ms, ReservationId};

#[derive(Debug)]
pub enum EngineError {
    UnknownDevice(DeviceId),
    UnknownReservation(ReservationId),
    AlreadyExists(DeviceId),
    InvalidTerm(&'static str),
    /// Carries the id of the conflicting reservation.
    Unavailable(ReservationId),
    TooLate {
        start_at: Ms,
        required_notice_ms: Ms,
    },
    InvalidDiscount(f64),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UnknownDevice(id) => write!(f, "unknown device: {id}"),
            EngineError::UnknownReservation(id) => write!(f, "unknown reservation: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "device already exists: {id}"),
            EngineError::InvalidTerm(msg) => write!(f, "invalid term: {msg}"),
            EngineError::Unavailable(id) => {
                write!(f, "device unavailable: conflicts with reservation {id}")
            }
            EngineError::TooLate {
                start_at,
                required_notice_ms,
            } => write!(
                f,
                "too late to cancel: start {start_at} is within the {required_notice_ms}ms notice window"
            ),
            EngineError::InvalidDiscount(d) => {
                write!(f, "invalid discount {d}: must be within [0, 1]")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
