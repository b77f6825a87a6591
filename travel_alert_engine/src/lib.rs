use std::fmt;

pub mod alert;
pub mod notify;
pub mod position_source;
pub mod sensor;
pub mod session;
pub mod store;

#[derive(Debug, Clone)]
pub enum TrackingError {
    /// The sensor reported an error or is absent. Tracking does not start;
    /// the caller has to re-invoke start.
    LocationUnavailable(String),
    /// No fix arrived within the bounded wait of a single-shot request.
    LocationTimeout,
    /// A persistence collaborator call failed.
    Persistence(String),
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::LocationUnavailable(reason) => write!(f, "location unavailable: {reason}"),
            TrackingError::LocationTimeout => write!(f, "timed out waiting for a location fix"),
            TrackingError::Persistence(reason) => write!(f, "persistence call failed: {reason}"),
        }
    }
}

impl std::error::Error for TrackingError {}
