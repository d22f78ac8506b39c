//! Error types for the autopilot engine

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the autopilot engine
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Pilot registry errors
    #[error("Pilot not found: {0}")]
    PilotNotFound(String),

    #[error("Invalid deposit amount: {0}")]
    InvalidDeposit(f64),

    #[error("Invalid state for pilot {pilot_id}: {reason}")]
    InvalidState { pilot_id: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Catalog errors
    #[error("Invalid strategy {id}: {reason}")]
    InvalidStrategy { id: String, reason: String },

    #[error("Duplicate strategy id: {0}")]
    DuplicateStrategy(String),

    // Trading errors
    #[error("Trade {0} already recorded")]
    DuplicateTrade(u64),

    // Persistence errors
    #[error("Persistence failed: {0}")]
    Persistence(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Check if this error means the requested entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PilotNotFound(_))
    }

    pub(crate) fn invalid_state(pilot_id: &str, reason: impl Into<String>) -> Self {
        Error::InvalidState {
            pilot_id: pilot_id.to_string(),
            reason: reason.into(),
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = Error::PilotNotFound("abc".to_string());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Pilot not found: abc");
        assert!(!Error::Persistence("disk full".to_string()).is_not_found());
    }

    #[test]
    fn test_json_errors_convert() {
        let err: Error = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
