//! Domain-level errors

use thiserror::Error;

use crate::value_objects::InvalidCoordinates;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Latitude/longitude out of range or only half of the pair supplied
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Unknown transport type label
    #[error("Unknown transport type: {0}")]
    UnknownTransportType(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl From<InvalidCoordinates> for DomainError {
    fn from(err: InvalidCoordinates) -> Self {
        Self::InvalidCoordinates(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_coordinates_error_message() {
        let err = DomainError::InvalidCoordinates("latitude 91".to_string());
        assert_eq!(err.to_string(), "Invalid coordinates: latitude 91");
    }

    #[test]
    fn unknown_transport_type_message() {
        let err = DomainError::UnknownTransportType("ferry".to_string());
        assert_eq!(err.to_string(), "Unknown transport type: ferry");
    }

    #[test]
    fn validation_error_message() {
        let err = DomainError::ValidationError("country is required".to_string());
        assert_eq!(err.to_string(), "Validation failed: country is required");
    }

    #[test]
    fn converts_from_invalid_coordinates() {
        let err: DomainError = InvalidCoordinates.into();
        assert!(matches!(err, DomainError::InvalidCoordinates(_)));
        assert!(err.to_string().contains("latitude must be -90 to 90"));
    }
}
