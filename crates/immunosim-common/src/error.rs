//! Error types for Immunosim
//!
//! Provides a unified error type and domain-specific error variants

use thiserror::Error;

/// Result type alias using ImmunoError
pub type Result<T> = std::result::Result<T, ImmunoError>;

/// Unified error type for Immunosim operations
#[derive(Debug, Error)]
pub enum ImmunoError {
    // Patient / pathogen precondition errors
    #[error("Entity error: {0}")]
    Entity(#[from] EntityError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Local precondition violations.
///
/// Both variants are raised before any state is touched, so the caller can
/// skip the offending patient without rolling anything back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EntityError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Pathogen {pathogene_id} is not tracked by patient {patient_id}")]
    UntrackedEntity {
        patient_id: String,
        pathogene_id: u32,
    },
}

impl EntityError {
    /// Shorthand for an `InvalidArgument` error
    pub fn invalid(reason: impl Into<String>) -> Self {
        EntityError::InvalidArgument(reason.into())
    }

    /// Reject non-finite inputs
    pub fn require_finite(name: &str, value: f64) -> std::result::Result<f64, Self> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EntityError::InvalidArgument(format!(
                "{} must be finite, got {}",
                name, value
            )))
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown cohort: {0}")]
    UnknownCohort(String),
}

impl From<serde_json::Error> for ImmunoError {
    fn from(err: serde_json::Error) -> Self {
        ImmunoError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ImmunoError::Entity(EntityError::UntrackedEntity {
            patient_id: "p-17".to_string(),
            pathogene_id: 4,
        });
        let text = err.to_string();
        assert!(text.contains("p-17"));
        assert!(text.contains("Pathogen 4"));
    }

    #[test]
    fn test_require_finite() {
        assert_eq!(EntityError::require_finite("amount", 2.0), Ok(2.0));
        assert!(matches!(
            EntityError::require_finite("amount", f64::INFINITY),
            Err(EntityError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_from_sub_errors() {
        fn reject() -> Result<()> {
            Err(EntityError::invalid("empty id").into())
        }
        assert!(matches!(
            reject(),
            Err(ImmunoError::Entity(EntityError::InvalidArgument(_)))
        ));

        let err: ImmunoError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ImmunoError::Serialization(_)));
    }

    #[test]
    fn test_config_error() {
        let err = ConfigError::InvalidValue {
            key: "IMMUNOSIM_STEPS".to_string(),
            value: "many".to_string(),
        };
        assert!(err.to_string().contains("IMMUNOSIM_STEPS"));
    }
}
