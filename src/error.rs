//! Error types and handling for the `UrbanSite` service

use thiserror::Error;

/// Main error type for the `UrbanSite` service
#[derive(Error, Debug)]
pub enum UrbanSiteError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Result cache errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// The requested origin could not be geocoded
    #[error("Place not found: {place}")]
    PlaceNotFound { place: String },
}

impl UrbanSiteError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new place-not-found error
    pub fn place_not_found<S: Into<String>>(place: S) -> Self {
        Self::PlaceNotFound {
            place: place.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            UrbanSiteError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            UrbanSiteError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            UrbanSiteError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            UrbanSiteError::PlaceNotFound { .. } => "Place not found".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = UrbanSiteError::config("bad radius");
        assert!(matches!(config_err, UrbanSiteError::Config { .. }));

        let validation_err = UrbanSiteError::validation("invalid coordinates");
        assert!(matches!(validation_err, UrbanSiteError::Validation { .. }));

        let not_found = UrbanSiteError::place_not_found("Atlantis");
        assert!(matches!(not_found, UrbanSiteError::PlaceNotFound { .. }));
        assert_eq!(not_found.to_string(), "Place not found: Atlantis");
    }

    #[test]
    fn test_user_messages() {
        let config_err = UrbanSiteError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let validation_err = UrbanSiteError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));

        let not_found = UrbanSiteError::place_not_found("Atlantis");
        assert_eq!(not_found.user_message(), "Place not found");

        let cache_err = UrbanSiteError::cache("database is locked");
        assert!(cache_err.user_message().contains("clear your cache"));
        assert!(!cache_err.user_message().contains("locked"));
    }
}
