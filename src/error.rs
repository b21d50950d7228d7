//! Error types and handling for the weather archive service

use crate::forms::ValidationErrors;
use thiserror::Error;

/// Main error type for the weather archive service
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream geocoding or archive API errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Field-level input validation errors
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// Geocoding returned no match for the query
    #[error("Location not found: {query}")]
    LocationNotFound { query: String },

    /// Response cache (de)serialization errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// CSV export errors
    #[error("Export error: {message}")]
    Export { message: String },

}

impl ArchiveError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new location-not-found error
    pub fn location_not_found<S: Into<String>>(query: S) -> Self {
        Self::LocationNotFound {
            query: query.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new export error
    pub fn export<S: Into<String>>(message: S) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ArchiveError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            ArchiveError::Api { .. } => {
                "Unable to reach the weather archive. Please try again later.".to_string()
            }
            ArchiveError::Validation(errors) => format!("Invalid input: {errors}"),
            ArchiveError::LocationNotFound { query } => {
                format!("No location found for '{query}'.")
            }
            ArchiveError::Cache { .. } => "Cache operation failed.".to_string(),
            ArchiveError::Export { .. } => "Failed to build the download file.".to_string(),
        }
    }
}

impl From<reqwest_middleware::Error> for ArchiveError {
    fn from(err: reqwest_middleware::Error) -> Self {
        ArchiveError::api(err.to_string())
    }
}

impl From<reqwest::Error> for ArchiveError {
    fn from(err: reqwest::Error) -> Self {
        ArchiveError::api(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{Field, ValidationError};

    #[test]
    fn test_error_creation() {
        let config_err = ArchiveError::config("bad port");
        assert!(matches!(config_err, ArchiveError::Config { .. }));

        let api_err = ArchiveError::api("connection failed");
        assert!(matches!(api_err, ArchiveError::Api { .. }));

        let missing = ArchiveError::location_not_found("Atlantis");
        assert!(matches!(missing, ArchiveError::LocationNotFound { .. }));
    }

    #[test]
    fn test_user_messages() {
        let api_err = ArchiveError::api("test");
        assert!(api_err.user_message().contains("Unable to reach"));

        let missing = ArchiveError::location_not_found("Atlantis");
        assert!(missing.user_message().contains("Atlantis"));

        let mut errors = ValidationErrors::default();
        errors.add(Field::City, ValidationError::CityRequired);
        let err: ArchiveError = errors.into();
        assert!(err.user_message().contains("City name is required"));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let cache_err = ArchiveError::cache("bad bytes for key 'https://example'");
        assert_eq!(cache_err.user_message(), "Cache operation failed.");

        let export_err = ArchiveError::export("csv writer closed");
        assert!(!export_err.user_message().contains("csv writer"));
    }
}
