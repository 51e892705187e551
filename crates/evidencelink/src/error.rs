//! Error types for evidencelink.
//!
//! This module defines all error types used throughout the evidencelink crate.
//! Failures fall into three groups: persisted state that could not be read or
//! written, input that was rejected before anything changed, and the external
//! analysis call failing.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for evidencelink operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// A persisted document could not be written.
    #[error("failed to write document '{key}': {message}")]
    DocumentWrite {
        /// Key of the document.
        key: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Validation Errors ===
    /// A quote was submitted without any text.
    #[error("quote text must not be empty")]
    EmptyQuoteText,

    /// An objective identifier was empty.
    #[error("objective id must not be empty")]
    EmptyObjectiveId,

    /// A transcript was too short to analyze.
    #[error("transcript is too short to analyze: {length} characters (minimum {minimum})")]
    TranscriptTooShort {
        /// Number of characters in the trimmed transcript.
        length: usize,
        /// Configured minimum.
        minimum: usize,
    },

    /// The objective catalog could not be read.
    #[error("invalid objective catalog: {message}")]
    Catalog {
        /// Description of the problem.
        message: String,
    },

    // === Analysis Errors ===
    /// The analysis service returned a non-success status.
    #[error("analysis service error ({status}): {message}")]
    AnalysisApi {
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
    },

    /// The analysis call failed before a response was received.
    #[error("analysis request failed: {0}")]
    AnalysisRequest(#[from] reqwest::Error),

    /// The analysis call could not be made or its envelope was unusable.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// No API key was found for the analysis service.
    #[error("missing API key: set the {env_var} environment variable")]
    MissingApiKey {
        /// Name of the environment variable that was checked.
        env_var: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for evidencelink operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new analysis error.
    #[must_use]
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis(message.into())
    }

    /// Create a catalog error.
    #[must_use]
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Check if this error means the input was rejected and nothing changed.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuoteText | Self::EmptyObjectiveId | Self::TranscriptTooShort { .. }
        )
    }

    /// Check if this error came from the external analysis call.
    #[must_use]
    pub fn is_analysis_error(&self) -> bool {
        matches!(
            self,
            Self::AnalysisApi { .. }
                | Self::AnalysisRequest(_)
                | Self::Analysis(_)
                | Self::MissingApiKey { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::EmptyQuoteText.to_string(),
            "quote text must not be empty"
        );

        let err = Error::analysis("empty response");
        assert_eq!(err.to_string(), "analysis failed: empty response");
    }

    #[test]
    fn test_is_validation_error() {
        assert!(Error::EmptyQuoteText.is_validation_error());
        assert!(Error::EmptyObjectiveId.is_validation_error());
        assert!(Error::TranscriptTooShort {
            length: 3,
            minimum: 50
        }
        .is_validation_error());
        assert!(!Error::analysis("x").is_validation_error());
    }

    #[test]
    fn test_is_analysis_error() {
        let err = Error::AnalysisApi {
            status: 529,
            message: "overloaded".to_string(),
        };
        assert!(err.is_analysis_error());
        assert!(Error::MissingApiKey {
            env_var: "KEY".to_string()
        }
        .is_analysis_error());
        assert!(!Error::EmptyQuoteText.is_analysis_error());
    }

    #[test]
    fn test_transcript_too_short_display() {
        let err = Error::TranscriptTooShort {
            length: 12,
            minimum: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn test_analysis_api_display() {
        let err = Error::AnalysisApi {
            status: 401,
            message: "invalid x-api-key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "analysis service error (401): invalid x-api-key"
        );
    }

    #[test]
    fn test_missing_api_key_display() {
        let err = Error::MissingApiKey {
            env_var: "ANTHROPIC_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_catalog_error() {
        let err = Error::catalog("expected an object");
        assert!(err.to_string().contains("expected an object"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_document_write_display() {
        let err = Error::DocumentWrite {
            key: "evidence/linked-quotes".to_string(),
            message: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("evidence/linked-quotes"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "max_tokens must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
