//! Error types for the harvesting and captioning pipelines.
//!
//! Errors are organized by stage so a failed batch can say which card or
//! image stopped it. Each `PipelineError` variant is one named failure kind;
//! [`PipelineError::is_skippable`] decides whether a batch continues past it.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for artdeck operations.
#[derive(Error, Debug)]
pub enum ArtdeckError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, one variant per failure kind.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A color code outside the W/U/B/R/G table
    #[error("Unknown color code '{code}' on card {card}")]
    UnknownColor { card: String, code: String },

    /// Image resolution or download failed
    #[error("Fetch failed for {url}: {message}")]
    Fetch {
        url: String,
        status_code: Option<u16>,
        message: String,
    },

    /// An image has no sibling tag file
    #[error("Missing companion file {companion} for image {image}")]
    MissingCompanion { image: PathBuf, companion: PathBuf },

    /// A batch finished without visiting a single file
    #[error("No files were processed")]
    EmptyBatch,

    /// The card export could not be read or parsed
    #[error("Card source {path} unreadable: {message}")]
    Source { path: PathBuf, message: String },

    /// A card record is missing data its layout requires
    #[error("Malformed card record {id}: {message}")]
    MalformedRecord { id: String, message: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Caption model backend failure
    #[error("Caption model error: {message}")]
    Model {
        message: String,
        status_code: Option<u16>,
    },

    /// Malformed caption document
    #[error("Invalid caption document: {0}")]
    Document(String),

    /// Filesystem error while persisting output
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Whether a batch should log this error and move on to the next item.
    ///
    /// Fetch failures and malformed records only cost their own item; all
    /// other kinds abort the run.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            PipelineError::Fetch { .. } | PipelineError::MalformedRecord { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for artdeck results.
pub type Result<T> = std::result::Result<T, ArtdeckError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
