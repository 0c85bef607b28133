/*!
 * Error types for the doctrans pipeline.
 *
 * Each failure scope has its own type so that callers can tell apart what is
 * fatal to a single segment, to a single document, or to the whole batch:
 *
 * - `ProviderError`: one provider call (segment/chunk scope, classified for retry)
 * - `ExtractionError` / `ReassemblyError`: one document
 * - `ConfigurationError`: before any job starts
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by a translation provider, already classified for the retry policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider asked us to slow down
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Network failure, timeout, 5xx or malformed response
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// Authentication failure or invalid request; retrying will not help
    #[error("Permanent provider failure: {0}")]
    Permanent(String),

    /// The account has run out of quota or credit
    #[error("Provider quota exhausted: {0}")]
    QuotaExhausted(String),
}

impl ProviderError {
    /// Whether the retry policy may try this call again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Transient(_))
    }

    /// Whether this error must stop the remaining chunks of the job
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::QuotaExhausted(_))
    }

    /// Short label for logs and result records
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "rate_limited",
            Self::Transient(_) => "transient",
            Self::Permanent(_) => "permanent",
            Self::QuotaExhausted(_) => "quota_exhausted",
        }
    }

    /// Classify an HTTP error response
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, truncate_body(body));
        let lower = body.to_lowercase();
        let mentions_quota = lower.contains("insufficient_quota")
            || lower.contains("quota")
            || lower.contains("billing")
            || lower.contains("credit balance");

        match status {
            402 => Self::QuotaExhausted(message),
            429 if mentions_quota => Self::QuotaExhausted(message),
            429 => Self::RateLimited(message),
            408 | 425 => Self::Transient(message),
            400..=499 => Self::Permanent(message),
            _ => Self::Transient(message),
        }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::from_status(status.as_u16(), &error.to_string());
        }
        Self::Transient(format!("Request failed: {}", error))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 300;
    if body.chars().count() <= MAX {
        body.trim().to_string()
    } else {
        format!("{}...", body.chars().take(MAX).collect::<String>().trim())
    }
}

/// A source document could not be read or decoded
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container is malformed
    #[error("Corrupt {kind} document: {message}")]
    Corrupt { kind: String, message: String },

    /// The container is password protected
    #[error("Document is encrypted and cannot be extracted")]
    Encrypted,

    /// The file extension does not map to a supported document kind
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
}

/// The translated document could not be produced or written
#[derive(Error, Debug)]
pub enum ReassemblyError {
    /// A segment does not point at a valid position in the document
    #[error("Segment {index} refers to a missing position: {location}")]
    MissingPosition { index: usize, location: String },

    /// The segment list does not belong to this document
    #[error("Segment list mismatch: expected {expected} segments, got {actual}")]
    SegmentMismatch { expected: usize, actual: usize },

    /// Serializing the output container failed
    #[error("Failed to encode output: {0}")]
    Encode(String),

    /// Writing the output file failed
    #[error("Failed to write output {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid configuration detected before any job starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Language code is not a valid ISO 639 code
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    /// Source and target language are the same or otherwise unsupported
    #[error("Unsupported language pair: {source_language} -> {target_language}")]
    UnsupportedLanguagePair {
        source_language: String,
        target_language: String,
    },

    /// Provider credentials are missing or were rejected
    #[error("Invalid credentials for provider {provider}: {message}")]
    InvalidCredentials { provider: String, message: String },

    /// A numeric limit is out of range
    #[error("Invalid setting {name}: {message}")]
    InvalidSetting { name: String, message: String },
}

/// Failures raised while driving a single document job
#[derive(Error, Debug)]
pub enum JobError {
    /// Extraction failed
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Reassembly failed
    #[error("Reassembly error: {0}")]
    Reassembly(#[from] ReassemblyError),

    /// A state transition that the job state machine does not allow
    #[error("Illegal job transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Error from a document job
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
