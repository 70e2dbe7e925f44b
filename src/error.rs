//! Error types for partial archive access.

use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening an archive or reading one of its entries.
///
/// Every error aborts only the operation that produced it. Nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// The source could not be opened or its length could not be probed
    #[error("cannot open {source_id}: {reason}")]
    SourceUnreachable { source_id: String, reason: String },

    /// No structurally valid End of Central Directory record was found
    #[error("not a ZIP archive: no End of Central Directory record found")]
    NotAZipArchive,

    /// The central directory is cut short or its records are inconsistent
    #[error("truncated or corrupt central directory: {0}")]
    TruncatedOrCorruptDirectory(String),

    /// No entry carries exactly the requested name
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// The entry uses a compression method other than stored or deflate
    #[error("unsupported compression method {method} for {name}")]
    UnsupportedCompressionMethod { name: String, method: u16 },

    /// The entry is password protected
    #[error("entry is encrypted: {0}")]
    EncryptedEntry(String),

    /// The payload could not be decoded into exactly the recorded size
    #[error("decompression failed for {name}: {reason}")]
    DecompressionFailure { name: String, reason: String },

    /// No Local File Header signature at the offset named by the directory
    #[error("invalid local file header at offset {0}")]
    InvalidLocalHeader(u64),

    /// A range fetch failed or delivered the wrong number of bytes
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The operation was cancelled through its cancellation token
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn transport(reason: impl std::fmt::Display) -> Self {
        Self::TransportFailure(reason.to_string())
    }

    pub(crate) fn corrupt(reason: impl std::fmt::Display) -> Self {
        Self::TruncatedOrCorruptDirectory(reason.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::TransportFailure(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TransportFailure(format!("request timed out: {err}"))
        } else {
            Self::TransportFailure(err.to_string())
        }
    }
}
