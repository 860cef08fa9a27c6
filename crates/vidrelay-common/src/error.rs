//! Common error types used throughout vidrelay.
//!
//! Covers the failure cases of the file store, the range responder, the
//! retention scheduler and the acquisition collaborators.

/// Common error type for vidrelay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested file was not found in the store.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The filename would escape the store root or is otherwise unusable.
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// The byte range cannot be served for a file of the given size.
    #[error("Range not satisfiable for {size} byte file")]
    RangeNotSatisfiable { size: u64 },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An upstream service (resolver, media host, channel) failed.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidFilename error.
    pub fn invalid_filename<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFilename(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Upstream error.
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        Self::Upstream(msg.into())
    }

    /// True for errors meaning "the file is not there".
    ///
    /// I/O errors of kind `NotFound` count, since a file can vanish between
    /// a metadata lookup and the following open.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
