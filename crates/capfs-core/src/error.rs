use std::io;

use thiserror::Error;

/// Canonical result for capfs.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The operation would push (or did push) usage past the configured limit.
    ///
    /// Returned as-is, never nested, so callers can match on the variant.
    #[error("not enough capacity: requested {requested} bytes, used {used}, limit {limit}")]
    CapacityExceeded { requested: i64, used: i64, limit: i64 },

    #[error("size traversal failed at '{path}': {source}")]
    Traversal {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Errors surfaced by the wrapped store, passed through unchanged.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Error::CapacityExceeded { .. })
    }

    /// True when the wrapped store reported a missing entry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }

    /// The underlying `io::ErrorKind`, if this is a pass-through error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Recover a capfs error that was carried through an `io::Error`.
    pub fn from_io(err: io::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(e) => e,
            Err(err) => Error::Io(err),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
