//! `ocinit::error` is the error type shared by every stage of the conversion
//! pipeline.

use std::{
    error::Error,
    fmt::{self, Display},
};

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of an ocinit-related operation.
pub type OcinitResult<T> = Result<T, OcinitError>;

/// An error that occurred while converting an OCI layout into a CPIO archive.
#[derive(pretty_error_debug::Debug, Error)]
pub enum OcinitError {
    /// The OCI layout directory is missing or structurally invalid: no
    /// `index.json`, an unparseable index or manifest, an unusable manifest
    /// list, or a missing blob file.
    #[error("malformed OCI layout: {0}")]
    MalformedLayout(String),

    /// The selected manifest descriptor does not reference an image manifest.
    #[error("unexpected media type: expected an image manifest, got {0}")]
    UnexpectedMediaType(String),

    /// A layer descriptor advertises a media type the decoder cannot stream.
    #[error("unsupported layer media type: {0}")]
    UnsupportedLayerType(String),

    /// A layer tar stream (or its gzip wrapping) could not be decoded.
    #[error("malformed layer archive: {0}")]
    MalformedArchive(String),

    /// A tar entry name contains a `..` segment and would escape the
    /// archive root.
    #[error("entry path escapes archive root: {0}")]
    MalformedPath(String),

    /// An entry was finalized with fewer body bytes than its header declared.
    #[error("body underrun for {name}: declared {declared} bytes, wrote {written}")]
    BodyUnderrun {
        /// Name of the entry whose body came up short.
        name: String,

        /// The size the header declared.
        declared: u64,

        /// The bytes actually supplied.
        written: u64,
    },

    /// More body bytes were supplied for an entry than its header declared.
    #[error("body overrun for {name}: declared {declared} bytes")]
    WriteTooLong {
        /// Name of the entry whose body overflowed.
        name: String,

        /// The size the header declared.
        declared: u64,
    },

    /// The CPIO writer was used after it emitted the trailer.
    #[error("cpio writer is closed")]
    WriterClosed,

    /// An error that occurred during an IO operation.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Custom error.
    #[error("Custom error: {0}")]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl OcinitError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> OcinitError {
        OcinitError::Custom(AnyError {
            error: error.into(),
        })
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `OcinitResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> OcinitResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}
