use std::io;

use thiserror::Error;

/// Result type returned by every fallible khash operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by contexts and by the binding surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The algorithm selector is outside the supported set.
    #[error("unsupported algorithm selector {0}")]
    UnsupportedAlgorithm(u8),
    /// The salt descriptor could not be resolved into salt bytes.
    #[error("invalid salt: {0}")]
    InvalidSalt(#[from] InvalidSalt),
    /// The operating system could not supply entropy for a random salt.
    #[error("random source unavailable")]
    RandomSourceUnavailable(#[source] rand::Error),
    /// The context has already been disposed.
    #[error("context used after it was disposed")]
    UseAfterFree,
    /// The context was disposed twice.
    #[error("context disposed twice")]
    DoubleFree,
    /// The caller's output buffer cannot hold the digest and its terminator.
    #[error("output buffer too small: need {required} bytes, got {provided}")]
    BufferTooSmall {
        /// Bytes needed, terminator included.
        required: usize,
        /// Bytes the caller offered.
        provided: usize,
    },
    /// Reading a streamed input failed.
    #[error("io: {0}")]
    Io(#[from] io::Error),
    /// The handle was never issued by the handle table.
    #[error("invalid context handle")]
    InvalidHandle,
}

/// Why a salt descriptor was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidSalt {
    /// `Specific` was requested without salt bytes.
    #[error("specific salt requested without material")]
    MissingMaterial,
    /// The salt is longer than [`crate::salt::MAX_SALT_LEN`].
    #[error("salt of {len} bytes exceeds the {max} byte maximum")]
    TooLong {
        /// Length of the rejected salt.
        len: usize,
        /// Longest accepted salt.
        max: usize,
    },
    /// The binding-level kind value names no salt kind.
    #[error("unknown salt kind {0}")]
    UnknownKind(u8),
    /// The declared length runs past the provided material.
    #[error("declared salt length {declared} exceeds the {available} bytes provided")]
    LengthMismatch {
        /// Length the caller declared.
        declared: usize,
        /// Bytes actually provided.
        available: usize,
    },
}

/// Status codes returned across the binding surface.
pub mod status {
    /// The operation completed.
    pub const SUCCESS: i32 = 0;
    /// [`super::Error::UnsupportedAlgorithm`]
    pub const UNSUPPORTED_ALGORITHM: i32 = 1;
    /// [`super::Error::InvalidSalt`]
    pub const INVALID_SALT: i32 = 2;
    /// [`super::Error::RandomSourceUnavailable`]
    pub const RANDOM_SOURCE_UNAVAILABLE: i32 = 3;
    /// [`super::Error::UseAfterFree`]
    pub const USE_AFTER_FREE: i32 = 4;
    /// [`super::Error::DoubleFree`]
    pub const DOUBLE_FREE: i32 = 5;
    /// [`super::Error::BufferTooSmall`]
    pub const BUFFER_TOO_SMALL: i32 = 6;
    /// [`super::Error::Io`]
    pub const IO: i32 = 7;
    /// [`super::Error::InvalidHandle`]
    pub const INVALID_HANDLE: i32 = 8;
    /// A panic was caught at the binding boundary.
    pub const PANIC: i32 = -1;
}

impl Error {
    /// The non-zero status code this error is reported as.
    pub fn status(&self) -> i32 {
        match self {
            Error::UnsupportedAlgorithm(_) => status::UNSUPPORTED_ALGORITHM,
            Error::InvalidSalt(_) => status::INVALID_SALT,
            Error::RandomSourceUnavailable(_) => status::RANDOM_SOURCE_UNAVAILABLE,
            Error::UseAfterFree => status::USE_AFTER_FREE,
            Error::DoubleFree => status::DOUBLE_FREE,
            Error::BufferTooSmall { .. } => status::BUFFER_TOO_SMALL,
            Error::Io(_) => status::IO,
            Error::InvalidHandle => status::INVALID_HANDLE,
        }
    }
}

impl From<Error> for i32 {
    fn from(err: Error) -> Self {
        err.status()
    }
}
