//! Error types for building and loading double arrays.

use thiserror::Error;

/// Errors that can occur when building or loading a double array.
///
/// Construction errors are fatal to the whole build: no partially built
/// array is ever handed back. Queries never fail; a key that cannot be
/// walked simply does not match.
#[derive(Debug, Error)]
pub enum Error {
    /// A key with no bytes was supplied.
    #[error("zero-length key")]
    EmptyKey,

    /// A key contains a 0 byte before its end. The 0 label is reserved for
    /// the terminal edge.
    #[error("invalid null character at byte {position} of key {key:?}")]
    NulByte {
        /// The offending key.
        key: Vec<u8>,
        /// Index of the first 0 byte.
        position: usize,
    },

    /// A value below zero was supplied.
    #[error("negative value {value} for key {key:?}")]
    NegativeValue {
        /// The key the value belongs to.
        key: Vec<u8>,
        /// The rejected value.
        value: i32,
    },

    /// Keys were not provided in strictly ascending byte order.
    #[error("wrong key order: {key:?} is smaller than its predecessor")]
    WrongKeyOrder {
        /// The first key found out of order.
        key: Vec<u8>,
    },

    /// The same key was provided twice.
    #[error("duplicate key {key:?}")]
    DuplicateKey {
        /// The repeated key.
        key: Vec<u8>,
    },

    /// Values were supplied but not one per key.
    #[error("{values} values supplied for {keys} keys")]
    ValueCountMismatch {
        /// Number of keys.
        keys: usize,
        /// Number of values.
        values: usize,
    },

    /// Too many keys to number them with 31-bit default values.
    #[error("too many keys: {0}")]
    TooManyKeys(usize),

    /// The array grew past the largest offset a unit can encode.
    #[error("too large offset: {0}")]
    OffsetOverflow(u32),

    /// A serialized buffer whose length is not a whole number of units.
    #[error("buffer length {0} is not a multiple of 4")]
    InvalidBuffer(usize),

    /// An I/O error occurred while loading or saving.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for double-array operations.
pub type Result<T> = std::result::Result<T, Error>;
