//! Error type shared by every codec operation.
//!
//! The compressed formats are not recoverable: the first bad bit invalidates
//! everything after it, so every variant here is fatal to the operation that
//! produced it. The CLI turns any of these into exit code 1.

use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for compression and decompression operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The two-byte envelope prefix does not name a known algorithm.
    #[error("invalid magic number: {0:#06x}")]
    BadMagic(u16),

    /// The stream was written by an incompatible compressor version.
    #[error("unsupported compressor version: {0}")]
    BadVersion(u8),

    /// A header field or record is malformed (impossible parameters,
    /// a malformed tree, a record overrunning its block).
    #[error("invalid header: {0}")]
    Header(&'static str),

    /// The stream ended in the middle of a header or record.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A decoder received a dictionary index it has no entry for.
    #[error("dictionary index {index} out of range (dictionary size {size})")]
    DictionaryIndex { index: usize, size: usize },

    /// The stream ended without a final block marker.
    #[error("stream ended without a final block")]
    Unterminated,

    /// Huffman compression needs two passes over its input.
    #[error("huffman compression requires a rewindable input")]
    NotSeekable,

    /// The underlying byte stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
