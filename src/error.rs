//! Error types for BGZF stream operations.

use std::io;

use thiserror::Error;

use crate::device::OpenMode;

/// Result type alias for BGZF stream operations.
pub type Result<T> = std::result::Result<T, BgzfError>;

/// Error type for BGZF stream operations.
///
/// The original C implementation of this codec terminated the process on
/// internal failures (deflate overflow, short writes); here every failure
/// surfaces on the return channel and recovery is the caller's concern.
#[derive(Error, Debug)]
pub enum BgzfError {
    /// The underlying device could not be opened.
    #[error("unable to open device '{path}': {source}")]
    DeviceOpen {
        /// Device path or sentinel name
        path: String,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A legacy mode string other than "rb" or "wb" was supplied.
    #[error("unknown file mode: '{mode}'")]
    UnknownMode {
        /// The rejected mode string
        mode: String,
    },

    /// The stream has no bound device.
    #[error("stream is not open")]
    NotOpen,

    /// The operation requires the opposite open mode.
    #[error("stream is open {actual}, operation requires {expected}")]
    WrongMode {
        /// Mode the operation requires
        expected: OpenMode,
        /// Mode the stream is actually open in
        actual: OpenMode,
    },

    /// A block header failed validation.
    #[error("invalid BGZF block header")]
    InvalidHeader,

    /// The device ended mid-block.
    #[error("truncated BGZF block: expected {expected} bytes, got {actual}")]
    TruncatedBlock {
        /// Bytes the block layout called for
        expected: usize,
        /// Bytes actually read
        actual: usize,
    },

    /// Single-shot block decompression did not complete.
    #[error("block decompression failed: {0}")]
    BlockInflate(String),

    /// The footer CRC32 does not match the inflated contents.
    #[error("block CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        /// CRC32 recorded in the block footer
        expected: u32,
        /// CRC32 of the inflated bytes
        actual: u32,
    },

    /// Block compression failed for a reason other than output space.
    #[error("block compression failed: {0}")]
    BlockCompress(String),

    /// A framed block exceeded the 65,536-byte ceiling.
    #[error("deflate overflow: compressed block is {length} bytes")]
    DeflateOverflow {
        /// Size of the oversized block
        length: usize,
    },

    /// The retry loop drove the deflate input length below zero.
    #[error("deflate input reduction failed")]
    InputReductionFailed,

    /// The uncompressed tail left behind by a deflate exceeded the consumed input.
    #[error("remainder after deflate ({remaining} bytes) exceeds consumed input ({consumed} bytes)")]
    RemainderTooLarge {
        /// Bytes left in the uncompressed buffer
        remaining: usize,
        /// Bytes the deflate consumed
        consumed: usize,
    },

    /// The device accepted fewer bytes than a block flush required.
    #[error("short write: expected to write {expected} bytes, wrote {written}")]
    ShortWrite {
        /// Bytes the flush needed to write
        expected: usize,
        /// Bytes the device accepted
        written: usize,
    },

    /// The device rejected a seek to a block address.
    #[error("unable to seek to compressed offset {position}: {source}")]
    SeekFailed {
        /// Target compressed-file offset
        position: u64,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Seek was requested on a device without random access.
    #[error("device does not support random access")]
    NotRandomAccess,

    /// Any other I/O error from the underlying device.
    #[error(transparent)]
    Io(#[from] io::Error),
}
