#![deny(unsafe_code)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # bgzf-stream - Blocked-gzip stream codec
//!
//! This crate reads and writes BGZF (Blocked GZIP Format) streams: a
//! gzip-compatible framing that partitions a logical byte stream into
//! independently-deflated blocks of at most 64 KiB on the wire, each a
//! conformant RFC 1952 member carrying a "BC" extra subfield with its own
//! compressed size. Because blocks are independent, any uncompressed byte
//! is addressable by a 64-bit [`VirtualOffset`] pairing the block's
//! compressed-file start with the in-block index.
//!
//! ## Overview
//!
//! - **[`stream`]** - [`BgzfStream`], the codec: sequential read and write,
//!   virtual-offset seek, and the close-time EOF marker
//! - **[`block`]** - block framing: header/footer layout, BSIZE, the
//!   canonical empty-block EOF marker
//! - **[`device`]** - the byte source/sink contract and the file, standard
//!   stream, and in-memory devices
//! - **[`virtual_offset`]** - the packed 48/16-bit stream address
//! - **[`error`]** - [`BgzfError`] and the crate [`Result`] alias
//! - **[`commands`]** - the compress / decompress / inspect CLI surface
//!
//! ## Quick start
//!
//! ```no_run
//! use bgzf_stream::BgzfStream;
//!
//! # fn main() -> bgzf_stream::Result<()> {
//! let mut writer = BgzfStream::new();
//! writer.open("data.bgz", "wb")?;
//! writer.write(b"payload bytes")?;
//! writer.close()?; // flushes and appends the EOF marker
//!
//! let mut reader = BgzfStream::new();
//! reader.open("data.bgz", "rb")?;
//! let mut buf = [0u8; 16];
//! let n = reader.read(&mut buf)?;
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod commands;
pub mod device;
pub mod error;
pub mod stream;
pub mod virtual_offset;

// Re-export commonly used types
pub use block::{
    check_block_header, is_eof_block, BGZF_EOF, BGZF_FOOTER_SIZE, BGZF_HEADER_SIZE,
    DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE,
};
pub use device::{open_device, Device, FileDevice, MemoryDevice, OpenMode, StdioDevice};
pub use error::{BgzfError, Result};
pub use stream::BgzfStream;
pub use virtual_offset::VirtualOffset;
