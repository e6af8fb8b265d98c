//! BGZF block framing.
//!
//! Each BGZF block is a conformant gzip member (RFC 1952) carrying a fixed
//! "BC" extra subfield that records the compressed block size:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                               │
//! │  - Magic: 0x1f 0x8b (gzip)                                      │
//! │  - Method: 0x08 (deflate)                                       │
//! │  - Flags: 0x04 (FEXTRA)                                         │
//! │  - MTIME, XFL, OS: 6 bytes                                      │
//! │  - XLEN: 2 bytes (= 6)                                          │
//! │  - Subfield: "BC" + len(2) + BSIZE(2)                           │
//! │    where BSIZE = total_block_size - 1                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Compressed data (deflate)                                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                                │
//! │  - CRC32: 4 bytes                                               │
//! │  - ISIZE: 4 bytes (uncompressed size mod 2^32)                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Header + compressed data + footer must fit in 65,536 bytes on the wire.

// ============================================================================
// Constants
// ============================================================================

/// Size of the BGZF block header.
pub const BGZF_HEADER_SIZE: usize = 18;

/// Size of the BGZF block footer (CRC32 + ISIZE).
pub const BGZF_FOOTER_SIZE: usize = 8;

/// Capacity of the uncompressed block buffer.
pub const DEFAULT_BLOCK_SIZE: usize = 65_536;

/// Maximum on-wire size of a single framed block.
pub const MAX_BLOCK_SIZE: usize = 65_536;

/// BGZF EOF marker block (empty block signaling end of file).
pub const BGZF_EOF: [u8; 28] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02, 0x00,
    0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const GZIP_ID1: u8 = 0x1f;
const GZIP_ID2: u8 = 0x8b;
const CM_DEFLATE: u8 = 0x08;
const FLG_FEXTRA: u8 = 0x04;
const OS_UNKNOWN: u8 = 0xff;
const BGZF_XLEN: u8 = 6;
const BGZF_SUBFIELD_ID1: u8 = b'B';
const BGZF_SUBFIELD_ID2: u8 = b'C';
const BGZF_SUBFIELD_LEN: u16 = 2;

// ============================================================================
// Header stamping and validation
// ============================================================================

/// Stamp the fixed BGZF header fields into the first 18 bytes of `buf`.
///
/// MTIME, XFL, and BSIZE are left zeroed; BSIZE is filled in by
/// [`encode_bsize`] once the compressed length is known.
///
/// # Panics
///
/// Panics if `buf` is shorter than [`BGZF_HEADER_SIZE`].
pub fn write_block_header(buf: &mut [u8]) {
    buf[..BGZF_HEADER_SIZE].fill(0);
    buf[0] = GZIP_ID1;
    buf[1] = GZIP_ID2;
    buf[2] = CM_DEFLATE;
    buf[3] = FLG_FEXTRA;
    buf[9] = OS_UNKNOWN;
    buf[10] = BGZF_XLEN;
    buf[12] = BGZF_SUBFIELD_ID1;
    buf[13] = BGZF_SUBFIELD_ID2;
    buf[14] = BGZF_SUBFIELD_LEN as u8;
}

/// Validate the fixed fields of an 18-byte BGZF block header.
///
/// Accepts iff the gzip magic, deflate method, and FEXTRA flag are present,
/// the extra subfield is tagged "BC", and the subfield payload length is 2.
/// Unknown MTIME, XFL, or OS values are tolerated.
#[must_use]
pub fn check_block_header(header: &[u8]) -> bool {
    header.len() >= BGZF_HEADER_SIZE
        && header[0] == GZIP_ID1
        && header[1] == GZIP_ID2
        && header[2] == CM_DEFLATE
        && header[3] == FLG_FEXTRA
        && header[12] == BGZF_SUBFIELD_ID1
        && header[13] == BGZF_SUBFIELD_ID2
        && u16::from_le_bytes([header[14], header[15]]) == BGZF_SUBFIELD_LEN
}

/// Write BSIZE (`block_size - 1`, little-endian) into bytes 16-17 of `buf`.
///
/// # Panics
///
/// Panics if `block_size` is 0 or exceeds [`MAX_BLOCK_SIZE`].
pub fn encode_bsize(buf: &mut [u8], block_size: usize) {
    assert!(block_size >= 1 && block_size <= MAX_BLOCK_SIZE);
    let bsize = (block_size - 1) as u16;
    buf[16..BGZF_HEADER_SIZE].copy_from_slice(&bsize.to_le_bytes());
}

/// Decode the on-wire block size (`BSIZE + 1`) from an 18-byte header.
#[must_use]
pub fn decode_block_size(header: &[u8]) -> usize {
    u16::from_le_bytes([header[16], header[17]]) as usize + 1
}

/// Check whether `block` is the canonical BGZF EOF marker.
#[must_use]
pub fn is_eof_block(block: &[u8]) -> bool {
    block == BGZF_EOF
}

// ============================================================================
// Tests
// ============================================================================
