//! The BGZF stream codec.
//!
//! [`BgzfStream`] partitions a logical byte stream into independently
//! deflated blocks of at most 64 KiB on the wire, and reads such streams
//! back with virtual-offset seeking. One codec instance owns one device at
//! a time and drives it strictly sequentially; it is single-threaded and
//! not reentrant.
//!
//! Data flow on write: caller bytes → uncompressed buffer → (when full or
//! on close) deflate into the compressed buffer → device. Data flow on
//! read: device → compressed buffer → inflate into the uncompressed
//! buffer → slices copied to the caller.
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use bgzf_stream::{BgzfStream, MemoryDevice};
//!
//! # fn main() -> bgzf_stream::Result<()> {
//! let sink = Arc::new(Mutex::new(Vec::new()));
//! let mut writer = BgzfStream::new();
//! writer.open_with_device(Box::new(MemoryDevice::for_writing(Arc::clone(&sink))))?;
//! writer.write(b"hello, blocked gzip")?;
//! writer.close()?;
//!
//! let compressed = sink.lock().clone();
//! let mut reader = BgzfStream::new();
//! reader.open_with_device(Box::new(MemoryDevice::for_reading(compressed)))?;
//! let mut buf = [0u8; 32];
//! let n = reader.read(&mut buf)?;
//! assert_eq!(&buf[..n], b"hello, blocked gzip");
//! # Ok(())
//! # }
//! ```

use libdeflater::{CompressionError, CompressionLvl, Compressor, Decompressor};

use crate::block::{
    check_block_header, decode_block_size, encode_bsize, write_block_header, BGZF_EOF,
    BGZF_FOOTER_SIZE, BGZF_HEADER_SIZE, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE,
};
use crate::device::{open_device, read_fully, Device, OpenMode};
use crate::error::{BgzfError, Result};
use crate::virtual_offset::VirtualOffset;

/// Step by which the deflate input is shrunk when a block refuses to fit
/// under the on-wire ceiling.
const DEFLATE_RETRY_STEP: usize = 1024;

/// A block-compressed stream codec over a [`Device`].
///
/// Created closed; [`open`](BgzfStream::open) (or one of its variants)
/// binds a device, and [`close`](BgzfStream::close) on a writable stream
/// flushes the pending block, appends the 28-byte empty-block EOF marker,
/// and releases the device.
///
/// Dropping an open write-mode stream without calling `close` discards the
/// buffered tail and the EOF marker; always close writable streams.
pub struct BgzfStream {
    /// Payload bytes not yet deflated (write) or just inflated (read).
    uncompressed_buf: Box<[u8]>,
    /// One gzip member being built (write) or consumed (read).
    compressed_buf: Box<[u8]>,
    /// Valid bytes in `uncompressed_buf` when reading; 0 on the write path.
    block_length: usize,
    /// In-block cursor: next write position (write) or read position (read).
    block_offset: usize,
    /// Compressed-file byte offset of the block currently materialized.
    block_address: u64,
    /// The bound device; `None` when closed.
    device: Option<Box<dyn Device>>,
    /// When false, deflate runs at a no-compression level but still emits
    /// valid gzip framing.
    compress_on_write: bool,
    /// Reused across blocks; compressors are built per deflate call since
    /// the level can change between blocks.
    decompressor: Decompressor,
}

impl Default for BgzfStream {
    fn default() -> Self {
        Self::new()
    }
}

impl BgzfStream {
    /// Create a closed codec with its two 64 KiB scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            uncompressed_buf: vec![0u8; DEFAULT_BLOCK_SIZE].into_boxed_slice(),
            compressed_buf: vec![0u8; MAX_BLOCK_SIZE].into_boxed_slice(),
            block_length: 0,
            block_offset: 0,
            block_address: 0,
            device: None,
            compress_on_write: true,
            decompressor: Decompressor::new(),
        }
    }

    /// Whether a device is currently bound.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// The mode of the bound device, if any.
    #[must_use]
    pub fn mode(&self) -> Option<OpenMode> {
        self.device.as_ref().map(|device| device.mode())
    }

    /// Toggle compression for subsequently written blocks.
    ///
    /// `close` restores the default (compressed), so call this after
    /// opening, not before.
    pub fn set_write_compressed(&mut self, compress: bool) {
        self.compress_on_write = compress;
    }

    /// Open a named device with a legacy mode string ("rb" or "wb").
    ///
    /// Thin adapter over [`open_with_mode`](BgzfStream::open_with_mode);
    /// the names `"stdin"`, `"stdout"`, and `"-"` route to the standard
    /// streams.
    ///
    /// # Errors
    ///
    /// [`BgzfError::UnknownMode`] for any other mode string, or a device
    /// open failure.
    pub fn open(&mut self, filename: &str, mode: &str) -> Result<()> {
        let mode = OpenMode::from_mode_str(mode)?;
        self.open_with_mode(filename, mode)
    }

    /// Open a named device in the given mode, closing any current device
    /// first.
    ///
    /// # Errors
    ///
    /// Propagates a failed close of the previous device or a device open
    /// failure.
    pub fn open_with_mode(&mut self, filename: &str, mode: OpenMode) -> Result<()> {
        self.close()?;
        self.device = Some(open_device(filename, mode)?);
        Ok(())
    }

    /// Bind a caller-constructed device, closing any current device first.
    ///
    /// # Errors
    ///
    /// Propagates a failed close of the previous device.
    pub fn open_with_device(&mut self, device: Box<dyn Device>) -> Result<()> {
        self.close()?;
        self.device = Some(device);
        Ok(())
    }

    /// Read up to `dst.len()` bytes of uncompressed payload.
    ///
    /// Returns the bytes delivered; `Ok(0)` is clean end of stream (an
    /// empty `dst` also returns 0 without touching the device).
    ///
    /// # Errors
    ///
    /// [`BgzfError::NotOpen`]/[`BgzfError::WrongMode`] when the stream is
    /// not open for reading, or any block read/validation/inflate failure.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }
        self.require_mode(OpenMode::ReadOnly)?;

        // Read and decompress blocks until the request is satisfied or the
        // stream ends.
        let mut total = 0;
        while total < dst.len() {
            let mut available = self.block_length.saturating_sub(self.block_offset);
            if available == 0 {
                self.read_block()?;
                available = self.block_length.saturating_sub(self.block_offset);
                if available == 0 {
                    break;
                }
            }

            let copy_len = (dst.len() - total).min(available);
            let source = &self.uncompressed_buf[self.block_offset..self.block_offset + copy_len];
            dst[total..total + copy_len].copy_from_slice(source);
            self.block_offset += copy_len;
            total += copy_len;
        }

        // Exhausted block: the next block starts at the device's current
        // position.
        if self.block_offset == self.block_length {
            let device = self.device.as_mut().ok_or(BgzfError::NotOpen)?;
            self.block_address = device.tell()?;
            self.block_offset = 0;
            self.block_length = 0;
        }

        Ok(total)
    }

    /// Buffer `src` for writing, deflating and emitting a block each time
    /// the 64 KiB accumulator fills.
    ///
    /// Returns the bytes consumed, always the full request on success.
    ///
    /// # Errors
    ///
    /// [`BgzfError::NotOpen`]/[`BgzfError::WrongMode`] when the stream is
    /// not open for writing, or any deflate/flush failure.
    pub fn write(&mut self, src: &[u8]) -> Result<usize> {
        self.require_mode(OpenMode::WriteOnly)?;

        let mut written = 0;
        while written < src.len() {
            let copy_len = (DEFAULT_BLOCK_SIZE - self.block_offset).min(src.len() - written);
            self.uncompressed_buf[self.block_offset..self.block_offset + copy_len]
                .copy_from_slice(&src[written..written + copy_len]);
            self.block_offset += copy_len;
            written += copy_len;

            if self.block_offset == DEFAULT_BLOCK_SIZE {
                self.flush_block()?;
            }
        }

        Ok(written)
    }

    /// The virtual offset of the next uncompressed byte, or zero when
    /// closed.
    #[must_use]
    pub fn tell(&self) -> VirtualOffset {
        if self.device.is_none() {
            return VirtualOffset::default();
        }
        VirtualOffset::new(self.block_address, (self.block_offset & 0xffff) as u16)
    }

    /// Reposition a read-mode stream to a virtual offset.
    ///
    /// The device is sought to the block address; the in-block offset is
    /// honored by the next `read`, which reloads the block.
    ///
    /// # Errors
    ///
    /// [`BgzfError::NotRandomAccess`] on devices without seek support,
    /// [`BgzfError::SeekFailed`] when the device rejects the position, or
    /// the usual open/mode errors.
    pub fn seek(&mut self, position: VirtualOffset) -> Result<()> {
        self.require_mode(OpenMode::ReadOnly)?;
        let device = self.device.as_mut().ok_or(BgzfError::NotOpen)?;
        if !device.is_random_access() {
            return Err(BgzfError::NotRandomAccess);
        }

        let block_address = position.compressed();
        device
            .seek(block_address)
            .map_err(|source| BgzfError::SeekFailed { position: block_address, source })?;

        // Force a refill on the next read; read_block preserves the preset
        // in-block offset when loading into an empty codec.
        self.block_length = 0;
        self.block_address = block_address;
        self.block_offset = position.uncompressed() as usize;
        Ok(())
    }

    /// Close the stream.
    ///
    /// On a write-mode device this flushes the pending block and appends
    /// the canonical 28-byte empty-block EOF marker. The device is released
    /// and all cursors reset. Closing an already-closed codec is a no-op.
    ///
    /// # Errors
    ///
    /// Any flush or EOF-marker write failure; the device is released
    /// either way.
    pub fn close(&mut self) -> Result<()> {
        if self.device.is_none() {
            return Ok(());
        }

        let result = self.finish();
        self.device = None;
        self.block_length = 0;
        self.block_offset = 0;
        self.block_address = 0;
        self.compress_on_write = true;
        result
    }

    /// Flush pending data and write the EOF marker on writable streams.
    fn finish(&mut self) -> Result<()> {
        let device = self.device.as_mut().ok_or(BgzfError::NotOpen)?;
        if device.mode() != OpenMode::WriteOnly {
            return Ok(());
        }

        self.flush_block()?;
        let device = self.device.as_mut().ok_or(BgzfError::NotOpen)?;
        let written = device.write(&BGZF_EOF)?;
        if written != BGZF_EOF.len() {
            return Err(BgzfError::ShortWrite { expected: BGZF_EOF.len(), written });
        }
        Ok(())
    }

    fn require_mode(&self, expected: OpenMode) -> Result<()> {
        let device = self.device.as_ref().ok_or(BgzfError::NotOpen)?;
        let actual = device.mode();
        if actual != expected {
            return Err(BgzfError::WrongMode { expected, actual });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deflate path
    // ------------------------------------------------------------------

    /// Frame and compress the buffered payload into `compressed_buf`,
    /// returning the total on-wire block size.
    ///
    /// When the payload refuses to fit under [`MAX_BLOCK_SIZE`] the input
    /// length is reduced by [`DEFLATE_RETRY_STEP`] and the deflate retried;
    /// bytes the deflate did not consume are compacted to the start of the
    /// uncompressed buffer and stay pending.
    fn deflate_block(&mut self) -> Result<usize> {
        write_block_header(&mut self.compressed_buf);

        let level = if self.compress_on_write {
            CompressionLvl::default()
        } else {
            CompressionLvl::new(0).map_err(|e| BgzfError::BlockCompress(format!("{e:?}")))?
        };
        let mut compressor = Compressor::new(level);

        let mut input_length = self.block_offset;
        let compressed_length = loop {
            let result = compressor.deflate_compress(
                &self.uncompressed_buf[..input_length],
                &mut self.compressed_buf[BGZF_HEADER_SIZE..MAX_BLOCK_SIZE - BGZF_FOOTER_SIZE],
            );
            match result {
                Ok(deflated) => break BGZF_HEADER_SIZE + deflated + BGZF_FOOTER_SIZE,
                Err(CompressionError::InsufficientSpace) => {
                    // Pathologically incompressible input: shrink the block
                    // until the frame fits.
                    input_length = input_length
                        .checked_sub(DEFLATE_RETRY_STEP)
                        .ok_or(BgzfError::InputReductionFailed)?;
                    log::debug!("deflate overflow, retrying with {input_length} input bytes");
                }
            }
        };

        if compressed_length > MAX_BLOCK_SIZE {
            return Err(BgzfError::DeflateOverflow { length: compressed_length });
        }
        encode_bsize(&mut self.compressed_buf, compressed_length);

        let crc = crc32fast::hash(&self.uncompressed_buf[..input_length]);
        self.compressed_buf[compressed_length - 8..compressed_length - 4]
            .copy_from_slice(&crc.to_le_bytes());
        self.compressed_buf[compressed_length - 4..compressed_length]
            .copy_from_slice(&(input_length as u32).to_le_bytes());

        // Bytes accepted by write but not consumed by this deflate stay
        // pending; the tail may never exceed the consumed portion.
        let remaining = self.block_offset - input_length;
        if remaining > 0 {
            if remaining > input_length {
                return Err(BgzfError::RemainderTooLarge { remaining, consumed: input_length });
            }
            self.uncompressed_buf.copy_within(input_length..self.block_offset, 0);
        }
        self.block_offset = remaining;

        Ok(compressed_length)
    }

    /// Deflate and emit blocks until the uncompressed accumulator is empty.
    fn flush_block(&mut self) -> Result<()> {
        while self.block_offset > 0 {
            let block_length = self.deflate_block()?;

            let device = self.device.as_mut().ok_or(BgzfError::NotOpen)?;
            let written = device.write(&self.compressed_buf[..block_length])?;
            if written != block_length {
                return Err(BgzfError::ShortWrite { expected: block_length, written });
            }

            self.block_address += block_length as u64;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inflate path
    // ------------------------------------------------------------------

    /// Decompress the member in `compressed_buf` into `uncompressed_buf`,
    /// returning the inflated length.
    ///
    /// The footer CRC32 is re-verified against the inflated bytes; ISIZE is
    /// not consulted.
    fn inflate_block(&mut self, block_length: usize) -> Result<usize> {
        let compressed = &self.compressed_buf[BGZF_HEADER_SIZE..block_length - BGZF_FOOTER_SIZE];
        let inflated = self
            .decompressor
            .deflate_decompress(compressed, &mut self.uncompressed_buf)
            .map_err(|e| BgzfError::BlockInflate(format!("{e:?}")))?;

        let expected = u32::from_le_bytes([
            self.compressed_buf[block_length - 8],
            self.compressed_buf[block_length - 7],
            self.compressed_buf[block_length - 6],
            self.compressed_buf[block_length - 5],
        ]);
        let actual = crc32fast::hash(&self.uncompressed_buf[..inflated]);
        if expected != actual {
            return Err(BgzfError::CrcMismatch { expected, actual });
        }

        Ok(inflated)
    }

    /// Load and inflate the next block from the device.
    ///
    /// A zero-byte header read is clean end of stream (`block_length`
    /// becomes 0); any other short read, an invalid header, or an inflate
    /// failure is an error.
    fn read_block(&mut self) -> Result<()> {
        let device = self.device.as_mut().ok_or(BgzfError::NotOpen)?;
        let block_address = device.tell()?;

        let mut header = [0u8; BGZF_HEADER_SIZE];
        let n = read_fully(&mut **device, &mut header)?;
        if n == 0 {
            self.block_length = 0;
            return Ok(());
        }
        if n != BGZF_HEADER_SIZE {
            return Err(BgzfError::TruncatedBlock { expected: BGZF_HEADER_SIZE, actual: n });
        }
        if !check_block_header(&header) {
            return Err(BgzfError::InvalidHeader);
        }

        let block_length = decode_block_size(&header);
        if block_length < BGZF_HEADER_SIZE + BGZF_FOOTER_SIZE {
            return Err(BgzfError::InvalidHeader);
        }
        self.compressed_buf[..BGZF_HEADER_SIZE].copy_from_slice(&header);

        let remaining = block_length - BGZF_HEADER_SIZE;
        let n = read_fully(&mut **device, &mut self.compressed_buf[BGZF_HEADER_SIZE..block_length])?;
        if n != remaining {
            return Err(BgzfError::TruncatedBlock { expected: remaining, actual: n });
        }

        let inflated = self.inflate_block(block_length)?;

        // A seek may have preset block_offset before any block was loaded;
        // that offset must survive the first refill.
        if self.block_length != 0 {
            self.block_offset = 0;
        }
        self.block_address = block_address;
        self.block_length = inflated;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    use super::*;
    use crate::device::{MemoryDevice, StdioDevice};

    fn compress_to_vec(payload: &[u8], compress: bool) -> Vec<u8> {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut stream = BgzfStream::new();
        stream
            .open_with_device(Box::new(MemoryDevice::for_writing(Arc::clone(&sink))))
            .unwrap();
        stream.set_write_compressed(compress);
        assert_eq!(stream.write(payload).unwrap(), payload.len());
        stream.close().unwrap();
        let compressed = sink.lock().clone();
        compressed
    }

    fn open_for_reading(compressed: Vec<u8>) -> BgzfStream {
        let mut stream = BgzfStream::new();
        stream.open_with_device(Box::new(MemoryDevice::for_reading(compressed))).unwrap();
        stream
    }

    fn read_to_end(stream: &mut BgzfStream) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    /// (address, on-wire size, uncompressed size) for every block.
    fn block_spans(compressed: &[u8]) -> Vec<(u64, usize, usize)> {
        let mut spans = Vec::new();
        let mut address = 0usize;
        while address < compressed.len() {
            let header = &compressed[address..address + BGZF_HEADER_SIZE];
            assert!(check_block_header(header), "bad header at {address}");
            let size = decode_block_size(header);
            let end = address + size;
            let isize =
                u32::from_le_bytes(compressed[end - 4..end].try_into().unwrap()) as usize;
            spans.push((address as u64, size, isize));
            address = end;
        }
        assert_eq!(address, compressed.len(), "trailing garbage after last block");
        spans
    }

    /// Virtual offset of uncompressed byte `k` in a raw stream.
    fn voffset_of(compressed: &[u8], k: usize) -> VirtualOffset {
        let mut remaining = k;
        for (address, _, isize) in block_spans(compressed) {
            if remaining < isize {
                return VirtualOffset::new(address, remaining as u16);
            }
            remaining -= isize;
        }
        panic!("byte {k} beyond end of stream");
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_empty_stream_is_canonical_eof_marker() {
        let compressed = compress_to_vec(&[], true);
        assert_eq!(compressed, BGZF_EOF);

        let mut stream = open_for_reading(compressed);
        let mut buf = [0u8; 16];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_single_byte_roundtrip_and_tell() {
        let compressed = compress_to_vec(&[0x41], true);
        let first_block_len = (compressed.len() - BGZF_EOF.len()) as u64;

        let mut stream = open_for_reading(compressed);
        assert_eq!(stream.tell(), VirtualOffset::new(0, 0));

        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0x41);
        // The exhausted block resets the cursor to the next block start.
        assert_eq!(stream.tell(), VirtualOffset::new(first_block_len, 0));
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_roundtrip_various_sizes() {
        for len in [0, 1, 100, 4096, 65_535, 65_536, 65_537, 70_000, 200_000] {
            let payload = pattern(len);
            let compressed = compress_to_vec(&payload, true);
            let mut stream = open_for_reading(compressed);
            assert_eq!(read_to_end(&mut stream), payload, "length {len}");
        }
    }

    #[test]
    fn test_short_last_block_roundtrips() {
        let payload = pattern(DEFAULT_BLOCK_SIZE + 4464);
        let compressed = compress_to_vec(&payload, true);
        let spans = block_spans(&compressed);
        assert_eq!(spans.len(), 3); // two data blocks + EOF marker
        assert_eq!(spans[0].2, DEFAULT_BLOCK_SIZE);
        assert_eq!(spans[1].2, 4464);
        assert_eq!(spans[2].2, 0);

        let mut stream = open_for_reading(compressed);
        assert_eq!(read_to_end(&mut stream), payload);
    }

    #[test]
    fn test_seek_into_second_block_of_zeros() {
        let payload = vec![0u8; 70_000];
        let compressed = compress_to_vec(&payload, true);
        let spans = block_spans(&compressed);
        let second_block_start = spans[1].0;

        let voffset = voffset_of(&compressed, 65_537);
        assert_eq!(voffset.compressed(), second_block_start);
        assert_eq!(voffset.uncompressed(), 1);

        let mut stream = open_for_reading(compressed);
        stream.seek(voffset).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(stream.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0x00);
    }

    #[test]
    fn test_seek_roundtrip_in_patterned_stream() {
        let payload = pattern(200_000);
        let compressed = compress_to_vec(&payload, true);

        let mut stream = open_for_reading(compressed.clone());
        for k in [0, 1, 65_535, 65_536, 100_000, 199_999] {
            stream.seek(voffset_of(&compressed, k)).unwrap();
            let mut buf = [0u8; 1];
            assert_eq!(stream.read(&mut buf).unwrap(), 1, "byte {k}");
            assert_eq!(buf[0], (k % 251) as u8, "byte {k}");
        }
        // S4: byte 100,000 is 100000 mod 251 = 46.
        stream.seek(voffset_of(&compressed, 100_000)).unwrap();
        let mut buf = [0u8; 1];
        stream.read(&mut buf).unwrap();
        assert_eq!(buf[0], 46);
    }

    #[test]
    fn test_tell_is_monotonic_during_sequential_read() {
        let payload = pattern(150_000);
        let compressed = compress_to_vec(&payload, true);
        let mut stream = open_for_reading(compressed);

        let mut previous = stream.tell();
        let mut buf = [0u8; 777];
        loop {
            let n = stream.read(&mut buf).unwrap();
            let current = stream.tell();
            assert!(current >= previous, "tell went backwards: {current} < {previous}");
            previous = current;
            if n == 0 {
                break;
            }
        }
    }

    #[test]
    fn test_incompressible_input_retries_and_roundtrips() {
        let mut payload = vec![0u8; DEFAULT_BLOCK_SIZE];
        StdRng::seed_from_u64(42).fill_bytes(&mut payload);

        let compressed = compress_to_vec(&payload, true);
        let spans = block_spans(&compressed);
        // 64 KiB of random bytes cannot fit one frame, so the retry loop
        // must have split the payload across at least two data blocks.
        assert!(spans.len() >= 3, "expected a split, got {} blocks", spans.len());
        for (address, size, _) in &spans {
            assert!(*size <= MAX_BLOCK_SIZE, "block at {address} is {size} bytes");
        }

        let mut stream = open_for_reading(compressed);
        assert_eq!(read_to_end(&mut stream), payload);
    }

    #[test]
    fn test_no_compress_mode_roundtrips() {
        let payload = pattern(100);
        let compressed = compress_to_vec(&payload, false);
        let spans = block_spans(&compressed);
        // Stored deflate cannot shrink the payload.
        assert!(spans[0].1 >= BGZF_HEADER_SIZE + payload.len() + BGZF_FOOTER_SIZE);

        let mut stream = open_for_reading(compressed);
        assert_eq!(read_to_end(&mut stream), payload);
    }

    #[test]
    fn test_no_compress_large_payload_roundtrips() {
        let payload = pattern(DEFAULT_BLOCK_SIZE + 100);
        let compressed = compress_to_vec(&payload, false);
        for (address, size, _) in block_spans(&compressed) {
            assert!(size <= MAX_BLOCK_SIZE, "block at {address} is {size} bytes");
        }
        let mut stream = open_for_reading(compressed);
        assert_eq!(read_to_end(&mut stream), payload);
    }

    #[test]
    fn test_block_cap_signature_and_bsize() {
        let payload = pattern(200_000);
        let compressed = compress_to_vec(&payload, true);

        for (address, size, _) in block_spans(&compressed) {
            let start = address as usize;
            assert!(size <= MAX_BLOCK_SIZE);
            assert_eq!(&compressed[start..start + 4], &[0x1f, 0x8b, 0x08, 0x04]);
            assert_eq!(&compressed[start + 12..start + 16], &[b'B', b'C', 0x02, 0x00]);
            let bsize =
                u16::from_le_bytes([compressed[start + 16], compressed[start + 17]]) as usize;
            assert_eq!(bsize, size - 1);
        }
    }

    #[test]
    fn test_footer_crc_matches_inflated_contents() {
        let payload = pattern(10_000);
        let compressed = compress_to_vec(&payload, true);
        let (address, size, isize) = block_spans(&compressed)[0];
        let start = address as usize;

        let deflate_payload = &compressed[start + BGZF_HEADER_SIZE..start + size - BGZF_FOOTER_SIZE];
        let mut inflated = vec![0u8; DEFAULT_BLOCK_SIZE];
        let n = Decompressor::new().deflate_decompress(deflate_payload, &mut inflated).unwrap();
        assert_eq!(n, isize);

        let footer_crc = u32::from_le_bytes(
            compressed[start + size - 8..start + size - 4].try_into().unwrap(),
        );
        assert_eq!(footer_crc, crc32fast::hash(&inflated[..n]));
    }

    #[test]
    fn test_corrupted_subfield_id_fails_read() {
        let payload = pattern(100);
        let mut compressed = compress_to_vec(&payload, true);
        assert_eq!(compressed[12], b'B');
        compressed[12] = b'X';

        let mut stream = open_for_reading(compressed);
        let mut buf = [0u8; 16];
        assert!(matches!(stream.read(&mut buf), Err(BgzfError::InvalidHeader)));
    }

    #[test]
    fn test_corrupted_footer_crc_fails_read() {
        let payload = pattern(100);
        let mut compressed = compress_to_vec(&payload, true);
        let (_, size, _) = block_spans(&compressed)[0];
        compressed[size - 8] ^= 0xff;

        let mut stream = open_for_reading(compressed);
        let mut buf = [0u8; 16];
        assert!(matches!(stream.read(&mut buf), Err(BgzfError::CrcMismatch { .. })));
    }

    #[test]
    fn test_truncated_block_fails_read() {
        let payload = pattern(100);
        let compressed = compress_to_vec(&payload, true);
        let truncated = compressed[..compressed.len() - BGZF_EOF.len() - 3].to_vec();

        let mut stream = open_for_reading(truncated);
        let mut buf = [0u8; 16];
        assert!(matches!(stream.read(&mut buf), Err(BgzfError::TruncatedBlock { .. })));
    }

    #[test]
    fn test_close_is_idempotent() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut stream = BgzfStream::new();
        stream
            .open_with_device(Box::new(MemoryDevice::for_writing(Arc::clone(&sink))))
            .unwrap();
        stream.close().unwrap();
        stream.close().unwrap();
        assert!(!stream.is_open());
        assert_eq!(sink.lock().as_slice(), &BGZF_EOF);
        assert_eq!(stream.tell(), VirtualOffset::default());
    }

    #[test]
    fn test_mode_and_openness_enforced() {
        let mut stream = BgzfStream::new();
        let mut buf = [0u8; 4];
        assert!(matches!(stream.read(&mut buf), Err(BgzfError::NotOpen)));
        assert!(matches!(stream.write(&buf), Err(BgzfError::NotOpen)));

        let sink = Arc::new(Mutex::new(Vec::new()));
        stream.open_with_device(Box::new(MemoryDevice::for_writing(sink))).unwrap();
        assert!(matches!(stream.read(&mut buf), Err(BgzfError::WrongMode { .. })));

        let mut stream = open_for_reading(BGZF_EOF.to_vec());
        assert!(matches!(stream.write(&buf), Err(BgzfError::WrongMode { .. })));
    }

    #[test]
    fn test_seek_requires_random_access() {
        let mut stream = BgzfStream::new();
        stream.open_with_device(Box::new(StdioDevice::stdin())).unwrap();
        let result = stream.seek(VirtualOffset::new(0, 0));
        assert!(matches!(result, Err(BgzfError::NotRandomAccess)));
    }

    #[test]
    fn test_unknown_legacy_mode_string() {
        let mut stream = BgzfStream::new();
        assert!(matches!(
            stream.open("whatever", "r+"),
            Err(BgzfError::UnknownMode { .. })
        ));
        assert!(!stream.is_open());
    }

    #[test]
    fn test_write_across_exact_block_boundary() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut stream = BgzfStream::new();
        stream
            .open_with_device(Box::new(MemoryDevice::for_writing(Arc::clone(&sink))))
            .unwrap();

        let payload = pattern(DEFAULT_BLOCK_SIZE);
        stream.write(&payload).unwrap();
        // The full accumulator flushes eagerly, so the cursor is clean for
        // the next byte.
        assert_eq!(stream.tell().uncompressed(), 0);
        stream.write(b"tail").unwrap();
        stream.close().unwrap();

        let compressed = sink.lock().clone();
        let mut expected = payload;
        expected.extend_from_slice(b"tail");
        let mut stream = open_for_reading(compressed);
        assert_eq!(read_to_end(&mut stream), expected);
    }

    #[test]
    fn test_reads_spanning_block_boundaries() {
        let payload = pattern(DEFAULT_BLOCK_SIZE * 2 + 123);
        let compressed = compress_to_vec(&payload, true);
        let mut stream = open_for_reading(compressed);

        // One request larger than any single block.
        let mut out = vec![0u8; payload.len()];
        let mut total = 0;
        while total < out.len() {
            let n = stream.read(&mut out[total..]).unwrap();
            assert!(n > 0);
            total += n;
        }
        assert_eq!(out, payload);
    }
}
