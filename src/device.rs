//! Byte devices the codec rides on.
//!
//! A [`Device`] is the pluggable byte source/sink underneath a BGZF stream:
//! a positioned file, a standard stream, or an in-memory buffer. The codec
//! borrows the device exclusively from open to close and drives it strictly
//! sequentially (plus seeks on random-access read devices).
//!
//! The [`open_device`] factory routes the conventional sentinels `"stdin"`,
//! `"stdout"`, and `"-"` to the standard streams; everything else opens a
//! file.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{BgzfError, Result};

// ============================================================================
// Open modes
// ============================================================================

/// Direction a device is open in. The codec is never bidirectional on one
/// handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// Sequential reads plus seeks where the device supports them.
    ReadOnly,
    /// Sequential writes.
    WriteOnly,
}

impl OpenMode {
    /// Parse a legacy mode string ("rb" or "wb").
    ///
    /// # Errors
    ///
    /// Returns [`BgzfError::UnknownMode`] for any other string.
    pub fn from_mode_str(mode: &str) -> Result<Self> {
        match mode {
            "rb" => Ok(Self::ReadOnly),
            "wb" => Ok(Self::WriteOnly),
            _ => Err(BgzfError::UnknownMode { mode: mode.to_string() }),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("read-only"),
            Self::WriteOnly => f.write_str("write-only"),
        }
    }
}

// ============================================================================
// Device contract
// ============================================================================

/// Byte source/sink contract consumed by the codec.
///
/// Opening happens at construction (constructors return `Result`); closing
/// happens on drop. Short reads are permitted and a read of 0 bytes means
/// end of stream; short writes are surfaced to the caller, which treats
/// them as fatal during a block flush.
pub trait Device {
    /// The mode this device was opened in.
    fn mode(&self) -> OpenMode;

    /// Whether [`Device::seek`] is supported.
    fn is_random_access(&self) -> bool;

    /// Read up to `buf.len()` bytes; 0 means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write up to `buf.len()` bytes, returning the count accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// The current byte offset.
    fn tell(&mut self) -> io::Result<u64>;

    /// Reposition to an absolute byte offset.
    fn seek(&mut self, pos: u64) -> io::Result<()>;
}

/// Read into `buf` until it is full or the device ends, returning the byte
/// count delivered.
///
/// The device contract permits short reads (pipes, standard streams), so a
/// single span may take several device calls.
///
/// # Errors
///
/// Propagates the first device error.
pub fn read_fully(device: &mut dyn Device, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = device.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

// ============================================================================
// File device
// ============================================================================

/// A positioned file device.
pub struct FileDevice {
    file: File,
    mode: OpenMode,
}

impl FileDevice {
    /// Open `path` for reading or create/truncate it for writing.
    ///
    /// # Errors
    ///
    /// Propagates the filesystem error.
    pub fn open(path: &str, mode: OpenMode) -> io::Result<Self> {
        let file = match mode {
            OpenMode::ReadOnly => File::open(path)?,
            OpenMode::WriteOnly => File::create(path)?,
        };
        Ok(Self { file, mode })
    }
}

impl Device for FileDevice {
    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn is_random_access(&self) -> bool {
        true
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos)).map(|_| ())
    }
}

// ============================================================================
// Standard-stream device
// ============================================================================

enum StdStream {
    Input(io::Stdin),
    Output(io::Stdout),
}

/// A device over stdin (read mode) or stdout (write mode).
///
/// The byte position is tracked by counter; seeking is unsupported.
pub struct StdioDevice {
    stream: StdStream,
    position: u64,
}

impl StdioDevice {
    /// A read-only device over standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self { stream: StdStream::Input(io::stdin()), position: 0 }
    }

    /// A write-only device over standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self { stream: StdStream::Output(io::stdout()), position: 0 }
    }
}

impl Device for StdioDevice {
    fn mode(&self) -> OpenMode {
        match self.stream {
            StdStream::Input(_) => OpenMode::ReadOnly,
            StdStream::Output(_) => OpenMode::WriteOnly,
        }
    }

    fn is_random_access(&self) -> bool {
        false
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            StdStream::Input(stream) => {
                let n = stream.read(buf)?;
                self.position += n as u64;
                Ok(n)
            }
            StdStream::Output(_) => {
                Err(io::Error::new(io::ErrorKind::Unsupported, "stdout is write-only"))
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.stream {
            StdStream::Input(_) => {
                Err(io::Error::new(io::ErrorKind::Unsupported, "stdin is read-only"))
            }
            StdStream::Output(stream) => {
                let n = stream.write(buf)?;
                self.position += n as u64;
                Ok(n)
            }
        }
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }

    fn seek(&mut self, _pos: u64) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "standard streams are not seekable"))
    }
}

// ============================================================================
// Memory device
// ============================================================================

/// An in-memory device, random access in both modes.
///
/// A write-mode device appends into a shared buffer the caller keeps a
/// handle to, so the produced bytes stay reachable after the codec drops
/// the device on close:
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use bgzf_stream::device::MemoryDevice;
///
/// let sink = Arc::new(Mutex::new(Vec::new()));
/// let device = MemoryDevice::for_writing(Arc::clone(&sink));
/// // ... hand `device` to a stream, write, close ...
/// # drop(device);
/// let bytes = sink.lock().clone();
/// assert!(bytes.is_empty());
/// ```
pub struct MemoryDevice {
    data: Arc<Mutex<Vec<u8>>>,
    position: u64,
    mode: OpenMode,
}

impl MemoryDevice {
    /// A read-only device over `data`.
    #[must_use]
    pub fn for_reading(data: Vec<u8>) -> Self {
        Self { data: Arc::new(Mutex::new(data)), position: 0, mode: OpenMode::ReadOnly }
    }

    /// A write-only device appending into `sink`.
    #[must_use]
    pub fn for_writing(sink: Arc<Mutex<Vec<u8>>>) -> Self {
        Self { data: sink, position: 0, mode: OpenMode::WriteOnly }
    }
}

impl Device for MemoryDevice {
    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn is_random_access(&self) -> bool {
        true
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.lock();
        let start = (self.position as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        drop(data);
        self.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.lock();
        let start = self.position as usize;
        if start < data.len() {
            let overlap = buf.len().min(data.len() - start);
            data[start..start + overlap].copy_from_slice(&buf[..overlap]);
            data.extend_from_slice(&buf[overlap..]);
        } else {
            data.resize(start, 0);
            data.extend_from_slice(buf);
        }
        drop(data);
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.position = pos;
        Ok(())
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Open a device by name.
///
/// The sentinels `"stdin"`, `"stdout"`, and `"-"` route to the standard
/// streams (`"-"` picks the stream matching `mode`); any other name opens
/// a file.
///
/// # Errors
///
/// Returns [`BgzfError::DeviceOpen`] when the name cannot be opened in the
/// requested mode.
pub fn open_device(name: &str, mode: OpenMode) -> Result<Box<dyn Device>> {
    match (name, mode) {
        ("stdin" | "-", OpenMode::ReadOnly) => Ok(Box::new(StdioDevice::stdin())),
        ("stdout" | "-", OpenMode::WriteOnly) => Ok(Box::new(StdioDevice::stdout())),
        ("stdin", OpenMode::WriteOnly) => Err(BgzfError::DeviceOpen {
            path: name.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "stdin is read-only"),
        }),
        ("stdout", OpenMode::ReadOnly) => Err(BgzfError::DeviceOpen {
            path: name.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "stdout is write-only"),
        }),
        _ => match FileDevice::open(name, mode) {
            Ok(device) => Ok(Box::new(device)),
            Err(source) => Err(BgzfError::DeviceOpen { path: name.to_string(), source }),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
