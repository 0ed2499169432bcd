//! Seekable, read-only byte sources the FBPT is decoded from.
//!
//! [`SliceSource`] serves synthetic in-memory images. With the `std` feature, [`IoSource`] wraps any
//! [`std::io::Read`] + [`std::io::Seek`] implementation and [`PhysicalMemory`] opens the platform memory device.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use crate::error::{Error, Result};

#[cfg(any(test, feature = "mockall"))]
use mockall::automock;

/// Read-only, seekable view over a memory medium.
///
/// Offsets are absolute physical addresses. A read either fills the whole buffer or fails, short reads are
/// never padded.
#[cfg_attr(any(test, feature = "mockall"), automock)]
pub trait ByteSource {
    /// Moves the read cursor to `offset`.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Fills `buf` from the current cursor and advances the cursor by `buf.len()`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Returns the current cursor.
    fn position(&self) -> u64;

    /// Advances the cursor by `count` bytes without reading them.
    fn skip(&mut self, count: u64) -> Result<()> {
        let position = self.position();
        let target = position.checked_add(count).ok_or(Error::SeekOutOfRange { offset: u64::MAX })?;
        self.seek(target)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn seek(&mut self, offset: u64) -> Result<()> {
        (**self).seek(offset)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn skip(&mut self, count: u64) -> Result<()> {
        (**self).skip(count)
    }
}

/// In-memory byte source. Byte 0 of the slice is mapped to the physical address `base`.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    base: u64,
    cursor: u64,
}

impl<'a> SliceSource<'a> {
    /// Creates a source where byte 0 of `data` is physical address 0.
    pub const fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Creates a source where byte 0 of `data` is the physical address `base`.
    pub const fn with_base(data: &'a [u8], base: u64) -> Self {
        Self { data, base, cursor: base }
    }
}

impl ByteSource for SliceSource<'_> {
    fn seek(&mut self, offset: u64) -> Result<()> {
        // Positioning exactly at the end is allowed, the next read reports the truncation.
        // Addresses above `u64::MAX` are unreachable even when the slice extends that far.
        if offset < self.base || offset - self.base > self.data.len() as u64 {
            return Err(Error::SeekOutOfRange { offset });
        }
        self.cursor = offset;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = (self.cursor - self.base) as usize;
        let available = self.data.len() - start;
        if available < buf.len() {
            return Err(Error::ShortRead { offset: self.cursor, requested: buf.len(), available });
        }
        let cursor = self.cursor.checked_add(buf.len() as u64).ok_or(Error::SeekOutOfRange { offset: u64::MAX })?;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        self.cursor = cursor;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.cursor
    }
}

#[cfg(feature = "std")]
pub use std_source::{IoSource, PhysicalMemory, PHYSICAL_MEMORY_DEVICE};

#[cfg(feature = "std")]
mod std_source {
    use std::{
        fs::File,
        io::{self, Read, Seek, SeekFrom},
        path::Path,
        time::Instant,
    };

    use super::ByteSource;
    use crate::error::{Error, Result};

    /// Default path of the physical memory device.
    pub const PHYSICAL_MEMORY_DEVICE: &str = "/dev/mem";

    /// Byte source over any standard reader.
    ///
    /// An optional deadline bounds the time spent reading: once it has passed, every seek and read fails with
    /// [`Error::DeviceAccess`].
    #[derive(Debug)]
    pub struct IoSource<R: Read + Seek> {
        inner: R,
        cursor: u64,
        deadline: Option<Instant>,
    }

    impl<R: Read + Seek> IoSource<R> {
        /// Wraps `inner`, taking its current stream position as the cursor.
        pub fn new(mut inner: R) -> Result<Self> {
            let cursor = inner.stream_position().map_err(|e| device_error(&e))?;
            Ok(Self { inner, cursor, deadline: None })
        }

        /// Fails any access issued after `deadline`.
        pub fn with_deadline(mut self, deadline: Instant) -> Self {
            self.deadline = Some(deadline);
            self
        }

        /// Returns the wrapped reader.
        pub fn into_inner(self) -> R {
            self.inner
        }

        fn check_deadline(&self) -> Result<()> {
            match self.deadline {
                Some(deadline) if Instant::now() >= deadline => Err(Error::DeviceAccess { reason: "deadline expired" }),
                _ => Ok(()),
            }
        }
    }

    impl<R: Read + Seek> ByteSource for IoSource<R> {
        fn seek(&mut self, offset: u64) -> Result<()> {
            self.check_deadline()?;
            self.inner.seek(SeekFrom::Start(offset)).map_err(|e| match e.kind() {
                io::ErrorKind::InvalidInput => Error::SeekOutOfRange { offset },
                _ => device_error(&e),
            })?;
            self.cursor = offset;
            Ok(())
        }

        fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
            self.check_deadline()?;
            let mut filled = 0;
            while filled < buf.len() {
                match self.inner.read(&mut buf[filled..]) {
                    Ok(0) => {
                        return Err(Error::ShortRead { offset: self.cursor, requested: buf.len(), available: filled });
                    }
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(device_error(&e)),
                }
            }
            self.cursor += buf.len() as u64;
            Ok(())
        }

        fn position(&self) -> u64 {
            self.cursor
        }
    }

    /// Read-only handle on a physical memory device or a raw memory image file.
    ///
    /// The handle is closed when the value is dropped.
    pub type PhysicalMemory = IoSource<File>;

    impl IoSource<File> {
        /// Opens `path` read-only.
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            log::debug!(target: "fbpt", "Opening memory source {}", path.display());
            let file = File::open(path).map_err(|e| device_error(&e))?;
            Self::new(file)
        }
    }

    fn device_error(e: &io::Error) -> Error {
        let reason = match e.kind() {
            io::ErrorKind::NotFound => "not found",
            io::ErrorKind::PermissionDenied => "permission denied",
            io::ErrorKind::Unsupported => "unsupported",
            _ => "i/o error",
        };
        log::debug!(target: "fbpt", "Memory source access failed: {e}");
        Error::DeviceAccess { reason }
    }

}
