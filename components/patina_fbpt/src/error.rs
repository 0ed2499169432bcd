//! Error types returned while locating and scanning a Firmware Basic Boot Performance Table.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use alloc::vec::Vec;
use core::fmt::Display;

use crate::record::MeasurementRecord;

/// Result type used by every fallible operation of this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for FBPT discovery and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The memory source could not be opened or reached.
    DeviceAccess {
        /// Short description of the underlying failure.
        reason: &'static str,
    },
    /// The requested position is outside of the memory source.
    SeekOutOfRange {
        /// Absolute offset that was requested.
        offset: u64,
    },
    /// Fewer bytes than requested were available, the table is truncated or corrupted.
    ShortRead {
        /// Absolute offset at which the read started.
        offset: u64,
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes that were actually available.
        available: usize,
    },
    /// The magic bytes found at the table base do not match.
    SignatureMismatch {
        /// Signature that was expected.
        expected: [u8; 4],
        /// Bytes observed at the table base.
        found: [u8; 4],
    },
    /// A record declares a length smaller than its own fixed overhead.
    Structural {
        /// Absolute offset of the record header.
        offset: u64,
        /// Type of the offending record.
        record_type: u16,
        /// Length declared in the record header.
        length: u8,
        /// Smallest length allowed for this record type.
        minimum: u8,
    },
    /// A record extends past the end declared in the table header.
    RecordOverrun {
        /// Absolute offset of the record header.
        offset: u64,
        /// Length declared in the record header.
        length: u8,
        /// Bytes left in the table when the record was reached.
        remaining: u64,
    },
    /// The FPDT does not reference a basic boot performance table.
    TableNotFound,
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::DeviceAccess { reason } => write!(f, "Unable to access memory source: {reason}"),
            Error::SeekOutOfRange { offset } => write!(f, "Seek to {offset:#x} is outside of the memory source"),
            Error::ShortRead { offset, requested, available } => {
                write!(f, "Short read at {offset:#x}: requested {requested} bytes, {available} available")
            }
            Error::SignatureMismatch { expected, found } => write!(
                f,
                "Table signature check failed. Expected: {}, Got: {}",
                DisplaySignature(expected),
                DisplaySignature(found)
            ),
            Error::Structural { offset, record_type, length, minimum } => write!(
                f,
                "Record {record_type:#06x} at {offset:#x} declares length {length}, minimum is {minimum}"
            ),
            Error::RecordOverrun { offset, length, remaining } => write!(
                f,
                "Record at {offset:#x} with length {length} overruns the table, {remaining} bytes remaining"
            ),
            Error::TableNotFound => write!(f, "FPDT does not contain a basic boot performance table pointer"),
        }
    }
}

impl core::error::Error for Error {}

impl Error {
    /// Converts a `scroll` failure for a read that started at the absolute `offset`.
    pub(crate) fn from_scroll(error: scroll::Error, offset: u64) -> Self {
        match error {
            scroll::Error::TooBig { size, len } => Error::ShortRead { offset, requested: size, available: len },
            scroll::Error::BadOffset(_) => Error::SeekOutOfRange { offset },
            _ => Error::DeviceAccess { reason: "malformed buffer" },
        }
    }
}

/// Prints a signature as ASCII, escaping bytes that are not printable.
struct DisplaySignature<'a>(&'a [u8; 4]);

impl Display for DisplaySignature<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for &b in self.0.iter() {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// Error returned by a scan, carrying the records decoded before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    records: Vec<MeasurementRecord>,
    error: Error,
}

impl ScanError {
    pub(crate) fn new(records: Vec<MeasurementRecord>, error: Error) -> Self {
        Self { records, error }
    }

    /// The underlying failure.
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Records successfully decoded before the failure, in table order.
    pub fn partial_records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Splits the error into the partial records and the underlying failure.
    pub fn into_parts(self) -> (Vec<MeasurementRecord>, Error) {
        (self.records, self.error)
    }
}

impl From<Error> for ScanError {
    fn from(value: Error) -> Self {
        Self::new(Vec::new(), value)
    }
}

impl Display for ScanError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({} records decoded before the failure)", self.error, self.records.len())
    }
}

impl core::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.error)
    }
}
