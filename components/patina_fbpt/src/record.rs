//! Performance record header shared by every FBPT and FPDT record.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

pub mod dynamic_string;

use core::mem;

use scroll::{Pread, Pwrite, SizeWith};

use crate::{
    byte_source::ByteSource,
    error::{Error, Result},
};

pub use dynamic_string::{DynamicStringEventRecord, MeasurementRecord};

/// Maximum size in byte that a performance record can have.
pub const FPDT_MAX_PERF_RECORD_SIZE: usize = u8::MAX as usize;

/// Size in byte of the header of a performance record.
pub const PERFORMANCE_RECORD_HEADER_SIZE: usize = mem::size_of::<u16>() // Type
        + mem::size_of::<u8>() // Length
        + mem::size_of::<u8>(); // Revision

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pread, Pwrite, SizeWith)]
pub struct PerformanceRecordHeader {
    /// This value depicts the format and contents of the performance record.
    pub record_type: u16,
    /// This value depicts the length of the performance record, in bytes, header included.
    pub length: u8,
    /// This value is updated if the format of the record type is extended.
    pub revision: u8,
}

impl PerformanceRecordHeader {
    pub const fn new(record_type: u16, length: u8, revision: u8) -> Self {
        Self { record_type, length, revision }
    }

    /// Reads a header at the current cursor. Unknown record types are not an error.
    pub fn read<S: ByteSource + ?Sized>(source: &mut S) -> Result<Self> {
        let offset = source.position();
        let mut buffer = [0_u8; PERFORMANCE_RECORD_HEADER_SIZE];
        source.read_exact(&mut buffer)?;
        buffer.pread_with(0, scroll::LE).map_err(|e| Error::from_scroll(e, offset))
    }

    /// Number of bytes following the header, or `None` when the declared length cannot hold the header.
    pub fn data_length(&self) -> Option<u8> {
        self.length.checked_sub(PERFORMANCE_RECORD_HEADER_SIZE as u8)
    }
}
