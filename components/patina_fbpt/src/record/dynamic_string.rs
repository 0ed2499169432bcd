//! Dynamic string event record (type `0x1011`), the record carrying boot measurements.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use alloc::{
    format,
    string::{String, ToString},
    vec,
};
use core::mem;

use r_efi::efi;
use scroll::{Pread, Pwrite};

use super::{PerformanceRecordHeader, FPDT_MAX_PERF_RECORD_SIZE, PERFORMANCE_RECORD_HEADER_SIZE};
use crate::{
    byte_source::ByteSource,
    error::{Error, Result},
    guid::FmtGuid,
    known::hook_type_name,
};

/// Decoder for the dynamic string event record.
pub struct DynamicStringEventRecord;

impl DynamicStringEventRecord {
    /// The defined type ID for this record.
    pub const TYPE: u16 = 0x1011;
    /// The current revision version of this structure.
    pub const REVISION: u8 = 1;

    /// Size of the fields preceding the description.
    pub const FIXED_DATA_SIZE: usize = mem::size_of::<u16>() // ProgressID
        + mem::size_of::<u32>() // ApicID
        + mem::size_of::<u64>() // Timestamp
        + mem::size_of::<efi::Guid>(); // Guid

    /// Smallest valid record length, header included.
    pub const MIN_LENGTH: u8 = (PERFORMANCE_RECORD_HEADER_SIZE + Self::FIXED_DATA_SIZE) as u8;

    /// Decodes the record body following `header`, which was read at `offset`.
    ///
    /// The cursor of `source` must be right after the header. On success it is left at the end of the record.
    pub fn read<S: ByteSource + ?Sized>(
        source: &mut S,
        header: &PerformanceRecordHeader,
        offset: u64,
    ) -> Result<MeasurementRecord> {
        if header.length < Self::MIN_LENGTH {
            return Err(Error::Structural {
                offset,
                record_type: header.record_type,
                length: header.length,
                minimum: Self::MIN_LENGTH,
            });
        }

        let mut fixed = [0_u8; Self::FIXED_DATA_SIZE];
        source.read_exact(&mut fixed)?;

        let mut description = vec![0_u8; (header.length - Self::MIN_LENGTH) as usize];
        source.read_exact(&mut description)?;

        let parse_fixed = || -> core::result::Result<(u16, u32, u64, [u8; 16]), scroll::Error> {
            let mut data_offset = 0;
            let progress_id = fixed.gread_with::<u16>(&mut data_offset, scroll::LE)?;
            let processor_identifier = fixed.gread_with::<u32>(&mut data_offset, scroll::LE)?;
            let timestamp = fixed.gread_with::<u64>(&mut data_offset, scroll::LE)?;
            let mut guid_bytes = [0_u8; 16];
            fixed.gread_inout_with(&mut data_offset, &mut guid_bytes[..], scroll::LE)?;
            Ok((progress_id, processor_identifier, timestamp, guid_bytes))
        };
        let (progress_id, processor_identifier, timestamp, guid_bytes) =
            parse_fixed().map_err(|e| Error::from_scroll(e, offset + PERFORMANCE_RECORD_HEADER_SIZE as u64))?;

        // ASCII string padded with null characters, only the text before the first NUL is kept.
        let end = description.iter().position(|&b| b == 0).unwrap_or(description.len());
        let description = String::from_utf8_lossy(&description[..end]).to_string();

        Ok(MeasurementRecord {
            hook_type: hook_type_name(progress_id),
            progress_id,
            processor_identifier,
            timestamp,
            guid: efi::Guid::from_bytes(&guid_bytes),
            description,
        })
    }
}

/// A boot measurement decoded from a dynamic string event record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementRecord {
    /// Label of the progress identifier, empty when the identifier is not known.
    pub hook_type: &'static str,
    /// Raw progress identifier.
    pub progress_id: u16,
    /// APIC ID for the processor in the system used as a timestamp clock source.
    pub processor_identifier: u32,
    /// 64-bit value (nanosecond) describing elapsed time since the most recent deassertion of processor reset.
    pub timestamp: u64,
    /// If ProgressID < 0x10, GUID of the referenced module; otherwise, GUID of the module logging the event.
    pub guid: efi::Guid,
    /// Module name, function name, or token name.
    ///
    /// Decoded from the description bytes up to the first NUL, invalid UTF-8 being replaced. The text never
    /// contains a NUL.
    pub description: String,
}

impl MeasurementRecord {
    pub fn new(
        progress_id: u16,
        processor_identifier: u32,
        timestamp: u64,
        guid: efi::Guid,
        description: impl Into<String>,
    ) -> Self {
        Self {
            hook_type: hook_type_name(progress_id),
            progress_id,
            processor_identifier,
            timestamp,
            guid,
            description: description.into(),
        }
    }

    /// Canonical text form of the GUID.
    pub fn guid_string(&self) -> String {
        format!("{}", FmtGuid(&self.guid))
    }

    /// A record with no timestamp, no known hook type and no description carries no information.
    pub fn is_empty(&self) -> bool {
        self.timestamp == 0 && self.hook_type.is_empty() && self.description.is_empty()
    }

    /// Length of the encoded record, header and string terminator included.
    pub fn encoded_length(&self) -> usize {
        DynamicStringEventRecord::MIN_LENGTH as usize + self.description.len() + 1
    }

    /// Encodes the record, header included, at `offset` and advances it. Returns the record size.
    ///
    /// Fails with [`scroll::Error::BadInput`] when the description contains a NUL, which could not be decoded back.
    pub fn write_into(&self, buff: &mut [u8], offset: &mut usize) -> core::result::Result<usize, scroll::Error> {
        let record_size = self.encoded_length();
        if self.description.contains('\0') {
            return Err(scroll::Error::BadInput { size: self.description.len(), msg: "description contains a NUL" });
        }
        if record_size > FPDT_MAX_PERF_RECORD_SIZE {
            return Err(scroll::Error::TooBig { size: record_size, len: FPDT_MAX_PERF_RECORD_SIZE });
        }

        let mut writing_offset = *offset;
        let header = PerformanceRecordHeader::new(
            DynamicStringEventRecord::TYPE,
            record_size as u8,
            DynamicStringEventRecord::REVISION,
        );
        buff.gwrite_with(header, &mut writing_offset, scroll::LE)?;
        buff.gwrite_with(self.progress_id, &mut writing_offset, scroll::LE)?;
        buff.gwrite_with(self.processor_identifier, &mut writing_offset, scroll::LE)?;
        buff.gwrite_with(self.timestamp, &mut writing_offset, scroll::LE)?;
        buff.gwrite_with(self.guid.as_bytes().as_slice(), &mut writing_offset, ())?;
        buff.gwrite_with(self.description.as_bytes(), &mut writing_offset, ())?;
        buff.gwrite_with(0_u8, &mut writing_offset, scroll::LE)?; // End of the string.

        *offset = writing_offset;
        Ok(record_size)
    }
}
