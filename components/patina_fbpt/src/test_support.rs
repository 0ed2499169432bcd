//! Builders for synthetic FBPT and FPDT images used by unit tests.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use alloc::vec::Vec;

use r_efi::efi;
use scroll::Pwrite;

use crate::{
    locator::Fpdt,
    record::{MeasurementRecord, PerformanceRecordHeader, FPDT_MAX_PERF_RECORD_SIZE, PERFORMANCE_RECORD_HEADER_SIZE},
    table::{PerformanceTableHeader, FBPT_HEADER_SIZE, FBPT_SIGNATURE},
};

pub(crate) const TEST_GUID: efi::Guid =
    efi::Guid::from_fields(0x3b387bfd, 0x7abc, 0x4cf2, 0xa0, 0xca, &[0xb6, 0xa1, 0x6c, 0x1b, 0x1b, 0x25]);

pub(crate) fn measurement(progress_id: u16, timestamp: u64, description: &str) -> MeasurementRecord {
    MeasurementRecord::new(progress_id, 0, timestamp, TEST_GUID, description)
}

/// Appends a record header followed by `length - 4` zero bytes. Lengths below the header size still emit a header.
fn push_record(buffer: &mut Vec<u8>, record_type: u16, length: u8, revision: u8) {
    let offset = buffer.len();
    buffer.resize(offset + (length as usize).max(PERFORMANCE_RECORD_HEADER_SIZE), 0);
    buffer.pwrite_with(PerformanceRecordHeader::new(record_type, length, revision), offset, scroll::LE).unwrap();
}

pub(crate) struct FbptBuilder {
    records: Vec<u8>,
}

impl FbptBuilder {
    pub(crate) fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub(crate) fn measurement(mut self, record: MeasurementRecord) -> Self {
        let mut offset = self.records.len();
        self.records.resize(offset + FPDT_MAX_PERF_RECORD_SIZE, 0);
        record.write_into(&mut self.records, &mut offset).unwrap();
        self.records.truncate(offset);
        self
    }

    /// Firmware basic boot performance record (type 2, revision 2), always present in firmware-produced tables.
    pub(crate) fn basic_boot_record(mut self) -> Self {
        push_record(&mut self.records, 0x0002, 48, 2);
        self
    }

    pub(crate) fn unknown_record(mut self, record_type: u16, length: u8) -> Self {
        push_record(&mut self.records, record_type, length, 1);
        self
    }

    pub(crate) fn raw(mut self, bytes: &[u8]) -> Self {
        self.records.extend_from_slice(bytes);
        self
    }

    /// Table image with the header length covering every record.
    pub(crate) fn build(self) -> Vec<u8> {
        let length = FBPT_HEADER_SIZE + self.records.len();
        let mut image = alloc::vec![0_u8; FBPT_HEADER_SIZE];
        image
            .pwrite_with(PerformanceTableHeader { signature: FBPT_SIGNATURE, length: length as u32 }, 0, scroll::LE)
            .unwrap();
        image.extend_from_slice(&self.records);
        image
    }
}

pub(crate) struct FpdtBuilder {
    records: Vec<u8>,
}

impl FpdtBuilder {
    pub(crate) fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub(crate) fn record(mut self, record_type: u16, length: u8) -> Self {
        push_record(&mut self.records, record_type, length, 1);
        self
    }

    pub(crate) fn boot_performance_pointer(mut self, address: u64) -> Self {
        let offset = self.records.len();
        push_record(&mut self.records, Fpdt::BOOT_PERFORMANCE_POINTER_TYPE, Fpdt::BOOT_PERFORMANCE_POINTER_LENGTH, 1);
        self.records.pwrite_with(address, offset + PERFORMANCE_RECORD_HEADER_SIZE + 4, scroll::LE).unwrap();
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut table = alloc::vec![0_u8; Fpdt::HEADER_SIZE];
        table[..4].copy_from_slice(&Fpdt::SIGNATURE);
        let length = (Fpdt::HEADER_SIZE + self.records.len()) as u32;
        table.pwrite_with(length, 4, scroll::LE).unwrap();
        table[8] = 1; // Revision
        table.extend_from_slice(&self.records);
        table
    }
}
