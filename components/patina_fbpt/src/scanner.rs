//! Scanner walking the records of a Firmware Basic Boot Performance Table.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use alloc::vec::Vec;
use core::{fmt::Debug, slice};

use crate::{
    byte_source::ByteSource,
    config::ScanConfig,
    error::{Error, Result, ScanError},
    record::{DynamicStringEventRecord, MeasurementRecord, PerformanceRecordHeader, PERFORMANCE_RECORD_HEADER_SIZE},
    table::PerformanceTableHeader,
};

/// Maximum number of measurement records decoded from a single table.
pub const MAX_PERF_RECORDS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    Done,
}

/// Lazy, non-restartable iterator over the measurement records of an FBPT.
///
/// Records of other types are skipped. Iteration ends when the declared table length has been consumed or the
/// record cap is reached. The first error is yielded once, after which the scanner is exhausted.
pub struct FbptScanner<S: ByteSource> {
    source: S,
    table_length: u32,
    records_end: u64,
    bytes_consumed: u64,
    record_count: usize,
    max_records: usize,
    state: State,
}

impl<S: ByteSource> FbptScanner<S> {
    /// Seeks `source` to `fbpt_address` and validates the table header.
    pub fn new(source: S, fbpt_address: u64) -> Result<Self> {
        Self::with_config(source, fbpt_address, &ScanConfig::default())
    }

    pub fn with_config(mut source: S, fbpt_address: u64, config: &ScanConfig) -> Result<Self> {
        source.seek(fbpt_address)?;
        let header = PerformanceTableHeader::read(&mut source)?;
        log::debug!(target: "fbpt", "FBPT at {fbpt_address:#x}, length {:#x}", header.length);
        Ok(Self {
            source,
            table_length: header.length,
            records_end: header.records_length(),
            bytes_consumed: 0,
            record_count: 0,
            max_records: config.max_records(),
            state: State::Scanning,
        })
    }

    /// Table length declared in the header, header included.
    pub fn table_length(&self) -> u32 {
        self.table_length
    }

    /// Record bytes walked so far, decoded or skipped.
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Number of measurement records yielded so far.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// True when the record cap stopped the scan before the end of the table.
    pub fn is_truncated(&self) -> bool {
        self.record_count >= self.max_records && self.bytes_consumed < self.records_end
    }

    /// Releases the underlying source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Walks records until the next measurement record or the end of the table.
    fn next_record(&mut self) -> Result<Option<MeasurementRecord>> {
        while self.bytes_consumed < self.records_end {
            if self.record_count >= self.max_records {
                log::warn!(
                    target: "fbpt",
                    "Record cap of {} reached, ignoring the rest of the table",
                    self.max_records
                );
                return Ok(None);
            }

            let offset = self.source.position();
            let header = PerformanceRecordHeader::read(&mut self.source)?;
            log::trace!(
                target: "fbpt",
                "Record {:#06x} at {offset:#x}, length {}",
                header.record_type,
                header.length
            );

            let Some(data_length) = header.data_length() else {
                return Err(Error::Structural {
                    offset,
                    record_type: header.record_type,
                    length: header.length,
                    minimum: PERFORMANCE_RECORD_HEADER_SIZE as u8,
                });
            };
            let remaining = self.records_end - self.bytes_consumed;
            if header.length as u64 > remaining {
                return Err(Error::RecordOverrun { offset, length: header.length, remaining });
            }

            let record = match header.record_type {
                DynamicStringEventRecord::TYPE => {
                    Some(DynamicStringEventRecord::read(&mut self.source, &header, offset)?)
                }
                _ => {
                    self.source.skip(data_length as u64)?;
                    None
                }
            };
            self.bytes_consumed += header.length as u64;

            if let Some(record) = record {
                self.record_count += 1;
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

impl<S: ByteSource> Iterator for FbptScanner<S> {
    type Item = Result<MeasurementRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::Done {
            return None;
        }
        let next = self.next_record();
        if !matches!(next, Ok(Some(_))) {
            self.state = State::Done;
        }
        next.transpose()
    }
}

impl<S: ByteSource> core::iter::FusedIterator for FbptScanner<S> {}

impl<S: ByteSource> Debug for FbptScanner<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FbptScanner")
            .field("table_length", &self.table_length)
            .field("bytes_consumed", &self.bytes_consumed)
            .field("record_count", &self.record_count)
            .field("max_records", &self.max_records)
            .field("state", &self.state)
            .finish()
    }
}

/// Measurement records decoded from one FBPT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FbptRecords {
    records: Vec<MeasurementRecord>,
    table_length: u32,
    bytes_consumed: u64,
    truncated: bool,
}

impl FbptRecords {
    /// Number of measurement records.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, MeasurementRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MeasurementRecord> {
        self.records
    }

    /// Table length declared in the header, header included.
    pub fn table_length(&self) -> u32 {
        self.table_length
    }

    /// Record bytes walked, decoded or skipped.
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// True when the record cap stopped the scan before the end of the table.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> IntoIterator for &'a FbptRecords {
    type Item = &'a MeasurementRecord;
    type IntoIter = slice::Iter<'a, MeasurementRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Decodes every measurement record of the FBPT at `fbpt_address`.
///
/// On failure, the records decoded before the failure are returned with the error.
pub fn scan<S: ByteSource>(source: S, fbpt_address: u64) -> core::result::Result<FbptRecords, ScanError> {
    scan_with_config(source, fbpt_address, &ScanConfig::default())
}

pub fn scan_with_config<S: ByteSource>(
    source: S,
    fbpt_address: u64,
    config: &ScanConfig,
) -> core::result::Result<FbptRecords, ScanError> {
    let mut scanner = FbptScanner::with_config(source, fbpt_address, config)?;
    let mut records = Vec::new();
    for record in scanner.by_ref() {
        match record {
            Ok(record) => records.push(record),
            Err(err) => return Err(ScanError::new(records, err)),
        }
    }
    Ok(FbptRecords {
        records,
        table_length: scanner.table_length(),
        bytes_consumed: scanner.bytes_consumed(),
        truncated: scanner.is_truncated(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        byte_source::{MockByteSource, SliceSource},
        table::FBPT_HEADER_SIZE,
        test_support::{measurement, FbptBuilder},
    };
    use proptest::prelude::*;

    const BASE: u64 = 0x7F00_0000;

    #[test]
    fn test_decodes_records_and_skips_others() {
        let image = FbptBuilder::new()
            .basic_boot_record()
            .measurement(measurement(0x01, 10, "A"))
            .unknown_record(0x3000, 12)
            .measurement(measurement(0x02, 20, "B"))
            .build();
        let records = scan(SliceSource::with_base(&image, BASE), BASE).unwrap();

        assert_eq!(2, records.count());
        let hook_types: Vec<_> = records.iter().map(|r| r.hook_type).collect();
        assert_eq!(["MODULE_START_ID", "MODULE_END_ID"], hook_types.as_slice());
        assert_eq!(image.len() as u64 - FBPT_HEADER_SIZE as u64, records.bytes_consumed());
        assert_eq!(image.len() as u32, records.table_length());
        assert!(!records.is_truncated());
    }

    #[test]
    fn test_signature_mismatch_yields_no_records() {
        let mut image = FbptBuilder::new().measurement(measurement(0x01, 1, "A")).build();
        image[..4].copy_from_slice(b"XXXX");
        let err = scan(SliceSource::new(&image), 0).unwrap_err();
        assert_eq!(&Error::SignatureMismatch { expected: *b"FBPT", found: *b"XXXX" }, err.error());
        assert!(err.partial_records().is_empty());
    }

    #[test]
    fn test_table_without_records_is_empty_not_an_error() {
        let image = FbptBuilder::new().build();
        assert_eq!(8, image.len());
        let records = scan(SliceSource::new(&image), 0).unwrap();
        assert!(records.is_empty());
        assert_eq!(0, records.bytes_consumed());

        let mut image = FbptBuilder::new().measurement(measurement(0x01, 1, "A")).build();
        image[4..8].copy_from_slice(&4_u32.to_le_bytes());
        assert!(scan(SliceSource::new(&image), 0).unwrap().is_empty());
    }

    #[test]
    fn test_record_cap() {
        let mut builder = FbptBuilder::new();
        for i in 0..(MAX_PERF_RECORDS as u64 + 1) {
            builder = builder.measurement(measurement(0x01, i + 1, ""));
        }
        let image = builder.build();
        let records = scan(SliceSource::new(&image), 0).unwrap();
        assert_eq!(MAX_PERF_RECORDS, records.count());
        assert!(records.is_truncated());
        assert_eq!(MAX_PERF_RECORDS as u64, records.records().last().unwrap().timestamp);
    }

    #[test]
    fn test_record_cap_from_config() {
        let image = FbptBuilder::new()
            .measurement(measurement(0x01, 1, "A"))
            .measurement(measurement(0x02, 2, "B"))
            .measurement(measurement(0x03, 3, "C"))
            .build();
        let records = scan_with_config(SliceSource::new(&image), 0, &ScanConfig::new().with_max_records(2)).unwrap();
        assert_eq!(2, records.count());
        assert!(records.is_truncated());
    }

    #[test]
    fn test_exact_cap_at_table_end_is_not_truncated() {
        let image = FbptBuilder::new().measurement(measurement(0x01, 1, "A")).build();
        let records = scan_with_config(SliceSource::new(&image), 0, &ScanConfig::new().with_max_records(1)).unwrap();
        assert_eq!(1, records.count());
        assert!(!records.is_truncated());
    }

    #[test]
    fn test_truncated_image_returns_prefix_and_short_read() {
        let image = FbptBuilder::new()
            .measurement(measurement(0x01, 1, "First"))
            .measurement(measurement(0x02, 2, "Second"))
            .measurement(measurement(0x03, 3, "Third"))
            .build();
        let truncated = &image[..image.len() - 10];
        let err = scan(SliceSource::new(truncated), 0).unwrap_err();

        assert!(matches!(err.error(), Error::ShortRead { .. }));
        let descriptions: Vec<_> = err.partial_records().iter().map(|r| r.description.as_str()).collect();
        assert_eq!(["First", "Second"], descriptions.as_slice());
    }

    #[test]
    fn test_header_length_below_minimum_is_structural() {
        let image = FbptBuilder::new()
            .measurement(measurement(0x01, 1, "A"))
            .raw(&[0x00, 0x30, 0x02, 0x00])
            .build();
        let err = scan(SliceSource::new(&image), 0).unwrap_err();
        assert_eq!(1, err.partial_records().len());
        assert!(matches!(err.error(), Error::Structural { record_type: 0x3000, length: 2, minimum: 4, .. }));
    }

    #[test]
    fn test_short_dynamic_string_record_is_structural() {
        let mut raw = [0_u8; 20];
        raw[..4].copy_from_slice(&[0x11, 0x10, 20, 1]);
        let image = FbptBuilder::new().raw(&raw).build();
        let err = scan(SliceSource::new(&image), 0).unwrap_err();
        assert_eq!(&Error::Structural { offset: 8, record_type: 0x1011, length: 20, minimum: 34 }, err.error());
    }

    #[test]
    fn test_record_overrunning_table_end() {
        let mut image = FbptBuilder::new().measurement(measurement(0x01, 1, "A")).unknown_record(0x3000, 16).build();
        let short_length = image.len() as u32 - 4;
        image[4..8].copy_from_slice(&short_length.to_le_bytes());
        let err = scan(SliceSource::new(&image), 0).unwrap_err();
        assert_eq!(1, err.partial_records().len());
        assert!(matches!(err.error(), Error::RecordOverrun { length: 16, remaining: 12, .. }));
    }

    #[test]
    fn test_skipped_record_advances_by_its_length() {
        let image = FbptBuilder::new().unknown_record(0x2, 48).build();
        let mut source = SliceSource::with_base(&image, BASE);
        let mut scanner = FbptScanner::new(&mut source, BASE).unwrap();
        assert!(scanner.next().is_none());
        assert_eq!(48, scanner.bytes_consumed());
        assert_eq!(0, scanner.record_count());
        drop(scanner);
        assert_eq!(BASE + 8 + 48, source.position());
    }

    #[test]
    fn test_scanner_is_exhausted_after_error() {
        let mut image = FbptBuilder::new().measurement(measurement(0x01, 1, "A")).build();
        image.truncate(image.len() - 1);
        let mut scanner = FbptScanner::new(SliceSource::new(&image), 0).unwrap();
        assert!(matches!(scanner.next(), Some(Err(Error::ShortRead { .. }))));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_seek_failure_aborts_before_reading() {
        let mut source = MockByteSource::new();
        source.expect_seek().once().returning(|offset| Err(Error::SeekOutOfRange { offset }));
        source.expect_read_exact().never();
        let err = scan(source, 0xFFFF_0000).unwrap_err();
        assert_eq!(&Error::SeekOutOfRange { offset: 0xFFFF_0000 }, err.error());
    }

    #[test]
    fn test_device_failure_mid_scan_keeps_prefix() {
        let image = FbptBuilder::new()
            .measurement(measurement(0x01, 1, "A"))
            .measurement(measurement(0x02, 2, "B"))
            .build();
        let first_record_end = 8 + measurement(0x01, 1, "A").encoded_length() as u64;

        let mut source = MockByteSource::new();
        source.expect_seek().returning(|_| Ok(()));
        let mut cursor = 0_u64;
        source.expect_read_exact().returning(move |buf| {
            if cursor >= first_record_end {
                return Err(Error::DeviceAccess { reason: "i/o error" });
            }
            let mut inner = SliceSource::new(&image);
            inner.seek(cursor)?;
            inner.read_exact(buf)?;
            cursor += buf.len() as u64;
            Ok(())
        });
        source.expect_position().returning(|| 0);

        let err = scan(source, 0).unwrap_err();
        assert_eq!(1, err.partial_records().len());
        assert_eq!(&Error::DeviceAccess { reason: "i/o error" }, err.error());
    }

    proptest! {
        #[test]
        fn prop_returns_every_measurement_in_order(kinds in prop::collection::vec(any::<bool>(), 0..64)) {
            let mut builder = FbptBuilder::new();
            let mut expected = Vec::new();
            for (i, is_measurement) in kinds.iter().enumerate() {
                if *is_measurement {
                    let record = measurement(0x40, i as u64 + 1, "Event");
                    builder = builder.measurement(record.clone());
                    expected.push(record);
                } else {
                    builder = builder.unknown_record(0x1010, 4 + (i % 32) as u8);
                }
            }
            let image = builder.build();
            let records = scan(SliceSource::with_base(&image, BASE), BASE).unwrap();
            prop_assert_eq!(expected.as_slice(), records.records());
            prop_assert_eq!(image.len() as u64 - FBPT_HEADER_SIZE as u64, records.bytes_consumed());
        }
    }
}
