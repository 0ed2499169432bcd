//! Firmware Basic Boot Performance Table (FBPT) reader
//!
//! The FBPT is produced by firmware and referenced by the ACPI Firmware Performance Data Table (FPDT). It holds the
//! performance records logged during boot. This library locates the table in a physical memory image, validates it,
//! and decodes its dynamic string event records into [`MeasurementRecord`]s.
//!
//! ## Examples and Usage
//!
//! ```rust
//! use patina_fbpt::{byte_source::SliceSource, scan};
//!
//! // An empty table: signature and a length covering only the header.
//! let image = [b'F', b'B', b'P', b'T', 8, 0, 0, 0];
//! let records = scan(SliceSource::with_base(&image, 0x7F00_0000), 0x7F00_0000).unwrap();
//! assert!(records.is_empty());
//! ```
//!
//! A failed scan still returns the records decoded before the failure:
//!
//! ```rust
//! use patina_fbpt::{byte_source::SliceSource, scan, Error};
//!
//! let image = *b"XXXX\x08\x00\x00\x00";
//! let err = scan(SliceSource::new(&image), 0).unwrap_err();
//! assert!(matches!(err.error(), Error::SignatureMismatch { .. }));
//! assert!(err.partial_records().is_empty());
//! ```
//!
//! With the `std` feature, [`byte_source::PhysicalMemory`] reads `/dev/mem` and [`locator::Fpdt::read_sysfs`] loads
//! the FPDT exported by the kernel. The `fbpt_parser` binary puts both together.
//!
//! ## Logging
//!
//! Table discovery and record decoding are logged under the `fbpt` log target.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod byte_source;
pub mod config;
pub mod error;
pub mod guid;
pub mod known;
pub mod locator;
pub mod record;
pub mod scanner;
pub mod table;

#[cfg(feature = "std")]
pub mod logger;
#[cfg(feature = "std")]
pub mod report;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result, ScanError};
pub use record::MeasurementRecord;
pub use scanner::{scan, scan_with_config, FbptRecords, FbptScanner, MAX_PERF_RECORDS};

use byte_source::ByteSource;
use config::ScanConfig;
use locator::FbptLocator;

/// Asks `locator` for the FBPT address, then scans the table from `source`.
pub fn find_all_fbpt_records<L, S>(
    locator: &L,
    source: S,
    config: &ScanConfig,
) -> core::result::Result<FbptRecords, ScanError>
where
    L: FbptLocator + ?Sized,
    S: ByteSource,
{
    let fbpt_address = locator.fbpt_address()?;
    scan_with_config(source, fbpt_address, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        byte_source::SliceSource,
        locator::{FixedAddress, Fpdt},
        test_support::{measurement, FbptBuilder, FpdtBuilder},
    };

    #[test]
    fn test_find_all_fbpt_records_through_fpdt() {
        const FBPT_ADDRESS: u64 = 0x7F00_0000;
        let image = FbptBuilder::new()
            .basic_boot_record()
            .measurement(measurement(0x03, 100, "LoadImage"))
            .measurement(measurement(0x04, 200, "LoadImage"))
            .build();
        let fpdt = FpdtBuilder::new().boot_performance_pointer(FBPT_ADDRESS).build();
        let fpdt = Fpdt::new(&fpdt).unwrap();

        let records =
            find_all_fbpt_records(&fpdt, SliceSource::with_base(&image, FBPT_ADDRESS), &ScanConfig::default()).unwrap();
        let hook_types: alloc::vec::Vec<_> = records.iter().map(|r| r.hook_type).collect();
        assert_eq!(["MODULE_LOADIMAGE_START_ID", "MODULE_LOADIMAGE_END_ID"], hook_types.as_slice());
    }

    #[test]
    fn test_locator_failure_is_returned_without_records() {
        let fpdt = FpdtBuilder::new().build();
        let fpdt = Fpdt::new(&fpdt).unwrap();
        let image = FbptBuilder::new().build();
        let err = find_all_fbpt_records(&fpdt, SliceSource::new(&image), &ScanConfig::default()).unwrap_err();
        assert_eq!(&Error::TableNotFound, err.error());
        assert!(err.partial_records().is_empty());
    }

    #[test]
    fn test_dyn_locator() {
        let image = FbptBuilder::new().measurement(measurement(0x01, 1, "A")).build();
        let locator: &dyn FbptLocator = &FixedAddress(0x1000);
        let records =
            find_all_fbpt_records(locator, SliceSource::with_base(&image, 0x1000), &ScanConfig::default()).unwrap();
        assert_eq!(1, records.count());
    }
}
