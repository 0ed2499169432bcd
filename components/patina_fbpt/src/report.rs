//! Text report of decoded measurement records, to be used in the standard environment.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use std::io::{self, Write};

use crate::{guid::FmtGuid, record::MeasurementRecord, scanner::FbptRecords};

/// Writes one line per record. Records carrying no information are skipped unless `include_empty` is set.
///
/// The index is the position of the record in the table, so skipped records leave gaps.
pub fn write_records<'a, W: Write>(
    records: impl IntoIterator<Item = &'a MeasurementRecord>,
    out: &mut W,
    include_empty: bool,
) -> io::Result<()> {
    for (index, record) in records.into_iter().enumerate() {
        if record.is_empty() && !include_empty {
            continue;
        }
        writeln!(
            out,
            "Index: {index}, Hook Type: {}, Processor Identifier/APIC ID: {}, Timestamp: {}, Guid: {}, Description: {}",
            record.hook_type,
            record.processor_identifier,
            record.timestamp,
            FmtGuid(&record.guid),
            record.description
        )?;
    }
    Ok(())
}

/// Writes the table totals.
pub fn write_summary<W: Write>(records: &FbptRecords, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "Table length: {:#x}, Bytes consumed: {:#x}, Records: {}{}",
        records.table_length(),
        records.bytes_consumed(),
        records.count(),
        if records.is_truncated() { " (record cap reached)" } else { "" }
    )
}
