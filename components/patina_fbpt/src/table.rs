//! Firmware Basic Boot Performance Table (FBPT) header.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use core::mem;

use scroll::{Pread, Pwrite, SizeWith};

use crate::{
    byte_source::ByteSource,
    error::{Error, Result},
};

/// Signature at the base of every FBPT.
pub const FBPT_SIGNATURE: [u8; 4] = *b"FBPT";

/// Size in bytes of the FBPT header. The table length includes it.
pub const FBPT_HEADER_SIZE: usize = mem::size_of::<u32>() // Signature
        + mem::size_of::<u32>(); // Length

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pread, Pwrite, SizeWith)]
#[repr(C)]
pub struct PerformanceTableHeader {
    pub signature: [u8; 4],
    /// Length of the whole table in bytes, header included.
    pub length: u32,
}

impl PerformanceTableHeader {
    /// Reads and validates the header at the current cursor of `source`, leaving the cursor on the first record.
    ///
    /// The signature is checked before the length is read, so a mismatch reports only the four bytes observed.
    pub fn read<S: ByteSource + ?Sized>(source: &mut S) -> Result<Self> {
        let mut signature = [0_u8; 4];
        source.read_exact(&mut signature)?;
        if signature != FBPT_SIGNATURE {
            return Err(Error::SignatureMismatch { expected: FBPT_SIGNATURE, found: signature });
        }

        let offset = source.position();
        let mut length = [0_u8; 4];
        source.read_exact(&mut length)?;
        let length = length.pread_with::<u32>(0, scroll::LE).map_err(|e| Error::from_scroll(e, offset))?;
        Ok(Self { signature, length })
    }

    /// Number of record bytes declared by the header. A length below the header size declares no records.
    pub fn records_length(&self) -> u64 {
        (self.length as u64).saturating_sub(FBPT_HEADER_SIZE as u64)
    }
}
