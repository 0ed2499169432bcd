//! Discovery of the FBPT address through the ACPI Firmware Performance Data Table (FPDT).
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use scroll::Pread;

use crate::{
    error::{Error, Result},
    record::{PerformanceRecordHeader, PERFORMANCE_RECORD_HEADER_SIZE},
};

/// Source of the physical address of the FBPT.
pub trait FbptLocator {
    fn fbpt_address(&self) -> Result<u64>;
}

/// Locator returning an address known in advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAddress(pub u64);

impl FbptLocator for FixedAddress {
    fn fbpt_address(&self) -> Result<u64> {
        Ok(self.0)
    }
}

/// Raw ACPI FPDT.
#[derive(Debug, Clone, Copy)]
pub struct Fpdt<'a> {
    data: &'a [u8],
}

impl<'a> Fpdt<'a> {
    pub const SIGNATURE: [u8; 4] = *b"FPDT";
    /// Size of the standard ACPI description header.
    pub const HEADER_SIZE: usize = 36;

    /// Firmware Basic Boot Performance Pointer record type.
    pub const BOOT_PERFORMANCE_POINTER_TYPE: u16 = 0x0000;
    pub const BOOT_PERFORMANCE_POINTER_LENGTH: u8 = 16;

    /// Validates the ACPI signature and length of `data`.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let available = data.len();
        if available < Self::HEADER_SIZE {
            return Err(Error::ShortRead { offset: 0, requested: Self::HEADER_SIZE, available });
        }
        let signature = [data[0], data[1], data[2], data[3]];
        if signature != Self::SIGNATURE {
            return Err(Error::SignatureMismatch { expected: Self::SIGNATURE, found: signature });
        }
        let length = data.pread_with::<u32>(4, scroll::LE).map_err(|e| Error::from_scroll(e, 4))? as usize;
        if length > available {
            return Err(Error::ShortRead { offset: 0, requested: length, available });
        }
        Ok(Self { data: &data[..length.max(Self::HEADER_SIZE)] })
    }

    /// Reads the raw table exported by the kernel, usually `/sys/firmware/acpi/tables/FPDT`.
    #[cfg(feature = "std")]
    pub fn read_sysfs(path: impl AsRef<std::path::Path>) -> Result<alloc::vec::Vec<u8>> {
        let path = path.as_ref();
        log::debug!(target: "fbpt", "Reading FPDT from {}", path.display());
        std::fs::read(path).map_err(|e| {
            log::debug!(target: "fbpt", "FPDT read failed: {e}");
            Error::DeviceAccess {
                reason: match e.kind() {
                    std::io::ErrorKind::NotFound => "not found",
                    std::io::ErrorKind::PermissionDenied => "permission denied",
                    _ => "i/o error",
                },
            }
        })
    }
}

impl FbptLocator for Fpdt<'_> {
    fn fbpt_address(&self) -> Result<u64> {
        let mut offset = Self::HEADER_SIZE;
        while offset + PERFORMANCE_RECORD_HEADER_SIZE <= self.data.len() {
            let header = self
                .data
                .pread_with::<PerformanceRecordHeader>(offset, scroll::LE)
                .map_err(|e| Error::from_scroll(e, offset as u64))?;
            if header.data_length().is_none() {
                return Err(Error::Structural {
                    offset: offset as u64,
                    record_type: header.record_type,
                    length: header.length,
                    minimum: PERFORMANCE_RECORD_HEADER_SIZE as u8,
                });
            }
            if header.record_type == Self::BOOT_PERFORMANCE_POINTER_TYPE {
                if header.length < Self::BOOT_PERFORMANCE_POINTER_LENGTH {
                    return Err(Error::Structural {
                        offset: offset as u64,
                        record_type: header.record_type,
                        length: header.length,
                        minimum: Self::BOOT_PERFORMANCE_POINTER_LENGTH,
                    });
                }
                // Four reserved bytes precede the address.
                let address_offset = offset + PERFORMANCE_RECORD_HEADER_SIZE + 4;
                let address = self
                    .data
                    .pread_with::<u64>(address_offset, scroll::LE)
                    .map_err(|e| Error::from_scroll(e, address_offset as u64))?;
                log::debug!(target: "fbpt", "FPDT references FBPT at {address:#x}");
                return Ok(address);
            }
            offset += header.length as usize;
        }
        Err(Error::TableNotFound)
    }
}
