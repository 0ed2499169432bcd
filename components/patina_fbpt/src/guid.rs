//! GUID formatting for records read out of firmware memory.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use r_efi::efi;

/// Formats a GUID stored in firmware (mixed-endian) byte order.
///
/// The first three fields are stored little-endian, the last eight bytes are kept in stored order.
///
/// ```
/// # use patina_fbpt::guid::FmtGuid;
/// # use r_efi::efi;
/// let guid = efi::Guid::from_bytes(&[
///     0x2F, 0x32, 0xC9, 0x23, 0xF2, 0x2A, 0x6A, 0x47, 0xBC, 0x4C, 0x26, 0xBC, 0x88, 0x26, 0x6C, 0x71,
/// ]);
/// assert_eq!("23C9322F-2AF2-476A-BC4C-26BC88266C71", format!("{}", FmtGuid(&guid)));
/// ```
pub struct FmtGuid<'a>(pub &'a efi::Guid);

impl core::fmt::Display for FmtGuid<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let b = self.0.as_bytes();
        let time_low = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        let time_mid = u16::from_le_bytes([b[4], b[5]]);
        let time_hi_and_version = u16::from_le_bytes([b[6], b[7]]);
        write!(f, "{time_low:08X}-{time_mid:04X}-{time_hi_and_version:04X}-{:02X}{:02X}-", b[8], b[9])?;
        for byte in b[10..].iter() {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for FmtGuid<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", &self)
    }
}
