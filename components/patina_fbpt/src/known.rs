//! Progress identifiers (hook types) known to this library.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use core::convert::TryFrom;

/// Progress identifiers reserved for core performance entries.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u16)]
pub enum KnownPerfId {
    ModuleStart = 0x01,
    ModuleEnd = 0x02,
    ModuleLoadImageStart = 0x03,
    ModuleLoadImageEnd = 0x04,
    ModuleDbStart = 0x05,
    ModuleDbEnd = 0x06,
    ModuleDbSupportStart = 0x07,
    ModuleDbSupportEnd = 0x08,
    ModuleDbStopStart = 0x09,
    ModuleDbStopEnd = 0x0A,
    PerfEventSignalStart = 0x10,
    PerfEventSignalEnd = 0x11,
    PerfCallbackStart = 0x20,
    PerfCallbackEnd = 0x21,
    PerfFunctionStart = 0x30,
    PerfFunctionEnd = 0x31,
    PerfInModuleStart = 0x40,
    PerfInModuleEnd = 0x41,
    PerfCrossModuleStart = 0x50,
    PerfCrossModuleEnd = 0x51,
}

impl KnownPerfId {
    /// Every known identifier, in ascending code order.
    pub const ALL: [KnownPerfId; 20] = [
        Self::ModuleStart,
        Self::ModuleEnd,
        Self::ModuleLoadImageStart,
        Self::ModuleLoadImageEnd,
        Self::ModuleDbStart,
        Self::ModuleDbEnd,
        Self::ModuleDbSupportStart,
        Self::ModuleDbSupportEnd,
        Self::ModuleDbStopStart,
        Self::ModuleDbStopEnd,
        Self::PerfEventSignalStart,
        Self::PerfEventSignalEnd,
        Self::PerfCallbackStart,
        Self::PerfCallbackEnd,
        Self::PerfFunctionStart,
        Self::PerfFunctionEnd,
        Self::PerfInModuleStart,
        Self::PerfInModuleEnd,
        Self::PerfCrossModuleStart,
        Self::PerfCrossModuleEnd,
    ];

    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Label used when reporting the identifier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ModuleStart => "MODULE_START_ID",
            Self::ModuleEnd => "MODULE_END_ID",
            Self::ModuleLoadImageStart => "MODULE_LOADIMAGE_START_ID",
            Self::ModuleLoadImageEnd => "MODULE_LOADIMAGE_END_ID",
            Self::ModuleDbStart => "MODULE_DB_START_ID",
            Self::ModuleDbEnd => "MODULE_DB_END_ID",
            Self::ModuleDbSupportStart => "MODULE_DB_SUPPORT_START_ID",
            Self::ModuleDbSupportEnd => "MODULE_DB_SUPPORT_END_ID",
            Self::ModuleDbStopStart => "MODULE_DB_STOP_START_ID",
            Self::ModuleDbStopEnd => "MODULE_DB_STOP_END_ID",
            Self::PerfEventSignalStart => "PERF_EVENTSIGNAL_START_ID",
            Self::PerfEventSignalEnd => "PERF_EVENTSIGNAL_END_ID",
            Self::PerfCallbackStart => "PERF_CALLBACK_START_ID",
            Self::PerfCallbackEnd => "PERF_CALLBACK_END_ID",
            Self::PerfFunctionStart => "PERF_FUNCTION_START_ID",
            Self::PerfFunctionEnd => "PERF_FUNCTION_END_ID",
            Self::PerfInModuleStart => "PERF_INMODULE_START_ID",
            Self::PerfInModuleEnd => "PERF_INMODULE_END_ID",
            Self::PerfCrossModuleStart => "PERF_CROSSMODULE_START_ID",
            Self::PerfCrossModuleEnd => "PERF_CROSSMODULE_END_ID",
        }
    }
}

impl TryFrom<u16> for KnownPerfId {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL.iter().copied().find(|id| id.as_u16() == value).ok_or(())
    }
}

/// Returns the label of a hook type code, or an empty string when the code is not known.
pub fn hook_type_name(code: u16) -> &'static str {
    KnownPerfId::try_from(code).map(|id| id.as_str()).unwrap_or("")
}
