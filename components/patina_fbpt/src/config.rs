//! FBPT scan configuration.
//!
//! ## Example
//!
//! ```rust
//! use patina_fbpt::config::ScanConfig;
//!
//! let config = ScanConfig::new().with_max_records(100);
//! assert_eq!(100, config.max_records());
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use crate::scanner::MAX_PERF_RECORDS;

/// The configuration of a table scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    max_records: usize,
}

impl ScanConfig {
    pub const fn new() -> Self {
        Self { max_records: MAX_PERF_RECORDS }
    }

    /// Lowers the number of measurement records decoded. Values above [`MAX_PERF_RECORDS`] are clamped.
    pub const fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = if max_records > MAX_PERF_RECORDS { MAX_PERF_RECORDS } else { max_records };
        self
    }

    pub const fn max_records(&self) -> usize {
        self.max_records
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}
