//! A logger for the `log` crate writing to standard error.
//!
//! ## Examples
//!
//! ```rust
//! use patina_fbpt::logger::{Format, StderrLogger};
//!
//! static LOGGER: StderrLogger = StderrLogger::new(Format::Standard, &[("fbpt", log::LevelFilter::Debug)], log::LevelFilter::Warn);
//!
//! log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Debug)).unwrap();
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use std::io::{self, Write};

/// Enum to describe the format of the log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Standard text format containing the log level and message.
    Standard,
    /// JSON blob containing the log level, target and message.
    Json,
}

impl Format {
    /// Formats the log message and writes it to the target.
    pub fn write<W: Write>(&self, target: &mut W, record: &log::Record) -> io::Result<()> {
        match self {
            Format::Standard if record.level() == log::Level::Trace => writeln!(
                target,
                "TRACE - {}:{}: {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            ),
            Format::Standard => writeln!(target, "{} - {}", record.level(), record.args()),
            Format::Json => writeln!(
                target,
                "{{\"level\": \"{}\", \"target\": \"{}\", \"message\": \"{}\"}}",
                record.level(),
                record.target(),
                JsonEscaped(&record.args().to_string())
            ),
        }
    }
}

struct JsonEscaped<'a>(&'a str);

impl core::fmt::Display for JsonEscaped<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for c in self.0.chars() {
            match c {
                '"' => write!(f, "\\\"")?,
                '\\' => write!(f, "\\\\")?,
                '\n' => write!(f, "\\n")?,
                c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
                c => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}

/// Logger writing every enabled record to standard error.
pub struct StderrLogger<'a> {
    target_filters: &'a [(&'a str, log::LevelFilter)],
    max_level: log::LevelFilter,
    format: Format,
}

impl<'a> StderrLogger<'a> {
    pub const fn new(
        format: Format,
        target_filters: &'a [(&'a str, log::LevelFilter)],
        max_level: log::LevelFilter,
    ) -> Self {
        Self { target_filters, max_level, format }
    }

    /// Highest level any target can be enabled at, suitable for `log::set_max_level`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.target_filters.iter().map(|(_, level)| *level).fold(self.max_level, core::cmp::max)
    }
}

impl log::Log for StderrLogger<'_> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level().to_level_filter()
            <= *self
                .target_filters
                .iter()
                .find(|(name, _)| metadata.target().starts_with(name))
                .map(|(_, level)| level)
                .unwrap_or(&self.max_level)
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            // Nowhere left to report a failure to write to stderr.
            let _ = self.format.write(&mut io::stderr().lock(), record);
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    fn format_to_string(format: Format, level: log::Level, message: &str) -> String {
        let mut out = Vec::new();
        format
            .write(&mut out, &log::Record::builder().level(level).target("fbpt").args(format_args!("{message}")).build())
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_standard_format() {
        assert_eq!("WARN - cap reached\n", format_to_string(Format::Standard, log::Level::Warn, "cap reached"));
    }

    #[test]
    fn test_json_format_escapes_message() {
        assert_eq!(
            "{\"level\": \"INFO\", \"target\": \"fbpt\", \"message\": \"a \\\"b\\\"\"}\n",
            format_to_string(Format::Json, log::Level::Info, "a \"b\"")
        );
    }

    #[test]
    fn test_target_filters() {
        let logger = StderrLogger::new(Format::Standard, &[("fbpt", log::LevelFilter::Trace)], log::LevelFilter::Warn);
        let metadata = |target, level| log::Metadata::builder().target(target).level(level).build();
        assert!(logger.enabled(&metadata("fbpt", log::Level::Trace)));
        assert!(!logger.enabled(&metadata("other", log::Level::Info)));
        assert!(logger.enabled(&metadata("other", log::Level::Error)));
        assert_eq!(log::LevelFilter::Trace, logger.level_filter());
    }
}
