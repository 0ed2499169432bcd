//! Executable for reporting the measurements recorded in the Firmware Basic Boot Performance Table.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use clap::Parser;
use patina_fbpt::{
    byte_source::{IoSource, PhysicalMemory, PHYSICAL_MEMORY_DEVICE},
    config::ScanConfig,
    find_all_fbpt_records,
    locator::{FbptLocator, FixedAddress, Fpdt},
    logger::{Format, StderrLogger},
    report, ScanError,
};
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom, Write},
    path::PathBuf,
    process::ExitCode,
};

const FPDT_SYSFS_PATH: &str = "/sys/firmware/acpi/tables/FPDT";

#[derive(Parser, Debug)]
struct Args {
    /// Physical memory device, or a raw memory image file.
    #[arg(long, default_value = PHYSICAL_MEMORY_DEVICE)]
    memory: PathBuf,
    /// FBPT physical address. When set, the FPDT is not consulted.
    #[arg(long, value_parser = parse_address)]
    address: Option<u64>,
    /// Raw ACPI FPDT used to find the FBPT address.
    #[arg(long, default_value = FPDT_SYSFS_PATH)]
    fpdt: PathBuf,
    /// Physical address of the first byte of a memory image file.
    #[arg(long, value_parser = parse_address, default_value = "0")]
    image_base: u64,
    /// Lower the number of records decoded.
    #[arg(long)]
    max_records: Option<usize>,
    /// Optional path for the output file. If not specified, the output will be printed to stdout.
    #[arg(short, long)]
    output_path: Option<PathBuf>,
    /// Flag to include records that carry no information.
    #[arg(long, default_value_t = false)]
    all: bool,
    /// Flag to print a summary line after the records.
    #[arg(long, default_value_t = false)]
    summary: bool,
    /// Flag to emit log messages as JSON.
    #[arg(long, default_value_t = false)]
    json_log: bool,
    /// Increase log verbosity, may be repeated.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_address(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{value}': {e}"))
}

/// Memory image whose first byte maps to a physical address other than 0.
struct ImageFile {
    file: File,
    base: u64,
}

impl Read for ImageFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for ImageFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let pos = match pos {
            SeekFrom::Start(address) => SeekFrom::Start(
                address.checked_sub(self.base).ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?,
            ),
            other => other,
        };
        self.file.seek(pos).map(|offset| offset + self.base)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let max_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let format = if args.json_log { Format::Json } else { Format::Standard };
    let logger: &'static StderrLogger = Box::leak(Box::new(StderrLogger::new(format, &[], max_level)));
    if log::set_logger(logger).is_ok() {
        log::set_max_level(logger.level_filter());
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    // Failing to find the table is fatal whichever step fails.
    let fpdt_data;
    let locator: Box<dyn FbptLocator + '_> = match args.address {
        Some(address) => Box::new(FixedAddress(address)),
        None => {
            fpdt_data = Fpdt::read_sysfs(&args.fpdt)?;
            Box::new(Fpdt::new(&fpdt_data)?)
        }
    };

    let mut config = ScanConfig::default();
    if let Some(max_records) = args.max_records {
        config = config.with_max_records(max_records);
    }

    let result = if args.image_base == 0 {
        let memory = PhysicalMemory::open(&args.memory)?;
        find_all_fbpt_records(locator.as_ref(), memory, &config)
    } else {
        let file = PhysicalMemory::open(&args.memory)?.into_inner();
        let memory = IoSource::new(ImageFile { file, base: args.image_base })?;
        find_all_fbpt_records(locator.as_ref(), memory, &config)
    };

    match args.output_path {
        Some(ref path) => write_result(args, &result, &mut File::create(path)?)?,
        None => write_result(args, &result, &mut io::stdout().lock())?,
    }

    result.map(|_| ()).map_err(|e| e.into())
}

fn write_result<W: Write>(
    args: &Args,
    result: &Result<patina_fbpt::FbptRecords, ScanError>,
    out: &mut W,
) -> io::Result<()> {
    match result {
        Ok(records) => {
            report::write_records(records, out, args.all)?;
            if args.summary {
                report::write_summary(records, out)?;
            }
        }
        // Print what was decoded before the failure; the error itself is reported by the caller.
        Err(err) => report::write_records(err.partial_records(), out, args.all)?,
    }
    out.flush()
}
