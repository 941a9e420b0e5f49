//! Binary entry point for **netprobe**.
//!
//! * Parses CLI arguments.
//! * Runs the probe engine and maps its code to the process exit status.

use clap::Parser;
use netprobe::{cli::Args, engine, error::Result};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let exit_code = engine::run(args)?;
    Ok(if exit_code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
