/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! A thin inspection CLI over the core log/codec API. The CLI itself is an out-of-scope
//! collaborator (§1): this binary exists so the crate's `[[bin]]` target has somewhere to
//! exercise the codecs, not as a feature-complete tool.

use std::path::PathBuf;
use std::process::ExitCode;

use log::error;
use trajectory_log::codec::{compressed, native};

const HELP: &str = "\
trajectory_log_util

USAGE:
    trajectory_log_util <COMMAND> <PATH>

COMMANDS:
    inspect <path>    Print header, metadata and sub-beam summary for a native or compressed log
    header  <path>    Same as inspect, but native logs skip the sample payload entirely
";

struct Args {
    command: String,
    path: PathBuf,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let command: String = args.free_from_str()?;
    let path: PathBuf = args.free_from_str()?;
    args.finish();

    Ok(Args { command, path })
}

fn is_compressed(path: &std::path::Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("vostlc") | Some("gz")
    )
}

fn run(args: Args) -> trajectory_log::Result<()> {
    match args.command.as_str() {
        "inspect" => {
            let log = if is_compressed(&args.path) {
                compressed::read(&args.path)?
            } else {
                native::read(&args.path)?
            };
            println!("version: {}", log.header.version);
            println!("sampling interval: {} ms", log.header.sampling_interval_ms);
            println!("snapshots: {}", log.num_snapshots());
            println!("axes sampled: {}", log.header.axes_sampled.len());
            println!("sub-beams: {}", log.sub_beams.len());
            println!("patient id: {}", log.metadata.patient_id);
            println!("plan name: {}", log.metadata.plan_name);
        }
        "header" => {
            let parsed = native::read_header_only(&args.path)?;
            println!("version: {}", parsed.header.version);
            println!("sampling interval: {} ms", parsed.header.sampling_interval_ms);
            println!("snapshots: {}", parsed.header.num_snapshots);
            println!("sub-beams:");
            for sub_beam in &parsed.sub_beams {
                println!("  seq {}: {} ({} MU)", sub_beam.sequence_number, sub_beam.name, sub_beam.delivered_mu);
            }
        }
        other => {
            error!("unknown command {other:?}");
            print!("{HELP}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new().init().ok();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            error!("argument error: {e}");
            print!("{HELP}");
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
