use std::env;
use std::ffi::OsString;
use std::process::ExitCode;

use clap::Parser;
use wb_config::split_config_arguments;
use wbd::{DaemonArgs, DaemonOptions, run_daemon};

fn main() -> ExitCode {
    let args: Vec<OsString> = env::args_os().collect();
    let split = split_config_arguments(&args);
    let options = DaemonOptions::from(DaemonArgs::parse_from(split.command_arguments(&args)));
    match run_daemon(&options, split.config_arguments) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("wbd: {error}");
            ExitCode::FAILURE
        }
    }
}
