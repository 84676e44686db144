//! Binary entrypoint for the multilang daemon launcher.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    multilang_runner::run(std::env::args_os(), &mut io::stderr().lock())
}
