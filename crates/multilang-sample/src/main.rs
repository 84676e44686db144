//! Binary entrypoint for the sample record processor.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    multilang_sample::run(std::env::args_os(), &mut io::stderr().lock())
}
