//! Binary entrypoint for the `jsport` port program.

use std::ffi::OsString;
use std::io::{self, Write};

use jsport::{OrthoConfigLoader, run};

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    if let Err(error) = run(&args, &OrthoConfigLoader) {
        writeln!(io::stderr().lock(), "jsport: {error}").ok();
        std::process::exit(1);
    }
}
