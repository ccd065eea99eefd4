//! Entry point: dispatches between CLI-file mode and the protoc-plugin
//! stdin/stdout bridge.

use std::io::{Read, Write};
use std::process;

use clap::Parser;

use nanopb_gen::cli::Args;
use nanopb_gen::driver;

fn main() {
    let args = Args::parse();
    let argv0 = std::env::args().next().unwrap_or_default();

    if args.is_plugin_mode(&argv0) {
        run_plugin_mode(&args);
        return;
    }

    if let Err(err) = driver::run_cli(&args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run_plugin_mode(args: &Args) {
    let mut request_bytes = Vec::new();
    if let Err(err) = std::io::stdin().read_to_end(&mut request_bytes) {
        eprintln!("error: failed to read plugin request from stdin: {err}");
        process::exit(1);
    }

    let response_bytes = driver::run_plugin(&request_bytes, args);

    if let Err(err) = std::io::stdout().write_all(&response_bytes) {
        eprintln!("error: failed to write plugin response to stdout: {err}");
        process::exit(1);
    }
}
