//! bytespool CLI
//!
//! Front end for the library's three adapters: `spool` streams stdin through
//! a disk-spilling tee, `tac` prints a file's tokens in reverse, and
//! `pack` / `ls` / `cat` build and browse packed filesystem images.
//!
//! # Exit Codes
//!
//! - `0`: Success
//! - `1`: Runtime failure (I/O, corrupt image, scan error)
//! - `2`: Invalid arguments

use std::io;

use bytespool::cli::{parse_args, run};
use tracing_subscriber::EnvFilter;

fn main() {
    let invocation = parse_args();
    if invocation.verbose {
        init_logging();
    }

    match run(invocation.command) {
        Ok(()) => {}
        // Downstream closed early (e.g. piped into `head`).
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
        Err(err) => {
            eprintln!("bytespool: {err}");
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
