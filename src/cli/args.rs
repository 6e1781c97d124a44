//! Subcommand CLI parser.
//!
//! Hand-rolled (no clap dependency) to keep the binary small.
//!
//! # Grammar
//!
//! ```text
//! bytespool [--verbose] spool [--dir=<d>] [--prefix=<p>] [--block-size=<n>] [--io-unit=<n>]
//! bytespool [--verbose] tac   [--split=lines|words|bytes|runes] [--max-token=<n>] <file>
//! bytespool [--verbose] pack  <dir> <image>
//! bytespool [--verbose] ls    <image> [path]
//! bytespool [--verbose] cat   <image> <path>
//! bytespool --help | -h
//! ```

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use super::{Command, Invocation, SplitKind};
use crate::reverse::ScanLimits;
use crate::tee::{TeeLimits, TempSpill};

/// Outcome of parsing that does not yield an invocation.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// `--help` was requested; print usage and exit 0.
    Help,
    /// Invalid arguments; print the message and usage, exit 2.
    Usage(String),
}

/// Parse `std::env::args_os()` into an [`Invocation`].
///
/// Exits the process with code 2 on invalid arguments, printing a
/// diagnostic and usage summary to stderr.
pub fn parse_args() -> Invocation {
    match parse_from(env::args_os().skip(1)) {
        Ok(invocation) => invocation,
        Err(ParseError::Help) => {
            print_usage();
            std::process::exit(0);
        }
        Err(ParseError::Usage(msg)) => {
            eprintln!("error: {msg}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    }
}

/// Parses arguments (without the program name).
pub fn parse_from<I>(args: I) -> Result<Invocation, ParseError>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter().peekable();
    let mut verbose = false;

    while let Some(flag) = args.peek().and_then(|arg| arg.to_str()) {
        match flag {
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => return Err(ParseError::Help),
            _ if flag.starts_with('-') => {
                return Err(ParseError::Usage(format!("unknown flag: {flag}")))
            }
            _ => break,
        }
        args.next();
    }

    let Some(sub) = args.next() else {
        return Err(usage("missing subcommand"));
    };
    let sub = sub.to_string_lossy().into_owned();
    let rest: Vec<OsString> = args.collect();
    if rest.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Err(ParseError::Help);
    }

    let command = match sub.as_str() {
        "spool" => parse_spool(rest)?,
        "tac" => parse_tac(rest)?,
        "pack" => {
            let [dir, image] = positionals::<2>("pack", rest, 2)?;
            Command::Pack {
                dir: dir.into(),
                image: image.into(),
            }
        }
        "ls" => {
            let [image, path] = positionals::<2>("ls", rest, 1)?;
            let path = path.to_string_lossy().into_owned();
            Command::Ls {
                image: image.into(),
                path: if path.is_empty() { "/".to_owned() } else { path },
            }
        }
        "cat" => {
            let [image, path] = positionals::<2>("cat", rest, 2)?;
            Command::Cat {
                image: image.into(),
                path: path.to_string_lossy().into_owned(),
            }
        }
        other => return Err(usage(format!("unknown subcommand '{other}'"))),
    };
    Ok(Invocation { verbose, command })
}

fn parse_spool(args: Vec<OsString>) -> Result<Command, ParseError> {
    let mut dir = None;
    let mut prefix = TempSpill::DEFAULT_PREFIX.to_owned();
    let mut limits = TeeLimits::DEFAULT;

    for arg in args {
        let Some(flag) = arg.to_str() else {
            return Err(usage("spool takes no positional arguments"));
        };
        if let Some(rest) = flag.strip_prefix("--dir=") {
            dir = Some(PathBuf::from(rest));
        } else if let Some(rest) = flag.strip_prefix("--prefix=") {
            prefix = rest.to_owned();
        } else if let Some(rest) = flag.strip_prefix("--block-size=") {
            limits.block_size = parse_size(rest, "--block-size")?;
        } else if let Some(rest) = flag.strip_prefix("--io-unit=") {
            limits.io_unit = parse_size(rest, "--io-unit")?;
        } else if flag.starts_with("--") {
            return Err(usage(format!("unknown flag: {flag}")));
        } else {
            return Err(usage("spool takes no positional arguments"));
        }
    }
    limits.try_validate().map_err(usage)?;
    Ok(Command::Spool {
        dir,
        prefix,
        limits,
    })
}

fn parse_tac(args: Vec<OsString>) -> Result<Command, ParseError> {
    let mut path: Option<PathBuf> = None;
    let mut split = SplitKind::default();
    let mut limits = ScanLimits::DEFAULT;

    for arg in args {
        if let Some(flag) = arg.to_str() {
            if let Some(rest) = flag.strip_prefix("--split=") {
                split = rest.parse().map_err(|()| {
                    usage(format!(
                        "invalid --split value: {rest} (expected lines|words|bytes|runes)"
                    ))
                })?;
                continue;
            }
            if let Some(rest) = flag.strip_prefix("--max-token=") {
                limits.max_buf = parse_size(rest, "--max-token")?;
                limits.initial_buf = limits.initial_buf.min(limits.max_buf);
                continue;
            }
            if flag.starts_with("--") {
                return Err(usage(format!("unknown flag: {flag}")));
            }
        }
        if path.is_some() {
            return Err(usage("tac takes exactly one file"));
        }
        path = Some(PathBuf::from(arg));
    }

    let Some(path) = path else {
        return Err(usage("tac requires a file"));
    };
    limits.try_validate().map_err(usage)?;
    Ok(Command::Tac {
        path,
        split,
        limits,
    })
}

/// Collects exactly `N` positionals, of which the first `required` must be
/// present; missing optional ones are empty.
fn positionals<const N: usize>(
    sub: &str,
    args: Vec<OsString>,
    required: usize,
) -> Result<[OsString; N], ParseError> {
    if let Some(flag) = args
        .iter()
        .filter_map(|arg| arg.to_str())
        .find(|arg| arg.starts_with("--"))
    {
        return Err(usage(format!("unknown flag: {flag}")));
    }
    if args.len() < required || args.len() > N {
        return Err(usage(format!(
            "{sub} expects {required}..={N} arguments, got {}",
            args.len()
        )));
    }
    let mut out: [OsString; N] = std::array::from_fn(|_| OsString::new());
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg;
    }
    Ok(out)
}

fn parse_size(s: &str, flag: &str) -> Result<usize, ParseError> {
    match s.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(usage(format!("invalid {flag} value: {s} (expected a positive integer)"))),
    }
}

fn usage(msg: impl Into<String>) -> ParseError {
    ParseError::Usage(msg.into())
}

fn print_usage() {
    eprintln!(
        "usage: bytespool [--verbose] <command> [OPTIONS]

COMMANDS:
    spool   Copy stdin to stdout through a disk-spilling buffer
    tac     Print the tokens of a file in reverse order
    pack    Encode a directory into an image
    ls      List the tree under a path of an image (default /)
    cat     Write one file of an image to stdout

SPOOL OPTIONS:
    --dir=<dir>                 Spill file directory (default: system temp)
    --prefix=<name>             Spill file name prefix
    --block-size=<N>            Spill block size in bytes (default: 1048576)
    --io-unit=<N>               Source read size in bytes (default: 16384)

TAC OPTIONS:
    --split=lines|words|bytes|runes   Token rule (default: lines)
    --max-token=<N>             Longest token in bytes (default: 65536)

EXAMPLES:
    bytespool pack ./assets assets.img
    bytespool ls assets.img /css
    bytespool tac --split=words notes.txt

GLOBAL:
    --verbose, -v               Log diagnostics to stderr (RUST_LOG overrides)
    --help, -h                  Show this help"
    );
}
