//! Command-line front end for the `bytespool` binary.
//!
//! # Module layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`args`] | Subcommand argument parsing |
//! | [`commands`] | Subcommand execution |

pub mod args;
pub mod commands;

use std::path::PathBuf;

use crate::reverse::ScanLimits;
use crate::tee::TeeLimits;

pub use args::parse_args;
pub use commands::run;

/// Parsed invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Install a stderr log subscriber.
    pub verbose: bool,
    pub command: Command,
}

/// One subcommand with its options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Copy stdin to stdout through a buffered tee.
    Spool {
        dir: Option<PathBuf>,
        prefix: String,
        limits: TeeLimits,
    },
    /// Print the tokens of a file in reverse order.
    Tac {
        path: PathBuf,
        split: SplitKind,
        limits: ScanLimits,
    },
    /// Encode a directory into an image file.
    Pack { dir: PathBuf, image: PathBuf },
    /// List the tree under a path of an image.
    Ls { image: PathBuf, path: String },
    /// Write one file of an image to stdout.
    Cat { image: PathBuf, path: String },
}

/// Built-in split rule selected by `--split`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitKind {
    #[default]
    Lines,
    Words,
    Bytes,
    Runes,
}

impl std::str::FromStr for SplitKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "lines" => Ok(Self::Lines),
            "words" => Ok(Self::Words),
            "bytes" => Ok(Self::Bytes),
            "runes" => Ok(Self::Runes),
            _ => Err(()),
        }
    }
}
