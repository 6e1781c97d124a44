//! Subcommand execution.
//!
//! Output goes to stdout; diagnostics go through `tracing` and are only
//! visible with `--verbose`. Library errors are converted to `io::Error`
//! so `main` has a single failure path.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use super::{Command, SplitKind};
use crate::reverse::{scan_bytes, scan_lines, scan_runes, scan_words, ReverseScanner, ScanLimits};
use crate::stringfs::{encode_dir, StringFs};
use crate::tee::{BufferedTee, TeeLimits, TempSpill};

/// Runs one subcommand to completion.
pub fn run(command: Command) -> io::Result<()> {
    match command {
        Command::Spool {
            dir,
            prefix,
            limits,
        } => spool(dir.as_deref(), &prefix, limits),
        Command::Tac {
            path,
            split,
            limits,
        } => tac(&path, split, limits),
        Command::Pack { dir, image } => pack(&dir, &image),
        Command::Ls { image, path } => ls(&image, &path),
        Command::Cat { image, path } => cat(&image, &path),
    }
}

fn spool(dir: Option<&Path>, prefix: &str, limits: TeeLimits) -> io::Result<()> {
    let mut tee = BufferedTee::with_limits(io::stdin(), TempSpill::new(dir, prefix), limits)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let copied = io::copy(&mut tee, &mut out)?;
    out.flush()?;
    tee.close()?;
    tracing::info!(bytes = copied, "spool finished");
    Ok(())
}

fn tac(path: &Path, split: SplitKind, limits: ScanLimits) -> io::Result<()> {
    let file = File::open(path)?;
    let mut scanner = ReverseScanner::with_limits(file, limits);
    match split {
        SplitKind::Lines => scanner.split(scan_lines),
        SplitKind::Words => scanner.split(scan_words),
        SplitKind::Bytes => scanner.split(scan_bytes),
        SplitKind::Runes => scanner.split(scan_runes),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut tokens = 0u64;
    while scanner.scan() {
        out.write_all(scanner.bytes())?;
        out.write_all(b"\n")?;
        tokens += 1;
    }
    out.flush()?;
    tracing::info!(tokens, path = %path.display(), "tac finished");

    match scanner.err() {
        Some(err) => Err(io::Error::other(format!("{}: {err}", path.display()))),
        None => Ok(()),
    }
}

fn pack(dir: &Path, image: &Path) -> io::Result<()> {
    let bytes = encode_dir(dir).map_err(|err| annotate(dir, err.into()))?;
    fs::write(image, &bytes)?;
    tracing::info!(bytes = bytes.len(), image = %image.display(), "image written");
    Ok(())
}

fn ls(image: &Path, path: &str) -> io::Result<()> {
    let mmap = map_image(image)?;
    let packed = StringFs::decode(&mmap).map_err(|err| annotate(image, err.into()))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut write_err = None;
    packed.walk(path, |path, file| {
        if write_err.is_some() {
            return;
        }
        let line = if file.is_dir() {
            writeln!(out, "d {path}")
        } else {
            writeln!(out, "- {path}\t{} bytes", file.len())
        };
        if let Err(err) = line {
            write_err = Some(err);
        }
    })
    .map_err(io::Error::from)?;
    if let Some(err) = write_err {
        return Err(err);
    }
    out.flush()
}

fn cat(image: &Path, path: &str) -> io::Result<()> {
    let mmap = map_image(image)?;
    let packed = StringFs::decode(&mmap).map_err(|err| annotate(image, err.into()))?;
    let contents = packed.open(path)?.contents()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(contents)?;
    out.flush()
}

fn map_image(path: &Path) -> io::Result<Mmap> {
    let file = File::open(path).map_err(|err| annotate(path, err))?;
    // SAFETY: map read-only image data; the image is assumed stable while
    // the command runs.
    unsafe { Mmap::map(&file) }
}

fn annotate(path: &Path, err: io::Error) -> io::Error {
    io::Error::new(err.kind(), format!("{}: {err}", path.display()))
}
