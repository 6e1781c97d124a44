//! Packed filesystem built from real directory trees.

use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use bytespool::stringfs::{encode_dir, StringFs};
use bytespool::StringFsError;

fn sample_tree(root: &Path) {
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b/sub")).unwrap();
    fs::write(root.join("a/x.txt"), "hello").unwrap();
    fs::write(root.join("a/y.txt"), "").unwrap();
    fs::write(root.join("b/sub/z"), [0u8, 1, 2]).unwrap();
}

#[test]
fn encoded_tree_opens_by_path() {
    let tmp = tempfile::tempdir().unwrap();
    sample_tree(tmp.path());

    let image = encode_dir(tmp.path()).unwrap();
    let packed = StringFs::decode(&image).unwrap();

    let mut contents = Vec::new();
    packed
        .open("/b/sub/z")
        .unwrap()
        .read_to_end(&mut contents)
        .unwrap();
    assert_eq!(contents, [0, 1, 2]);

    let names: BTreeSet<&str> = packed
        .open("/a")
        .unwrap()
        .readdir_names()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(names, BTreeSet::from(["x.txt", "y.txt"]));

    let empty = packed.open("a/y.txt").unwrap();
    assert!(!empty.is_dir());
    assert!(empty.is_empty());
}

#[test]
fn bad_paths_report_walk_errors() {
    let tmp = tempfile::tempdir().unwrap();
    sample_tree(tmp.path());
    let image = encode_dir(tmp.path()).unwrap();
    let packed = StringFs::decode(&image).unwrap();

    let missing = packed.open("/c").unwrap_err();
    assert!(matches!(missing, StringFsError::NotFound));
    assert_eq!(missing.to_string(), "file not found");

    let not_dir = packed
        .open("/a/x.txt")
        .unwrap()
        .readdir_names()
        .unwrap_err();
    assert_eq!(not_dir.to_string(), "not a directory");
}

#[test]
fn encoding_is_deterministic() {
    let tmp = tempfile::tempdir().unwrap();
    sample_tree(tmp.path());
    assert_eq!(
        encode_dir(tmp.path()).unwrap(),
        encode_dir(tmp.path()).unwrap()
    );
}

#[test]
fn root_must_be_a_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("plain");
    fs::write(&file, "x").unwrap();

    let err = encode_dir(&file).unwrap_err();
    assert!(matches!(err, StringFsError::RootNotDirectory));
    assert_eq!(err.to_string(), "root must be a directory");
}

#[test]
fn every_truncation_is_rejected_or_safe() {
    let tmp = tempfile::tempdir().unwrap();
    sample_tree(tmp.path());
    let image = encode_dir(tmp.path()).unwrap();

    // Cutting the image moves the trailer; decoding must fail cleanly or
    // yield a filesystem whose walk fails cleanly, never panic.
    for cut in 0..image.len() {
        if let Ok(packed) = StringFs::decode(&image[..cut]) {
            let _ = packed.walk("/", |_, file| {
                let _ = file.contents();
            });
        }
    }
}

#[cfg(unix)]
#[test]
fn symlinked_directories_are_followed() {
    let tmp = tempfile::tempdir().unwrap();
    sample_tree(tmp.path());
    std::os::unix::fs::symlink(tmp.path().join("b"), tmp.path().join("link")).unwrap();

    let image = encode_dir(tmp.path()).unwrap();
    let packed = StringFs::decode(&image).unwrap();
    assert_eq!(
        packed.open("/link/sub/z").unwrap().contents().unwrap(),
        [0, 1, 2]
    );
}

#[cfg(unix)]
#[test]
fn symlink_cycle_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    sample_tree(tmp.path());
    std::os::unix::fs::symlink(tmp.path(), tmp.path().join("a/up")).unwrap();

    let err = encode_dir(tmp.path()).unwrap_err();
    assert!(matches!(err, StringFsError::Io(_)), "{err:?}");
}
