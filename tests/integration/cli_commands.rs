use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

fn bytespool() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bytespool"))
}

#[test]
fn spool_copies_stdin() {
    let spill_dir = tempfile::tempdir().expect("create temp dir");
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let mut child = bytespool()
        .arg("spool")
        .arg(format!("--dir={}", spill_dir.path().display()))
        .arg("--block-size=4096")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("run bytespool spool");

    let mut stdin = child.stdin.take().expect("stdin");
    let input = payload.clone();
    let writer = std::thread::spawn(move || {
        stdin.write_all(&input).expect("write stdin");
    });
    let output = child.wait_with_output().expect("wait for spool");
    writer.join().unwrap();

    assert!(output.status.success());
    assert!(output.stdout == payload, "spooled output differs");
    assert_eq!(fs::read_dir(spill_dir.path()).unwrap().count(), 0);
}

#[test]
fn tac_prints_lines_in_reverse() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("lines.txt");
    fs::write(&path, "alpha\nbeta\ngamma\n").unwrap();

    let output = bytespool().arg("tac").arg(&path).output().expect("run tac");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "gamma\nbeta\nalpha\n");
}

#[test]
fn pack_ls_cat_round_trip() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let src = tmp.path().join("src");
    fs::create_dir_all(src.join("docs")).unwrap();
    fs::write(src.join("docs/readme.md"), "# hi\n").unwrap();
    fs::write(src.join("top.txt"), "top").unwrap();
    let image = tmp.path().join("tree.img");

    let pack = bytespool()
        .arg("pack")
        .arg(&src)
        .arg(&image)
        .output()
        .expect("run pack");
    assert!(
        pack.status.success(),
        "pack failed: stderr={}",
        String::from_utf8_lossy(&pack.stderr)
    );

    let ls = bytespool().arg("ls").arg(&image).output().expect("run ls");
    assert!(ls.status.success());
    assert_eq!(
        String::from_utf8_lossy(&ls.stdout),
        "d /\nd /docs\n- /docs/readme.md\t5 bytes\n- /top.txt\t3 bytes\n"
    );

    let cat = bytespool()
        .arg("cat")
        .arg(&image)
        .arg("/docs/readme.md")
        .output()
        .expect("run cat");
    assert!(cat.status.success());
    assert_eq!(cat.stdout, b"# hi\n");

    let missing = bytespool()
        .arg("cat")
        .arg(&image)
        .arg("/nope")
        .output()
        .expect("run cat");
    assert_eq!(missing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("file not found"));
}

#[test]
fn bad_arguments_exit_with_usage() {
    let output = bytespool().arg("frobnicate").output().expect("run bytespool");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage:"));
}
