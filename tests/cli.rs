mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::{TestEntry, build_archive};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_partialzip"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_archive(dir: &Path, entries: &[TestEntry]) -> String {
    let path = dir.join("a.zip");
    std::fs::write(&path, build_archive(entries, b"").bytes).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn failed_entries_are_reported_and_the_rest_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(
        dir.path(),
        &[
            TestEntry::new("bad.bin", b"imploded, supposedly", 6),
            TestEntry::stored("good.txt", b"this one works"),
        ],
    );
    let out = dir.path().join("out");

    let output = run(&["-q", "-d", out.to_str().unwrap(), &archive, "bad.bin", "good.txt", "missing.txt"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert_eq!(std::fs::read(out.join("good.txt")).unwrap(), b"this one works");
    assert!(!out.join("bad.bin").exists());
    assert!(stderr.contains(&format!("Cannot find missing.txt in {archive}")), "{stderr}");
    assert!(stderr.contains("Couldn't extract bad.bin"), "{stderr}");
}

#[test]
fn entries_escaping_the_output_directory_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let absolute = dir.path().join("absolute.txt");
    let archive = write_archive(
        dir.path(),
        &[
            TestEntry::stored("../escaped.txt", b"outside"),
            TestEntry::stored(absolute.to_str().unwrap(), b"outside too"),
            TestEntry::stored("nested/ok.txt", b"inside"),
        ],
    );
    let out = dir.path().join("out");

    let output = run(&["-q", "-d", out.to_str().unwrap(), &archive]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(!dir.path().join("escaped.txt").exists());
    assert!(!absolute.exists());
    assert_eq!(std::fs::read(out.join("nested/ok.txt")).unwrap(), b"inside");
    assert!(stderr.contains("../escaped.txt"), "{stderr}");
}

#[test]
fn listing_prints_entries_and_totals() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(
        dir.path(),
        &[TestEntry::stored("one.txt", &[b'1'; 10]), TestEntry::stored("two.txt", &[b'2'; 20])],
    );

    let output = run(&["-l", &archive]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.starts_with(&format!("Archive:  {archive}")), "{stdout}");
    assert!(stdout.contains("01-02-2024 03:04   one.txt"), "{stdout}");
    assert!(stdout.trim_end().ends_with("2 files"), "{stdout}");
}
