use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const ENTRIES: &str = r#"[
  {"type": "dir", "name": "a/"},
  {"type": "reg", "name": "a/f", "size": 10,
   "digest": "sha256:84d89877f0d4041efb6bf91a16f0248f2fd573e6af05c19f96bedb9f882f7882"}
]"#;

fn setup(td: &assert_fs::TempDir) {
    td.child("entries.json").write_str(ENTRIES).unwrap();
    let ts = zstd::stream::encode_all(&b"tar-split json lines\n"[..], 3).unwrap();
    td.child("tarsplit.zst").write_binary(&ts).unwrap();
    // 100 bytes of pre-existing layer content
    td.child("layer.zst").write_binary(&[0u8; 100]).unwrap();
}

fn zck(td: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("zck").unwrap();
    cmd.current_dir(td.path());
    cmd
}

#[test]
fn write_then_inspect() {
    let td = assert_fs::TempDir::new().unwrap();
    setup(&td);

    zck(&td)
        .args([
            "write",
            "--entries", "entries.json",
            "--tar-split", "tarsplit.zst",
            "--annotations", "ann.json",
            "layer.zst",
        ])
        .assert()
        .success();

    let ann: serde_json::Value =
        serde_json::from_slice(&std::fs::read(td.child("ann.json").path()).unwrap()).unwrap();
    let pos = ann["io.github.containers.zstd-chunked.manifest-position"].as_str().unwrap();
    assert!(pos.starts_with("108:"), "{pos}");
    assert!(pos.ends_with(":1"), "{pos}");

    zck(&td)
        .args(["footer", "layer.zst"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"offset\": 108"));

    zck(&td)
        .args(["annotations", "ann.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"offset\": 108").and(predicate::str::contains("sha256:")));

    zck(&td)
        .args(["toc", "layer.zst"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"a/f\""));

    zck(&td)
        .args(["check", "--annotations", "ann.json", "layer.zst"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn write_annotations_to_stdout() {
    let td = assert_fs::TempDir::new().unwrap();
    setup(&td);
    zck(&td)
        .args(["write", "--entries", "entries.json", "--tar-split", "tarsplit.zst", "--tar-split-size", "21", "layer.zst"])
        .assert()
        .success()
        .stdout(predicate::str::contains("io.github.containers.zstd-chunked.tarsplit-position"));
}

#[test]
fn check_detects_stale_annotations() {
    let td = assert_fs::TempDir::new().unwrap();
    setup(&td);
    zck(&td)
        .args(["write", "--entries", "entries.json", "--tar-split", "tarsplit.zst", "--annotations", "ann.json", "layer.zst"])
        .assert()
        .success();
    // a second write moves the footer; the first annotations no longer match
    zck(&td)
        .args(["write", "--entries", "entries.json", "--tar-split", "tarsplit.zst", "--annotations", "ann2.json", "layer.zst"])
        .assert()
        .success();
    zck(&td)
        .args(["check", "--annotations", "ann.json", "layer.zst"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("footer mismatch"));
    zck(&td)
        .args(["check", "--annotations", "ann2.json", "layer.zst"])
        .assert()
        .success();
}

#[test]
fn footer_of_plain_file_fails() {
    let td = assert_fs::TempDir::new().unwrap();
    td.child("plain.bin").write_binary(&[7u8; 200]).unwrap();
    zck(&td)
        .args(["footer", "plain.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid magic number"));

    td.child("tiny.bin").write_binary(&[7u8; 10]).unwrap();
    zck(&td)
        .args(["footer", "tiny.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("blob too small"));
}

#[test]
fn annotations_without_checksum_fail() {
    let td = assert_fs::TempDir::new().unwrap();
    td.child("ann.json")
        .write_str(r#"{"io.github.containers.zstd-chunked.manifest-position": "8:1:2:1"}"#)
        .unwrap();
    zck(&td)
        .args(["annotations", "ann.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("manifest-checksum"));
}

#[test]
fn invalid_entries_leave_blob_untouched() {
    let td = assert_fs::TempDir::new().unwrap();
    setup(&td);
    td.child("bad.json")
        .write_str(r#"[{"type": "chunk", "name": "orphan", "chunkSize": 4}]"#)
        .unwrap();
    zck(&td)
        .args(["write", "--entries", "bad.json", "--tar-split", "tarsplit.zst", "layer.zst"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid TOC"));
    assert_eq!(std::fs::metadata(td.child("layer.zst").path()).unwrap().len(), 100);
}
