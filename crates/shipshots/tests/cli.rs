use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn bin_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shipshots").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::new(width, height).save(path).unwrap();
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

#[test]
fn devices_lists_builtin_table() {
    let home = TempDir::new().unwrap();
    let json = stdout_json(bin_cmd(home.path()).args(["devices", "--format", "json"]));

    let devices = json["devices"].as_array().unwrap();
    let iphone65 = devices
        .iter()
        .find(|d| d["identifier"] == "iphone65")
        .unwrap();
    assert_eq!(iphone65["screen_size"], "iOS-6.5-in");
    assert!(iphone65["resolutions"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r == "1242x2688"));
}

#[test]
fn devices_filters_by_category() {
    let home = TempDir::new().unwrap();
    let json = stdout_json(bin_cmd(home.path()).args([
        "devices",
        "--category",
        "watch",
        "--format",
        "json",
    ]));

    let devices = json["devices"].as_array().unwrap();
    assert!(!devices.is_empty());
    assert!(devices.iter().all(|d| d["category"] == "watch"));
}

#[test]
fn classify_reads_image_dimensions() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let file = work.path().join("home.png");
    write_png(&file, 640, 960);

    let json = stdout_json(
        bin_cmd(home.path())
            .arg("-C")
            .arg(work.path())
            .args(["classify", "home.png", "--format", "json"]),
    );
    assert_eq!(json["screen_size"], "iOS-3.5-in");
    assert_eq!(json["device_type"], "iphone35");
    assert_eq!(json["source"], "dimensions");
    assert_eq!(json["dimensions"], "640x960");
}

#[test]
fn classify_text_output() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_png(&work.path().join("shot.png"), 640, 960);

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .args(["classify", "shot.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("iOS-3.5-in"));
}

#[test]
fn classify_unknown_device_is_validation_error() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_png(&work.path().join("shot.png"), 640, 960);

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .args(["classify", "shot.png", "--device", "phablet"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("phablet"));
}

#[test]
fn classify_unsupported_dimensions_fails() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_png(&work.path().join("odd.png"), 100, 100);

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .args(["classify", "odd.png"])
        .assert()
        .code(5);
}

#[test]
fn discover_lists_screenshots_per_language() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let root = work.path().join("screenshots");
    write_png(&root.join("en-US").join("1.png"), 640, 960);
    write_png(&root.join("de-DE").join("1.png"), 640, 1136);

    let json = stdout_json(
        bin_cmd(home.path())
            .arg("-C")
            .arg(work.path())
            .args(["discover", "--format", "json"]),
    );
    let screenshots = json["screenshots"].as_array().unwrap();
    assert_eq!(screenshots.len(), 2);
    assert!(screenshots
        .iter()
        .any(|s| s["language"] == "de-DE" && s["screen_size"] == "iOS-4-in"));
    assert!(json["skipped"].as_array().unwrap().is_empty());
}

#[test]
fn discover_rejects_unknown_folders() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_png(&work.path().join("en-US").join("1.png"), 640, 960);
    write_png(&work.path().join("drafts").join("1.png"), 640, 960);

    bin_cmd(home.path())
        .arg("discover")
        .arg(work.path())
        .assert()
        .code(5)
        .stderr(predicate::str::contains("drafts"));
}

#[test]
fn discover_missing_root_fails() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    bin_cmd(home.path())
        .arg("discover")
        .arg(work.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn upload_dry_run_records_calls() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let root = work.path().join("screenshots");
    write_png(&root.join("en-US").join("1.png"), 640, 960);
    write_png(&root.join("en-US").join("2.png"), 640, 960);

    let json = stdout_json(
        bin_cmd(home.path())
            .arg("-C")
            .arg(work.path())
            .args([
                "upload",
                "--dry-run",
                "--app-id",
                "com.example.app",
                "--format",
                "json",
            ]),
    );

    assert_eq!(json["success"], true);
    assert_eq!(json["report"]["languages"]["en-US"]["uploaded"], 2);
    let calls = json["calls"].as_array().unwrap();
    assert_eq!(calls.iter().filter(|c| c["call"] == "upload").count(), 2);
    assert_eq!(calls.iter().filter(|c| c["call"] == "activate").count(), 1);
}

#[test]
fn upload_reads_app_from_config() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    std::fs::write(
        work.path().join("shipshots.yaml"),
        "app:\n  identifier: com.example.app\nscreenshots:\n  path: ./shots\n",
    )
    .unwrap();
    write_png(&work.path().join("shots").join("fr-FR").join("1.png"), 640, 960);

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .args(["upload", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 screenshot(s) uploaded in 1 language(s)"));
}

#[test]
fn upload_without_app_is_config_error() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_png(&work.path().join("screenshots").join("en-US").join("1.png"), 640, 960);

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .args(["upload", "--dry-run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("app.identifier"));
}

#[test]
fn upload_unknown_platform_is_config_error() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .args(["upload", "--dry-run", "--app-id", "com.example.app", "--platform", "android"])
        .assert()
        .code(2);
}

#[test]
fn init_writes_config_once() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .arg("init")
        .assert()
        .success();
    let content = std::fs::read_to_string(work.path().join("shipshots.yaml")).unwrap();
    assert!(content.contains("platform: ios"));

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    bin_cmd(home.path())
        .arg("-C")
        .arg(work.path())
        .args(["init", "--force"])
        .assert()
        .success();
}
