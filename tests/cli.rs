use std::process::{Command, Output};

use tempfile::TempDir;

fn batch_sync(workdir: &TempDir, vars: &[(&str, String)], args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_batch-sync"))
        .env_clear()
        .envs(vars.iter().map(|(k, v)| (*k, v.as_str())))
        .current_dir(workdir.path())
        .args(args)
        .output()
        .unwrap()
}

fn full_env(workdir: &TempDir) -> Vec<(&'static str, String)> {
    let dir = |name: &str| workdir.path().join(name).to_string_lossy().into_owned();
    vec![
        // nothing listens here; the run must fail before any request
        ("S3_URL", "http://127.0.0.1:9".to_string()),
        ("S3_BUCKET_ID", "bucket".to_string()),
        ("S3_ACCESS_KEY", "access".to_string()),
        ("S3_SECRET_KEY", "secret".to_string()),
        ("S3_PREFIX", "staging".to_string()),
        ("INPUT_OBJECT_IDS", r#"["a.mp4"]"#.to_string()),
        ("SUBMISSION_ID", "sub-1".to_string()),
        ("FPS", "25".to_string()),
        ("TIMESTAMP", "2024-01-01T00:00:00Z".to_string()),
        ("BASE_IMAGE", "pipeline:1.0".to_string()),
        ("INPUT_FOLDER", dir("input")),
        ("OUTPUT_FOLDER", dir("output")),
    ]
}

#[test]
fn missing_config_exits_with_one() {
    let workdir = tempfile::tempdir().unwrap();

    let output = batch_sync(&workdir, &[], &["upload"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Error: environment variable S3_URL is not set"));
}

#[test]
fn missing_folder_exits_with_one() {
    let workdir = tempfile::tempdir().unwrap();

    let output = batch_sync(&workdir, &full_env(&workdir), &["download"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Error: Folder"));
    assert!(stdout.contains("not found"));
    assert!(!stdout.contains("Done"));
}

#[test]
fn empty_output_upload_exits_with_one() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::create_dir(workdir.path().join("input")).unwrap();
    std::fs::create_dir(workdir.path().join("output")).unwrap();

    let output = batch_sync(&workdir, &full_env(&workdir), &["upload"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Error: No output files to upload"));
    // progress is logged without any -d flag
    assert!(String::from_utf8_lossy(&output.stderr).contains("Uploading assets to S3 bucket bucket"));
}

#[test]
fn unknown_action_is_rejected_by_the_parser() {
    let workdir = tempfile::tempdir().unwrap();

    let output = batch_sync(&workdir, &full_env(&workdir), &["sync"]);

    assert_eq!(output.status.code(), Some(2));
}
