use clap::Parser;
use picsift::cli::Cli;
use picsift::error::{exit_code_for, ExitCode};
use picsift::run_app;
use tempfile::tempdir;

fn parse(args: &[&str]) -> Cli {
    let mut full = vec!["picsift", "-q"];
    full.extend_from_slice(args);
    Cli::try_parse_from(full).unwrap()
}

#[test]
fn test_missing_directory_exit_code() {
    let cli = parse(&["dupes", "-W", "/no/such/picsift/dir"]);
    let err = run_app(cli).unwrap_err();
    assert_eq!(exit_code_for(&err), ExitCode::MissingDirectory);
    assert_eq!(exit_code_for(&err).as_i32(), 1);
}

#[test]
fn test_threshold_out_of_range_exit_code() {
    let dir = tempdir().unwrap();
    let workdir = dir.path().to_str().unwrap();

    for bad in ["65", "-1"] {
        let cli = parse(&["dupes", "-W", workdir, "-T", bad]);
        let err = run_app(cli).unwrap_err();
        assert_eq!(exit_code_for(&err), ExitCode::InvalidThreshold);
        assert_eq!(exit_code_for(&err).as_i32(), 2);
    }

    // Rejected before any side effect.
    assert!(!dir.path().join("picsift.log").exists());
    assert!(!dir.path().join(".picsift_cache.db").exists());
}

#[test]
fn test_dupes_on_empty_directory_succeeds() {
    let dir = tempdir().unwrap();
    let cli = parse(&["dupes", "-W", dir.path().to_str().unwrap(), "-T", "64"]);

    assert_eq!(run_app(cli).unwrap(), ExitCode::Success);
    assert!(dir.path().join("picsift.log").exists());
    assert!(dir.path().join(".picsift_cache.db").exists());
}

#[test]
fn test_blur_does_not_create_cache() {
    let dir = tempdir().unwrap();
    let cli = parse(&["blur", "-W", dir.path().to_str().unwrap(), "-S"]);

    assert_eq!(run_app(cli).unwrap(), ExitCode::Success);
    assert!(dir.path().join("picsift.log").exists());
    assert!(!dir.path().join(".picsift_cache.db").exists());
}
