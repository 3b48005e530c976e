use std::collections::BTreeMap;
use std::path::PathBuf;

use envscan::{CircularPolicy, EnvLoader, Error, SubstitutionMode, TargetEnv};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn override_existing_false_skips_existing_values() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "A=from_file\nB=2\n");

    let mut loader = EnvLoader::new()
        .path(&file)
        .target(seeded(&[("A", "existing")]))
        .override_existing(false);

    let report = loader.load().expect("load should succeed");
    assert_eq!(report.files_read, 1);
    assert_eq!(report.loaded, 1);
    assert_eq!(report.skipped_existing, 1);

    let map = loader.target_env().as_memory().expect("memory target");
    assert_eq!(map.get("A").expect("A should exist"), "existing");
    assert_eq!(map.get("B").expect("B should exist"), "2");
}

#[test]
fn override_existing_true_replaces_values() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "A=from_file\n");

    let mut loader = EnvLoader::new()
        .path(&file)
        .target(seeded(&[("A", "existing")]))
        .override_existing(true);

    let report = loader.load().expect("load should succeed");
    assert_eq!(report.loaded, 1);
    assert_eq!(report.skipped_existing, 0);

    let map = loader.target_env().as_memory().expect("memory target");
    assert_eq!(map.get("A").expect("A should exist"), "from_file");
}

#[test]
fn first_occurrence_wins_across_files() {
    let dir = temp_dir();
    let first = write_file(&dir, ".env.local", "A=local\nB=local\n");
    let second = write_file(&dir, ".env", "B=base\nC=base\n");

    let mut loader = EnvLoader::new().paths([first, second]);

    let report = loader.load().expect("load should succeed");
    assert_eq!(report.files_read, 2);
    assert_eq!(report.loaded, 3);
    assert_eq!(report.duplicates, 1);

    let map = loader.into_target().into_memory().expect("memory target");
    assert_eq!(
        map,
        BTreeMap::from([
            ("A".to_owned(), "local".to_owned()),
            ("B".to_owned(), "local".to_owned()),
            ("C".to_owned(), "base".to_owned()),
        ])
    );
}

#[test]
fn duplicate_keys_within_a_file_keep_the_first() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "A=1\nA=2\n");

    let mut loader = EnvLoader::new().path(file);
    let report = loader.load().expect("load should succeed");
    assert_eq!(report.loaded, 1);
    assert_eq!(report.duplicates, 1);

    let map = loader.target_env().as_memory().expect("memory target");
    assert_eq!(map.get("A").expect("A should exist"), "1");
}

#[test]
fn missing_required_file_returns_io_error() {
    let dir = temp_dir();
    let mut loader = EnvLoader::new().path(dir.path().join("missing.env"));
    let err = loader.load().expect_err("expected I/O error");

    match err {
        Error::Io(_) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_optional_file_is_skipped() {
    let dir = temp_dir();
    let real = write_file(&dir, ".env.real", "A=loaded\n");

    let mut loader = EnvLoader::new()
        .paths([dir.path().join("missing.env"), real])
        .required(false);
    let report = loader.load().expect("load should succeed");
    assert_eq!(report.files_read, 1);
    assert_eq!(report.loaded, 1);
}

#[test]
fn invalid_utf8_returns_encoding_error() {
    let dir = temp_dir();
    let file = dir.path().join(".env");
    std::fs::write(&file, b"A=\xff\n").expect("failed to write test file");

    let err = EnvLoader::new()
        .path(file)
        .parse_only()
        .expect_err("expected encoding error");
    assert!(matches!(err, Error::InvalidEncoding(_)), "unexpected error: {err:?}");
}

#[test]
fn malformed_lines_are_skipped() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "A=ok\nBAD LINE\nB=also ok\n");

    let entries = EnvLoader::new()
        .path(&file)
        .parse_only()
        .expect("parse should succeed");
    let keys: Vec<&str> = entries.iter().map(|entry| entry.key.as_str()).collect();
    assert_eq!(keys, ["A", "B"]);
    assert!(entries.iter().all(|entry| entry.source.as_deref() == Some(file.as_path())));
}

#[test]
fn byte_order_mark_is_stripped() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "\u{feff}A=1\n");

    let entries = EnvLoader::new()
        .path(file)
        .parse_only()
        .expect("parse should succeed");
    assert_eq!(entries[0].key, "A");
}

#[test]
fn substitution_expands_chained_and_forward_references() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "A=${B}\nB=${C}\nC=value\n");

    let mut loader = EnvLoader::new().path(file);
    let report = loader.load().expect("load should succeed");
    assert_eq!(report.loaded, 3);

    let map = loader.target_env().as_memory().expect("memory target");
    assert_eq!(map.get("A").expect("A should exist"), "value");
    assert_eq!(map.get("B").expect("B should exist"), "value");
}

#[test]
fn substitution_disabled_keeps_references() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "A=1\nB=${A}\n");

    let entries = EnvLoader::new()
        .path(file)
        .substitution_mode(SubstitutionMode::Disabled)
        .parse_only()
        .expect("parse should succeed");
    assert_eq!(entries[1].value, "${A}");
}

#[test]
fn substitution_ignores_target_environment() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "OUT=${BASE}/bin\n");

    let mut loader = EnvLoader::new()
        .path(file)
        .target(seeded(&[("BASE", "/opt/app")]));
    loader.load().expect("load should succeed");

    let map = loader.target_env().as_memory().expect("memory target");
    assert_eq!(map.get("OUT").expect("OUT should exist"), "${BASE}/bin");
}

#[test]
fn files_are_resolved_in_isolation() {
    let dir = temp_dir();
    let first = write_file(&dir, "first.env", "ROOT=/srv\n");
    let second = write_file(&dir, "second.env", "DATA=${ROOT}/data\n");

    let entries = EnvLoader::new()
        .paths([first, second])
        .parse_only()
        .expect("parse should succeed");
    assert_eq!(entries[1].value, "${ROOT}/data");
}

#[test]
fn circular_reference_keeps_partial_value_by_default() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "OK=fine\nLOOP=${LOOP}-${OK}\n");

    let mut loader = EnvLoader::new().path(file);
    let report = loader.load().expect("load should succeed");
    assert_eq!(report.circular, 1);
    assert_eq!(report.loaded, 2);

    let map = loader.target_env().as_memory().expect("memory target");
    assert_eq!(map.get("LOOP").expect("LOOP should exist"), "${LOOP}-fine");
}

#[test]
fn circular_reference_errors_under_strict_policy() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "A=${B}\nB=${A}\n");

    let mut loader = EnvLoader::new()
        .path(&file)
        .circular_policy(CircularPolicy::Error);
    let err = loader.load().expect_err("expected circular reference error");

    match err {
        Error::CircularReference { key, path } => {
            assert_eq!(key, "A");
            assert_eq!(path, file);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(loader.target_env().as_memory().expect("memory target").is_empty());
}

#[test]
fn keys_the_environment_cannot_hold_are_skipped() {
    let dir = temp_dir();
    let file = write_file(&dir, ".env", "GOOD=1\nBAD\0KEY=2\n");

    let mut loader = EnvLoader::new().path(file);
    let report = loader.load().expect("load should succeed");
    assert_eq!(report.loaded, 1);

    let map = loader.target_env().as_memory().expect("memory target");
    assert_eq!(map.keys().collect::<Vec<_>>(), ["GOOD"]);
}

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("failed to write test file");
    path
}

fn seeded(vars: &[(&str, &str)]) -> TargetEnv {
    TargetEnv::from_memory(
        vars.iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect(),
    )
}
