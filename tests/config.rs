//! Loading `canvas-merge.toml` from disk.

use std::path::Path;

use canvas_merge::config::{MergeConfig, ResolveConfig};
use canvas_merge::core::{ConflictCode, MergeTarget, StrategyKind};
use tempfile::TempDir;

fn write(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("canvas-merge.toml");
    std::fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn missing_file_means_defaults() {
    let dir = TempDir::new().unwrap();
    let cfg = MergeConfig::load(&dir.path().join("canvas-merge.toml")).unwrap();
    assert_eq!(cfg, MergeConfig::default());
    assert_eq!(cfg.resolve, ResolveConfig::default());
}

#[test]
fn existing_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        r#"
[resolve]
target = "remote"
min_confidence = 0.6

[resolve.overrides]
"P-STYLE" = "prefer-local"
"#,
    );
    let cfg = MergeConfig::load(&path).unwrap();
    assert_eq!(cfg.resolve.target, MergeTarget::Remote);
    assert_eq!(cfg.resolve.min_confidence, 0.6);

    let options = cfg.resolve_options().unwrap();
    assert_eq!(options.overrides.get(&ConflictCode::Style), Some(&StrategyKind::PreferLocal));
}

#[test]
fn invalid_file_error_names_path_and_line() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "[resolve]\nauto_resolve = true\ntarget = \"sideways\"\n");
    let err = MergeConfig::load(&path).unwrap_err();
    assert_eq!(err.path.as_deref(), Some(path.as_path()));
    assert!(err.message.contains("line 3"), "{}", err.message);
    assert!(err.to_string().starts_with(&path.display().to_string()));
}

#[test]
fn semantic_errors_also_carry_the_path() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "[resolve.overrides]\n\"S-ORDER\" = \"merge\"\n");
    let err = MergeConfig::load(&path).unwrap_err();
    assert_eq!(err.path.as_deref(), Some(path.as_path()));
    assert!(err.message.contains("S-ORDER"), "{}", err.message);
}

#[test]
fn unreadable_path_is_an_error() {
    let dir = TempDir::new().unwrap();
    // A directory cannot be read as a file.
    let err = MergeConfig::load(dir.path()).unwrap_err();
    assert!(err.message.contains("could not read file"), "{}", err.message);
    assert_eq!(err.path.as_deref(), Some(Path::new(dir.path())));
}
