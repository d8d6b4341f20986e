// Language detection against realistic project trees

use std::fs;

use tempfile::TempDir;

use polyver::detect::{DetectorConfig, LanguageDetector};
use polyver::language::{Language, LanguageRegistry};

fn registry() -> LanguageRegistry {
    LanguageRegistry::builtin().unwrap()
}

#[test]
fn test_detects_file_by_extension_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let upper = dir.path().join("SCRIPT.PY");
    fs::write(&upper, "print('x')\n").unwrap();

    let registry = registry();
    let detector = LanguageDetector::new(&registry);
    assert_eq!(detector.detect(&upper).unwrap(), Some(Language::Python));
}

#[test]
fn test_detects_rust_project_from_manifest() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();

    let registry = registry();
    let detector = LanguageDetector::new(&registry);
    assert_eq!(detector.detect(dir.path()).unwrap(), Some(Language::Rust));
}

#[test]
fn test_typescript_outranks_javascript_when_both_markers_present() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("package.json"), "{}").unwrap();
    fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();

    let registry = registry();
    let detector = LanguageDetector::new(&registry);
    assert_eq!(
        detector.detect(dir.path()).unwrap(),
        Some(Language::TypeScript)
    );
}

#[test]
fn test_glob_marker_matches_project_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("App.csproj"), "<Project/>").unwrap();

    let registry = registry();
    let detector = LanguageDetector::new(&registry);
    assert_eq!(detector.detect(dir.path()).unwrap(), Some(Language::CSharp));
}

#[test]
fn test_unknown_extension_and_empty_directory_yield_none() {
    let dir = TempDir::new().unwrap();
    let odd = dir.path().join("data.xyz");
    fs::write(&odd, "???").unwrap();

    let registry = registry();
    let detector = LanguageDetector::new(&registry);
    assert_eq!(detector.detect(&odd).unwrap(), None);

    let empty = TempDir::new().unwrap();
    assert_eq!(detector.detect(empty.path()).unwrap(), None);
}

#[test]
fn test_missing_path_is_an_error() {
    let registry = registry();
    let detector = LanguageDetector::new(&registry);
    assert!(detector
        .detect(std::path::Path::new("/no/such/path/anywhere"))
        .is_err());
}

#[test]
fn test_strict_ambiguity_refuses_mixed_projects() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
    fs::write(dir.path().join("pyproject.toml"), "[project]\n").unwrap();

    let registry = registry();

    let relaxed = LanguageDetector::new(&registry);
    assert_eq!(relaxed.detect(dir.path()).unwrap(), Some(Language::Rust));

    let strict = LanguageDetector::with_config(
        &registry,
        DetectorConfig {
            strict_ambiguity: true,
            ..DetectorConfig::default()
        },
    );
    assert_eq!(strict.detect(dir.path()).unwrap(), None);
}

#[test]
fn test_custom_marker_order_overrides_builtin_priority() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
    fs::write(dir.path().join("pyproject.toml"), "[project]\n").unwrap();

    let registry = registry();
    let detector = LanguageDetector::with_config(
        &registry,
        DetectorConfig {
            marker_order: Some(vec![Language::Python, Language::Rust]),
            strict_ambiguity: false,
        },
    );
    assert_eq!(detector.detect(dir.path()).unwrap(), Some(Language::Python));
}
