// Language detection for polyver
//
// A single file is matched by extension (unique across profiles by
// construction). A directory is matched by walking an ordered list of marker
// files; ordering is configurable policy, not a hidden invariant, and a
// strict mode refuses to guess when several ecosystems' markers coexist.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::language::{Language, LanguageRegistry};

/// Detection policy
#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    /// Marker-check priority; defaults to the registry's table order
    pub marker_order: Option<Vec<Language>>,
    /// When true, a directory carrying markers of two or more distinct
    /// languages detects as nothing instead of first-match-wins
    pub strict_ambiguity: bool,
}

/// Infers a project's language from marker files and extensions
pub struct LanguageDetector<'a> {
    registry: &'a LanguageRegistry,
    config: DetectorConfig,
}

impl<'a> LanguageDetector<'a> {
    pub fn new(registry: &'a LanguageRegistry) -> Self {
        Self::with_config(registry, DetectorConfig::default())
    }

    pub fn with_config(registry: &'a LanguageRegistry, config: DetectorConfig) -> Self {
        Self { registry, config }
    }

    /// Detect the language of a file or project directory.
    ///
    /// Returns `Ok(None)` when nothing matches; that is a normal outcome
    /// callers must handle, not a failure.
    pub fn detect(&self, path: &Path) -> Result<Option<Language>> {
        if path.is_file() {
            return Ok(self.detect_file(path));
        }
        if path.is_dir() {
            return self.detect_directory(path);
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("path does not exist: {}", path.display()),
        )
        .into())
    }

    fn detect_file(&self, path: &Path) -> Option<Language> {
        let extension = path.extension()?.to_str()?;
        let detected = self.registry.language_for_extension(extension);
        debug!(path = %path.display(), language = ?detected, "File detection by extension");
        detected
    }

    fn detect_directory(&self, dir: &Path) -> Result<Option<Language>> {
        let order = self
            .config
            .marker_order
            .clone()
            .unwrap_or_else(|| self.registry.marker_order().to_vec());

        let mut matched: Vec<Language> = Vec::new();
        for language in order {
            let Some(profile) = self.registry.profile(language) else {
                continue;
            };
            if profile
                .markers
                .iter()
                .any(|marker| marker_present(dir, marker))
            {
                matched.push(language);
                if !self.config.strict_ambiguity {
                    break;
                }
            }
        }

        match matched.as_slice() {
            [] => {
                debug!(dir = %dir.display(), "No language marker found");
                Ok(None)
            }
            [only] => {
                debug!(dir = %dir.display(), language = %only, "Directory detection by marker");
                Ok(Some(*only))
            }
            many => {
                debug!(
                    dir = %dir.display(),
                    candidates = ?many,
                    "Ambiguous markers under strict policy, refusing to guess"
                );
                Ok(None)
            }
        }
    }
}

/// Check a marker against a directory. Markers of the form "*.ext" match any
/// direct child with that extension (e.g. C# project files).
fn marker_present(dir: &Path, marker: &str) -> bool {
    if let Some(suffix) = marker.strip_prefix('*') {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return false;
        };
        entries
            .flatten()
            .any(|entry| entry.file_name().to_string_lossy().ends_with(suffix))
    } else {
        dir.join(marker).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn detector_fixture() -> (TempDir, LanguageRegistry) {
        (TempDir::new().unwrap(), LanguageRegistry::builtin().unwrap())
    }

    #[test]
    fn test_detect_file_by_extension() {
        let (dir, registry) = detector_fixture();
        let file = dir.path().join("app.py");
        fs::write(&file, "print('hi')\n").unwrap();

        let detector = LanguageDetector::new(&registry);
        assert_eq!(detector.detect(&file).unwrap(), Some(Language::Python));
    }

    #[test]
    fn test_detect_directory_by_marker() {
        let (dir, registry) = detector_fixture();
        fs::write(dir.path().join("go.mod"), "module example\n").unwrap();

        let detector = LanguageDetector::new(&registry);
        assert_eq!(detector.detect(dir.path()).unwrap(), Some(Language::Go));
    }

    #[test]
    fn test_detect_glob_marker() {
        let (dir, registry) = detector_fixture();
        fs::write(dir.path().join("App.csproj"), "<Project/>").unwrap();

        let detector = LanguageDetector::new(&registry);
        assert_eq!(detector.detect(dir.path()).unwrap(), Some(Language::CSharp));
    }

    #[test]
    fn test_tsconfig_outranks_package_json() {
        let (dir, registry) = detector_fixture();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();

        let detector = LanguageDetector::new(&registry);
        assert_eq!(
            detector.detect(dir.path()).unwrap(),
            Some(Language::TypeScript)
        );
    }

    #[test]
    fn test_no_marker_is_not_detected() {
        let (dir, registry) = detector_fixture();
        let detector = LanguageDetector::new(&registry);
        assert_eq!(detector.detect(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let (dir, registry) = detector_fixture();
        let detector = LanguageDetector::new(&registry);
        assert!(detector.detect(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_strict_ambiguity_refuses_to_guess() {
        let (dir, registry) = detector_fixture();
        fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        fs::write(dir.path().join("pyproject.toml"), "[project]\n").unwrap();

        let strict = LanguageDetector::with_config(
            &registry,
            DetectorConfig {
                marker_order: None,
                strict_ambiguity: true,
            },
        );
        assert_eq!(strict.detect(dir.path()).unwrap(), None);

        // Default policy resolves by priority order instead
        let relaxed = LanguageDetector::new(&registry);
        assert_eq!(relaxed.detect(dir.path()).unwrap(), Some(Language::Rust));
    }

    #[test]
    fn test_custom_marker_order() {
        let (dir, registry) = detector_fixture();
        fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        fs::write(dir.path().join("pyproject.toml"), "[project]\n").unwrap();

        let detector = LanguageDetector::with_config(
            &registry,
            DetectorConfig {
                marker_order: Some(vec![Language::Python, Language::Rust]),
                strict_ambiguity: false,
            },
        );
        assert_eq!(detector.detect(dir.path()).unwrap(), Some(Language::Python));
    }

    #[test]
    fn test_every_profile_marker_detects_its_own_language() {
        let registry = LanguageRegistry::builtin().unwrap();
        let detector = LanguageDetector::new(&registry);

        for profile in registry.profiles() {
            for marker in profile.markers {
                let dir = TempDir::new().unwrap();
                let name = marker.strip_prefix('*').map_or(marker.to_string(), |s| {
                    format!("project{s}")
                });
                fs::write(dir.path().join(&name), "").unwrap();

                let detected = detector.detect(dir.path()).unwrap();
                // Marker priority may resolve shared signals, but a lone
                // marker must always detect its own language
                assert_eq!(
                    detected,
                    Some(profile.language),
                    "marker {marker} should detect {}",
                    profile.language
                );
            }
        }
    }
}
