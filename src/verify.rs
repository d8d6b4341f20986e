// Verification facade for polyver
//
// Each operation follows the same shape: resolve the tool profile through
// detection (or an explicit override), look up the operation's command
// template, execute through the runner, then hand the captured output to the
// parser. Capability gaps come back as Unsupported, never as errors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, Instrument};

use crate::detect::{DetectorConfig, LanguageDetector};
use crate::error::Result;
use crate::language::{Language, LanguageRegistry, Operation};
use crate::logging::utils::verification_span;
use crate::parser::{
    parse_coverage, parse_lint_issues, parse_syntax_diagnostics, parse_test_stats,
    CoverageReport, Diagnostic, Framework, LintReport, TestStatistics,
};
use crate::process::{Command, CommandRunner, ExecutionResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const TEST_TIMEOUT: Duration = Duration::from_secs(300);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Why an operation could not be attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedReason {
    /// No language could be detected for the target
    LanguageNotDetected,
    /// The language defines no command for this operation
    NoTemplate,
    /// The command's executable is not installed
    ToolMissing,
}

/// Outcome of a verification call: either the operation ran, or it was a
/// capability gap. Both are success-adjacent; neither is an error.
#[derive(Debug)]
pub enum Verification<T> {
    Completed(T),
    Unsupported {
        language: Option<Language>,
        operation: Operation,
        reason: UnsupportedReason,
    },
}

impl<T> Verification<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Verification::Completed(value) => Some(value),
            Verification::Unsupported { .. } => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Verification::Unsupported { .. })
    }
}

/// Test run outcome
#[derive(Debug)]
pub struct TestOutcome {
    pub result: ExecutionResult,
    pub stats: Option<TestStatistics>,
    pub framework: Framework,
}

/// Coverage run outcome
#[derive(Debug)]
pub struct CoverageOutcome {
    pub result: ExecutionResult,
    pub report: CoverageReport,
    /// False whenever the percentage could not be parsed; never assume passing
    pub meets_threshold: bool,
}

/// Lint run outcome
#[derive(Debug)]
pub struct LintOutcome {
    pub result: ExecutionResult,
    pub report: LintReport,
    pub passed: bool,
}

/// Syntax validation outcome
#[derive(Debug)]
pub struct SyntaxReport {
    pub valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub language: Option<Language>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    pub language: Option<Language>,
    pub framework: Option<Framework>,
    /// Test name filter, mapped onto the framework's own filter flag
    pub pattern: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct CoverageOptions {
    pub language: Option<Language>,
    /// Required minimum percentage
    pub threshold: f64,
    pub timeout: Option<Duration>,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        Self {
            language: None,
            threshold: 80.0,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub language: Option<Language>,
    /// Report what would change without rewriting files
    pub check_only: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    pub language: Option<Language>,
    /// Any finding fails the outcome, even when the tool exits zero
    pub strict: bool,
    /// Apply automatic fixes where the tool supports them
    pub fix: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub language: Option<Language>,
    pub release: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub language: Option<Language>,
    pub timeout: Option<Duration>,
}

/// Public facade composing detection, the profile table, the runner, and
/// the output parser
pub struct VerificationService {
    registry: LanguageRegistry,
    runner: CommandRunner,
    detector_config: DetectorConfig,
}

impl VerificationService {
    pub fn new() -> Result<Self> {
        Ok(Self {
            registry: LanguageRegistry::builtin()?,
            runner: CommandRunner::new(),
            detector_config: DetectorConfig::default(),
        })
    }

    pub fn with_detector_config(mut self, config: DetectorConfig) -> Self {
        self.detector_config = config;
        self
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    fn resolve_language(
        &self,
        target: &Path,
        explicit: Option<Language>,
    ) -> Result<Option<Language>> {
        if explicit.is_some() {
            return Ok(explicit);
        }
        let detector = LanguageDetector::with_config(&self.registry, self.detector_config.clone());
        detector.detect(target)
    }

    /// Resolve profile + template and execute. The common path for every
    /// operation.
    async fn dispatch(
        &self,
        target: &Path,
        working_dir: &Path,
        explicit: Option<Language>,
        operation: Operation,
        extra_args: Vec<String>,
        timeout: Duration,
    ) -> Result<Verification<(Language, ExecutionResult)>> {
        let Some(language) = self.resolve_language(target, explicit)? else {
            debug!(target = %target.display(), operation = %operation, "Language not detected");
            return Ok(Verification::Unsupported {
                language: None,
                operation,
                reason: UnsupportedReason::LanguageNotDetected,
            });
        };

        let argv = self
            .registry
            .profile(language)
            .and_then(|profile| profile.command(operation, target));
        let Some(mut argv) = argv else {
            debug!(language = %language, operation = %operation, "Operation undefined for language");
            return Ok(Verification::Unsupported {
                language: Some(language),
                operation,
                reason: UnsupportedReason::NoTemplate,
            });
        };
        argv.extend(extra_args);

        let command = Command::from_argv(argv)
            .expect("profile templates always produce a program")
            .with_working_dir(working_dir)
            .with_timeout(timeout);

        let result = self
            .runner
            .run_async(command)
            .instrument(verification_span(
                &operation.to_string(),
                &language.to_string(),
            ))
            .await?;
        if result.tool_missing {
            info!(language = %language, operation = %operation, "Tool not installed, reporting capability gap");
            return Ok(Verification::Unsupported {
                language: Some(language),
                operation,
                reason: UnsupportedReason::ToolMissing,
            });
        }

        Ok(Verification::Completed((language, result)))
    }

    fn project_dir(target: &Path) -> PathBuf {
        if target.is_file() {
            target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            target.to_path_buf()
        }
    }

    /// Execute a program or script directly and return the raw result.
    pub async fn run(
        &self,
        target: &Path,
        opts: RunOptions,
    ) -> Result<Verification<ExecutionResult>> {
        let dir = Self::project_dir(target);
        let outcome = self
            .dispatch(
                target,
                &dir,
                opts.language,
                Operation::Run,
                Vec::new(),
                opts.timeout.unwrap_or(DEFAULT_TIMEOUT),
            )
            .await?;
        Ok(map_completed(outcome, |(_, result)| result))
    }

    /// Run the project's test suite and extract statistics.
    pub async fn run_tests(
        &self,
        dir: &Path,
        opts: TestOptions,
    ) -> Result<Verification<TestOutcome>> {
        let language = self.resolve_language(dir, opts.language)?;
        let framework = opts.framework.unwrap_or_else(|| {
            language.map_or(Framework::Generic, |lang| detect_framework(dir, lang))
        });

        let extra_args = opts
            .pattern
            .as_deref()
            .map(|pattern| pattern_args(framework, pattern))
            .unwrap_or_default();

        let outcome = self
            .dispatch(
                dir,
                dir,
                language,
                Operation::Test,
                extra_args,
                opts.timeout.unwrap_or(TEST_TIMEOUT),
            )
            .await?;

        Ok(map_completed(outcome, |(language, result)| {
            let combined = combined_output(&result);
            let stats = parse_test_stats(&combined, language, framework);
            TestOutcome {
                result,
                stats: (!stats.is_empty()).then_some(stats),
                framework,
            }
        }))
    }

    /// Run coverage and compare the parsed percentage against a threshold.
    pub async fn run_coverage(
        &self,
        dir: &Path,
        opts: CoverageOptions,
    ) -> Result<Verification<CoverageOutcome>> {
        let outcome = self
            .dispatch(
                dir,
                dir,
                opts.language,
                Operation::Coverage,
                Vec::new(),
                opts.timeout.unwrap_or(TEST_TIMEOUT),
            )
            .await?;

        Ok(map_completed(outcome, |(language, result)| {
            let combined = combined_output(&result);
            let mut report = parse_coverage(&combined, language);
            report.artifacts = coverage_artifacts(dir);
            let meets_threshold = meets_threshold(report.percentage, opts.threshold);
            CoverageOutcome {
                result,
                report,
                meets_threshold,
            }
        }))
    }

    /// Format the project, or check formatting without rewriting.
    pub async fn format(
        &self,
        dir: &Path,
        opts: FormatOptions,
    ) -> Result<Verification<ExecutionResult>> {
        let operation = if opts.check_only {
            Operation::FormatCheck
        } else {
            Operation::Format
        };
        let outcome = self
            .dispatch(
                dir,
                dir,
                opts.language,
                operation,
                Vec::new(),
                opts.timeout.unwrap_or(DEFAULT_TIMEOUT),
            )
            .await?;
        Ok(map_completed(outcome, |(_, result)| result))
    }

    /// Lint the project and count findings.
    pub async fn lint(&self, dir: &Path, opts: LintOptions) -> Result<Verification<LintOutcome>> {
        let operation = if opts.fix {
            Operation::LintFix
        } else {
            Operation::Lint
        };
        let outcome = self
            .dispatch(
                dir,
                dir,
                opts.language,
                operation,
                Vec::new(),
                opts.timeout.unwrap_or(DEFAULT_TIMEOUT),
            )
            .await?;

        Ok(map_completed(outcome, |(language, result)| {
            let combined = combined_output(&result);
            let report = parse_lint_issues(&combined, language);
            let passed = if opts.strict {
                result.success() && report.issue_count == Some(0)
            } else {
                result.success()
            };
            LintOutcome {
                result,
                report,
                passed,
            }
        }))
    }

    /// Validate a single file's syntax without executing it (where the
    /// ecosystem offers a parse-only mode; otherwise this degrades to the
    /// language's own check step).
    pub async fn validate_syntax(&self, file: &Path) -> Result<Verification<SyntaxReport>> {
        let dir = Self::project_dir(file);
        let outcome = self
            .dispatch(
                file,
                &dir,
                None,
                Operation::SyntaxCheck,
                Vec::new(),
                DEFAULT_TIMEOUT,
            )
            .await?;

        Ok(map_completed(outcome, |(language, result)| {
            let combined = combined_output(&result);
            SyntaxReport {
                valid: result.success(),
                diagnostics: parse_syntax_diagnostics(&combined, language),
            }
        }))
    }

    /// Build the project. `Unsupported` for pure script languages.
    pub async fn build(
        &self,
        dir: &Path,
        opts: BuildOptions,
    ) -> Result<Verification<ExecutionResult>> {
        let extra_args = if opts.release {
            release_args(self.resolve_language(dir, opts.language)?)
        } else {
            Vec::new()
        };
        let outcome = self
            .dispatch(
                dir,
                dir,
                opts.language,
                Operation::Build,
                extra_args,
                opts.timeout.unwrap_or(TEST_TIMEOUT),
            )
            .await?;
        Ok(map_completed(outcome, |(_, result)| result))
    }

    /// Install the project's dependencies through its package manager.
    pub async fn install_dependencies(
        &self,
        dir: &Path,
        opts: InstallOptions,
    ) -> Result<Verification<ExecutionResult>> {
        let outcome = self
            .dispatch(
                dir,
                dir,
                opts.language,
                Operation::InstallDeps,
                Vec::new(),
                opts.timeout.unwrap_or(INSTALL_TIMEOUT),
            )
            .await?;
        Ok(map_completed(outcome, |(_, result)| result))
    }
}

fn map_completed<T, U>(
    outcome: Verification<T>,
    f: impl FnOnce(T) -> U,
) -> Verification<U> {
    match outcome {
        Verification::Completed(value) => Verification::Completed(f(value)),
        Verification::Unsupported {
            language,
            operation,
            reason,
        } => Verification::Unsupported {
            language,
            operation,
            reason,
        },
    }
}

fn combined_output(result: &ExecutionResult) -> String {
    let mut combined = result.stdout.clone();
    if !result.stderr.is_empty() {
        combined.push('\n');
        combined.push_str(&result.stderr);
    }
    combined
}

/// Detect the test framework in use from framework-specific config files,
/// falling back to the ecosystem's convention.
pub fn detect_framework(dir: &Path, language: Language) -> Framework {
    match language {
        Language::Python => {
            let pytest_config = dir.join("pytest.ini").is_file()
                || dir.join("conftest.py").is_file()
                || file_contains(&dir.join("pyproject.toml"), "[tool.pytest")
                || file_contains(&dir.join("setup.cfg"), "[tool:pytest]");
            if pytest_config || has_convention_tests(dir) {
                Framework::Pytest
            } else {
                Framework::Unittest
            }
        }
        Language::JavaScript | Language::TypeScript => {
            let jest = ["jest.config.js", "jest.config.ts", "jest.config.mjs"]
                .iter()
                .any(|name| dir.join(name).is_file())
                || file_contains(&dir.join("package.json"), "\"jest\"");
            if jest {
                Framework::Jest
            } else if dir.join(".mocharc.yml").is_file()
                || dir.join(".mocharc.json").is_file()
                || file_contains(&dir.join("package.json"), "\"mocha\"")
            {
                Framework::Mocha
            } else {
                // Package-manager-level "test" script
                Framework::Generic
            }
        }
        other => Framework::default_for(other),
    }
}

fn has_convention_tests(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let name = entry.file_name().to_string_lossy().to_string();
        name == "tests"
            || (name.starts_with("test_") && name.ends_with(".py"))
            || name.ends_with("_test.py")
    })
}

fn file_contains(path: &Path, needle: &str) -> bool {
    std::fs::read_to_string(path)
        .map(|content| content.contains(needle))
        .unwrap_or(false)
}

/// Map a test-name filter onto the framework's own flag
fn pattern_args(framework: Framework, pattern: &str) -> Vec<String> {
    match framework {
        Framework::Pytest => vec!["-k".into(), pattern.into()],
        Framework::Unittest => vec!["-k".into(), pattern.into()],
        // npm forwards everything after "--" to the underlying script
        Framework::Jest => vec!["--".into(), "-t".into(), pattern.into()],
        Framework::Mocha => vec!["--".into(), "--grep".into(), pattern.into()],
        Framework::CargoTest => vec![pattern.into()],
        Framework::GoTest => vec!["-run".into(), pattern.into()],
        Framework::RSpec => vec!["-e".into(), pattern.into()],
        Framework::Generic => Vec::new(),
    }
}

/// An unparseable percentage never passes the threshold
fn meets_threshold(percentage: Option<f64>, threshold: f64) -> bool {
    percentage.is_some_and(|p| p >= threshold)
}

fn release_args(language: Option<Language>) -> Vec<String> {
    match language {
        Some(Language::Rust) => vec!["--release".into()],
        Some(Language::CSharp) => vec!["--configuration".into(), "Release".into()],
        _ => Vec::new(),
    }
}

/// Report artifacts the coverage tool may have written; paths are returned,
/// not parsed further.
fn coverage_artifacts(dir: &Path) -> Vec<PathBuf> {
    [
        "coverage",
        "htmlcov",
        ".coverage",
        "coverage.xml",
        "coverage.out",
        "lcov.info",
        "tarpaulin-report.html",
    ]
    .iter()
    .map(|name| dir.join(name))
    .filter(|path| path.exists())
    .collect()
}
