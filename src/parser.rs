// Tool output parsing for polyver
//
// Pure, side-effect-free pattern extraction over the known-variable text
// formats a dozen ecosystems emit. Absence of a recognizable pattern yields
// None fields, never an error; truncated output (timeouts) degrades to
// partial statistics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Test frameworks whose summary lines we understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    Pytest,
    Unittest,
    Jest,
    Mocha,
    CargoTest,
    GoTest,
    RSpec,
    Generic,
}

impl Framework {
    /// The conventional framework for a language when nothing more specific
    /// was detected
    pub fn default_for(language: Language) -> Self {
        match language {
            Language::Python => Framework::Pytest,
            Language::JavaScript | Language::TypeScript => Framework::Jest,
            Language::Rust => Framework::CargoTest,
            Language::Go => Framework::GoTest,
            Language::Ruby => Framework::RSpec,
            _ => Framework::Generic,
        }
    }
}

/// Best-effort test run statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestStatistics {
    pub total: Option<u32>,
    pub passed: Option<u32>,
    pub failed: Option<u32>,
    pub skipped: Option<u32>,
    pub duration: Option<String>,
}

impl TestStatistics {
    /// True when no field could be extracted at all
    pub fn is_empty(&self) -> bool {
        self.total.is_none()
            && self.passed.is_none()
            && self.failed.is_none()
            && self.skipped.is_none()
            && self.duration.is_none()
    }

    fn fill_total(mut self) -> Self {
        if self.total.is_none() {
            let counted: u32 = [self.passed, self.failed, self.skipped]
                .iter()
                .flatten()
                .sum();
            if self.passed.is_some() || self.failed.is_some() || self.skipped.is_some() {
                self.total = Some(counted);
            }
        }
        self
    }
}

/// Parsed coverage information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Coverage percentage in 0..=100 when a total line was recognized
    pub percentage: Option<f64>,
    /// Report artifacts the tool left on disk (paths, not parsed further)
    pub artifacts: Vec<std::path::PathBuf>,
}

/// Parsed lint findings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LintReport {
    pub issue_count: Option<u32>,
    pub findings: String,
}

/// A single syntax diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: Option<u32>,
    pub message: String,
}

fn capture_u32(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

fn sum_captures(re: &Regex, text: &str) -> Option<u32> {
    let mut total = 0u32;
    let mut any = false;
    for caps in re.captures_iter(text) {
        if let Ok(n) = caps[1].parse::<u32>() {
            total += n;
            any = true;
        }
    }
    any.then_some(total)
}

/// Extract test statistics from raw tool output.
pub fn parse_test_stats(raw: &str, language: Language, framework: Framework) -> TestStatistics {
    let framework = match framework {
        Framework::Generic => Framework::default_for(language),
        other => other,
    };

    match framework {
        Framework::Pytest => parse_pytest(raw),
        Framework::Unittest => parse_unittest(raw),
        Framework::Jest => parse_jest(raw),
        Framework::Mocha => parse_mocha(raw),
        Framework::CargoTest => parse_cargo_test(raw),
        Framework::GoTest => parse_go_test(raw),
        Framework::RSpec => parse_rspec(raw),
        // Unknown ecosystem: try the two most common summary shapes
        Framework::Generic => {
            let stats = parse_pytest(raw);
            if stats.is_empty() {
                parse_jest(raw)
            } else {
                stats
            }
        }
    }
}

static PYTEST_PASSED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) passed").unwrap());
static PYTEST_FAILED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) failed").unwrap());
static PYTEST_SKIPPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) skipped").unwrap());
static PYTEST_DURATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"in ([0-9.]+s)").unwrap());

fn parse_pytest(raw: &str) -> TestStatistics {
    TestStatistics {
        passed: capture_u32(&PYTEST_PASSED, raw),
        failed: capture_u32(&PYTEST_FAILED, raw),
        skipped: capture_u32(&PYTEST_SKIPPED, raw),
        duration: PYTEST_DURATION
            .captures(raw)
            .map(|c| c[1].to_string()),
        total: None,
    }
    .fill_total()
}

static UNITTEST_RAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Ran (\d+) tests? in ([0-9.]+s)").unwrap());
static UNITTEST_FAILURES: Lazy<Regex> = Lazy::new(|| Regex::new(r"failures=(\d+)").unwrap());
static UNITTEST_ERRORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"errors=(\d+)").unwrap());
static UNITTEST_SKIPPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"skipped=(\d+)").unwrap());

fn parse_unittest(raw: &str) -> TestStatistics {
    let Some(caps) = UNITTEST_RAN.captures(raw) else {
        return TestStatistics::default();
    };
    let total: Option<u32> = caps[1].parse().ok();
    let duration = Some(caps[2].to_string());
    let failed = capture_u32(&UNITTEST_FAILURES, raw).unwrap_or(0)
        + capture_u32(&UNITTEST_ERRORS, raw).unwrap_or(0);
    let skipped = capture_u32(&UNITTEST_SKIPPED, raw);
    let passed = total.map(|t| t.saturating_sub(failed).saturating_sub(skipped.unwrap_or(0)));

    TestStatistics {
        total,
        passed,
        failed: Some(failed),
        skipped,
        duration,
    }
}

static JEST_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Tests:\s+(.+)$").unwrap());
static JEST_PASSED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) passed").unwrap());
static JEST_FAILED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) failed").unwrap());
static JEST_SKIPPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) skipped").unwrap());
static JEST_TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) total").unwrap());
static JEST_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Time:\s+([0-9.]+)\s*s").unwrap());

fn parse_jest(raw: &str) -> TestStatistics {
    let Some(line) = JEST_LINE.captures(raw).map(|c| c[1].to_string()) else {
        return TestStatistics::default();
    };
    TestStatistics {
        passed: capture_u32(&JEST_PASSED, &line),
        failed: capture_u32(&JEST_FAILED, &line),
        skipped: capture_u32(&JEST_SKIPPED, &line),
        total: capture_u32(&JEST_TOTAL, &line),
        duration: JEST_TIME.captures(raw).map(|c| format!("{}s", &c[1])),
    }
    .fill_total()
}

static MOCHA_PASSING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) passing \(([^)]+)\)").unwrap());
static MOCHA_FAILING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) failing").unwrap());
static MOCHA_PENDING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) pending").unwrap());

fn parse_mocha(raw: &str) -> TestStatistics {
    let caps = MOCHA_PASSING.captures(raw);
    TestStatistics {
        passed: caps.as_ref().and_then(|c| c[1].parse().ok()),
        failed: capture_u32(&MOCHA_FAILING, raw),
        skipped: capture_u32(&MOCHA_PENDING, raw),
        duration: caps.map(|c| c[2].to_string()),
        total: None,
    }
    .fill_total()
}

// Several result lines appear in one run (unit, integration, doc tests);
// counts are summed across them
static CARGO_PASSED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) passed").unwrap());
static CARGO_FAILED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) failed").unwrap());
static CARGO_IGNORED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) ignored").unwrap());
static CARGO_FINISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"finished in ([0-9.]+)s").unwrap());

fn parse_cargo_test(raw: &str) -> TestStatistics {
    TestStatistics {
        passed: sum_captures(&CARGO_PASSED, raw),
        failed: sum_captures(&CARGO_FAILED, raw),
        skipped: sum_captures(&CARGO_IGNORED, raw),
        duration: CARGO_FINISHED
            .captures_iter(raw)
            .last()
            .map(|c| format!("{}s", &c[1])),
        total: None,
    }
    .fill_total()
}

static GO_PASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*--- PASS:").unwrap());
static GO_FAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*--- FAIL:").unwrap());
static GO_SKIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*--- SKIP:").unwrap());
static GO_OK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^ok\s+\S+\s+([0-9.]+)s").unwrap());

fn parse_go_test(raw: &str) -> TestStatistics {
    let count = |re: &Regex| -> Option<u32> {
        let n = re.find_iter(raw).count() as u32;
        (n > 0).then_some(n)
    };
    TestStatistics {
        passed: count(&GO_PASS),
        failed: count(&GO_FAIL),
        skipped: count(&GO_SKIP),
        duration: GO_OK.captures(raw).map(|c| format!("{}s", &c[1])),
        total: None,
    }
    .fill_total()
}

static RSPEC_SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) examples?, (\d+) failures?(?:, (\d+) pending)?").unwrap());
static RSPEC_FINISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Finished in ([0-9.]+) seconds").unwrap());

fn parse_rspec(raw: &str) -> TestStatistics {
    let Some(caps) = RSPEC_SUMMARY.captures(raw) else {
        return TestStatistics::default();
    };
    let total: Option<u32> = caps[1].parse().ok();
    let failed: Option<u32> = caps[2].parse().ok();
    let skipped: Option<u32> = caps.get(3).and_then(|m| m.as_str().parse().ok());
    let passed = total.map(|t| {
        t.saturating_sub(failed.unwrap_or(0))
            .saturating_sub(skipped.unwrap_or(0))
    });
    TestStatistics {
        total,
        passed,
        failed,
        skipped,
        duration: RSPEC_FINISHED.captures(raw).map(|c| format!("{}s", &c[1])),
    }
}

static COVERAGE_PY_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^TOTAL(?:\s+\d+)+\s+(\d+(?:\.\d+)?)%").unwrap());
static COVERAGE_GO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"coverage: (\d+(?:\.\d+)?)% of statements").unwrap());
static COVERAGE_TARPAULIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)% coverage").unwrap());
static COVERAGE_ISTANBUL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^All files\s*\|\s*(\d+(?:\.\d+)?)").unwrap());
static COVERAGE_ANY_PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").unwrap());

/// Extract a coverage percentage from raw tool output.
///
/// The language selects the primary pattern; a bare trailing percentage is
/// the last-resort fallback. Values outside 0..=100 are discarded.
pub fn parse_coverage(raw: &str, language: Language) -> CoverageReport {
    let primary = match language {
        Language::Python => COVERAGE_PY_TOTAL.captures(raw),
        Language::Go => COVERAGE_GO.captures(raw),
        Language::Rust => COVERAGE_TARPAULIN.captures(raw),
        Language::JavaScript | Language::TypeScript => COVERAGE_ISTANBUL.captures(raw),
        _ => None,
    };

    let percentage = primary
        .or_else(|| COVERAGE_ANY_PERCENT.captures_iter(raw).last())
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|p| (0.0..=100.0).contains(p));

    CoverageReport {
        percentage,
        artifacts: Vec::new(),
    }
}

static LINT_FILE_LINE_COL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[^\s:][^:\n]*:\d+:\d+:?\s").unwrap());
static LINT_ESLINT_SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) problems?").unwrap());
static LINT_CLIPPY_GENERATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"generated (\d+) warnings?").unwrap());
static LINT_RUBOCOP_OFFENSES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) offenses?").unwrap());

/// Count lint findings from raw tool output.
pub fn parse_lint_issues(raw: &str, language: Language) -> LintReport {
    let summary = match language {
        Language::JavaScript | Language::TypeScript => {
            capture_u32(&LINT_ESLINT_SUMMARY, raw)
        }
        Language::Rust => sum_captures(&LINT_CLIPPY_GENERATED, raw),
        Language::Ruby => capture_u32(&LINT_RUBOCOP_OFFENSES, raw),
        _ => None,
    };

    let issue_count = summary.or_else(|| {
        let line_hits = LINT_FILE_LINE_COL.find_iter(raw).count() as u32;
        if line_hits > 0 {
            Some(line_hits)
        } else if raw.trim().is_empty() {
            Some(0)
        } else {
            None
        }
    });

    LintReport {
        issue_count,
        findings: raw.trim().to_string(),
    }
}

static DIAG_PY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"File "[^"]+", line (\d+)"#).unwrap());
static DIAG_PY_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(\w*Error: .+)$").unwrap());
static DIAG_COMPILER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[^\s:][^:\n]*:(\d+)(?::\d+)?:\s*(?:fatal )?(?:error|warning)[:,]?\s*(.+)$")
        .unwrap()
});
static DIAG_PHP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)Parse error:\s*(.+?) in .+ on line (\d+)").unwrap());

/// Extract syntax diagnostics (line + message) from a syntax checker's output.
pub fn parse_syntax_diagnostics(raw: &str, language: Language) -> Vec<Diagnostic> {
    match language {
        Language::Python => {
            let line = DIAG_PY_LINE
                .captures(raw)
                .and_then(|c| c[1].parse().ok());
            DIAG_PY_MESSAGE
                .captures_iter(raw)
                .map(|c| Diagnostic {
                    line,
                    message: c[1].trim().to_string(),
                })
                .collect()
        }
        Language::Php => DIAG_PHP
            .captures_iter(raw)
            .map(|c| Diagnostic {
                line: c[2].parse().ok(),
                message: c[1].trim().to_string(),
            })
            .collect(),
        _ => DIAG_COMPILER
            .captures_iter(raw)
            .map(|c| Diagnostic {
                line: c[1].parse().ok(),
                message: c[2].trim().to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pytest_summary() {
        let stats = parse_test_stats(
            "5 passed, 2 failed in 1.23s",
            Language::Python,
            Framework::Pytest,
        );
        assert_eq!(stats.passed, Some(5));
        assert_eq!(stats.failed, Some(2));
        assert_eq!(stats.total, Some(7));
        assert_eq!(stats.duration.as_deref(), Some("1.23s"));
    }

    #[test]
    fn test_pytest_with_skips() {
        let raw = "===== 10 passed, 3 skipped, 1 failed in 0.45s =====";
        let stats = parse_test_stats(raw, Language::Python, Framework::Pytest);
        assert_eq!(stats.total, Some(14));
        assert_eq!(stats.skipped, Some(3));
    }

    #[test]
    fn test_unittest_summary() {
        let raw = "Ran 8 tests in 0.012s\n\nFAILED (failures=2, errors=1)";
        let stats = parse_test_stats(raw, Language::Python, Framework::Unittest);
        assert_eq!(stats.total, Some(8));
        assert_eq!(stats.failed, Some(3));
        assert_eq!(stats.passed, Some(5));
        assert_eq!(stats.duration.as_deref(), Some("0.012s"));
    }

    #[test]
    fn test_jest_summary() {
        let raw = "Tests:       1 failed, 2 skipped, 5 passed, 8 total\nTime:        2.5 s";
        let stats = parse_test_stats(raw, Language::JavaScript, Framework::Jest);
        assert_eq!(stats.passed, Some(5));
        assert_eq!(stats.failed, Some(1));
        assert_eq!(stats.skipped, Some(2));
        assert_eq!(stats.total, Some(8));
        assert_eq!(stats.duration.as_deref(), Some("2.5s"));
    }

    #[test]
    fn test_mocha_summary() {
        let raw = "  5 passing (42ms)\n  2 failing\n  1 pending";
        let stats = parse_test_stats(raw, Language::JavaScript, Framework::Mocha);
        assert_eq!(stats.passed, Some(5));
        assert_eq!(stats.failed, Some(2));
        assert_eq!(stats.skipped, Some(1));
        assert_eq!(stats.duration.as_deref(), Some("42ms"));
    }

    #[test]
    fn test_cargo_test_sums_result_lines() {
        let raw = "test result: ok. 5 passed; 0 failed; 1 ignored; finished in 0.05s\n\
                   test result: ok. 3 passed; 1 failed; 0 ignored; finished in 1.20s";
        let stats = parse_test_stats(raw, Language::Rust, Framework::CargoTest);
        assert_eq!(stats.passed, Some(8));
        assert_eq!(stats.failed, Some(1));
        assert_eq!(stats.skipped, Some(1));
        assert_eq!(stats.duration.as_deref(), Some("1.20s"));
    }

    #[test]
    fn test_go_test_verbose() {
        let raw = "--- PASS: TestAdd (0.00s)\n--- PASS: TestSub (0.00s)\n\
                   --- FAIL: TestDiv (0.01s)\nFAIL\nok  \texample.com/calc\t0.015s";
        let stats = parse_test_stats(raw, Language::Go, Framework::GoTest);
        assert_eq!(stats.passed, Some(2));
        assert_eq!(stats.failed, Some(1));
        assert_eq!(stats.duration.as_deref(), Some("0.015s"));
    }

    #[test]
    fn test_rspec_summary() {
        let raw = "Finished in 0.23 seconds\n8 examples, 2 failures, 1 pending";
        let stats = parse_test_stats(raw, Language::Ruby, Framework::RSpec);
        assert_eq!(stats.total, Some(8));
        assert_eq!(stats.failed, Some(2));
        assert_eq!(stats.skipped, Some(1));
        assert_eq!(stats.passed, Some(5));
    }

    #[test]
    fn test_generic_falls_back_by_language() {
        let stats = parse_test_stats(
            "3 passed in 0.10s",
            Language::Python,
            Framework::Generic,
        );
        assert_eq!(stats.passed, Some(3));
        assert_eq!(stats.total, Some(3));
    }

    #[test]
    fn test_unrecognized_output_yields_nulls() {
        let stats = parse_test_stats("segmentation fault", Language::Python, Framework::Pytest);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_truncated_output_yields_partial_stats() {
        // Timeout mid-run: only the passed count made it out
        let stats = parse_test_stats("5 passed", Language::Python, Framework::Pytest);
        assert_eq!(stats.passed, Some(5));
        assert_eq!(stats.failed, None);
        assert_eq!(stats.duration, None);
    }

    #[test]
    fn test_coverage_pytest_total_line() {
        let report = parse_coverage("TOTAL 1234 567 85%", Language::Python);
        assert_eq!(report.percentage, Some(85.0));
    }

    #[test]
    fn test_coverage_go() {
        let report = parse_coverage(
            "ok  \texample.com/calc\t0.01s\tcoverage: 72.5% of statements",
            Language::Go,
        );
        assert_eq!(report.percentage, Some(72.5));
    }

    #[test]
    fn test_coverage_tarpaulin() {
        let report = parse_coverage("|| 91.30% coverage, 42/46 lines covered", Language::Rust);
        assert_eq!(report.percentage, Some(91.30));
    }

    #[test]
    fn test_coverage_istanbul_table() {
        let raw = "----------|---------|\nAll files |   85.3  |";
        let report = parse_coverage(raw, Language::TypeScript);
        assert_eq!(report.percentage, Some(85.3));
    }

    #[test]
    fn test_coverage_unparseable_is_none() {
        let report = parse_coverage("no useful output here", Language::Python);
        assert_eq!(report.percentage, None);
    }

    #[test]
    fn test_coverage_out_of_range_discarded() {
        let report = parse_coverage("weird tool says 250%", Language::Java);
        assert_eq!(report.percentage, None);
    }

    #[test]
    fn test_lint_flake8_line_count() {
        let raw = "app.py:3:1: E302 expected 2 blank lines\napp.py:10:80: E501 line too long";
        let report = parse_lint_issues(raw, Language::Python);
        assert_eq!(report.issue_count, Some(2));
        assert!(report.findings.contains("E302"));
    }

    #[test]
    fn test_lint_eslint_summary() {
        let raw = "  3:1  error  Unexpected var\n\n\u{2716} 12 problems (10 errors, 2 warnings)";
        let report = parse_lint_issues(raw, Language::JavaScript);
        assert_eq!(report.issue_count, Some(12));
    }

    #[test]
    fn test_lint_clippy_summary() {
        let raw = "warning: unused variable `x`\nwarning: `calc` (lib) generated 3 warnings";
        let report = parse_lint_issues(raw, Language::Rust);
        assert_eq!(report.issue_count, Some(3));
    }

    #[test]
    fn test_lint_rubocop_summary() {
        let raw = "13 files inspected, 2 offenses detected";
        let report = parse_lint_issues(raw, Language::Ruby);
        assert_eq!(report.issue_count, Some(2));
    }

    #[test]
    fn test_lint_clean_output() {
        let report = parse_lint_issues("", Language::Python);
        assert_eq!(report.issue_count, Some(0));
    }

    #[test]
    fn test_lint_unrecognized_is_none() {
        let report = parse_lint_issues("tool exploded for unrelated reasons", Language::Java);
        assert_eq!(report.issue_count, None);
    }

    #[test]
    fn test_python_syntax_diagnostics() {
        let raw = "  File \"app.py\", line 3\n    def f(:\n          ^\nSyntaxError: invalid syntax";
        let diags = parse_syntax_diagnostics(raw, Language::Python);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, Some(3));
        assert!(diags[0].message.contains("invalid syntax"));
    }

    #[test]
    fn test_compiler_style_diagnostics() {
        let raw = "main.c:7:5: error: expected ';' before 'return'\nmain.c:9:1: warning: unused variable";
        let diags = parse_syntax_diagnostics(raw, Language::C);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].line, Some(7));
        assert!(diags[0].message.contains("expected ';'"));
    }

    #[test]
    fn test_php_parse_error_diagnostic() {
        let raw = "PHP Parse error:  syntax error, unexpected end of file in index.php on line 14";
        let diags = parse_syntax_diagnostics(raw, Language::Php);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, Some(14));
    }

    #[test]
    fn test_parsers_are_idempotent() {
        let raw = "5 passed, 2 failed in 1.23s";
        let first = parse_test_stats(raw, Language::Python, Framework::Pytest);
        let second = parse_test_stats(raw, Language::Python, Framework::Pytest);
        assert_eq!(first, second);
    }
}
