// Parser tests against full captured tool transcripts rather than isolated
// summary lines

use polyver::language::Language;
use polyver::parser::{
    parse_coverage, parse_lint_issues, parse_syntax_diagnostics, parse_test_stats, Framework,
};

const PYTEST_RUN: &str = "\
============================= test session starts ==============================
platform linux -- Python 3.11.4, pytest-7.4.0, pluggy-1.2.0
rootdir: /work/app
collected 14 items

tests/test_auth.py ........                                              [ 57%]
tests/test_api.py ..F..s                                                 [100%]

=================================== FAILURES ===================================
_______________________________ test_api_timeout _______________________________
    def test_api_timeout():
>       assert fetch(timeout=0.1) is not None
E       AssertionError

=========================== short test summary info ============================
FAILED tests/test_api.py::test_api_timeout - AssertionError
=================== 1 failed, 12 passed, 1 skipped in 3.42s ====================
";

#[test]
fn test_pytest_full_transcript() {
    let stats = parse_test_stats(PYTEST_RUN, Language::Python, Framework::Pytest);
    assert_eq!(stats.passed, Some(12));
    assert_eq!(stats.failed, Some(1));
    assert_eq!(stats.skipped, Some(1));
    assert_eq!(stats.total, Some(14));
    assert_eq!(stats.duration.as_deref(), Some("3.42s"));
}

const CARGO_TEST_RUN: &str = "\
   Compiling app v0.1.0 (/work/app)
    Finished test [unoptimized + debuginfo] target(s) in 2.31s
     Running unittests src/lib.rs

running 9 tests
test config::tests::loads_defaults ... ok
test parser::tests::rejects_garbage ... ok
test result: ok. 9 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out; finished in 0.02s

     Running tests/integration.rs

running 4 tests
test result: ok. 4 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.41s

   Doc-tests app

running 2 tests
test result: ok. 2 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.09s
";

#[test]
fn test_cargo_test_sums_across_suites() {
    let stats = parse_test_stats(CARGO_TEST_RUN, Language::Rust, Framework::CargoTest);
    assert_eq!(stats.passed, Some(15));
    assert_eq!(stats.failed, Some(0));
    assert_eq!(stats.skipped, Some(1));
    assert_eq!(stats.total, Some(16));
    assert_eq!(stats.duration.as_deref(), Some("0.09s"));
}

const JEST_RUN: &str = "\
 PASS  src/auth.test.ts
 FAIL  src/api.test.ts
  ● api › retries on timeout

    expect(received).toBe(expected)

Test Suites: 1 failed, 1 passed, 2 total
Tests:       2 failed, 17 passed, 1 skipped, 20 total
Snapshots:   0 total
Time:        4.215 s
Ran all test suites.
";

#[test]
fn test_jest_summary_line() {
    let stats = parse_test_stats(JEST_RUN, Language::TypeScript, Framework::Jest);
    assert_eq!(stats.passed, Some(17));
    assert_eq!(stats.failed, Some(2));
    assert_eq!(stats.skipped, Some(1));
    assert_eq!(stats.total, Some(20));
}

const GO_TEST_RUN: &str = "\
=== RUN   TestLogin
--- PASS: TestLogin (0.01s)
=== RUN   TestLogout
--- PASS: TestLogout (0.00s)
=== RUN   TestRefresh
--- FAIL: TestRefresh (0.02s)
    auth_test.go:42: token not refreshed
=== RUN   TestLegacy
--- SKIP: TestLegacy (0.00s)
FAIL
ok  	example.com/app/auth	0.173s
";

#[test]
fn test_go_test_counts_result_lines() {
    let stats = parse_test_stats(GO_TEST_RUN, Language::Go, Framework::GoTest);
    assert_eq!(stats.passed, Some(2));
    assert_eq!(stats.failed, Some(1));
    assert_eq!(stats.skipped, Some(1));
    assert_eq!(stats.total, Some(4));
}

#[test]
fn test_generic_framework_falls_back_to_language_default() {
    let stats = parse_test_stats(CARGO_TEST_RUN, Language::Rust, Framework::Generic);
    assert_eq!(stats.passed, Some(15));
}

#[test]
fn test_unparseable_output_yields_empty_stats() {
    let stats = parse_test_stats(
        "Segmentation fault (core dumped)\n",
        Language::Python,
        Framework::Pytest,
    );
    assert!(stats.is_empty());
}

const COVERAGE_PY_RUN: &str = "\
Name                 Stmts   Miss  Cover
----------------------------------------
app/__init__.py          4      0   100%
app/auth.py            120     14    88%
app/api.py              86     20    77%
----------------------------------------
TOTAL                  210     34    84%
";

#[test]
fn test_coverage_python_total_row() {
    let report = parse_coverage(COVERAGE_PY_RUN, Language::Python);
    assert_eq!(report.percentage, Some(84.0));
}

#[test]
fn test_coverage_go_statements_line() {
    let raw = "ok  \texample.com/app\t1.2s\tcoverage: 71.4% of statements\n";
    let report = parse_coverage(raw, Language::Go);
    assert_eq!(report.percentage, Some(71.4));
}

#[test]
fn test_coverage_out_of_range_discarded() {
    let report = parse_coverage("progress: 250%\n", Language::Python);
    assert_eq!(report.percentage, None);
}

const ESLINT_RUN: &str = "\
/work/app/src/api.js
  12:5   error    'res' is assigned a value but never used  no-unused-vars
  40:13  warning  Unexpected console statement              no-console

/work/app/src/auth.js
  7:1    error    Parsing error: Unexpected token

✖ 3 problems (2 errors, 1 warning)
";

#[test]
fn test_eslint_problem_count() {
    let report = parse_lint_issues(ESLINT_RUN, Language::JavaScript);
    assert_eq!(report.issue_count, Some(3));
}

#[test]
fn test_clean_lint_output_is_zero_issues() {
    let report = parse_lint_issues("", Language::Rust);
    assert_eq!(report.issue_count, Some(0));
}

const PYTHON_SYNTAX_ERROR: &str = r#"  File "/work/app/broken.py", line 3
    def handler(
               ^
SyntaxError: '(' was never closed
"#;

#[test]
fn test_python_syntax_diagnostics() {
    let diagnostics = parse_syntax_diagnostics(PYTHON_SYNTAX_ERROR, Language::Python);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].line, Some(3));
    assert!(diagnostics[0].message.contains("never closed"));
}

const GCC_STYLE_ERRORS: &str = "\
main.c:14:9: error: expected ';' before 'return'
main.c:20:1: warning: control reaches end of non-void function
";

#[test]
fn test_compiler_style_diagnostics() {
    let diagnostics = parse_syntax_diagnostics(GCC_STYLE_ERRORS, Language::C);
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].line, Some(14));
}
