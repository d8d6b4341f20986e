//! polyver: polyglot verification and repository lifecycle engine
//!
//! Detects the language of a file or project, dispatches verification
//! operations (run, test, format, lint, build, coverage) to the right
//! ecosystem tooling, parses tool output into structured statistics, and
//! drives the git lifecycle from `init` through commit, remote creation,
//! push and tag with a resumable deployment workflow.
//!
//! Missing tools, failing tests and pre-existing remotes are reported as
//! outcome data; errors are reserved for conditions the caller cannot act
//! on, such as an unreadable repository or a rejected credential.

pub mod detect;
pub mod error;
pub mod git;
pub mod language;
pub mod logging;
pub mod parser;
pub mod process;
pub mod remote;
pub mod verify;
pub mod workflow;

pub use detect::{DetectorConfig, LanguageDetector};
pub use error::{
    ConfigError, GitError, PolyverError, ProcessError, RemoteError, Result, WorkflowError,
};
pub use git::{
    CommitInfo, CommitOptions, CommitOutcome, GitPushOptions, InitOptions, PushCredentials,
    PushOutcome, RefPushStatus, RemoteOutcome, RepoInitResult, RepositoryManager,
    RepositoryState, TagOptions, TagOutcome,
};
pub use language::{CommandTemplate, Language, LanguageRegistry, Operation, ToolProfile};
pub use parser::{
    parse_coverage, parse_lint_issues, parse_syntax_diagnostics, parse_test_stats,
    CoverageReport, Diagnostic, Framework, LintReport, TestStatistics,
};
pub use process::{Command, CommandRunner, ExecutionResult};
pub use remote::{
    CreateRepoOptions, CreateRepoOutcome, GitHubClient, HostConfig, RemoteHost, RemoteRepository,
};
pub use verify::{
    BuildOptions, CoverageOptions, CoverageOutcome, FormatOptions, InstallOptions, LintOptions,
    LintOutcome, RunOptions, SyntaxReport, TestOptions, TestOutcome, UnsupportedReason,
    Verification, VerificationService,
};
pub use workflow::{
    DeploymentOptions, DeploymentWorkflow, StepOutcome, StepRecord, WorkflowState, WorkflowStep,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_metadata() {
        assert_eq!(NAME, "polyver");
        assert!(!VERSION.is_empty());
        assert!(!DESCRIPTION.is_empty());
    }

    #[test]
    fn test_core_types_reachable_from_root() {
        let registry = LanguageRegistry::builtin().unwrap();
        assert!(registry.profile(Language::Rust).is_some());
        let _ = RepositoryManager::new();
        let _ = CommandRunner::new();
    }
}
