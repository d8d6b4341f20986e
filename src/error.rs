// Error handling framework for polyver
//
// Recoverable conditions (missing tools, timeouts, non-zero exits, clean
// trees, duplicate tags/remotes) are modeled as outcome data on result types,
// not as errors. Only genuinely exceptional conditions travel through this
// hierarchy.
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PolyverError>;

/// Main error type for polyver
#[derive(Debug, Error)]
pub enum PolyverError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<ConfigError>),

    #[error("Git operation failed: {0}")]
    Git(#[from] Box<GitError>),

    #[error("Process execution failed: {0}")]
    Process(#[from] Box<ProcessError>),

    #[error("Remote host error: {0}")]
    Remote(#[from] Box<RemoteError>),

    #[error("Workflow error: {0}")]
    Workflow(#[from] Box<WorkflowError>),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors, reported at startup rather than at call time
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Extension '.{extension}' is claimed by both {first} and {second}")]
    DuplicateExtension {
        extension: String,
        first: String,
        second: String,
    },

    #[error("Missing credential: set {variable} in the environment")]
    MissingCredential { variable: String },

    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Git operation errors with context
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository: {path}")]
    NotARepository {
        path: PathBuf,
        suggestion: Option<String>,
    },

    #[error("Git {operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },

    #[error("Invalid git reference: {reference}")]
    InvalidReference {
        reference: String,
        suggestion: Option<String>,
    },

    #[error("Authentication required for {operation}")]
    AuthRequired { operation: String },
}

/// Process execution errors
///
/// Timeouts and missing executables are NOT errors; they are flags on
/// `ExecutionResult`. These variants cover failures to launch or observe
/// a process at all.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Process spawn failed: {command}")]
    SpawnFailed { command: String, error: String },

    #[error("Output capture failed for {command}: {message}")]
    OutputCaptureFailed { command: String, message: String },
}

/// Hosted git service errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Not authenticated: {message}")]
    Unauthenticated { message: String },

    #[error("Remote repository not found: {owner}/{name}")]
    NotFound { owner: String, name: String },

    #[error("Remote repository already exists: {name}")]
    AlreadyExists { name: String },

    #[error("Rate limited by remote host{}", reset_hint(.reset_at))]
    RateLimited { reset_at: Option<String> },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Remote API error ({status}): {message}")]
    Api { status: u16, message: String },
}

fn reset_hint(reset_at: &Option<String>) -> String {
    match reset_at {
        Some(at) => format!(" (resets at {at})"),
        None => String::new(),
    }
}

/// Deployment workflow errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow step {step} failed: {message}")]
    StepFailed { step: String, message: String },
}

// Conversion from git2::Error to GitError
impl From<git2::Error> for Box<GitError> {
    fn from(error: git2::Error) -> Self {
        Box::new(GitError::CommandFailed {
            operation: "git2".to_string(),
            stderr: error.message().to_string(),
        })
    }
}

// Direct conversion from git2::Error to PolyverError
impl From<git2::Error> for PolyverError {
    fn from(error: git2::Error) -> Self {
        PolyverError::Git(Box::<GitError>::from(error))
    }
}

// Conversion from reqwest::Error to RemoteError
impl From<reqwest::Error> for Box<RemoteError> {
    fn from(error: reqwest::Error) -> Self {
        Box::new(RemoteError::Network {
            message: error.to_string(),
        })
    }
}

impl From<reqwest::Error> for PolyverError {
    fn from(error: reqwest::Error) -> Self {
        PolyverError::Remote(Box::<RemoteError>::from(error))
    }
}
