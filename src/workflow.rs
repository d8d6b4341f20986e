// Deployment workflow for polyver
//
// Ordered step pipeline from a bare directory to a pushed, tagged
// repository. Every step outcome is appended to a serializable ledger so an
// interrupted run can resume from the first step that has not succeeded.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{PolyverError, Result, WorkflowError};
use crate::git::{
    self, CommitOptions, CommitOutcome, GitPushOptions, InitOptions, PushCredentials,
    RefPushStatus, RemoteOutcome, RepositoryManager, TagOptions, TagOutcome,
};
use crate::language::Language;
use crate::logging::utils::{log_step_outcome, workflow_step_span};
use crate::remote::{CreateRepoOptions, CreateRepoOutcome, RemoteHost, RemoteRepository};

/// The pipeline steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Init,
    Gitignore,
    Commit,
    CreateRemote,
    AddRemote,
    Push,
    Tag,
    Verify,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 8] = [
        WorkflowStep::Init,
        WorkflowStep::Gitignore,
        WorkflowStep::Commit,
        WorkflowStep::CreateRemote,
        WorkflowStep::AddRemote,
        WorkflowStep::Push,
        WorkflowStep::Tag,
        WorkflowStep::Verify,
    ];
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowStep::Init => "init",
            WorkflowStep::Gitignore => "gitignore",
            WorkflowStep::Commit => "commit",
            WorkflowStep::CreateRemote => "create_remote",
            WorkflowStep::AddRemote => "add_remote",
            WorkflowStep::Push => "push",
            WorkflowStep::Tag => "tag",
            WorkflowStep::Verify => "verify",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Skipped,
    Failed,
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepOutcome::Success => "success",
            StepOutcome::Skipped => "skipped",
            StepOutcome::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// One ledger entry. Records are never rewritten; a retried step appends a
/// new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: WorkflowStep,
    pub outcome: StepOutcome,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only ledger of step outcomes, serializable for persistence
/// between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub records: Vec<StepRecord>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: WorkflowStep, outcome: StepOutcome, detail: Option<String>) {
        log_step_outcome(&step.to_string(), &outcome.to_string(), detail.as_deref());
        self.records.push(StepRecord {
            step,
            outcome,
            detail,
            timestamp: Utc::now(),
        });
    }

    /// Whether the step's most recent attempt succeeded. Skipped and failed
    /// attempts are re-run on resume.
    pub fn is_complete(&self, step: WorkflowStep) -> bool {
        self.records
            .iter()
            .rev()
            .find(|record| record.step == step)
            .map(|record| record.outcome == StepOutcome::Success)
            .unwrap_or(false)
    }

    pub fn latest(&self, step: WorkflowStep) -> Option<&StepRecord> {
        self.records.iter().rev().find(|record| record.step == step)
    }

    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            PolyverError::Workflow(Box::new(WorkflowError::StepFailed {
                step: "state".to_string(),
                message: format!("could not serialize workflow state: {e}"),
            }))
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            PolyverError::Workflow(Box::new(WorkflowError::StepFailed {
                step: "state".to_string(),
                message: format!("could not parse workflow state: {e}"),
            }))
        })
    }
}

/// Everything a deployment run needs up front. The token stays inside
/// `credentials` and is never written to the ledger.
#[derive(Debug, Clone)]
pub struct DeploymentOptions {
    pub project_dir: PathBuf,
    pub repo_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub commit_message: String,
    pub branch: String,
    pub tag: Option<String>,
    pub remote_name: String,
    pub language_hint: Option<Language>,
    pub credentials: Option<PushCredentials>,
}

impl DeploymentOptions {
    pub fn new(project_dir: impl Into<PathBuf>, repo_name: impl Into<String>) -> Self {
        Self {
            project_dir: project_dir.into(),
            repo_name: repo_name.into(),
            description: None,
            private: false,
            commit_message: "Initial commit".to_string(),
            branch: "main".to_string(),
            tag: None,
            remote_name: "origin".to_string(),
            language_hint: None,
            credentials: None,
        }
    }
}

/// Drives the init -> commit -> remote -> push -> tag -> verify pipeline.
/// The hosted service sits behind [`RemoteHost`] so runs are testable
/// against a local bare repository.
pub struct DeploymentWorkflow<'a> {
    git: RepositoryManager,
    host: &'a dyn RemoteHost,
    options: DeploymentOptions,
}

impl<'a> DeploymentWorkflow<'a> {
    pub fn new(host: &'a dyn RemoteHost, options: DeploymentOptions) -> Self {
        Self {
            git: RepositoryManager::new(),
            host,
            options,
        }
    }

    pub fn options(&self) -> &DeploymentOptions {
        &self.options
    }

    /// Execute the pipeline, resuming past any step whose latest ledger
    /// entry is a success. Halts at the first failure, which is recorded
    /// before the error is returned.
    #[instrument(skip(self, state), fields(repo = %self.options.repo_name))]
    pub async fn run(&self, state: &mut WorkflowState) -> Result<()> {
        // Carried between CreateRemote and AddRemote within one run;
        // re-resolved on resume
        let mut remote_repo: Option<RemoteRepository> = None;

        for step in WorkflowStep::ALL {
            if state.is_complete(step) {
                debug!(step = %step, "Step already succeeded, resuming past it");
                continue;
            }

            let span = workflow_step_span(&step.to_string());
            let _guard = span.enter();

            let result = match step {
                WorkflowStep::Init => self.step_init(),
                WorkflowStep::Gitignore => self.step_gitignore(),
                WorkflowStep::Commit => self.step_commit(),
                WorkflowStep::CreateRemote => {
                    self.step_create_remote(&mut remote_repo).await
                }
                WorkflowStep::AddRemote => self.step_add_remote(&mut remote_repo).await,
                WorkflowStep::Push => self.step_push(),
                WorkflowStep::Tag => self.step_tag(),
                WorkflowStep::Verify => self.step_verify(),
            };

            match result {
                Ok((outcome, detail)) => {
                    state.record(step, outcome, detail);
                }
                Err(e) => {
                    let message = e.to_string();
                    state.record(step, StepOutcome::Failed, Some(message.clone()));
                    return Err(PolyverError::Workflow(Box::new(
                        WorkflowError::StepFailed {
                            step: step.to_string(),
                            message,
                        },
                    )));
                }
            }
        }

        Ok(())
    }

    fn step_init(&self) -> Result<(StepOutcome, Option<String>)> {
        let result = self.git.init(
            &self.options.project_dir,
            InitOptions {
                branch: self.options.branch.clone(),
                // The dedicated gitignore step handles the template
                generate_gitignore: false,
                language_hint: self.options.language_hint,
            },
        )?;
        let detail = if result.reused {
            "reused existing repository"
        } else {
            "initialized repository"
        };
        Ok((StepOutcome::Success, Some(detail.to_string())))
    }

    fn step_gitignore(&self) -> Result<(StepOutcome, Option<String>)> {
        let written =
            git::write_gitignore(&self.options.project_dir, self.options.language_hint)?;
        if written {
            Ok((StepOutcome::Success, Some("generated .gitignore".to_string())))
        } else {
            Ok((
                StepOutcome::Success,
                Some("existing .gitignore kept".to_string()),
            ))
        }
    }

    fn step_commit(&self) -> Result<(StepOutcome, Option<String>)> {
        let outcome = self.git.commit(
            &self.options.project_dir,
            &self.options.commit_message,
            CommitOptions {
                add_all: true,
                files: Vec::new(),
            },
        )?;
        match outcome {
            CommitOutcome::Committed(info) => {
                let short = info.hash.chars().take(8).collect::<String>();
                Ok((StepOutcome::Success, Some(format!("committed {short}"))))
            }
            CommitOutcome::NoChanges => Ok((
                StepOutcome::Success,
                Some("working tree clean, nothing to commit".to_string()),
            )),
        }
    }

    async fn step_create_remote(
        &self,
        remote_repo: &mut Option<RemoteRepository>,
    ) -> Result<(StepOutcome, Option<String>)> {
        let outcome = self
            .host
            .create_repository(
                &self.options.repo_name,
                &CreateRepoOptions {
                    description: self.options.description.clone(),
                    private: self.options.private,
                    ..CreateRepoOptions::default()
                },
            )
            .await?;

        let detail = match &outcome {
            CreateRepoOutcome::Created(repo) => format!("created {}", repo.html_url),
            CreateRepoOutcome::AlreadyExists(repo) => {
                format!("already exists at {}", repo.html_url)
            }
        };
        *remote_repo = Some(outcome.repository().clone());
        Ok((StepOutcome::Success, Some(detail)))
    }

    async fn step_add_remote(
        &self,
        remote_repo: &mut Option<RemoteRepository>,
    ) -> Result<(StepOutcome, Option<String>)> {
        // On resume past CreateRemote the record is gone; create is
        // idempotent and returns the existing repository
        if remote_repo.is_none() {
            let outcome = self
                .host
                .create_repository(
                    &self.options.repo_name,
                    &CreateRepoOptions {
                        description: self.options.description.clone(),
                        private: self.options.private,
                        ..CreateRepoOptions::default()
                    },
                )
                .await?;
            *remote_repo = Some(outcome.repository().clone());
        }
        let repo = remote_repo
            .as_ref()
            .expect("remote repository resolved above");

        let outcome = self.git.add_remote(
            &self.options.project_dir,
            &self.options.remote_name,
            &repo.clone_url,
        )?;
        let detail = match outcome {
            RemoteOutcome::Added => format!("added remote '{}'", self.options.remote_name),
            RemoteOutcome::AlreadyExists => {
                format!("remote '{}' already configured", self.options.remote_name)
            }
        };
        Ok((StepOutcome::Success, Some(detail)))
    }

    fn step_push(&self) -> Result<(StepOutcome, Option<String>)> {
        let outcome = self.git.push(
            &self.options.project_dir,
            &self.options.remote_name,
            &self.options.branch,
            GitPushOptions {
                force: false,
                set_upstream: true,
                credentials: self.options.credentials.clone(),
            },
        )?;

        if outcome.all_ok() {
            let up_to_date = outcome
                .refs
                .iter()
                .all(|(_, status)| *status == RefPushStatus::UpToDate);
            let detail = if up_to_date {
                "already up to date".to_string()
            } else {
                format!("pushed {}", self.options.branch)
            };
            return Ok((StepOutcome::Success, Some(detail)));
        }

        let reason = outcome
            .refs
            .iter()
            .find_map(|(name, status)| match status {
                RefPushStatus::Rejected { reason } => {
                    Some(format!("{name} rejected: {reason}"))
                }
                RefPushStatus::Error { message } => Some(format!("{name}: {message}")),
                _ => None,
            })
            .unwrap_or_else(|| "push did not complete".to_string());
        Err(PolyverError::Workflow(Box::new(WorkflowError::StepFailed {
            step: WorkflowStep::Push.to_string(),
            message: reason,
        })))
    }

    fn step_tag(&self) -> Result<(StepOutcome, Option<String>)> {
        let Some(tag_name) = &self.options.tag else {
            return Ok((StepOutcome::Skipped, Some("no tag requested".to_string())));
        };

        let outcome = self.git.tag(
            &self.options.project_dir,
            tag_name,
            TagOptions {
                message: Some(format!("Release {tag_name}")),
                push: true,
                remote: self.options.remote_name.clone(),
                credentials: self.options.credentials.clone(),
            },
        )?;
        let detail = match outcome {
            TagOutcome::Created { name, pushed, .. } => match pushed {
                Some(RefPushStatus::Success) | Some(RefPushStatus::UpToDate) => {
                    format!("tagged and pushed {name}")
                }
                Some(status) => format!("tagged {name}, push status {status:?}"),
                None => format!("tagged {name}"),
            },
            TagOutcome::AlreadyExists => format!("tag {tag_name} already exists"),
        };
        Ok((StepOutcome::Success, Some(detail)))
    }

    fn step_verify(&self) -> Result<(StepOutcome, Option<String>)> {
        let status = self.git.status(&self.options.project_dir)?;

        if status.dirty {
            return Err(PolyverError::Workflow(Box::new(WorkflowError::StepFailed {
                step: WorkflowStep::Verify.to_string(),
                message: "working tree is dirty after deployment".to_string(),
            })));
        }
        let remote_present = status
            .remotes
            .iter()
            .any(|(name, _)| name == &self.options.remote_name);
        if !remote_present {
            return Err(PolyverError::Workflow(Box::new(WorkflowError::StepFailed {
                step: WorkflowStep::Verify.to_string(),
                message: format!("remote '{}' is not configured", self.options.remote_name),
            })));
        }

        let detail = status
            .last_commit
            .map(|commit| format!("clean at {}", &commit.hash[..8.min(commit.hash.len())]))
            .unwrap_or_else(|| "clean".to_string());
        Ok((StepOutcome::Success, Some(detail)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(WorkflowStep::ALL.first(), Some(&WorkflowStep::Init));
        assert_eq!(WorkflowStep::ALL.last(), Some(&WorkflowStep::Verify));
        let push_at = WorkflowStep::ALL
            .iter()
            .position(|s| *s == WorkflowStep::Push)
            .unwrap();
        let add_remote_at = WorkflowStep::ALL
            .iter()
            .position(|s| *s == WorkflowStep::AddRemote)
            .unwrap();
        assert!(add_remote_at < push_at);
    }

    #[test]
    fn test_state_is_complete_uses_latest_record() {
        let mut state = WorkflowState::new();
        assert!(!state.is_complete(WorkflowStep::Commit));

        state.record(WorkflowStep::Commit, StepOutcome::Failed, None);
        assert!(!state.is_complete(WorkflowStep::Commit));

        state.record(WorkflowStep::Commit, StepOutcome::Success, None);
        assert!(state.is_complete(WorkflowStep::Commit));

        // Skipped does not count as complete; the step is retried on resume
        state.record(WorkflowStep::Tag, StepOutcome::Skipped, None);
        assert!(!state.is_complete(WorkflowStep::Tag));
    }

    #[test]
    fn test_state_serde_round_trip() {
        let mut state = WorkflowState::new();
        state.record(
            WorkflowStep::Init,
            StepOutcome::Success,
            Some("initialized repository".to_string()),
        );
        state.record(WorkflowStep::Tag, StepOutcome::Skipped, None);

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("create_remote") || json.contains("init"));
        let restored: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_state_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = WorkflowState::new();
        state.record(WorkflowStep::Init, StepOutcome::Success, None);
        state.save(&path).unwrap();

        let restored = WorkflowState::load(&path).unwrap();
        assert_eq!(restored, state);
        assert!(restored.is_complete(WorkflowStep::Init));
    }

    #[test]
    fn test_deployment_options_defaults() {
        let options = DeploymentOptions::new("/tmp/project", "demo");
        assert_eq!(options.branch, "main");
        assert_eq!(options.remote_name, "origin");
        assert!(options.tag.is_none());
        assert!(!options.private);
    }
}
