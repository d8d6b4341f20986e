// Local git lifecycle management for polyver
//
// Wraps a working directory's git metadata through git2: init, status,
// stage+commit, remotes, push, tag. State is recomputed on every call; the
// filesystem can change between calls, so nothing here is cached. "Nothing
// to do" conditions (clean tree, duplicate remote, existing tag) are
// distinguishable outcomes, never errors.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use git2::{
    Cred, ErrorCode, IndexAddOption, ObjectType, PushOptions as Git2PushOptions,
    RemoteCallbacks, Repository, RepositoryInitOptions, Signature, StatusOptions,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GitError, PolyverError, Result};
use crate::language::Language;
use crate::logging::utils::git_operation_span;

/// Options for repository initialization
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub branch: String,
    pub generate_gitignore: bool,
    /// Selects the gitignore template; callers that ran detection pass the
    /// result here so this module stays independent of language detection
    pub language_hint: Option<Language>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            generate_gitignore: true,
            language_hint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepoInitResult {
    /// True when the directory was already a repository and init was a no-op
    pub reused: bool,
    /// True when a .gitignore was written by this call
    pub gitignore_written: bool,
    pub branch: String,
}

/// Snapshot of the last commit on HEAD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Recomputed-on-demand repository state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryState {
    pub branch: Option<String>,
    pub upstream: Option<String>,
    pub dirty: bool,
    pub staged: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub untracked: Vec<PathBuf>,
    pub last_commit: Option<CommitInfo>,
    pub remotes: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub add_all: bool,
    /// Specific files to stage when `add_all` is false
    pub files: Vec<PathBuf>,
}

/// Commit result: a clean tree is success, not failure
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed(CommitInfo),
    NoChanges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Added,
    AlreadyExists,
}

/// Per-ref push status; a multi-ref push can partially succeed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RefPushStatus {
    Success,
    UpToDate,
    Rejected { reason: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub refs: Vec<(String, RefPushStatus)>,
}

impl PushOutcome {
    pub fn all_ok(&self) -> bool {
        self.refs
            .iter()
            .all(|(_, status)| matches!(status, RefPushStatus::Success | RefPushStatus::UpToDate))
    }
}

/// Token credentials for https pushes
#[derive(Debug, Clone)]
pub struct PushCredentials {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct GitPushOptions {
    pub force: bool,
    pub set_upstream: bool,
    pub credentials: Option<PushCredentials>,
}

#[derive(Debug, Clone)]
pub struct TagOptions {
    pub message: Option<String>,
    pub push: bool,
    pub remote: String,
    pub credentials: Option<PushCredentials>,
}

impl Default for TagOptions {
    fn default() -> Self {
        Self {
            message: None,
            push: false,
            remote: "origin".to_string(),
            credentials: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagOutcome {
    Created {
        name: String,
        annotated: bool,
        /// Push status when the tag was pushed; a pre-existing remote tag
        /// surfaces here as Rejected
        pushed: Option<RefPushStatus>,
    },
    AlreadyExists,
}

/// Manages the init -> commit -> remote -> push -> tag surface of a working
/// directory. Stateless; every method reopens the repository.
#[derive(Debug, Clone, Default)]
pub struct RepositoryManager;

impl RepositoryManager {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, dir: &Path) -> Result<Repository> {
        Repository::open(dir).map_err(|_| {
            PolyverError::Git(Box::new(GitError::NotARepository {
                path: dir.to_path_buf(),
                suggestion: Some("run init first to create a repository".to_string()),
            }))
        })
    }

    /// Initialize a repository. Idempotent: an existing repository is
    /// reported as `reused: true` and never re-initialized.
    pub fn init(&self, dir: &Path, opts: InitOptions) -> Result<RepoInitResult> {
        if !dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("project directory does not exist: {}", dir.display()),
            )
            .into());
        }

        let reused = Repository::open(dir).is_ok();
        if reused {
            debug!(dir = %dir.display(), "Repository already initialized, reusing");
        } else {
            let mut init_opts = RepositoryInitOptions::new();
            init_opts.initial_head(&format!("refs/heads/{}", opts.branch));
            Repository::init_opts(dir, &init_opts)?;
            info!(dir = %dir.display(), branch = %opts.branch, "Initialized repository");
        }

        let gitignore_written = if opts.generate_gitignore {
            write_gitignore(dir, opts.language_hint)?
        } else {
            false
        };

        Ok(RepoInitResult {
            reused,
            gitignore_written,
            branch: opts.branch,
        })
    }

    /// Recompute the repository's state. Never mutates, never caches.
    pub fn status(&self, dir: &Path) -> Result<RepositoryState> {
        let repo = self.open(dir)?;

        let mut status_opts = StatusOptions::new();
        status_opts
            .include_untracked(true)
            .recurse_untracked_dirs(true);
        let statuses = repo.statuses(Some(&mut status_opts))?;

        let mut staged = Vec::new();
        let mut modified = Vec::new();
        let mut untracked = Vec::new();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else { continue };
            let path = PathBuf::from(path);
            let flags = entry.status();
            if flags.is_wt_new() {
                untracked.push(path.clone());
            } else if flags.is_wt_modified() || flags.is_wt_deleted() || flags.is_wt_typechange() {
                modified.push(path.clone());
            }
            if flags.is_index_new()
                || flags.is_index_modified()
                || flags.is_index_deleted()
                || flags.is_index_renamed()
                || flags.is_index_typechange()
            {
                staged.push(path);
            }
        }
        let dirty = !staged.is_empty() || !modified.is_empty() || !untracked.is_empty();

        let branch = current_branch(&repo);
        let upstream = branch.as_deref().and_then(|name| {
            repo.find_branch(name, git2::BranchType::Local)
                .ok()
                .and_then(|b| b.upstream().ok())
                .and_then(|u| u.name().ok().flatten().map(str::to_string))
        });

        let last_commit = repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
            .map(|commit| commit_info(&commit));

        let mut remotes = Vec::new();
        for name in repo.remotes()?.iter().flatten() {
            if let Ok(remote) = repo.find_remote(name) {
                remotes.push((
                    name.to_string(),
                    remote.url().unwrap_or_default().to_string(),
                ));
            }
        }

        Ok(RepositoryState {
            branch,
            upstream,
            dirty,
            staged,
            modified,
            untracked,
            last_commit,
            remotes,
        })
    }

    /// Stage and commit. A clean tree returns `CommitOutcome::NoChanges`.
    pub fn commit(&self, dir: &Path, message: &str, opts: CommitOptions) -> Result<CommitOutcome> {
        let repo = self.open(dir)?;
        let mut index = repo.index()?;

        if opts.add_all {
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
            index.write()?;
        } else {
            for file in &opts.files {
                let relative = file.strip_prefix(dir).unwrap_or(file);
                index.add_path(relative).map_err(|e| {
                    PolyverError::Git(Box::new(GitError::CommandFailed {
                        operation: format!("add {}", relative.display()),
                        stderr: e.message().to_string(),
                    }))
                })?;
            }
            if !opts.files.is_empty() {
                index.write()?;
            }
        }

        let tree_id = index.write_tree()?;
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());

        // Nothing staged and nothing new in the tree
        if let Some(ref parent) = parent {
            if parent.tree_id() == tree_id {
                debug!(dir = %dir.display(), "Working tree clean, nothing to commit");
                return Ok(CommitOutcome::NoChanges);
            }
        } else if index.is_empty() {
            return Ok(CommitOutcome::NoChanges);
        }

        let tree = repo.find_tree(tree_id)?;
        let sig = signature(&repo)?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;

        let commit = repo.find_commit(oid)?;
        info!(dir = %dir.display(), hash = %oid, "Created commit");
        Ok(CommitOutcome::Committed(commit_info(&commit)))
    }

    /// Add a named remote. A duplicate name is a distinguishable outcome.
    pub fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<RemoteOutcome> {
        let repo = self.open(dir)?;
        let outcome = match repo.remote(name, url) {
            Ok(_) => Ok(RemoteOutcome::Added),
            Err(e) if e.code() == ErrorCode::Exists => {
                debug!(remote = %name, "Remote already exists");
                Ok(RemoteOutcome::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        };
        outcome
    }

    /// Push a branch. Each ref's outcome is reported individually because a
    /// multi-ref push can partially succeed.
    pub fn push(
        &self,
        dir: &Path,
        remote_name: &str,
        branch: &str,
        opts: GitPushOptions,
    ) -> Result<PushOutcome> {
        let span = git_operation_span("push", dir);
        let _guard = span.enter();
        let repo = self.open(dir)?;
        let refspec = format!(
            "{}refs/heads/{branch}:refs/heads/{branch}",
            if opts.force { "+" } else { "" }
        );
        let local_ref = format!("refs/heads/{branch}");

        let refs = push_refspecs(
            &repo,
            remote_name,
            &[refspec],
            &local_ref,
            opts.credentials.as_ref(),
        )?;

        let outcome = PushOutcome { refs };
        if opts.set_upstream && outcome.all_ok() {
            if let Ok(mut local) = repo.find_branch(branch, git2::BranchType::Local) {
                if let Err(e) = local.set_upstream(Some(&format!("{remote_name}/{branch}"))) {
                    warn!(branch = %branch, error = %e.message(), "Could not record upstream");
                }
            }
        }
        Ok(outcome)
    }

    /// Create a tag on HEAD. An existing local tag of the same name is
    /// `AlreadyExists`, never an error.
    pub fn tag(&self, dir: &Path, name: &str, opts: TagOptions) -> Result<TagOutcome> {
        let repo = self.open(dir)?;

        if repo
            .find_reference(&format!("refs/tags/{name}"))
            .is_ok()
        {
            debug!(tag = %name, "Tag already exists locally");
            return Ok(TagOutcome::AlreadyExists);
        }

        let head = repo.head().map_err(|_| {
            PolyverError::Git(Box::new(GitError::InvalidReference {
                reference: "HEAD".to_string(),
                suggestion: Some("create a commit before tagging".to_string()),
            }))
        })?;
        let target = head.peel(ObjectType::Commit)?;

        let annotated = opts.message.is_some();
        match &opts.message {
            Some(message) => {
                let sig = signature(&repo)?;
                repo.tag(name, &target, &sig, message, false)?;
            }
            None => {
                repo.tag_lightweight(name, &target, false)?;
            }
        }
        info!(tag = %name, annotated = annotated, "Created tag");

        let pushed = if opts.push {
            let refspec = format!("refs/tags/{name}:refs/tags/{name}");
            let tag_ref = format!("refs/tags/{name}");
            let refs = push_refspecs(
                &repo,
                &opts.remote,
                &[refspec],
                &tag_ref,
                opts.credentials.as_ref(),
            )?;
            refs.into_iter().next().map(|(_, status)| status)
        } else {
            None
        };

        Ok(TagOutcome::Created {
            name: name.to_string(),
            annotated,
            pushed,
        })
    }
}

fn current_branch(repo: &Repository) -> Option<String> {
    match repo.head() {
        Ok(head) => head.shorthand().map(str::to_string),
        // Unborn branch: HEAD exists symbolically but points at no commit
        Err(_) => repo
            .find_reference("HEAD")
            .ok()
            .and_then(|r| r.symbolic_target().map(str::to_string))
            .and_then(|target| {
                target
                    .strip_prefix("refs/heads/")
                    .map(str::to_string)
            }),
    }
}

fn commit_info(commit: &git2::Commit) -> CommitInfo {
    let author = commit.author();
    let timestamp = Utc
        .timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now);
    CommitInfo {
        hash: commit.id().to_string(),
        author: author.name().unwrap_or("unknown").to_string(),
        timestamp,
        message: commit.message().unwrap_or_default().trim_end().to_string(),
    }
}

fn signature(repo: &Repository) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig),
        // No user.name/user.email configured; fall back so automation can
        // still commit
        Err(_) => Ok(Signature::now("polyver", "polyver@localhost")?),
    }
}

/// Run a push and collect per-ref statuses through git2's update callback.
/// Refs the server already has produce no callback, which reads as UpToDate.
fn push_refspecs(
    repo: &Repository,
    remote_name: &str,
    refspecs: &[String],
    expected_ref: &str,
    credentials: Option<&PushCredentials>,
) -> Result<Vec<(String, RefPushStatus)>> {
    let mut remote = repo.find_remote(remote_name).map_err(|_| {
        PolyverError::Git(Box::new(GitError::InvalidReference {
            reference: remote_name.to_string(),
            suggestion: Some("add the remote before pushing".to_string()),
        }))
    })?;

    let updates: RefCell<Vec<(String, Option<String>)>> = RefCell::new(Vec::new());

    let mut callbacks = RemoteCallbacks::new();
    if let Some(creds) = credentials {
        let username = creds.username.clone();
        let token = creds.token.clone();
        callbacks.credentials(move |_url, _username_from_url, _allowed| {
            Cred::userpass_plaintext(&username, &token)
        });
    }
    callbacks.push_update_reference(|refname, status| {
        updates
            .borrow_mut()
            .push((refname.to_string(), status.map(str::to_string)));
        Ok(())
    });

    let mut push_opts = Git2PushOptions::new();
    push_opts.remote_callbacks(callbacks);

    let refspec_refs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
    match remote.push(&refspec_refs, Some(&mut push_opts)) {
        Ok(()) => {}
        Err(e) if e.code() == ErrorCode::Auth => {
            return Err(PolyverError::Git(Box::new(GitError::AuthRequired {
                operation: format!("push to {remote_name}"),
            })));
        }
        Err(e) => {
            // Transport or protocol failure: report as a per-ref error so
            // callers see which refs never made it
            return Ok(vec![(
                expected_ref.to_string(),
                RefPushStatus::Error {
                    message: e.message().to_string(),
                },
            )]);
        }
    }

    // The callbacks borrow `updates`; release them before reading it back
    drop(push_opts);
    let recorded = updates.into_inner();
    if recorded.is_empty() {
        // Server accepted the connection but had nothing to update
        return Ok(vec![(expected_ref.to_string(), RefPushStatus::UpToDate)]);
    }

    Ok(recorded
        .into_iter()
        .map(|(refname, status)| {
            let status = match status {
                None => RefPushStatus::Success,
                Some(reason) => RefPushStatus::Rejected { reason },
            };
            (refname, status)
        })
        .collect())
}

/// Universal ignores unioned into every generated .gitignore
const BASE_IGNORES: &[&str] = &[
    ".env",
    "*.log",
    ".DS_Store",
    "Thumbs.db",
    ".vscode/",
    ".idea/",
    "*.swp",
];

fn language_ignores(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => &[
            "__pycache__/",
            "*.pyc",
            "*.pyo",
            "venv/",
            ".venv/",
            ".pytest_cache/",
            "htmlcov/",
            ".coverage",
            "*.egg-info/",
            "dist/",
            "build/",
        ],
        Language::JavaScript | Language::TypeScript => {
            &["node_modules/", "dist/", "build/", "coverage/", ".npm/"]
        }
        Language::Rust => &["target/"],
        Language::Go => &["bin/", "coverage.out"],
        Language::Java => &["target/", "*.class", ".gradle/", "build/"],
        Language::Ruby => &[".bundle/", "vendor/bundle/"],
        Language::CSharp => &["bin/", "obj/"],
        Language::Php => &["vendor/"],
        Language::C | Language::Cpp => &["*.o", "*.out", "build/"],
        Language::Shell => &[],
    }
}

/// Write a .gitignore unioning the base set with the language template.
/// An existing file is left untouched; returns whether a file was written.
pub(crate) fn write_gitignore(dir: &Path, language: Option<Language>) -> Result<bool> {
    let path = dir.join(".gitignore");
    if path.exists() {
        return Ok(false);
    }

    let mut lines: Vec<&str> = BASE_IGNORES.to_vec();
    if let Some(language) = language {
        for entry in language_ignores(language) {
            if !lines.contains(entry) {
                lines.push(entry);
            }
        }
    }

    std::fs::write(&path, lines.join("\n") + "\n")?;
    debug!(path = %path.display(), language = ?language, "Generated .gitignore");
    Ok(true)
}
