// Hosted git service adapter for polyver
//
// Repository create/lookup over the provider's HTTP API. The credential is
// supplied out-of-band (environment or explicit config, never hard-coded)
// and its absence is surfaced before any network call is attempted.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{PolyverError, RemoteError, Result};

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Credentials and endpoint for the hosted service
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub token: Option<String>,
    pub username: Option<String>,
    pub api_base: Url,
}

impl HostConfig {
    pub fn new(token: Option<String>, username: Option<String>) -> Self {
        Self {
            token,
            username,
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is valid"),
        }
    }

    /// Read credentials from the environment: GITHUB_TOKEN, GITHUB_USERNAME,
    /// and an optional POLYVER_API_BASE override (useful against test
    /// servers or GitHub Enterprise).
    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            std::env::var("GITHUB_USERNAME").ok().filter(|u| !u.is_empty()),
        );
        if let Some(base) = std::env::var("POLYVER_API_BASE")
            .ok()
            .and_then(|raw| Url::parse(&raw).ok())
        {
            config.api_base = base;
        }
        config
    }

    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }
}

/// A repository on the hosted service; owned by the service, referenced
/// locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub name: String,
    pub owner: String,
    pub html_url: String,
    pub clone_url: String,
    pub ssh_url: String,
    pub private: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateRepoOptions {
    pub description: Option<String>,
    pub private: bool,
    pub initialize_with_readme: bool,
    pub license_template: Option<String>,
}

/// Create result: an existing repository of the same name is a
/// distinguishable outcome carrying the existing record
#[derive(Debug, Clone, PartialEq)]
pub enum CreateRepoOutcome {
    Created(RemoteRepository),
    AlreadyExists(RemoteRepository),
}

impl CreateRepoOutcome {
    pub fn repository(&self) -> &RemoteRepository {
        match self {
            CreateRepoOutcome::Created(repo) | CreateRepoOutcome::AlreadyExists(repo) => repo,
        }
    }
}

/// Adapter boundary to the hosted service, kept as a trait so workflows are
/// testable without a network
#[async_trait]
pub trait RemoteHost: Send + Sync {
    async fn create_repository(
        &self,
        name: &str,
        opts: &CreateRepoOptions,
    ) -> Result<CreateRepoOutcome>;

    async fn get_repository(&self, owner: &str, name: &str) -> Result<Option<RemoteRepository>>;
}

// GitHub wire format: owner arrives as a nested object
#[derive(Debug, Deserialize)]
struct ApiOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    name: String,
    owner: ApiOwner,
    html_url: String,
    clone_url: String,
    ssh_url: String,
    private: bool,
    description: Option<String>,
}

impl From<ApiRepository> for RemoteRepository {
    fn from(api: ApiRepository) -> Self {
        Self {
            name: api.name,
            owner: api.owner.login,
            html_url: api.html_url,
            clone_url: api.clone_url,
            ssh_url: api.ssh_url,
            private: api.private,
            description: api.description,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateRepoPayload<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    private: bool,
    auto_init: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    license_template: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

/// GitHub implementation of [`RemoteHost`]
pub struct GitHubClient {
    http: reqwest::Client,
    config: HostConfig,
}

impl GitHubClient {
    pub fn new(config: HostConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("polyver/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(HostConfig::from_env())
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Checked before any network call; a missing token is a hard error
    fn require_token(&self) -> Result<&str> {
        self.config.token.as_deref().ok_or_else(|| {
            PolyverError::Remote(Box::new(RemoteError::Unauthenticated {
                message: "no token configured; set GITHUB_TOKEN".to_string(),
            }))
        })
    }

    fn headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                PolyverError::Remote(Box::new(RemoteError::Unauthenticated {
                    message: "token contains invalid header characters".to_string(),
                }))
            })?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("polyver"));
        Ok(headers)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.config.api_base.join(path).map_err(|e| {
            PolyverError::Remote(Box::new(RemoteError::Api {
                status: 0,
                message: format!("invalid endpoint {path}: {e}"),
            }))
        })
    }

    /// The authenticated user's login, preferring the configured username
    async fn login(&self, token: &str) -> Result<String> {
        if let Some(username) = &self.config.username {
            return Ok(username.clone());
        }
        let response = self
            .http
            .get(self.endpoint("user")?)
            .headers(self.headers(token)?)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(PolyverError::Remote(Box::new(
                RemoteError::Unauthenticated {
                    message: "token rejected by remote host".to_string(),
                },
            )));
        }
        let user: ApiUser = response.json().await?;
        Ok(user.login)
    }

    async fn error_from_response(&self, response: reqwest::Response) -> PolyverError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return PolyverError::Remote(Box::new(RemoteError::Unauthenticated {
                message: "token rejected by remote host".to_string(),
            }));
        }
        if status == StatusCode::FORBIDDEN {
            let remaining = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if remaining.as_deref() == Some("0") {
                let reset_at = response
                    .headers()
                    .get("x-ratelimit-reset")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                return PolyverError::Remote(Box::new(RemoteError::RateLimited { reset_at }));
            }
        }
        let message = response
            .json::<ApiErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_default();
        PolyverError::Remote(Box::new(RemoteError::Api {
            status: status.as_u16(),
            message,
        }))
    }
}

#[async_trait]
impl RemoteHost for GitHubClient {
    async fn create_repository(
        &self,
        name: &str,
        opts: &CreateRepoOptions,
    ) -> Result<CreateRepoOutcome> {
        let token = self.require_token()?.to_string();

        let payload = CreateRepoPayload {
            name,
            description: opts.description.as_deref(),
            private: opts.private,
            auto_init: opts.initialize_with_readme,
            license_template: opts.license_template.as_deref(),
        };

        debug!(name = %name, private = opts.private, "Creating remote repository");
        let response = self
            .http
            .post(self.endpoint("user/repos")?)
            .headers(self.headers(&token)?)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                let repo: ApiRepository = response.json().await?;
                let repo = RemoteRepository::from(repo);
                info!(url = %repo.html_url, "Remote repository created");
                Ok(CreateRepoOutcome::Created(repo))
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                // Name collision: fetch the existing repository so the
                // caller can keep going with it
                let owner = self.login(&token).await?;
                match self.get_repository(&owner, name).await? {
                    Some(existing) => {
                        info!(name = %name, "Remote repository already exists");
                        Ok(CreateRepoOutcome::AlreadyExists(existing))
                    }
                    None => Err(PolyverError::Remote(Box::new(RemoteError::Api {
                        status: 422,
                        message: format!("repository '{name}' was rejected by the remote host"),
                    }))),
                }
            }
            _ => Err(self.error_from_response(response).await),
        }
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<Option<RemoteRepository>> {
        let token = self.require_token()?.to_string();

        let response = self
            .http
            .get(self.endpoint(&format!("repos/{owner}/{name}"))?)
            .headers(self.headers(&token)?)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let repo: ApiRepository = response.json().await?;
                Ok(Some(repo.into()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(self.error_from_response(response).await),
        }
    }
}
