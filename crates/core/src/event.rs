//! Push event payload, as delivered by the CI runner.
//!
//! Only the fields the report pipeline reads are modelled; everything else
//! in the payload is ignored by serde.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::EventError;

/// A `push` webhook payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushEvent {
    /// Commits in the push. Entries may be `null` in malformed payloads.
    #[serde(default)]
    pub commits: Option<Vec<Option<PushCommit>>>,
    #[serde(default)]
    pub repository: Option<Repository>,
}

/// One commit of a push.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushCommit {
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<CommitActor>,
    #[serde(default)]
    pub committer: Option<CommitActor>,
}

/// Author or committer of a commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Platform login; absent when the email is not linked to an account.
    #[serde(default)]
    pub username: Option<String>,
}

/// Repository descriptor of a push.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    pub html_url: String,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub owner: Option<RepositoryOwner>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryOwner {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl PushEvent {
    /// Load a push event from the JSON file the runner points at.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, EventError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading push event payload");

        if !path.exists() {
            return Err(EventError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let event = Self::from_json(&contents)?;
        debug!(
            commits = event.commits.as_ref().map(Vec::len).unwrap_or(0),
            "push event parsed"
        );
        Ok(event)
    }

    pub fn from_json(json: &str) -> Result<Self, EventError> {
        serde_json::from_str(json).map_err(|e| EventError::ParseError(e.to_string()))
    }
}

impl PushCommit {
    /// The login credited for this commit: the author's, falling back to the
    /// committer's. Blank usernames count as absent; others are used verbatim.
    pub fn username(&self) -> Option<&str> {
        fn login(actor: &Option<CommitActor>) -> Option<&str> {
            actor
                .as_ref()
                .and_then(|a| a.username.as_deref())
                .filter(|u| !u.trim().is_empty())
        }
        login(&self.author).or_else(|| login(&self.committer))
    }
}

impl Repository {
    /// Owner login, taken from the owner object or the `owner/name` full name.
    pub fn owner_login(&self) -> Option<&str> {
        let from_owner = self.owner.as_ref().and_then(|o| {
            o.login
                .as_deref()
                .or(o.name.as_deref())
                .filter(|s| !s.is_empty())
        });
        from_owner.or_else(|| {
            self.full_name
                .as_deref()
                .and_then(|full| full.split_once('/'))
                .map(|(owner, _)| owner)
                .filter(|s| !s.is_empty())
        })
    }
}

/// Resource id to credit: the configured one, or `<owner>-<repo>` when the
/// configured value is blank.
pub fn derive_resource_id(configured: Option<&str>, repo: &Repository) -> String {
    match configured.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => match repo.owner_login() {
            Some(owner) => format!("{}-{}", owner, repo.name),
            None => repo.name.clone(),
        },
    }
}
