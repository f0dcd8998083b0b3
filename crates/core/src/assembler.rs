//! Push event -> attribution records.
//!
//! [`ReportAssembler`] validates the event, resolves each distinct commit
//! author once through an [`IdentityResolver`], and builds one
//! [`AttributionRecord`] per commit whose author has an ORCID. Commits
//! without a username or without an ORCID are skipped, not failed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AssemblyError;
use crate::event::{PushCommit, PushEvent};
use crate::identity::{IdentityResolver, Resolution};
use crate::models::AttributionRecord;

/// Values copied into every record of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSettings {
    pub activity_term: String,
    pub league: String,
    pub resource_id: String,
    /// Optional prefix put in front of the repository URL in entity URIs.
    pub resource_url: Option<String>,
}

impl ReportSettings {
    fn validate(&self) -> Result<(), AssemblyError> {
        if self.activity_term.trim().is_empty() {
            return Err(AssemblyError::EmptySetting("activity_term"));
        }
        if self.league.trim().is_empty() {
            return Err(AssemblyError::EmptySetting("league"));
        }
        if self.resource_id.trim().is_empty() {
            return Err(AssemblyError::EmptySetting("resource_id"));
        }
        Ok(())
    }
}

/// Builds attribution records from push events.
#[derive(Clone)]
pub struct ReportAssembler {
    resolver: Arc<dyn IdentityResolver>,
}

impl ReportAssembler {
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { resolver }
    }

    /// Map each commit of `event` to at most one record, in commit order.
    ///
    /// Fails only on structural problems (no commits, no repository, a
    /// `null` commit entry, blank settings). An empty result is a valid
    /// outcome meaning nobody could be credited.
    pub async fn assemble(
        &self,
        event: &PushEvent,
        settings: &ReportSettings,
    ) -> Result<Vec<AttributionRecord>, AssemblyError> {
        let commits = event
            .commits
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(AssemblyError::NoCommits)?;
        let repo = event
            .repository
            .as_ref()
            .ok_or(AssemblyError::MissingRepository)?;
        let commits = commits
            .iter()
            .enumerate()
            .map(|(i, c)| c.as_ref().ok_or(AssemblyError::NullCommit(i)))
            .collect::<Result<Vec<&PushCommit>, _>>()?;
        settings.validate()?;

        info!(
            commits = commits.len(),
            repo = %repo.html_url,
            "processing push event"
        );

        // Commits worth resolving, and the distinct usernames among them.
        let mut candidates: Vec<(&PushCommit, &str)> = Vec::with_capacity(commits.len());
        let mut usernames: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for commit in commits {
            if commit.id.trim().is_empty() || commit.timestamp.trim().is_empty() {
                warn!(commit = %commit.id, "skipping commit - missing id or timestamp");
                continue;
            }
            let Some(username) = commit.username() else {
                warn!(commit = %commit.id, "skipping commit - no username associated");
                continue;
            };
            if seen.insert(username) {
                usernames.push(username);
            }
            candidates.push((commit, username));
        }

        debug!(authors = usernames.len(), "resolving commit authors");
        let resolutions: HashMap<&str, Resolution> =
            join_all(usernames.into_iter().map(|username| async move {
                (username, self.resolver.resolve(username).await)
            }))
            .await
            .into_iter()
            .collect();

        let records: Vec<AttributionRecord> = candidates
            .into_iter()
            .filter_map(|(commit, username)| match resolutions.get(username) {
                Some(Resolution::Resolved(orcid)) => Some(AttributionRecord {
                    curator_orcid: orcid.clone(),
                    entity_uri: entity_uri(
                        settings.resource_url.as_deref(),
                        &repo.html_url,
                        &commit.id,
                    ),
                    resource_id: settings.resource_id.clone(),
                    timestamp: commit.timestamp.clone(),
                    activity_term: settings.activity_term.clone(),
                    league: settings.league.clone(),
                }),
                _ => {
                    info!(username, commit = %commit.id, "skipping report - no ORCID available");
                    None
                }
            })
            .collect();

        info!(records = records.len(), "assembled reports");
        Ok(records)
    }
}

/// `[<resource_url>/]<repo_url>/commit/<commit_id>`
pub fn entity_uri(resource_url: Option<&str>, repo_url: &str, commit_id: &str) -> String {
    let repo_url = repo_url.trim_end_matches('/');
    match resource_url
        .map(|p| p.trim().trim_end_matches('/'))
        .filter(|p| !p.is_empty())
    {
        Some(prefix) => format!("{}/{}/commit/{}", prefix, repo_url, commit_id),
        None => format!("{}/commit/{}", repo_url, commit_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CommitActor, Repository};
    use crate::identity::StaticIdentityResolver;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every username it is asked about.
    struct CountingResolver {
        inner: StaticIdentityResolver,
        calls: Mutex<Vec<String>>,
    }

    impl CountingResolver {
        fn new(inner: StaticIdentityResolver) -> Arc<Self> {
            Arc::new(Self {
                inner,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IdentityResolver for CountingResolver {
        async fn resolve(&self, username: &str) -> Resolution {
            self.calls.lock().unwrap().push(username.to_string());
            self.inner.resolve(username).await
        }
    }

    fn actor(username: Option<&str>) -> Option<CommitActor> {
        Some(CommitActor {
            name: Some("Someone".into()),
            email: Some("someone@example.com".into()),
            username: username.map(String::from),
        })
    }

    fn commit(id: &str, author: Option<&str>, committer: Option<&str>) -> Option<PushCommit> {
        Some(PushCommit {
            id: id.into(),
            timestamp: format!("T-{}", id),
            message: None,
            author: actor(author),
            committer: actor(committer),
        })
    }

    fn repo() -> Repository {
        Repository {
            html_url: "https://example.com/org/repo".into(),
            name: "repo".into(),
            full_name: Some("org/repo".into()),
            owner: None,
        }
    }

    fn event(commits: Vec<Option<PushCommit>>) -> PushEvent {
        PushEvent {
            commits: Some(commits),
            repository: Some(repo()),
        }
    }

    fn settings() -> ReportSettings {
        ReportSettings {
            activity_term: "commit".into(),
            league: "default".into(),
            resource_id: "org-repo".into(),
            resource_url: None,
        }
    }

    fn alice_only() -> StaticIdentityResolver {
        StaticIdentityResolver::new([("alice", "0000-1111-2222-3333")])
    }

    #[tokio::test]
    async fn test_unmapped_author_is_dropped() {
        let assembler = ReportAssembler::new(Arc::new(alice_only()));
        let mut alice = commit("c1", Some("alice"), None).unwrap();
        alice.timestamp = "T1".into();
        let mut bob = commit("c2", Some("bob"), None).unwrap();
        bob.timestamp = "T2".into();

        let records = assembler
            .assemble(&event(vec![Some(alice), Some(bob)]), &settings())
            .await
            .unwrap();

        assert_eq!(
            records,
            vec![AttributionRecord {
                curator_orcid: "0000-1111-2222-3333".into(),
                entity_uri: "https://example.com/org/repo/commit/c1".into(),
                resource_id: "org-repo".into(),
                timestamp: "T1".into(),
                activity_term: "commit".into(),
                league: "default".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_commit_without_username_skips_resolver() {
        let resolver = CountingResolver::new(alice_only());
        let assembler = ReportAssembler::new(resolver.clone());

        let records = assembler
            .assemble(
                &event(vec![commit("c1", None, None), commit("c2", Some("alice"), None)]),
                &settings(),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_uri, "https://example.com/org/repo/commit/c2");
        assert_eq!(resolver.calls(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_committer_username_is_fallback() {
        let assembler = ReportAssembler::new(Arc::new(alice_only()));
        let records = assembler
            .assemble(&event(vec![commit("c1", None, Some("alice"))]), &settings())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].curator_orcid, "0000-1111-2222-3333");
    }

    #[tokio::test]
    async fn test_each_author_resolved_once() {
        let resolver = CountingResolver::new(alice_only());
        let assembler = ReportAssembler::new(resolver.clone());

        let records = assembler
            .assemble(
                &event(vec![
                    commit("c1", Some("alice"), None),
                    commit("c2", Some("bob"), None),
                    commit("c3", Some("alice"), None),
                ]),
                &settings(),
            )
            .await
            .unwrap();

        let timestamps: Vec<&str> = records.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(timestamps, vec!["T-c1", "T-c3"]);

        let mut calls = resolver.calls();
        calls.sort();
        assert_eq!(calls, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_all_skipped_is_empty_not_error() {
        let assembler = ReportAssembler::new(Arc::new(StaticIdentityResolver::default()));
        let records = assembler
            .assemble(&event(vec![commit("c1", Some("bob"), None)]), &settings())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_resource_url_prefix() {
        let assembler = ReportAssembler::new(Arc::new(alice_only()));
        let mut settings = settings();
        settings.resource_url = Some("https://apicuron.org/".into());

        let records = assembler
            .assemble(&event(vec![commit("abc", Some("alice"), None)]), &settings)
            .await
            .unwrap();
        assert_eq!(
            records[0].entity_uri,
            "https://apicuron.org/https://example.com/org/repo/commit/abc"
        );
    }

    #[tokio::test]
    async fn test_structural_errors() {
        let assembler = ReportAssembler::new(Arc::new(alice_only()));

        let no_commits = PushEvent {
            commits: None,
            repository: Some(repo()),
        };
        assert_eq!(
            assembler.assemble(&no_commits, &settings()).await,
            Err(AssemblyError::NoCommits)
        );

        assert_eq!(
            assembler.assemble(&event(vec![]), &settings()).await,
            Err(AssemblyError::NoCommits)
        );

        let no_repo = PushEvent {
            commits: Some(vec![commit("c1", Some("alice"), None)]),
            repository: None,
        };
        assert_eq!(
            assembler.assemble(&no_repo, &settings()).await,
            Err(AssemblyError::MissingRepository)
        );

        assert_eq!(
            assembler
                .assemble(&event(vec![commit("c1", Some("alice"), None), None]), &settings())
                .await,
            Err(AssemblyError::NullCommit(1))
        );
    }

    #[tokio::test]
    async fn test_blank_setting_is_rejected() {
        let assembler = ReportAssembler::new(Arc::new(alice_only()));
        let mut settings = settings();
        settings.activity_term = " ".into();
        assert_eq!(
            assembler
                .assemble(&event(vec![commit("c1", Some("alice"), None)]), &settings)
                .await,
            Err(AssemblyError::EmptySetting("activity_term"))
        );
    }

    #[test]
    fn test_entity_uri() {
        assert_eq!(
            entity_uri(None, "https://github.com/org/repo/", "c1"),
            "https://github.com/org/repo/commit/c1"
        );
        assert_eq!(
            entity_uri(Some(""), "https://github.com/org/repo", "c1"),
            "https://github.com/org/repo/commit/c1"
        );
    }
}
