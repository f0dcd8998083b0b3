//! HTTP lookup of a user's ORCID against the profile service.
//!
//! `GET <endpoint>?profileName=<username>` with `Authorization: tokenKey
//! <token>`, answering `{ "orcid_id": "..." }`. Successful lookups are
//! cached for the lifetime of the resolver; misses are not, so a user who
//! links an ORCID is picked up by the next lookup.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::{IdentityResolver, Resolution};
use crate::errors::IdentityError;

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    orcid_id: Option<String>,
}

/// What the profile service said about a user.
#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    Found(String),
    /// 4xx: the service has no ORCID on file for this user.
    NotMapped(u16),
    /// 2xx without a usable `orcid_id`.
    MissingField,
}

/// Remote ORCID resolver with a process-lifetime cache.
pub struct RemoteIdentityResolver {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    /// Username -> ORCID. Additive only.
    cache: RwLock<HashMap<String, String>>,
}

impl RemoteIdentityResolver {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, token)
    }

    pub fn with_client(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        info!(endpoint = %endpoint, "created RemoteIdentityResolver");
        Self {
            http,
            endpoint,
            token: token.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cached ORCID for `username`, if a previous lookup succeeded.
    pub fn cached(&self, username: &str) -> Option<String> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(username).cloned())
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Insert unless another lookup got there first; returns the stored value.
    fn remember(&self, username: &str, orcid: String) -> String {
        match self.cache.write() {
            Ok(mut cache) => cache
                .entry(username.to_string())
                .or_insert(orcid)
                .clone(),
            Err(_) => orcid,
        }
    }

    #[instrument(skip(self))]
    async fn fetch(&self, username: &str) -> Result<Lookup, IdentityError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("profileName", username)])
            .header(AUTHORIZATION, format!("tokenKey {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status.is_client_error() {
            return Ok(Lookup::NotMapped(status.as_u16()));
        }
        if !status.is_success() {
            return Err(IdentityError::UnexpectedStatus(status.as_u16()));
        }

        let body = resp.text().await?;
        let profile: Option<ProfileResponse> =
            serde_json::from_str(&body).map_err(|e| IdentityError::ParseError(e.to_string()))?;

        match profile
            .and_then(|p| p.orcid_id)
            .filter(|o| !o.trim().is_empty())
        {
            Some(orcid) => Ok(Lookup::Found(orcid)),
            None => Ok(Lookup::MissingField),
        }
    }
}

#[async_trait]
impl IdentityResolver for RemoteIdentityResolver {
    async fn resolve(&self, username: &str) -> Resolution {
        if let Some(orcid) = self.cached(username) {
            debug!(username, "cache hit for user");
            return Resolution::Resolved(orcid);
        }

        match self.fetch(username).await {
            Ok(Lookup::Found(orcid)) => {
                debug!(username, orcid = %orcid, "resolved ORCID");
                Resolution::Resolved(self.remember(username, orcid))
            }
            Ok(Lookup::NotMapped(status)) => {
                warn!(
                    username,
                    status,
                    "user won't be credited - no ORCID associated with their account"
                );
                Resolution::Unresolved
            }
            Ok(Lookup::MissingField) => {
                info!(username, "no ORCID found for user in API response");
                Resolution::Unresolved
            }
            Err(e) => {
                error!(username, error = %e, "failed to fetch user info");
                Resolution::Unresolved
            }
        }
    }
}
