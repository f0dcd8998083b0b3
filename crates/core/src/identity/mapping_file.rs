//! Fixed username -> ORCID resolution, optionally backed by a TOML file.
//!
//! The mapping file format:
//!
//! ```toml
//! [orcids]
//! alice = "0000-0002-1825-0097"
//! bob = "0000-0001-5109-3700"
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{IdentityResolver, Resolution};
use crate::errors::IdentityError;

/// Wrapper around the TOML mapping file structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MappingFileData {
    /// The `[orcids]` table mapping username -> ORCID.
    #[serde(default)]
    pub orcids: HashMap<String, String>,
}

/// Resolver over an in-memory map. Never touches the network.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    orcids: HashMap<String, String>,
}

impl StaticIdentityResolver {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            orcids: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load the mapping file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IdentityError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading ORCID mapping file");

        if !path.exists() {
            return Err(IdentityError::MappingFileError {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let data: MappingFileData =
            toml::from_str(&contents).map_err(|e| IdentityError::ParseError(e.to_string()))?;

        debug!(count = data.orcids.len(), "loaded ORCID mappings");
        Ok(Self {
            orcids: data.orcids,
        })
    }

    pub fn len(&self) -> usize {
        self.orcids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orcids.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, username: &str) -> Resolution {
        match self.orcids.get(username).filter(|o| !o.is_empty()) {
            Some(orcid) => {
                debug!(username, "found in ORCID mapping");
                Resolution::Resolved(orcid.clone())
            }
            None => {
                warn!(
                    username,
                    "user won't be credited - no ORCID in the mapping file"
                );
                Resolution::Unresolved
            }
        }
    }
}
