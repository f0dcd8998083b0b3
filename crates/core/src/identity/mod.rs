//! ORCID identity resolution for commit authors.
//!
//! Two strategies implement [`IdentityResolver`]:
//! 1. [`RemoteIdentityResolver`]: HTTP lookup against the user/ORCID service,
//!    memoized for the lifetime of the process
//! 2. [`StaticIdentityResolver`]: fixed username -> ORCID map, optionally
//!    loaded from a TOML mapping file

pub mod mapping_file;
pub mod remote;

use async_trait::async_trait;

pub use mapping_file::StaticIdentityResolver;
pub use remote::RemoteIdentityResolver;

/// Outcome of resolving a username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The user's ORCID identifier.
    Resolved(String),
    /// No identity could be determined for this user in this run.
    Unresolved,
}

impl Resolution {
    pub fn orcid(&self) -> Option<&str> {
        match self {
            Self::Resolved(orcid) => Some(orcid),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Maps a source-control username to an ORCID.
///
/// Implementations absorb their own failures: a lookup that cannot be
/// completed yields [`Resolution::Unresolved`] rather than an error, so one
/// author's failure never aborts a run.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Resolution;
}
