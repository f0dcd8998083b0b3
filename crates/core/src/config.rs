//! Configuration for the APICURON action.
//!
//! Two sources are supported:
//! - a TOML file, where secrets are `*_env` fields naming environment
//!   variables that are resolved at runtime via
//!   [`ActionConfig::resolve_env_vars`];
//! - the runner's action inputs (`INPUT_<NAME>` environment variables), via
//!   [`ActionConfig::from_inputs`] / [`ActionConfig::from_action_env`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::models::DEFAULT_LEAGUE;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level action configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Remote username -> ORCID lookup service.
    #[serde(default)]
    pub orcid: Option<OrcidApiConfig>,

    /// APICURON report submission endpoint.
    pub apicuron: ApicuronConfig,

    /// Values stamped on every report.
    pub report: ReportConfig,

    /// Local identity mapping settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// ORCID lookup service
// ---------------------------------------------------------------------------

/// User/ORCID lookup service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrcidApiConfig {
    /// Lookup URL; the username is appended as `?profileName=`.
    pub endpoint: String,

    /// Environment variable holding the service token.
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// APICURON
// ---------------------------------------------------------------------------

/// APICURON submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApicuronConfig {
    /// Bulk report endpoint.
    pub endpoint: String,

    /// Environment variable holding the APICURON API token.
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Settings copied into each attribution record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Activity term registered on APICURON, e.g. `commit`.
    pub activity_term: String,

    /// League the activity counts towards.
    #[serde(default = "default_league")]
    pub league: String,

    /// Resource id; `<owner>-<repo>` is used when blank.
    #[serde(default)]
    pub resource_id: Option<String>,

    /// Optional prefix for entity URIs.
    #[serde(default)]
    pub resource_url: Option<String>,
}

fn default_league() -> String {
    DEFAULT_LEAGUE.into()
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Local username -> ORCID mapping, used instead of the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    /// Path to a TOML file with an `[orcids]` table.
    #[serde(default)]
    pub mapping_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Action inputs
// ---------------------------------------------------------------------------

pub const INPUT_ORCID_API_ENDPOINT: &str = "orcid_api_endpoint";
pub const INPUT_ORCID_API_TOKEN: &str = "orcid_api_token";
pub const INPUT_APICURON_ENDPOINT: &str = "apicuron_endpoint";
pub const INPUT_APICURON_TOKEN: &str = "apicuron_token";
pub const INPUT_ACTIVITY_TERM: &str = "activity_term";
pub const INPUT_LEAGUE: &str = "league";
pub const INPUT_RESOURCE_ID: &str = "resource_id";
pub const INPUT_RESOURCE_URL: &str = "resource_url";
pub const INPUT_ORCID_MAPPING_FILE: &str = "orcid_mapping_file";

/// Environment variable the runner uses for an action input.
pub fn input_env_name(input: &str) -> String {
    format!("INPUT_{}", input.replace(' ', "_").to_uppercase())
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl ActionConfig {
    /// Load an [`ActionConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ActionConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Build a config from action inputs. `input` returns the raw value of an
    /// input by name; blank values count as unset. Tokens are taken as-is.
    pub fn from_inputs<F>(input: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            input(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require =
            |name: &str| get(name).ok_or_else(|| ConfigError::MissingInput(name.to_string()));

        let mapping_file = get(INPUT_ORCID_MAPPING_FILE).map(PathBuf::from);
        let orcid = match get(INPUT_ORCID_API_ENDPOINT) {
            Some(endpoint) => Some(OrcidApiConfig {
                endpoint,
                token_env: input_env_name(INPUT_ORCID_API_TOKEN),
                token: Some(require(INPUT_ORCID_API_TOKEN)?),
            }),
            None if mapping_file.is_some() => None,
            None => return Err(ConfigError::MissingInput(INPUT_ORCID_API_ENDPOINT.into())),
        };

        let config = Self {
            orcid,
            apicuron: ApicuronConfig {
                endpoint: require(INPUT_APICURON_ENDPOINT)?,
                token_env: input_env_name(INPUT_APICURON_TOKEN),
                token: Some(require(INPUT_APICURON_TOKEN)?),
            },
            report: ReportConfig {
                activity_term: require(INPUT_ACTIVITY_TERM)?,
                league: get(INPUT_LEAGUE).unwrap_or_else(default_league),
                resource_id: get(INPUT_RESOURCE_ID),
                resource_url: get(INPUT_RESOURCE_URL),
            },
            identity: IdentityConfig { mapping_file },
            logging: LoggingConfig::default(),
        };
        debug!("configuration built from action inputs");
        Ok(config)
    }

    /// [`from_inputs`](Self::from_inputs) over the process environment.
    pub fn from_action_env() -> Result<Self, ConfigError> {
        info!("reading configuration from action inputs");
        Self::from_inputs(|name| std::env::var(input_env_name(name)).ok())
    }

    /// Resolve all `*_env` fields from environment variables and populate the
    /// corresponding resolved fields.
    ///
    /// Missing variables only log a warning here; [`validate`](Self::validate)
    /// reports the tokens that are actually needed.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        if let Some(ref mut orcid) = self.orcid {
            if orcid.token.is_none() {
                orcid.token = resolve_optional_env(&orcid.token_env, "orcid.token_env");
            }
        }

        if self.apicuron.token.is_none() {
            self.apicuron.token =
                resolve_optional_env(&self.apicuron.token_env, "apicuron.token_env");
        }

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.orcid, &self.identity.mapping_file) {
            (Some(orcid), _) => {
                require_url(&orcid.endpoint, "orcid.endpoint")?;
                if orcid.token.is_none() {
                    return Err(ConfigError::EnvVarMissing {
                        var: orcid.token_env.clone(),
                        field: "orcid.token_env".into(),
                    });
                }
            }
            (None, Some(_)) => {}
            (None, None) => {
                return Err(ConfigError::InvalidValue {
                    field: "orcid".into(),
                    detail: "either an ORCID lookup service or identity.mapping_file is required"
                        .into(),
                });
            }
        }

        require_url(&self.apicuron.endpoint, "apicuron.endpoint")?;
        if self.apicuron.token.is_none() {
            return Err(ConfigError::EnvVarMissing {
                var: self.apicuron.token_env.clone(),
                field: "apicuron.token_env".into(),
            });
        }

        if self.report.activity_term.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "report.activity_term".into(),
                detail: "activity term must not be empty".into(),
            });
        }
        if self.report.league.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "report.league".into(),
                detail: "league must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

fn require_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: "URL must not be empty".into(),
        });
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: format!("'{}' is not an http(s) URL", value),
        });
    }
    Ok(())
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
