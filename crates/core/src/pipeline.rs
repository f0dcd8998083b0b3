//! One run of the action: assemble reports for a push, then submit them.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::apicuron::ApicuronClient;
use crate::assembler::{ReportAssembler, ReportSettings};
use crate::config::{ActionConfig, ReportConfig};
use crate::errors::{ConfigError, CoreError};
use crate::event::{derive_resource_id, PushEvent};
use crate::identity::{IdentityResolver, RemoteIdentityResolver, StaticIdentityResolver};
use crate::models::AttributionRecord;

/// Whether assembled reports are sent to APICURON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitMode {
    #[default]
    Submit,
    /// Assemble only; nothing is sent.
    DryRun,
}

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub reports: Vec<AttributionRecord>,
    /// True when the batch was accepted by APICURON.
    pub submitted: bool,
}

/// Assembler and submitter wired together.
pub struct ReportPipeline {
    assembler: ReportAssembler,
    client: ApicuronClient,
}

impl ReportPipeline {
    pub fn new(resolver: Arc<dyn IdentityResolver>, client: ApicuronClient) -> Self {
        Self {
            assembler: ReportAssembler::new(resolver),
            client,
        }
    }

    /// Build the resolver and client a resolved config describes. A mapping
    /// file takes precedence over the remote lookup service.
    pub fn from_config(config: &ActionConfig) -> Result<Self, CoreError> {
        let resolver: Arc<dyn IdentityResolver> =
            match (&config.identity.mapping_file, &config.orcid) {
                (Some(path), _) => Arc::new(StaticIdentityResolver::load(path)?),
                (None, Some(orcid)) => {
                    let token = orcid.token.clone().ok_or_else(|| ConfigError::EnvVarMissing {
                        var: orcid.token_env.clone(),
                        field: "orcid.token_env".into(),
                    })?;
                    Arc::new(RemoteIdentityResolver::new(orcid.endpoint.clone(), token))
                }
                (None, None) => {
                    return Err(ConfigError::MissingInput("orcid_api_endpoint".into()).into())
                }
            };

        let token = config
            .apicuron
            .token
            .clone()
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: config.apicuron.token_env.clone(),
                field: "apicuron.token_env".into(),
            })?;
        let client = ApicuronClient::new(config.apicuron.endpoint.clone(), token);

        Ok(Self::new(resolver, client))
    }

    /// Turn configured report values into per-run settings, deriving the
    /// resource id from the event's repository when none is configured.
    pub fn settings_for(report: &ReportConfig, event: &PushEvent) -> ReportSettings {
        let configured = report.resource_id.as_deref();
        let resource_id = match &event.repository {
            Some(repo) => derive_resource_id(configured, repo),
            None => configured.unwrap_or_default().to_string(),
        };
        ReportSettings {
            activity_term: report.activity_term.clone(),
            league: report.league.clone(),
            resource_id,
            resource_url: report.resource_url.clone(),
        }
    }

    pub async fn run(
        &self,
        event: &PushEvent,
        report: &ReportConfig,
        mode: SubmitMode,
    ) -> Result<RunSummary, CoreError> {
        let settings = Self::settings_for(report, event);
        let reports = self.assembler.assemble(event, &settings).await?;

        if reports.is_empty() {
            info!("no reports to submit");
            return Ok(RunSummary {
                reports,
                submitted: false,
            });
        }

        if mode == SubmitMode::DryRun {
            info!(count = reports.len(), "dry run, not submitting reports");
            return Ok(RunSummary {
                reports,
                submitted: false,
            });
        }

        self.client.send_reports(&reports).await?;
        Ok(RunSummary {
            reports,
            submitted: true,
        })
    }
}
