//! APICURON reporting API client.
//!
//! Sends a whole batch of attribution records in one `POST`. The API is
//! all-or-nothing per batch, and failure responses are not guaranteed to be
//! JSON, so the body is only parsed when the content type says so.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::{debug, error, info, instrument};

use crate::errors::SubmissionError;
use crate::models::{AttributionRecord, ReportBatch};

/// Value of the `version` header selecting the v2 report format.
pub const API_VERSION: &str = "2";

/// A response body, parsed as JSON when declared as such.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Interpret `raw` according to the declared `content_type`. A body that
    /// claims to be JSON but does not parse is kept as text.
    pub fn from_raw(content_type: &str, raw: String) -> Self {
        if content_type.contains("application/json") {
            if let Ok(value) = serde_json::from_str(&raw) {
                return Self::Json(value);
            }
        }
        Self::Text(raw)
    }
}

impl std::fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{}", value),
            Self::Text(text) => write!(f, "{:?}", text),
        }
    }
}

/// Client for the APICURON report submission endpoint.
#[derive(Clone)]
pub struct ApicuronClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl ApicuronClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, token)
    }

    pub fn with_client(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        info!(endpoint = %endpoint, "created ApicuronClient");
        Self {
            http,
            endpoint,
            token: token.into(),
        }
    }

    /// Submit `reports` as a single batch.
    ///
    /// An empty slice sends nothing and succeeds.
    #[instrument(skip(self, reports), fields(count = reports.len()))]
    pub async fn send_reports(&self, reports: &[AttributionRecord]) -> Result<(), SubmissionError> {
        if reports.is_empty() {
            info!("no reports to send");
            return Ok(());
        }

        info!(count = reports.len(), endpoint = %self.endpoint, "sending reports");

        let body = serde_json::to_vec(&ReportBatch::borrowed(reports))
            .map_err(|e| SubmissionError::Serialize(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("version", HeaderValue::from_static(API_VERSION));

        let resp = self
            .http
            .post(&self.endpoint)
            .headers(headers)
            .bearer_auth(&self.token)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to send reports");
                SubmissionError::Transport(e)
            })?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let raw = resp.text().await?;
        let body = ResponseBody::from_raw(&content_type, raw);

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("").to_string();
            error!(status = status.as_u16(), reason = %reason, "API error");
            error!(body = %body, "response body");
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                reason,
                body: body.to_string(),
            });
        }

        info!(count = reports.len(), "successfully sent reports");
        debug!(body = %body, "API response");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(orcid: &str, commit: &str) -> AttributionRecord {
        AttributionRecord {
            curator_orcid: orcid.into(),
            entity_uri: format!("https://github.com/org/repo/commit/{}", commit),
            resource_id: "org-repo".into(),
            timestamp: "2024-05-01T10:00:00Z".into(),
            activity_term: "commit".into(),
            league: "default".into(),
        }
    }

    fn client_for(server: &MockServer) -> ApicuronClient {
        ApicuronClient::new(format!("{}/api/reports/bulk", server.uri()), "tok")
    }

    #[tokio::test]
    async fn test_send_reports_wire_format() {
        let server = MockServer::start().await;
        let records = vec![record("0000-0000-0000-0001", "c1")];

        Mock::given(method("POST"))
            .and(path("/api/reports/bulk"))
            .and(header("authorization", "Bearer tok"))
            .and(header("version", "2"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "reports": records })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "accepted": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).send_reports(&records).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        client_for(&server).send_reports(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_plain_text_failure_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send_reports(&[record("0000-0000-0000-0001", "c1")])
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("500"));
        match err {
            SubmissionError::Rejected { reason, body, .. } => {
                assert_eq!(reason, "Internal Server Error");
                assert!(body.contains("upstream exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_failure_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "unknown activity" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send_reports(&[record("0000-0000-0000-0001", "c1")])
            .await
            .unwrap_err();
        match err {
            SubmissionError::Rejected { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("unknown activity"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let client = ApicuronClient::new("http://127.0.0.1:9/api/reports/bulk", "tok");
        let err = client
            .send_reports(&[record("0000-0000-0000-0001", "c1")])
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Transport(_)));
    }

    #[test]
    fn test_response_body_content_negotiation() {
        assert_eq!(
            ResponseBody::from_raw("application/json; charset=utf-8", r#"{"ok":true}"#.into()),
            ResponseBody::Json(json!({ "ok": true }))
        );
        assert_eq!(
            ResponseBody::from_raw("text/plain", r#"{"ok":true}"#.into()),
            ResponseBody::Text(r#"{"ok":true}"#.into())
        );
        assert_eq!(
            ResponseBody::from_raw("application/json", "Bad Gateway".into()),
            ResponseBody::Text("Bad Gateway".into())
        );
    }
}
