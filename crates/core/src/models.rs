//! Wire types sent to the APICURON reporting API.

use serde::{Deserialize, Serialize};

/// Default league when none is configured.
pub const DEFAULT_LEAGUE: &str = "default";

/// One credited activity, sent as an element of the `reports` array.
///
/// Records are only built for authors with a resolved ORCID, so every field
/// is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributionRecord {
    /// ORCID of the commit author.
    pub curator_orcid: String,
    /// URI of the credited commit.
    pub entity_uri: String,
    /// Resource (project) the activity is credited to.
    pub resource_id: String,
    /// ISO-8601 commit time, as found in the push event.
    pub timestamp: String,
    /// Activity label, e.g. `commit`.
    pub activity_term: String,
    /// Grouping label shared by every record of a run.
    pub league: String,
}

/// Request body for `POST <apicuron endpoint>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportBatch<'a> {
    pub reports: std::borrow::Cow<'a, [AttributionRecord]>,
}

impl<'a> ReportBatch<'a> {
    pub fn borrowed(reports: &'a [AttributionRecord]) -> Self {
        Self {
            reports: std::borrow::Cow::Borrowed(reports),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttributionRecord {
        AttributionRecord {
            curator_orcid: "0000-1111-2222-3333".into(),
            entity_uri: "https://example.com/org/repo/commit/c1".into(),
            resource_id: "org-repo".into(),
            timestamp: "2024-05-01T10:00:00+02:00".into(),
            activity_term: "commit".into(),
            league: DEFAULT_LEAGUE.into(),
        }
    }

    #[test]
    fn test_batch_wire_shape() {
        let records = vec![sample()];
        let value = serde_json::to_value(ReportBatch::borrowed(&records)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "reports": [{
                    "curator_orcid": "0000-1111-2222-3333",
                    "entity_uri": "https://example.com/org/repo/commit/c1",
                    "resource_id": "org-repo",
                    "timestamp": "2024-05-01T10:00:00+02:00",
                    "activity_term": "commit",
                    "league": "default"
                }]
            })
        );
    }

    #[test]
    fn test_batch_body_reproduces_records() {
        let records = vec![sample()];
        let body = serde_json::to_string(&ReportBatch::borrowed(&records)).unwrap();

        let decoded: ReportBatch<'static> = serde_json::from_str(&body).unwrap();
        assert_eq!(decoded.reports.as_ref(), records.as_slice());
    }
}
