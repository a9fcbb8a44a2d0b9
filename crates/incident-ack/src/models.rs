//! Incident data shapes.
//!
//! `Incident` is the point-in-time view of a remote incident; `AlertGroup`
//! and `AlertSummary` are derived per run and `BatchResult` carries the
//! mutation counters. The `Wire*` types mirror the JSON that grpcurl prints.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Label used when an incident carries no `alert_name` label.
pub const UNKNOWN_ALERT: &str = "Unknown";

/// Server-side incident state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IncidentState {
    #[serde(rename = "INCIDENT_STATE_TRIGGERED")]
    Triggered,
    #[serde(rename = "INCIDENT_STATE_RESOLVED")]
    Resolved,
    #[serde(other)]
    Unknown,
}

impl IncidentState {
    /// Enum name as the API expects it in request filters.
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Triggered => "INCIDENT_STATE_TRIGGERED",
            Self::Resolved => "INCIDENT_STATE_RESOLVED",
            Self::Unknown => "INCIDENT_STATE_UNSPECIFIED",
        }
    }
}

impl fmt::Display for IncidentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triggered => write!(f, "TRIGGERED"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Acknowledgement status of an incident.
///
/// `Triggered` is the unacknowledged status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IncidentStatus {
    #[serde(rename = "INCIDENT_STATUS_TRIGGERED")]
    Triggered,
    #[serde(rename = "INCIDENT_STATUS_ACKNOWLEDGED")]
    Acknowledged,
    #[serde(rename = "INCIDENT_STATUS_RESOLVED")]
    Resolved,
    #[serde(other)]
    Unknown,
}

impl IncidentStatus {
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Triggered => "INCIDENT_STATUS_TRIGGERED",
            Self::Acknowledged => "INCIDENT_STATUS_ACKNOWLEDGED",
            Self::Resolved => "INCIDENT_STATUS_RESOLVED",
            Self::Unknown => "INCIDENT_STATUS_UNSPECIFIED",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triggered => write!(f, "TRIGGERED"),
            Self::Acknowledged => write!(f, "ACKNOWLEDGED"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Incident severity as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Severity {
    #[serde(rename = "INCIDENT_SEVERITY_INFO")]
    Info,
    #[serde(rename = "INCIDENT_SEVERITY_LOW")]
    Low,
    #[serde(rename = "INCIDENT_SEVERITY_WARNING")]
    Warning,
    #[serde(rename = "INCIDENT_SEVERITY_ERROR")]
    Error,
    #[serde(rename = "INCIDENT_SEVERITY_CRITICAL")]
    Critical,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Low => write!(f, "LOW"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A remote incident as seen by one list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub id: String,
    pub alert_name: String,
    pub state: IncidentState,
    pub status: IncidentStatus,
    pub severity: Severity,
    /// `None` when the server sent no timestamp or an unparsable one
    pub created_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Convert a wire incident; incidents without an id are unusable.
    pub(crate) fn from_wire(wire: WireIncident) -> Option<Self> {
        let id = wire.id.filter(|id| !id.is_empty())?;
        let alert_name = wire
            .contextual_labels
            .as_ref()
            .and_then(|labels| labels.get("alert_name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_ALERT)
            .to_string();
        let created_at = wire.created_at.as_deref().and_then(parse_timestamp);

        Some(Self {
            id,
            alert_name,
            state: wire.state.unwrap_or(IncidentState::Unknown),
            status: wire.status.unwrap_or(IncidentStatus::Unknown),
            severity: wire.severity.unwrap_or(Severity::Unknown),
            created_at,
        })
    }
}

/// Parse an RFC 3339 timestamp into UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Incidents sharing one alert name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertGroup {
    pub alert_name: String,
    /// Severity of the most recently created member
    pub severity: Severity,
    /// Newest creation timestamp among members
    pub latest: Option<DateTime<Utc>>,
    /// Member ids in input order
    pub incident_ids: Vec<String>,
}

impl AlertGroup {
    #[must_use]
    pub fn count(&self) -> usize {
        self.incident_ids.len()
    }
}

/// Groups in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertSummary {
    pub groups: Vec<AlertGroup>,
}

impl AlertSummary {
    /// Number of incidents across all groups.
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.iter().map(AlertGroup::count).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn get(&self, alert_name: &str) -> Option<&AlertGroup> {
        self.groups.iter().find(|g| g.alert_name == alert_name)
    }

    /// All member ids, group by group.
    #[must_use]
    pub fn incident_ids(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| g.incident_ids.iter().cloned())
            .collect()
    }
}

/// Counters for one mutation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

impl BatchResult {
    pub fn record_success(&mut self, count: usize) {
        self.succeeded += count;
        self.total += count;
    }

    pub fn record_failure(&mut self, count: usize) {
        self.failed += count;
        self.total += count;
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

// Wire types

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireIncident {
    pub id: Option<String>,
    pub state: Option<IncidentState>,
    pub status: Option<IncidentStatus>,
    pub severity: Option<Severity>,
    #[serde(alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(alias = "contextual_labels")]
    pub contextual_labels: Option<HashMap<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListIncidentsResponse {
    #[serde(default)]
    pub incidents: Vec<WireIncident>,
    #[serde(alias = "next_page_token")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MutateIncidentsResponse {
    #[serde(default, alias = "failed_ids")]
    pub failed_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_incident_from_wire_full() {
        let wire: WireIncident = serde_json::from_value(json!({
            "id": "inc-1",
            "state": "INCIDENT_STATE_TRIGGERED",
            "status": "INCIDENT_STATUS_ACKNOWLEDGED",
            "severity": "INCIDENT_SEVERITY_CRITICAL",
            "createdAt": "2026-10-15T08:30:00.123Z",
            "contextualLabels": {"alert_name": "High latency", "team": "core"}
        }))
        .unwrap();

        let incident = Incident::from_wire(wire).unwrap();
        assert_eq!(incident.id, "inc-1");
        assert_eq!(incident.alert_name, "High latency");
        assert_eq!(incident.state, IncidentState::Triggered);
        assert_eq!(incident.status, IncidentStatus::Acknowledged);
        assert_eq!(incident.severity, Severity::Critical);
        assert_eq!(
            incident.created_at.unwrap().to_rfc3339(),
            "2026-10-15T08:30:00.123+00:00"
        );
    }

    #[test]
    fn test_incident_from_wire_defaults() {
        let wire: WireIncident = serde_json::from_value(json!({
            "id": "inc-2",
            "state": "INCIDENT_STATE_SOMETHING_NEW",
            "createdAt": "yesterday"
        }))
        .unwrap();

        let incident = Incident::from_wire(wire).unwrap();
        assert_eq!(incident.alert_name, UNKNOWN_ALERT);
        assert_eq!(incident.state, IncidentState::Unknown);
        assert_eq!(incident.status, IncidentStatus::Unknown);
        assert_eq!(incident.severity, Severity::Unknown);
        assert!(incident.created_at.is_none());
    }

    #[test]
    fn test_incident_without_id_is_dropped() {
        let wire: WireIncident = serde_json::from_value(json!({"id": ""})).unwrap();
        assert!(Incident::from_wire(wire).is_none());
        assert!(Incident::from_wire(WireIncident::default()).is_none());
    }

    #[test]
    fn test_list_response_page_token_forms() {
        let camel: ListIncidentsResponse =
            serde_json::from_value(json!({"incidents": [], "nextPageToken": "abc"})).unwrap();
        assert_eq!(camel.next_page_token.as_deref(), Some("abc"));

        let empty: ListIncidentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.incidents.is_empty());
        assert!(empty.next_page_token.is_none());
    }

    #[test]
    fn test_batch_result_counters() {
        let mut result = BatchResult::default();
        result.record_success(10);
        result.record_failure(3);
        result.record_success(2);
        assert_eq!(
            result,
            BatchResult {
                succeeded: 12,
                failed: 3,
                total: 15
            }
        );
        assert!(result.has_failures());
    }

    #[test]
    fn test_summary_ids_follow_group_order() {
        let summary = AlertSummary {
            groups: vec![
                AlertGroup {
                    alert_name: "b".into(),
                    severity: Severity::Info,
                    latest: None,
                    incident_ids: vec!["3".into(), "1".into()],
                },
                AlertGroup {
                    alert_name: "a".into(),
                    severity: Severity::Error,
                    latest: None,
                    incident_ids: vec!["2".into()],
                },
            ],
        };
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.incident_ids(), vec!["3", "1", "2"]);
        assert_eq!(summary.get("a").unwrap().count(), 1);
    }
}
