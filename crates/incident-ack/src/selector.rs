//! # Incident Selector
//!
//! Pages through `ListIncidents`, applies the client-side filter and folds
//! the result into per-alert groups.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::Error;
use crate::models::{
    AlertGroup, AlertSummary, Incident, IncidentState, IncidentStatus, ListIncidentsResponse,
};
use crate::transport::{RpcMethod, Transport};

/// Selection criteria for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentFilter {
    pub state: IncidentState,
    pub status: Option<IncidentStatus>,
    /// Keep only incidents created at or after this instant
    pub since: Option<DateTime<Utc>>,
}

impl IncidentFilter {
    /// Filter described by the settings, anchored at `now`.
    #[must_use]
    pub fn from_settings(settings: &Settings, now: DateTime<Utc>) -> Self {
        Self {
            state: settings.state_filter,
            status: settings.status_filter,
            since: settings.since(now),
        }
    }

    /// Client-side predicate.
    ///
    /// With a time window, an incident without a usable timestamp is never
    /// kept since it cannot be shown to be inside the window.
    #[must_use]
    pub fn matches(&self, incident: &Incident) -> bool {
        if incident.state != self.state {
            return false;
        }
        if let Some(status) = self.status {
            if incident.status != status {
                return false;
            }
        }
        match (self.since, incident.created_at) {
            (None, _) => true,
            (Some(since), Some(created)) => created >= since,
            (Some(_), None) => false,
        }
    }

    fn request(&self, page_token: Option<&str>) -> Value {
        let mut filter = json!({ "state": [self.state.as_wire()] });
        if let Some(status) = self.status {
            filter["status"] = json!([status.as_wire()]);
        }
        let mut request = json!({ "filter": filter });
        if let Some(token) = page_token {
            request["page_token"] = json!(token);
        }
        request
    }
}

/// Reads incidents through a [`Transport`].
pub struct IncidentSelector<'a, T: ?Sized> {
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> IncidentSelector<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Fetch every page and keep the incidents matching `filter`, in the
    /// order the server returned them.
    ///
    /// Any failure aborts the listing; a partial list is never returned.
    pub async fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, Error> {
        let mut selected = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        let mut fetched = 0usize;

        loop {
            let response = self
                .transport
                .invoke(RpcMethod::ListIncidents, filter.request(page_token.as_deref()))
                .await?;
            let page: ListIncidentsResponse = serde_json::from_value(response).map_err(|e| {
                Error::transport(
                    RpcMethod::ListIncidents.name(),
                    format!("unexpected response shape: {e}"),
                )
            })?;
            pages += 1;
            fetched += page.incidents.len();

            for wire in page.incidents {
                match Incident::from_wire(wire) {
                    Some(incident) if filter.matches(&incident) => selected.push(incident),
                    Some(incident) => {
                        debug!(id = %incident.id, "Incident does not match filter");
                    }
                    None => warn!("Skipping incident without an id"),
                }
            }

            let next = page.next_page_token.filter(|t| !t.is_empty());
            match next {
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    return Err(Error::transport(
                        RpcMethod::ListIncidents.name(),
                        format!("pagination did not advance past token {token}"),
                    ));
                }
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(
            pages,
            fetched,
            selected = selected.len(),
            "Listed incidents"
        );
        Ok(selected)
    }
}

/// Group incidents by alert name, keeping first-appearance order.
///
/// A group's severity is that of its most recently created member; on a
/// timestamp tie the member seen first wins.
#[must_use]
pub fn group_by_alert(incidents: &[Incident]) -> AlertSummary {
    let mut groups: Vec<AlertGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for incident in incidents {
        if let Some(&slot) = index.get(incident.alert_name.as_str()) {
            let group = &mut groups[slot];
            group.incident_ids.push(incident.id.clone());
            if incident.created_at > group.latest {
                group.latest = incident.created_at;
                group.severity = incident.severity;
            }
        } else {
            index.insert(incident.alert_name.as_str(), groups.len());
            groups.push(AlertGroup {
                alert_name: incident.alert_name.clone(),
                severity: incident.severity,
                latest: incident.created_at,
                incident_ids: vec![incident.id.clone()],
            });
        }
    }

    AlertSummary { groups }
}
