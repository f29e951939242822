use chrono::{DateTime, Utc};
use serde::Serialize;
use name_prober::ProbeError;
use shared::types::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    Probe,
    Reprobe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Names claimed as requested
    Claimed,
    /// Names claimed after renaming
    Renamed,
    Failed,
}

/// Result of one probing session, printed as one JSON line
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub instance: String,
    pub hostname: String,
    pub mode: ProbeMode,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionReport {
    pub fn new(
        requested: &Service,
        mode: ProbeMode,
        result: &Result<Service, ProbeError>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let (outcome, resolved, error) = match result {
            Ok(resolved) if resolved == requested => (Outcome::Claimed, Some(resolved), None),
            Ok(resolved) => (Outcome::Renamed, Some(resolved), None),
            Err(e) => (Outcome::Failed, None, Some(e.to_string())),
        };

        Self {
            instance: requested.service_instance_name(),
            hostname: requested.hostname(),
            mode,
            outcome,
            resolved_instance: resolved.map(Service::service_instance_name),
            resolved_hostname: resolved.map(Service::hostname),
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
