//! List filters for services and tasks
//!
//! Filters arrive as a JSON object mapping a key to accepted values, e.g.
//! `{"name": ["web"], "label": ["tier=front"]}`. An entity passes when it
//! matches any value of any category.

use super::service::Service;
use super::task::Task;
use std::collections::HashMap;

/// Filter key matching entity IDs
pub const FILTER_ID: &str = "id";
/// Filter key matching service names
pub const FILTER_NAME: &str = "name";
/// Filter key matching a task's service ID or name
pub const FILTER_SERVICE: &str = "service";
/// Filter key matching a task's node ID
pub const FILTER_NODE: &str = "node";
/// Filter key matching service labels (`key` or `key=value`)
pub const FILTER_LABEL: &str = "label";
/// Filter key matching a task's desired state
pub const FILTER_DESIRED_STATE: &str = "desired-state";

/// Parsed list filters. `None` means no filtering.
#[derive(Debug, Clone, Default)]
pub struct Filters(Option<HashMap<String, Vec<String>>>);

impl Filters {
    /// No filtering
    pub fn none() -> Self {
        Self(None)
    }

    /// Parse the raw `filters` query value.
    ///
    /// Absent, unparsable or `null` input disables filtering.
    pub fn parse(raw: Option<&str>) -> Self {
        let parsed = raw.and_then(|raw| {
            serde_json::from_str::<Option<HashMap<String, Vec<String>>>>(raw)
                .map_err(|e| tracing::debug!("Ignoring unparsable filters {:?}: {}", raw, e))
                .ok()
                .flatten()
        });
        Self(parsed)
    }

    /// Check whether filtering is active
    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }

    fn values(&self, key: &str) -> &[String] {
        self.0
            .as_ref()
            .and_then(|m| m.get(key))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Check whether a service passes the filters
    pub fn matches_service(&self, service: &Service) -> bool {
        if !self.is_active() {
            return true;
        }
        in_filter(self.values(FILTER_ID), &service.id)
            || in_filter(self.values(FILTER_NAME), &service.spec.name)
    }

    /// Check whether a task, owned by `service`, passes the filters
    pub fn matches_task(&self, task: &Task, service: &Service) -> bool {
        if !self.is_active() {
            return true;
        }
        in_filter(self.values(FILTER_ID), &task.id)
            || in_filter(self.values(FILTER_SERVICE), &task.service_id)
            || in_filter(self.values(FILTER_SERVICE), &service.spec.name)
            || in_filter(self.values(FILTER_NODE), &task.node_id)
            || in_filter(self.values(FILTER_DESIRED_STATE), task.desired_state.as_str())
            || in_label_filter(self.values(FILTER_LABEL), &service.spec.labels)
    }
}

impl From<HashMap<String, Vec<String>>> for Filters {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self(Some(map))
    }
}

fn in_filter(list: &[String], wanted: &str) -> bool {
    list.iter().any(|item| item == wanted)
}

fn in_label_filter(list: &[String], labels: &HashMap<String, String>) -> bool {
    list.iter().any(|item| match item.split_once('=') {
        Some((key, value)) => labels.get(key).map(|v| v == value).unwrap_or(false),
        None => labels.contains_key(item.as_str()),
    })
}
