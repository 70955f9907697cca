use std::fmt;

use serde::{Deserialize, Serialize};

/// Resource kinds removed by `delete`, in the order they are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Endpoint,
    EndpointConfig,
    Model,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Endpoint => "endpoint",
            ResourceKind::EndpointConfig => "endpoint config",
            ResourceKind::Model => "model",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum StepOutcome {
    Deleted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStep {
    pub kind: ResourceKind,
    pub name: String,
    pub outcome: StepOutcome,
}

/// Per-resource outcome of a `delete`.
///
/// There is no transaction across the platform calls, so once the endpoint is
/// gone every later step is attempted and recorded regardless of earlier
/// failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub endpoint_name: String,
    pub steps: Vec<DeleteStep>,
    /// Models left in place because of `--keep-model`.
    #[serde(default)]
    pub kept_models: Vec<String>,
}

impl DeleteReport {
    pub fn new(endpoint_name: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, kind: ResourceKind, name: &str, result: Result<(), String>) {
        let outcome = match result {
            Ok(()) => StepOutcome::Deleted,
            Err(e) => StepOutcome::Failed(e),
        };
        self.steps.push(DeleteStep {
            kind,
            name: name.to_string(),
            outcome,
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeleteStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Failed(_)))
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    /// True when something was removed and something else was not.
    pub fn is_partial(&self) -> bool {
        let deleted = self
            .steps
            .iter()
            .any(|s| s.outcome == StepOutcome::Deleted);
        deleted && !self.is_complete()
    }
}
