use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointSummary;
use crate::model::ModelSummary;

/// Which resource kinds a `list` invocation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    All,
    EndpointsOnly,
    ModelsOnly,
}

impl ListFilter {
    pub fn includes_endpoints(self) -> bool {
        !matches!(self, ListFilter::ModelsOnly)
    }

    pub fn includes_models(self) -> bool {
        !matches!(self, ListFilter::EndpointsOnly)
    }
}

/// Output of one `list` invocation.
///
/// A section is `None` when the filter excluded it, so JSON consumers can
/// tell "not queried" apart from "queried and empty".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<EndpointSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<ModelSummary>>,
}

impl ListingResult {
    pub fn endpoint_names(&self) -> Vec<&str> {
        self.endpoints
            .iter()
            .flatten()
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models
            .iter()
            .flatten()
            .map(|m| m.name.as_str())
            .collect()
    }
}
