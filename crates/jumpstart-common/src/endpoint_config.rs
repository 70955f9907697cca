use serde::{Deserialize, Serialize};

/// Default compute for a deployment when `--instance-type` is omitted.
pub const DEFAULT_INSTANCE_TYPE: &str = "ml.g5.2xlarge";

/// Variant name the platform's own SDK uses for single-model endpoints.
pub const DEFAULT_VARIANT_NAME: &str = "AllTraffic";

/// Request to bind a model resource to compute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub name: String,
    pub model_name: String,
    pub variant_name: String,
    pub instance_type: String,
    pub instance_count: u32,

    /// Large models can take several minutes to load; the platform's
    /// default health-check window is too short for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_health_check_timeout_secs: Option<u32>,
}

/// One production variant of a described endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantDescription {
    pub variant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfigDescription {
    pub name: String,
    pub variants: Vec<VariantDescription>,
}

impl EndpointConfigDescription {
    /// Distinct model names referenced by the variants, in variant order.
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for variant in &self.variants {
            if let Some(name) = &variant.model_name {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}
