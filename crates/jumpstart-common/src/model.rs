use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default catalog model deployed when `--model-id` is omitted.
pub const DEFAULT_MODEL_ID: &str = "huggingface-llm-mistral-7b-v3";

/// `*` selects the newest version published in the catalog.
pub const DEFAULT_MODEL_VERSION: &str = "*";

/// Where the platform fetches model weights from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// A single `model.tar.gz` the container unpacks at startup.
    Archive { s3_uri: String },
    /// An uncompressed S3 prefix mounted into the container as-is.
    Prefix { s3_uri: String },
}

impl ModelArtifact {
    pub fn s3_uri(&self) -> &str {
        match self {
            ModelArtifact::Archive { s3_uri } | ModelArtifact::Prefix { s3_uri } => s3_uri,
        }
    }
}

/// Everything needed to register a model resource on the platform.
///
/// Built either from the JumpStart catalog or directly from
/// `--image-uri` / `--model-data`; discarded once the create call returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelSpec {
    /// Catalog identifier (e.g. "huggingface-llm-mistral-7b-v3").
    pub model_id: String,

    /// Resolved catalog version, or the version string given on the command line.
    pub model_version: String,

    /// Inference container image.
    pub image_uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ModelArtifact>,

    /// Container environment, ordered so requests are reproducible.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Gated models refuse to start unless their EULA is accepted.
    #[serde(default)]
    pub requires_eula: bool,

    #[serde(default)]
    pub accept_eula: bool,
}

/// One row of the platform's model listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelSummary {
    pub name: String,
    pub arn: String,
    pub creation_time: DateTime<Utc>,

    /// Endpoints whose configuration references this model. Only filled in
    /// when endpoints were listed in the same invocation.
    #[serde(default)]
    pub endpoints: Vec<String>,
}
