use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use semver::{Version, VersionReq};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use jumpstart_common::{ModelArtifact, ModelSpec, PlatformError, PlatformResult};

use crate::types::{CatalogQuery, ModelCatalog};

const MANIFEST_KEY: &str = "models_manifest.json";

/// One line of the hub manifest.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub model_id: String,
    pub version: String,
    pub spec_key: String,
    #[serde(default)]
    pub min_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EnvironmentVariable {
    name: String,
    #[serde(default)]
    default: Option<serde_json::Value>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VariantProperties {
    #[serde(default)]
    image_uri: Option<String>,
    #[serde(default)]
    environment_variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Variant {
    #[serde(default)]
    regional_properties: VariantProperties,
    #[serde(default)]
    properties: VariantProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct InstanceTypeVariants {
    /// region → alias → image URI
    #[serde(default)]
    regional_aliases: HashMap<String, HashMap<String, String>>,
    /// keyed by full instance type ("ml.g5.2xlarge") or family ("g5")
    #[serde(default)]
    variants: HashMap<String, Variant>,
}

/// The subset of a hub model spec document needed to host the model.
#[derive(Debug, Clone, Deserialize)]
pub struct HubModelSpec {
    pub model_id: String,
    pub version: String,
    #[serde(default)]
    hosting_artifact_key: Option<String>,
    #[serde(default)]
    hosting_prepacked_artifact_key: Option<String>,
    #[serde(default)]
    hosting_artifact_s3_data_type: Option<String>,
    #[serde(default)]
    hosting_artifact_compression_type: Option<String>,
    #[serde(default)]
    hosting_eula_key: Option<String>,
    #[serde(default)]
    gated_bucket: bool,
    #[serde(default)]
    inference_environment_variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    hosting_instance_type_variants: Option<InstanceTypeVariants>,
    #[serde(default)]
    pub default_inference_instance_type: Option<String>,
    #[serde(default)]
    pub supported_inference_instance_types: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    deprecate_warn_message: Option<String>,
}

/// "ml.g5.2xlarge" → "g5"
fn instance_family(instance_type: &str) -> Option<&str> {
    instance_type.split('.').nth(1)
}

fn env_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl HubModelSpec {
    fn bucket(&self, region: &str) -> String {
        if self.gated_bucket {
            format!("jumpstart-private-cache-prod-{region}")
        } else {
            format!("jumpstart-cache-prod-{region}")
        }
    }

    /// Variants in lookup order: family first, exact instance type last so
    /// that its settings win when merged.
    fn variants_for<'a>(&'a self, instance_type: &str) -> Vec<&'a Variant> {
        let Some(table) = &self.hosting_instance_type_variants else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if let Some(v) = instance_family(instance_type).and_then(|f| table.variants.get(f)) {
            out.push(v);
        }
        if let Some(v) = table.variants.get(instance_type) {
            out.push(v);
        }
        out
    }

    fn image_uri(&self, region: &str, instance_type: &str) -> PlatformResult<String> {
        let raw = self
            .variants_for(instance_type)
            .iter()
            .rev()
            .find_map(|v| v.regional_properties.image_uri.clone())
            .ok_or_else(|| {
                PlatformError::Catalog(format!(
                    "{} has no inference image for instance type {instance_type}; pass --image-uri",
                    self.model_id
                ))
            })?;

        let Some(alias) = raw.strip_prefix('$') else {
            return Ok(raw);
        };
        self.hosting_instance_type_variants
            .as_ref()
            .and_then(|t| t.regional_aliases.get(region))
            .and_then(|aliases| aliases.get(alias))
            .cloned()
            .ok_or_else(|| {
                PlatformError::Catalog(format!(
                    "{} is not available in {region} (no '{alias}' image alias)",
                    self.model_id
                ))
            })
    }

    fn artifact(&self, region: &str) -> Option<ModelArtifact> {
        let key = self
            .hosting_prepacked_artifact_key
            .as_deref()
            .or(self.hosting_artifact_key.as_deref())?;
        let s3_uri = format!("s3://{}/{}", self.bucket(region), key);

        let uncompressed = self.hosting_artifact_compression_type.as_deref() == Some("None")
            || self.hosting_artifact_s3_data_type.as_deref() == Some("S3Prefix")
            || key.ends_with('/');
        Some(if uncompressed {
            ModelArtifact::Prefix { s3_uri }
        } else {
            ModelArtifact::Archive { s3_uri }
        })
    }

    fn environment(&self, instance_type: &str) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        for var in &self.inference_environment_variables {
            if !matches!(var.scope.as_deref(), None | Some("container")) {
                continue;
            }
            if let Some(default) = &var.default {
                env.insert(var.name.clone(), env_value(default));
            }
        }
        for variant in self.variants_for(instance_type) {
            env.extend(
                variant
                    .properties
                    .environment_variables
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        env
    }

    /// Build the deployable spec for `query` in `region`.
    pub fn to_model_spec(&self, query: &CatalogQuery, region: &str) -> PlatformResult<ModelSpec> {
        let requires_eula = self.hosting_eula_key.is_some();
        if requires_eula && !query.accept_eula {
            let eula = self.hosting_eula_key.as_deref().unwrap_or_default();
            return Err(PlatformError::InvalidRequest(format!(
                "{} is gated by a license (s3://{}/{eula}); re-run with --accept-eula true",
                self.model_id,
                self.bucket(region)
            )));
        }

        Ok(ModelSpec {
            model_id: self.model_id.clone(),
            model_version: self.version.clone(),
            image_uri: self.image_uri(region, &query.instance_type)?,
            artifact: self.artifact(region),
            environment: self.environment(&query.instance_type),
            requires_eula,
            accept_eula: query.accept_eula,
        })
    }
}

/// Pick the manifest entry for `model_id` matching `requested`.
///
/// Versions containing `*` are wildcards (`*`, `1.*`, `2.1.*`) resolved to the
/// highest matching release; anything else must match exactly.
pub fn select_version<'a>(
    entries: &'a [ManifestEntry],
    model_id: &str,
    requested: &str,
) -> PlatformResult<&'a ManifestEntry> {
    let mut candidates = entries.iter().filter(|e| e.model_id == model_id).peekable();
    if candidates.peek().is_none() {
        return Err(PlatformError::NotFound {
            kind: "catalog model",
            name: model_id.to_string(),
        });
    }

    let selected = if requested.contains('*') {
        let req = VersionReq::parse(requested).map_err(|e| {
            PlatformError::InvalidRequest(format!("invalid model version '{requested}': {e}"))
        })?;
        candidates
            .filter_map(|e| Version::parse(&e.version).ok().map(|v| (v, e)))
            .filter(|(v, _)| req.matches(v))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, e)| e)
    } else {
        candidates.find(|e| e.version == requested)
    };

    selected.ok_or_else(|| PlatformError::NotFound {
        kind: "catalog model version",
        name: format!("{model_id}@{requested}"),
    })
}

/// Resolves models against the public JumpStart hub bucket of one region.
#[derive(Debug, Clone)]
pub struct JumpStartCatalog {
    http: reqwest::Client,
    region: String,
    base_url: String,
}

impl JumpStartCatalog {
    pub fn new(region: &str) -> PlatformResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PlatformError::Catalog(format!("http client: {e}")))?;
        Ok(Self {
            http,
            region: region.to_string(),
            base_url: format!("https://jumpstart-cache-prod-{region}.s3.{region}.amazonaws.com"),
        })
    }

    /// Serve the manifest and spec documents from somewhere else (a mirror).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_json<T: DeserializeOwned>(&self, key: &str) -> PlatformResult<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), key);
        tracing::debug!(%url, "fetching catalog document");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PlatformError::Catalog(format!("GET {url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(PlatformError::Catalog(format!("GET {url}: {}", resp.status())));
        }
        resp.json()
            .await
            .map_err(|e| PlatformError::Catalog(format!("decode {url}: {e}")))
    }
}

#[async_trait]
impl ModelCatalog for JumpStartCatalog {
    async fn resolve(&self, query: &CatalogQuery) -> PlatformResult<ModelSpec> {
        let manifest: Vec<ManifestEntry> = self.fetch_json(MANIFEST_KEY).await?;
        let entry = select_version(&manifest, &query.model_id, &query.model_version)?;
        let spec: HubModelSpec = self.fetch_json(&entry.spec_key).await?;

        if spec.deprecated {
            tracing::warn!(
                model_id = %spec.model_id,
                message = spec.deprecate_warn_message.as_deref().unwrap_or("model is deprecated"),
                "deploying deprecated catalog model"
            );
        }
        if !spec.supported_inference_instance_types.is_empty()
            && !spec
                .supported_inference_instance_types
                .contains(&query.instance_type)
        {
            tracing::warn!(
                instance_type = %query.instance_type,
                default = spec.default_inference_instance_type.as_deref().unwrap_or("-"),
                "instance type is not listed as supported for this model"
            );
        }

        tracing::info!(
            model_id = %spec.model_id,
            version = %spec.version,
            region = %self.region,
            "resolved catalog model"
        );
        spec.to_model_spec(query, &self.region)
    }
}

/// A model given entirely on the command line; no hub lookup.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    pub image_uri: String,
    pub artifact: Option<ModelArtifact>,
}

#[async_trait]
impl ModelCatalog for StaticCatalog {
    async fn resolve(&self, query: &CatalogQuery) -> PlatformResult<ModelSpec> {
        Ok(ModelSpec {
            model_id: query.model_id.clone(),
            model_version: query.model_version.clone(),
            image_uri: self.image_uri.clone(),
            artifact: self.artifact.clone(),
            environment: BTreeMap::new(),
            requires_eula: false,
            accept_eula: query.accept_eula,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISTRAL_SPEC: &str = r#"{
        "model_id": "huggingface-llm-mistral-7b-v3",
        "version": "1.2.0",
        "hosting_artifact_key": "huggingface-llm/huggingface-llm-mistral-7b-v3/artifacts/inference/v1.0.0/",
        "hosting_artifact_s3_data_type": "S3Prefix",
        "hosting_artifact_compression_type": "None",
        "hosting_eula_key": "fmhMetadata/eula/mistralEula.txt",
        "inference_environment_variables": [
            {"name": "SAGEMAKER_PROGRAM", "type": "text", "default": "inference.py", "scope": "container"},
            {"name": "SAGEMAKER_MODEL_SERVER_TIMEOUT", "type": "text", "default": 3600, "scope": "container"},
            {"name": "ENDPOINT_SERVER_TIMEOUT", "type": "int", "default": 3600, "scope": "container"},
            {"name": "SAGEMAKER_SUBMIT_DIRECTORY", "type": "text", "default": "/opt/ml/model/code", "scope": "script"}
        ],
        "hosting_instance_type_variants": {
            "regional_aliases": {
                "us-east-1": {"gpu_ecr_uri_1": "763104351884.dkr.ecr.us-east-1.amazonaws.com/huggingface-pytorch-tgi-inference:2.1.1-tgi2.0.0-gpu-py310-cu121-ubuntu22.04"}
            },
            "variants": {
                "g5": {"regional_properties": {"image_uri": "$gpu_ecr_uri_1"}},
                "ml.g5.2xlarge": {"properties": {"environment_variables": {"SM_NUM_GPUS": "1"}}},
                "ml.g5.12xlarge": {"properties": {"environment_variables": {"SM_NUM_GPUS": "4"}}}
            }
        },
        "default_inference_instance_type": "ml.g5.2xlarge",
        "supported_inference_instance_types": ["ml.g5.2xlarge", "ml.g5.12xlarge"]
    }"#;

    fn query(instance_type: &str, accept_eula: bool) -> CatalogQuery {
        CatalogQuery {
            model_id: "huggingface-llm-mistral-7b-v3".to_string(),
            model_version: "*".to_string(),
            instance_type: instance_type.to_string(),
            accept_eula,
        }
    }

    fn entry(id: &str, version: &str) -> ManifestEntry {
        ManifestEntry {
            model_id: id.to_string(),
            version: version.to_string(),
            spec_key: format!("specs/{id}/{version}.json"),
            min_version: None,
        }
    }

    #[test]
    fn test_select_latest_version() {
        let manifest = vec![
            entry("a", "1.1.6"),
            entry("a", "1.10.0"),
            entry("a", "2.0.1"),
            entry("b", "9.0.0"),
        ];
        assert_eq!(select_version(&manifest, "a", "*").unwrap().version, "2.0.1");
        assert_eq!(select_version(&manifest, "a", "1.*").unwrap().version, "1.10.0");
        assert_eq!(select_version(&manifest, "a", "1.1.6").unwrap().version, "1.1.6");
    }

    #[test]
    fn test_select_version_misses() {
        let manifest = vec![entry("a", "1.0.0")];
        assert!(select_version(&manifest, "missing", "*").unwrap_err().is_not_found());
        assert!(select_version(&manifest, "a", "3.0.0").unwrap_err().is_not_found());
        assert!(select_version(&manifest, "a", "2.*").unwrap_err().is_not_found());
    }

    #[test]
    fn test_hub_spec_resolves_image_artifact_and_env() {
        let spec: HubModelSpec = serde_json::from_str(MISTRAL_SPEC).unwrap();
        let model = spec.to_model_spec(&query("ml.g5.2xlarge", true), "us-east-1").unwrap();

        assert!(model.image_uri.contains("huggingface-pytorch-tgi-inference"));
        assert_eq!(
            model.artifact,
            Some(ModelArtifact::Prefix {
                s3_uri: "s3://jumpstart-cache-prod-us-east-1/huggingface-llm/huggingface-llm-mistral-7b-v3/artifacts/inference/v1.0.0/".to_string()
            })
        );
        assert_eq!(model.environment.get("SAGEMAKER_PROGRAM").map(String::as_str), Some("inference.py"));
        assert_eq!(model.environment.get("ENDPOINT_SERVER_TIMEOUT").map(String::as_str), Some("3600"));
        assert_eq!(model.environment.get("SM_NUM_GPUS").map(String::as_str), Some("1"));
        assert!(!model.environment.contains_key("SAGEMAKER_SUBMIT_DIRECTORY"));
        assert!(model.requires_eula && model.accept_eula);
        assert_eq!(model.model_version, "1.2.0");
    }

    #[test]
    fn test_exact_instance_variant_overrides_family() {
        let spec: HubModelSpec = serde_json::from_str(MISTRAL_SPEC).unwrap();
        let model = spec.to_model_spec(&query("ml.g5.12xlarge", true), "us-east-1").unwrap();
        assert_eq!(model.environment.get("SM_NUM_GPUS").map(String::as_str), Some("4"));
    }

    #[test]
    fn test_gated_model_requires_eula() {
        let spec: HubModelSpec = serde_json::from_str(MISTRAL_SPEC).unwrap();
        let err = spec.to_model_spec(&query("ml.g5.2xlarge", false), "us-east-1").unwrap_err();
        assert!(err.to_string().contains("--accept-eula"), "{err}");
    }

    #[test]
    fn test_unknown_region_or_family() {
        let spec: HubModelSpec = serde_json::from_str(MISTRAL_SPEC).unwrap();
        let err = spec.to_model_spec(&query("ml.g5.2xlarge", true), "eu-north-1").unwrap_err();
        assert!(err.to_string().contains("not available in eu-north-1"), "{err}");

        let err = spec.to_model_spec(&query("ml.p4d.24xlarge", true), "us-east-1").unwrap_err();
        assert!(err.to_string().contains("--image-uri"), "{err}");
    }

    #[test]
    fn test_compressed_artifact() {
        let spec: HubModelSpec = serde_json::from_str(
            r#"{
                "model_id": "pytorch-ic-mobilenet-v2",
                "version": "3.0.0",
                "hosting_artifact_key": "pytorch-infer/infer-pytorch-ic-mobilenet-v2.tar.gz",
                "hosting_instance_type_variants": {
                    "variants": {"m5": {"regional_properties": {"image_uri": "123.dkr.ecr/pytorch:1.10"}}}
                }
            }"#,
        )
        .unwrap();
        let model = spec.to_model_spec(&query("ml.m5.xlarge", false), "us-west-2").unwrap();
        assert_eq!(model.image_uri, "123.dkr.ecr/pytorch:1.10");
        assert!(matches!(model.artifact, Some(ModelArtifact::Archive { .. })));
        assert!(!model.requires_eula);
    }

    #[tokio::test]
    async fn test_static_catalog_passes_through() {
        let catalog = StaticCatalog {
            image_uri: "img:latest".to_string(),
            artifact: None,
        };
        let model = catalog.resolve(&query("ml.g5.2xlarge", true)).await.unwrap();
        assert_eq!(model.image_uri, "img:latest");
        assert_eq!(model.model_version, "*");
        assert!(model.environment.is_empty());
    }
}
