use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use jumpstart_common::naming::{resource_name, validate_name};
use jumpstart_common::{
    EndpointConfig, EndpointDescription, EndpointStatus, ModelArtifact, ModelSpec,
    DEFAULT_VARIANT_NAME,
};
use jumpstart_platform::{CatalogQuery, JumpStartCatalog, ModelCatalog, Platform, StaticCatalog};

use crate::args::DeployArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

/// A validated deploy invocation. Building one makes no remote calls.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub query: CatalogQuery,
    pub role_arn: String,
    pub endpoint_name: Option<String>,
    pub instance_count: u32,
    pub environment: Vec<(String, String)>,
    pub startup_timeout_secs: Option<u32>,
    pub wait: Option<WaitPolicy>,
}

/// What a deploy created. Model, endpoint config and endpoint share `name`.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub name: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub spec: ModelSpec,
    /// Settled status when the deploy waited for completion.
    pub endpoint: Option<EndpointDescription>,
}

impl DeployArgs {
    pub fn to_request(&self) -> Result<DeployRequest> {
        let role_arn = self
            .role
            .clone()
            .filter(|r| !r.is_empty())
            .context("an execution role is required: pass --role or set JUMPSTART_ROLE_ARN")?;

        if let Some(name) = &self.endpoint_name {
            validate_name(name)
                .map_err(|e| anyhow::anyhow!("invalid --endpoint-name '{name}': {e}"))?;
        }

        let wait = self.wait.then(|| WaitPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        });

        Ok(DeployRequest {
            query: CatalogQuery {
                model_id: self.model_id.clone(),
                model_version: self.model_version.clone(),
                instance_type: self.instance_type.clone(),
                accept_eula: self.accept_eula,
            },
            role_arn,
            endpoint_name: self.endpoint_name.clone(),
            instance_count: self.instance_count,
            environment: self.env.clone(),
            startup_timeout_secs: self.startup_timeout_secs,
            wait,
        })
    }

    /// Hub lookup unless the image was given explicitly.
    pub fn catalog(&self, region: &str) -> Result<Box<dyn ModelCatalog>> {
        match &self.image_uri {
            Some(image_uri) => Ok(Box::new(StaticCatalog {
                image_uri: image_uri.clone(),
                artifact: self.model_data.as_deref().map(parse_artifact),
            })),
            None => {
                let mut catalog = JumpStartCatalog::new(region)?;
                if let Some(url) = &self.catalog_url {
                    catalog = catalog.with_base_url(url.clone());
                }
                Ok(Box::new(catalog))
            }
        }
    }
}

/// `.tar.gz` objects are archives; anything else is treated as a prefix.
pub fn parse_artifact(s3_uri: &str) -> ModelArtifact {
    if s3_uri.ends_with(".tar.gz") {
        ModelArtifact::Archive {
            s3_uri: s3_uri.to_string(),
        }
    } else {
        ModelArtifact::Prefix {
            s3_uri: s3_uri.to_string(),
        }
    }
}

pub async fn deploy(
    platform: &dyn Platform,
    catalog: &dyn ModelCatalog,
    request: &DeployRequest,
    now: DateTime<Utc>,
) -> Result<Deployment> {
    let query = &request.query;
    tracing::info!(
        model_id = %query.model_id,
        model_version = %query.model_version,
        instance_type = %query.instance_type,
        "deploying model"
    );

    let mut spec = catalog
        .resolve(query)
        .await
        .with_context(|| format!("resolving {}@{}", query.model_id, query.model_version))?;
    spec.environment.extend(request.environment.iter().cloned());

    let name = match &request.endpoint_name {
        Some(name) => name.clone(),
        None => resource_name(&spec.model_id, now),
    };

    platform
        .create_model(&name, &request.role_arn, &spec)
        .await
        .with_context(|| format!("creating model {name}"))?;
    tracing::info!(model = %name, image = %spec.image_uri, "model created");

    let config = EndpointConfig {
        name: name.clone(),
        model_name: name.clone(),
        variant_name: DEFAULT_VARIANT_NAME.to_string(),
        instance_type: query.instance_type.clone(),
        instance_count: request.instance_count,
        startup_health_check_timeout_secs: request.startup_timeout_secs,
    };
    platform
        .create_endpoint_config(&config)
        .await
        .with_context(|| format!("creating endpoint config {name} (model {name} was created)"))?;
    tracing::info!(endpoint_config = %name, "endpoint config created");

    platform.create_endpoint(&name, &name).await.with_context(|| {
        format!("creating endpoint {name} (model and endpoint config {name} were created)")
    })?;
    tracing::info!(endpoint = %name, "endpoint creation started");

    let endpoint = match request.wait {
        Some(policy) => Some(wait_for_endpoint(platform, &name, policy).await?),
        None => None,
    };

    Ok(Deployment {
        name,
        instance_type: query.instance_type.clone(),
        instance_count: request.instance_count,
        spec,
        endpoint,
    })
}

/// Poll at a fixed interval until the endpoint settles. Anything other than
/// `InService` is an error carrying the platform's failure reason.
pub async fn wait_for_endpoint(
    platform: &dyn Platform,
    name: &str,
    policy: WaitPolicy,
) -> Result<EndpointDescription> {
    let start = tokio::time::Instant::now();
    loop {
        let desc = platform.describe_endpoint(name).await?;
        if !desc.status.is_transient() {
            if desc.status == EndpointStatus::InService {
                tracing::info!(
                    endpoint = %name,
                    elapsed_s = start.elapsed().as_secs(),
                    "endpoint in service"
                );
                return Ok(desc);
            }
            anyhow::bail!(
                "endpoint {name} ended in {}: {}",
                desc.status,
                desc.failure_reason.as_deref().unwrap_or("no reason reported")
            );
        }

        if start.elapsed() >= policy.timeout {
            anyhow::bail!(
                "endpoint {name} still {} after {}s; check later with `jumpstart list`",
                desc.status,
                policy.timeout.as_secs()
            );
        }
        tracing::debug!(endpoint = %name, status = %desc.status, "waiting for endpoint");
        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use clap::Parser;

    use jumpstart_common::DEFAULT_MODEL_ID;
    use jumpstart_platform::{Call, MemoryPlatform};

    use super::*;
    use crate::args::{Args, Command};
    use crate::testing::{fast_wait, FixedCatalog};

    fn deploy_args(extra: &[&str]) -> DeployArgs {
        let mut argv = vec!["jumpstart", "deploy", "--role", "arn:aws:iam::123:role/exec"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Deploy(d) => d,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 11, 16, 20, 36).unwrap()
    }

    #[tokio::test]
    async fn test_deploy_without_flags_uses_defaults() {
        let platform = MemoryPlatform::new();
        let catalog = FixedCatalog::default();
        let request = deploy_args(&[]).to_request().unwrap();

        let deployment = deploy(&platform, &catalog, &request, now()).await.unwrap();

        let name = "huggingface-llm-mistral-7b-v3-2025-02-11-16-20-36-000";
        assert_eq!(deployment.name, name);
        assert!(deployment.endpoint.is_none());

        let queries = catalog.queries().await;
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].model_id, DEFAULT_MODEL_ID);
        assert_eq!(queries[0].model_version, "*");

        let calls = platform.calls().await;
        assert_eq!(calls.len(), 3);
        match &calls[0] {
            Call::CreateModel { name: n, role_arn, spec } => {
                assert_eq!(n, name);
                assert_eq!(role_arn, "arn:aws:iam::123:role/exec");
                assert_eq!(spec.model_id, DEFAULT_MODEL_ID);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &calls[1] {
            Call::CreateEndpointConfig(cfg) => {
                assert_eq!(cfg.instance_type, "ml.g5.2xlarge");
                assert_eq!(cfg.instance_count, 1);
                assert_eq!(cfg.model_name, name);
                assert_eq!(cfg.variant_name, "AllTraffic");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            calls[2],
            Call::CreateEndpoint {
                name: name.to_string(),
                config_name: name.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_deploy_overrides_and_env() {
        let platform = MemoryPlatform::new();
        let catalog = FixedCatalog::default();
        let request = deploy_args(&[
            "--model-id",
            "meta-textgeneration-llama-3-8b",
            "--instance-type",
            "ml.g5.12xlarge",
            "--instance-count",
            "2",
            "--endpoint-name",
            "llama-prod",
            "--env",
            "MAX_TOTAL_TOKENS=8192",
        ])
        .to_request()
        .unwrap();

        let deployment = deploy(&platform, &catalog, &request, now()).await.unwrap();
        assert_eq!(deployment.name, "llama-prod");
        assert_eq!(deployment.instance_count, 2);
        assert_eq!(
            deployment.spec.environment.get("MAX_TOTAL_TOKENS").map(String::as_str),
            Some("8192")
        );
    }

    #[tokio::test]
    async fn test_deploy_waits_until_in_service() {
        let platform = MemoryPlatform::new().with_ready_after(2);
        let catalog = FixedCatalog::default();
        let mut request = deploy_args(&["--wait"]).to_request().unwrap();
        request.wait = Some(fast_wait());

        let deployment = deploy(&platform, &catalog, &request, now()).await.unwrap();
        let endpoint = deployment.endpoint.unwrap();
        assert_eq!(endpoint.status, EndpointStatus::InService);

        let describes = platform
            .calls()
            .await
            .iter()
            .filter(|c| matches!(c, Call::DescribeEndpoint(_)))
            .count();
        assert_eq!(describes, 3);
    }

    #[tokio::test]
    async fn test_deploy_wait_reports_failure_reason() {
        let platform =
            MemoryPlatform::new().with_creation_failure("CapacityError: no ml.g5.2xlarge");
        let catalog = FixedCatalog::default();
        let mut request = deploy_args(&[]).to_request().unwrap();
        request.wait = Some(fast_wait());

        let err = deploy(&platform, &catalog, &request, now()).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("ended in Failed"), "{msg}");
        assert!(msg.contains("CapacityError"), "{msg}");
    }

    #[tokio::test]
    async fn test_deploy_wait_times_out() {
        let platform = MemoryPlatform::new().with_ready_after(u32::MAX);
        let catalog = FixedCatalog::default();
        let mut request = deploy_args(&[]).to_request().unwrap();
        request.wait = Some(WaitPolicy {
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(5),
        });

        let err = deploy(&platform, &catalog, &request, now()).await.unwrap_err();
        assert!(err.to_string().contains("still Creating"), "{err}");
    }

    #[tokio::test]
    async fn test_name_collision_surfaces_platform_error() {
        let platform = MemoryPlatform::new();
        let catalog = FixedCatalog::default();
        let request = deploy_args(&["--endpoint-name", "taken"]).to_request().unwrap();

        deploy(&platform, &catalog, &request, now()).await.unwrap();
        let err = deploy(&platform, &catalog, &request, now()).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("creating model taken"), "{msg}");
        assert!(msg.contains("already existing model"), "{msg}");
    }

    #[test]
    fn test_missing_role_is_rejected_before_remote_calls() {
        let mut args = deploy_args(&[]);
        args.role = None;
        let err = args.to_request().unwrap_err();
        assert!(err.to_string().contains("--role"), "{err}");
    }

    #[test]
    fn test_invalid_endpoint_name_is_rejected() {
        let args = deploy_args(&["--endpoint-name", "bad_name"]);
        assert!(args.to_request().is_err());
    }

    #[test]
    fn test_parse_artifact() {
        assert!(matches!(
            parse_artifact("s3://bucket/model.tar.gz"),
            ModelArtifact::Archive { .. }
        ));
        assert!(matches!(
            parse_artifact("s3://bucket/weights/"),
            ModelArtifact::Prefix { .. }
        ));
    }
}
