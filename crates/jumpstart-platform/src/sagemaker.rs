use std::future::Future;

use async_trait::async_trait;
use aws_sdk_sagemaker::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sagemaker::primitives::DateTime as SdkDateTime;
use aws_sdk_sagemaker::types::{
    ContainerDefinition, ModelAccessConfig, ModelCompressionType, ModelDataSource,
    ProductionVariant, ProductionVariantInstanceType, S3ModelDataSource, S3ModelDataType,
};
use aws_sdk_sagemaker::Client;
use chrono::{DateTime, Utc};

use jumpstart_common::{
    EndpointConfig, EndpointConfigDescription, EndpointDescription, EndpointStatus,
    EndpointSummary, ModelArtifact, ModelSpec, ModelSummary, PlatformError, PlatformResult,
    VariantDescription,
};

use crate::types::Platform;

const PAGE_SIZE: i32 = 100;

/// Region and profile overrides; anything unset falls through to the
/// standard AWS configuration chain.
#[derive(Debug, Clone, Default)]
pub struct SageMakerOptions {
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// [`Platform`] backed by the SageMaker control-plane API.
#[derive(Debug, Clone)]
pub struct SageMakerPlatform {
    client: Client,
    region: String,
}

impl SageMakerPlatform {
    pub async fn connect(options: &SageMakerOptions) -> PlatformResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &options.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(profile) = &options.profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;

        let region = config.region().map(|r| r.to_string()).ok_or_else(|| {
            PlatformError::InvalidRequest(
                "no AWS region configured; pass --region or set AWS_REGION".to_string(),
            )
        })?;
        tracing::debug!(%region, "sagemaker client ready");

        Ok(Self {
            client: Client::new(&config),
            region,
        })
    }

    fn container(spec: &ModelSpec) -> PlatformResult<ContainerDefinition> {
        let mut container = ContainerDefinition::builder().image(&spec.image_uri);
        for (key, value) in &spec.environment {
            container = container.environment(key, value);
        }

        match &spec.artifact {
            None => {}
            Some(ModelArtifact::Archive { s3_uri }) if !spec.requires_eula => {
                container = container.model_data_url(s3_uri);
            }
            Some(artifact) => {
                let (data_type, compression) = match artifact {
                    ModelArtifact::Archive { .. } => {
                        (S3ModelDataType::S3Object, ModelCompressionType::Gzip)
                    }
                    ModelArtifact::Prefix { .. } => {
                        (S3ModelDataType::S3Prefix, ModelCompressionType::None)
                    }
                };
                let mut source = S3ModelDataSource::builder()
                    .s3_uri(artifact.s3_uri())
                    .s3_data_type(data_type)
                    .compression_type(compression);
                if spec.requires_eula {
                    let access = ModelAccessConfig::builder()
                        .accept_eula(spec.accept_eula)
                        .build();
                    source = source.model_access_config(access);
                }
                let source = source.build();
                container = container
                    .model_data_source(ModelDataSource::builder().s3_data_source(source).build());
            }
        }

        Ok(container.build())
    }
}

fn build_error(err: BuildError) -> PlatformError {
    PlatformError::InvalidRequest(err.to_string())
}

/// Map an SDK failure onto [`PlatformError`]. The API reports missing
/// resources as a `ValidationException` whose message starts with
/// "Could not find".
fn classify<E, R>(
    operation: &'static str,
    kind: &'static str,
    name: &str,
    err: SdkError<E, R>,
) -> PlatformError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = match err.message() {
        Some(m) => m.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };
    if code == "ValidationException" && message.contains("Could not find") {
        return PlatformError::NotFound {
            kind,
            name: name.to_string(),
        };
    }
    PlatformError::Service {
        operation,
        code,
        message,
    }
}

fn to_utc(t: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}

fn count(value: u32, what: &str) -> PlatformResult<i32> {
    i32::try_from(value)
        .map_err(|_| PlatformError::InvalidRequest(format!("{what} {value} out of range")))
}

/// Call `fetch` with each continuation token until a page comes back without
/// one, collecting every row. An empty token ends the listing too.
async fn drain_pages<T, F, Fut>(mut fetch: F) -> PlatformResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = PlatformResult<(Vec<T>, Option<String>)>>,
{
    let mut items = Vec::new();
    let mut next_token = None;
    loop {
        let (rows, token) = fetch(next_token.take()).await?;
        items.extend(rows);
        match token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => return Ok(items),
        }
    }
}

async fn endpoints_page(
    client: &Client,
    next_token: Option<String>,
) -> PlatformResult<(Vec<EndpointSummary>, Option<String>)> {
    let page = client
        .list_endpoints()
        .max_results(PAGE_SIZE)
        .set_next_token(next_token)
        .send()
        .await
        .map_err(|e| classify("ListEndpoints", "endpoint", "", e))?;

    let rows = page
        .endpoints()
        .iter()
        .map(|ep| EndpointSummary {
            name: ep.endpoint_name().unwrap_or_default().to_string(),
            arn: ep.endpoint_arn().unwrap_or_default().to_string(),
            status: EndpointStatus::parse(ep.endpoint_status().map(|s| s.as_str()).unwrap_or_default()),
            creation_time: ep.creation_time().and_then(to_utc).unwrap_or_default(),
            last_modified_time: ep.last_modified_time().and_then(to_utc).unwrap_or_default(),
            config_name: None,
            model_names: Vec::new(),
            orphaned: false,
        })
        .collect();
    Ok((rows, page.next_token().map(str::to_string)))
}

async fn models_page(
    client: &Client,
    next_token: Option<String>,
) -> PlatformResult<(Vec<ModelSummary>, Option<String>)> {
    let page = client
        .list_models()
        .max_results(PAGE_SIZE)
        .set_next_token(next_token)
        .send()
        .await
        .map_err(|e| classify("ListModels", "model", "", e))?;

    let rows = page
        .models()
        .iter()
        .map(|m| ModelSummary {
            name: m.model_name().unwrap_or_default().to_string(),
            arn: m.model_arn().unwrap_or_default().to_string(),
            creation_time: m.creation_time().and_then(to_utc).unwrap_or_default(),
            endpoints: Vec::new(),
        })
        .collect();
    Ok((rows, page.next_token().map(str::to_string)))
}

#[async_trait]
impl Platform for SageMakerPlatform {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create_model(
        &self,
        name: &str,
        role_arn: &str,
        spec: &ModelSpec,
    ) -> PlatformResult<()> {
        let container = Self::container(spec)?;
        self.client
            .create_model()
            .model_name(name)
            .execution_role_arn(role_arn)
            .primary_container(container)
            .send()
            .await
            .map_err(|e| classify("CreateModel", "model", name, e))?;
        Ok(())
    }

    async fn create_endpoint_config(&self, config: &EndpointConfig) -> PlatformResult<()> {
        let startup_timeout = config
            .startup_health_check_timeout_secs
            .map(|s| count(s, "startup health check timeout"))
            .transpose()?;
        let variant = ProductionVariant::builder()
            .variant_name(&config.variant_name)
            .model_name(&config.model_name)
            .instance_type(ProductionVariantInstanceType::from(config.instance_type.as_str()))
            .initial_instance_count(count(config.instance_count, "instance count")?)
            .set_container_startup_health_check_timeout_in_seconds(startup_timeout)
            .build();

        self.client
            .create_endpoint_config()
            .endpoint_config_name(&config.name)
            .production_variants(variant)
            .send()
            .await
            .map_err(|e| classify("CreateEndpointConfig", "model", &config.model_name, e))?;
        Ok(())
    }

    async fn create_endpoint(&self, name: &str, config_name: &str) -> PlatformResult<()> {
        self.client
            .create_endpoint()
            .endpoint_name(name)
            .endpoint_config_name(config_name)
            .send()
            .await
            .map_err(|e| classify("CreateEndpoint", "endpoint configuration", config_name, e))?;
        Ok(())
    }

    async fn describe_endpoint(&self, name: &str) -> PlatformResult<EndpointDescription> {
        let out = self
            .client
            .describe_endpoint()
            .endpoint_name(name)
            .send()
            .await
            .map_err(|e| classify("DescribeEndpoint", "endpoint", name, e))?;

        Ok(EndpointDescription {
            name: out.endpoint_name().unwrap_or(name).to_string(),
            config_name: out.endpoint_config_name().unwrap_or_default().to_string(),
            status: out
                .endpoint_status()
                .map(|s| EndpointStatus::parse(s.as_str()))
                .unwrap_or_else(|| EndpointStatus::Unknown(String::new())),
            failure_reason: out.failure_reason().map(str::to_string),
            creation_time: out.creation_time().and_then(to_utc),
        })
    }

    async fn describe_endpoint_config(
        &self,
        name: &str,
    ) -> PlatformResult<EndpointConfigDescription> {
        let out = self
            .client
            .describe_endpoint_config()
            .endpoint_config_name(name)
            .send()
            .await
            .map_err(|e| classify("DescribeEndpointConfig", "endpoint configuration", name, e))?;

        let variants = out
            .production_variants()
            .iter()
            .map(|v| VariantDescription {
                variant_name: v.variant_name().unwrap_or_default().to_string(),
                model_name: v.model_name().map(str::to_string),
                instance_type: v.instance_type().map(|t| t.as_str().to_string()),
                instance_count: v.initial_instance_count().and_then(|c| u32::try_from(c).ok()),
            })
            .collect();

        Ok(EndpointConfigDescription {
            name: name.to_string(),
            variants,
        })
    }

    async fn list_endpoints(&self) -> PlatformResult<Vec<EndpointSummary>> {
        let client = &self.client;
        let endpoints = drain_pages(move |token| endpoints_page(client, token)).await?;
        tracing::debug!(count = endpoints.len(), "listed endpoints");
        Ok(endpoints)
    }

    async fn list_models(&self) -> PlatformResult<Vec<ModelSummary>> {
        let client = &self.client;
        let models = drain_pages(move |token| models_page(client, token)).await?;
        tracing::debug!(count = models.len(), "listed models");
        Ok(models)
    }

    async fn delete_endpoint(&self, name: &str) -> PlatformResult<()> {
        self.client
            .delete_endpoint()
            .endpoint_name(name)
            .send()
            .await
            .map_err(|e| classify("DeleteEndpoint", "endpoint", name, e))?;
        Ok(())
    }

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()> {
        self.client
            .delete_endpoint_config()
            .endpoint_config_name(name)
            .send()
            .await
            .map_err(|e| classify("DeleteEndpointConfig", "endpoint configuration", name, e))?;
        Ok(())
    }

    async fn delete_model(&self, name: &str) -> PlatformResult<()> {
        self.client
            .delete_model()
            .model_name(name)
            .send()
            .await
            .map_err(|e| classify("DeleteModel", "model", name, e))?;
        Ok(())
    }
}
