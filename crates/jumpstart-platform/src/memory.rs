use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use jumpstart_common::{
    EndpointConfig, EndpointConfigDescription, EndpointDescription, EndpointStatus,
    EndpointSummary, ModelSpec, ModelSummary, PlatformError, PlatformResult, VariantDescription,
};

use crate::types::Platform;

const ACCOUNT_ID: &str = "000000000000";

/// A call received by [`MemoryPlatform`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateModel {
        name: String,
        role_arn: String,
        spec: ModelSpec,
    },
    CreateEndpointConfig(EndpointConfig),
    CreateEndpoint {
        name: String,
        config_name: String,
    },
    DescribeEndpoint(String),
    DescribeEndpointConfig(String),
    ListEndpoints,
    ListModels,
    DeleteEndpoint(String),
    DeleteEndpointConfig(String),
    DeleteModel(String),
}

impl Call {
    pub fn operation(&self) -> &'static str {
        match self {
            Call::CreateModel { .. } => "CreateModel",
            Call::CreateEndpointConfig(_) => "CreateEndpointConfig",
            Call::CreateEndpoint { .. } => "CreateEndpoint",
            Call::DescribeEndpoint(_) => "DescribeEndpoint",
            Call::DescribeEndpointConfig(_) => "DescribeEndpointConfig",
            Call::ListEndpoints => "ListEndpoints",
            Call::ListModels => "ListModels",
            Call::DeleteEndpoint(_) => "DeleteEndpoint",
            Call::DeleteEndpointConfig(_) => "DeleteEndpointConfig",
            Call::DeleteModel(_) => "DeleteModel",
        }
    }
}

#[derive(Debug, Clone)]
struct StoredModel {
    arn: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredEndpoint {
    arn: String,
    config_name: String,
    status: EndpointStatus,
    failure_reason: Option<String>,
    describes_left: u32,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    models: BTreeMap<String, StoredModel>,
    configs: BTreeMap<String, EndpointConfig>,
    endpoints: BTreeMap<String, StoredEndpoint>,
    calls: Vec<Call>,
    failures: HashMap<(&'static str, String), String>,
}

/// In-process stand-in for the managed platform.
///
/// New endpoints report `Creating` for a configurable number of describes and
/// then settle. Individual operations can be made to fail to exercise the
/// handlers' error paths.
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    region: String,
    inner: Arc<Mutex<Inner>>,
    ready_after: u32,
    settle_as: EndpointStatus,
    settle_reason: Option<String>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            region: "us-east-1".to_string(),
            inner: Arc::new(Mutex::new(Inner::default())),
            ready_after: 1,
            settle_as: EndpointStatus::InService,
            settle_reason: None,
        }
    }

    /// Number of describes that still report `Creating`.
    pub fn with_ready_after(mut self, describes: u32) -> Self {
        self.ready_after = describes;
        self
    }

    /// Make new endpoints settle into `Failed` with `reason`.
    pub fn with_creation_failure(mut self, reason: &str) -> Self {
        self.settle_as = EndpointStatus::Failed;
        self.settle_reason = Some(reason.to_string());
        self
    }

    /// The next `operation` on `name` fails with an access-denied error.
    pub async fn fail_on(&self, operation: &'static str, name: &str, message: &str) {
        let mut inner = self.inner.lock().await;
        inner
            .failures
            .insert((operation, name.to_string()), message.to_string());
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.inner.lock().await.calls.clone()
    }

    /// Register a model directly, bypassing the call log.
    pub async fn seed_model(&self, name: &str) {
        let mut inner = self.inner.lock().await;
        let arn = self.arn("model", name);
        inner.models.insert(
            name.to_string(),
            StoredModel {
                arn,
                created: Utc::now(),
            },
        );
    }

    fn arn(&self, kind: &str, name: &str) -> String {
        format!("arn:aws:sagemaker:{}:{ACCOUNT_ID}:{kind}/{name}", self.region)
    }

    fn record(inner: &mut Inner, call: Call) -> PlatformResult<()> {
        let operation = call.operation();
        let key = match &call {
            Call::CreateModel { name, .. } | Call::CreateEndpoint { name, .. } => name.clone(),
            Call::CreateEndpointConfig(cfg) => cfg.name.clone(),
            Call::DescribeEndpoint(n)
            | Call::DescribeEndpointConfig(n)
            | Call::DeleteEndpoint(n)
            | Call::DeleteEndpointConfig(n)
            | Call::DeleteModel(n) => n.clone(),
            Call::ListEndpoints | Call::ListModels => String::new(),
        };
        inner.calls.push(call);
        match inner.failures.remove(&(operation, key)) {
            Some(message) => Err(PlatformError::Service {
                operation,
                code: "AccessDeniedException".to_string(),
                message,
            }),
            None => Ok(()),
        }
    }

    fn already_exists(operation: &'static str, kind: &str, name: &str) -> PlatformError {
        PlatformError::Service {
            operation,
            code: "ValidationException".to_string(),
            message: format!("Cannot create already existing {kind} \"{name}\"."),
        }
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create_model(
        &self,
        name: &str,
        role_arn: &str,
        spec: &ModelSpec,
    ) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        Self::record(
            &mut inner,
            Call::CreateModel {
                name: name.to_string(),
                role_arn: role_arn.to_string(),
                spec: spec.clone(),
            },
        )?;
        if inner.models.contains_key(name) {
            return Err(Self::already_exists("CreateModel", "model", name));
        }
        inner.models.insert(
            name.to_string(),
            StoredModel {
                arn: self.arn("model", name),
                created: Utc::now(),
            },
        );
        Ok(())
    }

    async fn create_endpoint_config(&self, config: &EndpointConfig) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        Self::record(&mut inner, Call::CreateEndpointConfig(config.clone()))?;
        if inner.configs.contains_key(&config.name) {
            return Err(Self::already_exists(
                "CreateEndpointConfig",
                "endpoint configuration",
                &config.name,
            ));
        }
        if !inner.models.contains_key(&config.model_name) {
            return Err(PlatformError::NotFound {
                kind: "model",
                name: config.model_name.clone(),
            });
        }
        inner.configs.insert(config.name.clone(), config.clone());
        Ok(())
    }

    async fn create_endpoint(&self, name: &str, config_name: &str) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        Self::record(
            &mut inner,
            Call::CreateEndpoint {
                name: name.to_string(),
                config_name: config_name.to_string(),
            },
        )?;
        if inner.endpoints.contains_key(name) {
            return Err(Self::already_exists("CreateEndpoint", "endpoint", name));
        }
        if !inner.configs.contains_key(config_name) {
            return Err(PlatformError::NotFound {
                kind: "endpoint configuration",
                name: config_name.to_string(),
            });
        }
        let now = Utc::now();
        inner.endpoints.insert(
            name.to_string(),
            StoredEndpoint {
                arn: self.arn("endpoint", name),
                config_name: config_name.to_string(),
                status: EndpointStatus::Creating,
                failure_reason: None,
                describes_left: self.ready_after,
                created: now,
                modified: now,
            },
        );
        Ok(())
    }

    async fn describe_endpoint(&self, name: &str) -> PlatformResult<EndpointDescription> {
        let mut inner = self.inner.lock().await;
        Self::record(&mut inner, Call::DescribeEndpoint(name.to_string()))?;
        let Some(ep) = inner.endpoints.get_mut(name) else {
            return Err(PlatformError::NotFound {
                kind: "endpoint",
                name: name.to_string(),
            });
        };
        if ep.status == EndpointStatus::Creating {
            if ep.describes_left == 0 {
                ep.status = self.settle_as.clone();
                ep.failure_reason = self.settle_reason.clone();
                ep.modified = Utc::now();
            } else {
                ep.describes_left -= 1;
            }
        }
        Ok(EndpointDescription {
            name: name.to_string(),
            config_name: ep.config_name.clone(),
            status: ep.status.clone(),
            failure_reason: ep.failure_reason.clone(),
            creation_time: Some(ep.created),
        })
    }

    async fn describe_endpoint_config(
        &self,
        name: &str,
    ) -> PlatformResult<EndpointConfigDescription> {
        let mut inner = self.inner.lock().await;
        Self::record(&mut inner, Call::DescribeEndpointConfig(name.to_string()))?;
        let Some(cfg) = inner.configs.get(name) else {
            return Err(PlatformError::NotFound {
                kind: "endpoint configuration",
                name: name.to_string(),
            });
        };
        Ok(EndpointConfigDescription {
            name: cfg.name.clone(),
            variants: vec![VariantDescription {
                variant_name: cfg.variant_name.clone(),
                model_name: Some(cfg.model_name.clone()),
                instance_type: Some(cfg.instance_type.clone()),
                instance_count: Some(cfg.instance_count),
            }],
        })
    }

    async fn list_endpoints(&self) -> PlatformResult<Vec<EndpointSummary>> {
        let mut inner = self.inner.lock().await;
        Self::record(&mut inner, Call::ListEndpoints)?;
        Ok(inner
            .endpoints
            .iter()
            .map(|(name, ep)| EndpointSummary {
                name: name.clone(),
                arn: ep.arn.clone(),
                status: ep.status.clone(),
                creation_time: ep.created,
                last_modified_time: ep.modified,
                config_name: None,
                model_names: Vec::new(),
                orphaned: false,
            })
            .collect())
    }

    async fn list_models(&self) -> PlatformResult<Vec<ModelSummary>> {
        let mut inner = self.inner.lock().await;
        Self::record(&mut inner, Call::ListModels)?;
        Ok(inner
            .models
            .iter()
            .map(|(name, m)| ModelSummary {
                name: name.clone(),
                arn: m.arn.clone(),
                creation_time: m.created,
                endpoints: Vec::new(),
            })
            .collect())
    }

    async fn delete_endpoint(&self, name: &str) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        Self::record(&mut inner, Call::DeleteEndpoint(name.to_string()))?;
        inner
            .endpoints
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound {
                kind: "endpoint",
                name: name.to_string(),
            })
    }

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        Self::record(&mut inner, Call::DeleteEndpointConfig(name.to_string()))?;
        inner
            .configs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound {
                kind: "endpoint configuration",
                name: name.to_string(),
            })
    }

    async fn delete_model(&self, name: &str) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        Self::record(&mut inner, Call::DeleteModel(name.to_string()))?;
        inner
            .models
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound {
                kind: "model",
                name: name.to_string(),
            })
    }
}
