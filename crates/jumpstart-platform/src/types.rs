use async_trait::async_trait;

use jumpstart_common::{
    EndpointConfig, EndpointConfigDescription, EndpointDescription, EndpointSummary, ModelSpec,
    ModelSummary, PlatformResult,
};

/// The managed ML platform as seen by the CLI handlers.
///
/// One call per remote operation; implementations bind region and
/// credentials at construction and hold no other state between calls.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Region the client is bound to.
    fn region(&self) -> &str;

    async fn create_model(
        &self,
        name: &str,
        role_arn: &str,
        spec: &ModelSpec,
    ) -> PlatformResult<()>;

    async fn create_endpoint_config(&self, config: &EndpointConfig) -> PlatformResult<()>;

    async fn create_endpoint(&self, name: &str, config_name: &str) -> PlatformResult<()>;

    async fn describe_endpoint(&self, name: &str) -> PlatformResult<EndpointDescription>;

    async fn describe_endpoint_config(
        &self,
        name: &str,
    ) -> PlatformResult<EndpointConfigDescription>;

    /// All endpoints in the region, every page.
    async fn list_endpoints(&self) -> PlatformResult<Vec<EndpointSummary>>;

    /// All models in the region, every page.
    async fn list_models(&self) -> PlatformResult<Vec<ModelSummary>>;

    async fn delete_endpoint(&self, name: &str) -> PlatformResult<()>;

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()>;

    async fn delete_model(&self, name: &str) -> PlatformResult<()>;
}

/// What the user asked to deploy, before catalog resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub model_id: String,
    pub model_version: String,
    pub instance_type: String,
    pub accept_eula: bool,
}

/// Turns a model identifier and version into a deployable [`ModelSpec`].
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn resolve(&self, query: &CatalogQuery) -> PlatformResult<ModelSpec>;
}
