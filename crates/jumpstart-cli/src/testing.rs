use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use jumpstart_common::{ModelArtifact, ModelSpec, PlatformResult};
use jumpstart_platform::{CatalogQuery, ModelCatalog};

use crate::deploy::WaitPolicy;

/// Catalog double that answers every query with a fixed image and records
/// what it was asked.
#[derive(Debug, Clone, Default)]
pub struct FixedCatalog {
    queries: Arc<Mutex<Vec<CatalogQuery>>>,
}

impl FixedCatalog {
    pub async fn queries(&self) -> Vec<CatalogQuery> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl ModelCatalog for FixedCatalog {
    async fn resolve(&self, query: &CatalogQuery) -> PlatformResult<ModelSpec> {
        self.queries.lock().await.push(query.clone());
        let mut environment = BTreeMap::new();
        environment.insert("SAGEMAKER_PROGRAM".to_string(), "inference.py".to_string());
        Ok(ModelSpec {
            model_id: query.model_id.clone(),
            model_version: "1.0.0".to_string(),
            image_uri: "763104351884.dkr.ecr.us-east-1.amazonaws.com/tgi:latest".to_string(),
            artifact: Some(ModelArtifact::Prefix {
                s3_uri: format!("s3://jumpstart-cache-prod-us-east-1/{}/", query.model_id),
            }),
            environment,
            requires_eula: true,
            accept_eula: query.accept_eula,
        })
    }
}

pub fn fast_wait() -> WaitPolicy {
    WaitPolicy {
        interval: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
    }
}
