use std::collections::HashSet;

use anyhow::{Context, Result};

use jumpstart_common::{ListFilter, ListingResult};
use jumpstart_platform::Platform;

use crate::args::ListArgs;

impl ListArgs {
    pub fn filter(&self) -> ListFilter {
        if self.endpoints_only {
            ListFilter::EndpointsOnly
        } else if self.models_only {
            ListFilter::ModelsOnly
        } else {
            ListFilter::All
        }
    }
}

/// Fetch both listings, cross-reference them, then drop the section the
/// filter hides. Both are always queried because each one annotates the other.
pub async fn list(platform: &dyn Platform, filter: ListFilter) -> Result<ListingResult> {
    tracing::info!(region = platform.region(), "retrieving models");
    let mut models = platform.list_models().await.context("listing models")?;

    tracing::info!(region = platform.region(), "retrieving endpoints");
    let mut endpoints = platform.list_endpoints().await.context("listing endpoints")?;

    let known: HashSet<&str> = models.iter().map(|m| m.name.as_str()).collect();
    for ep in &mut endpoints {
        let desc = match platform.describe_endpoint(&ep.name).await {
            Ok(d) => d,
            Err(e) if e.is_not_found() => {
                tracing::warn!(endpoint = %ep.name, "endpoint disappeared while listing");
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("describing endpoint {}", ep.name)),
        };

        match platform.describe_endpoint_config(&desc.config_name).await {
            Ok(cfg) => ep.model_names = cfg.model_names(),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    endpoint = %ep.name,
                    config = %desc.config_name,
                    "endpoint config is missing"
                );
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("describing endpoint config {}", desc.config_name))
            }
        }
        ep.config_name = Some(desc.config_name);
        ep.orphaned = ep.model_names.iter().any(|m| !known.contains(m.as_str()));
    }

    for model in &mut models {
        model.endpoints = endpoints
            .iter()
            .filter(|ep| ep.model_names.contains(&model.name))
            .map(|ep| ep.name.clone())
            .collect();
    }

    Ok(ListingResult {
        endpoints: filter.includes_endpoints().then_some(endpoints),
        models: filter.includes_models().then_some(models),
    })
}
