use anyhow::{Context, Result};

use jumpstart_common::{DeleteReport, ResourceKind};
use jumpstart_platform::Platform;

/// Remove an endpoint, its endpoint config and, unless `keep_model`, the
/// models the config references.
///
/// Errors before the endpoint is deleted mean nothing changed. After that
/// point every step is attempted and its outcome lands in the report.
pub async fn delete(
    platform: &dyn Platform,
    endpoint_name: &str,
    keep_model: bool,
) -> Result<DeleteReport> {
    tracing::info!(endpoint = %endpoint_name, "retrieving endpoint details");
    let endpoint = platform
        .describe_endpoint(endpoint_name)
        .await
        .with_context(|| format!("nothing deleted: could not describe endpoint {endpoint_name}"))?;
    let config_name = endpoint.config_name;

    let (config_exists, model_names) = match platform.describe_endpoint_config(&config_name).await {
        Ok(cfg) => (true, cfg.model_names()),
        Err(e) if e.is_not_found() => {
            tracing::warn!(
                config = %config_name,
                "endpoint config already gone; models cannot be traced"
            );
            (false, Vec::new())
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("nothing deleted: could not describe endpoint config {config_name}")
            })
        }
    };

    tracing::info!(endpoint = %endpoint_name, "deleting endpoint");
    platform
        .delete_endpoint(endpoint_name)
        .await
        .with_context(|| format!("nothing deleted: could not delete endpoint {endpoint_name}"))?;

    let mut report = DeleteReport::new(endpoint_name);
    report.record(ResourceKind::Endpoint, endpoint_name, Ok(()));

    if config_exists {
        tracing::info!(config = %config_name, "deleting endpoint config");
        let result = platform.delete_endpoint_config(&config_name).await;
        if let Err(e) = &result {
            tracing::error!(config = %config_name, error = %e, "failed to delete endpoint config");
        }
        report.record(
            ResourceKind::EndpointConfig,
            &config_name,
            result.map_err(|e| e.to_string()),
        );
    }

    if keep_model {
        report.kept_models = model_names;
        return Ok(report);
    }

    for model in &model_names {
        tracing::info!(%model, "deleting model");
        let result = platform.delete_model(model).await;
        if let Err(e) = &result {
            tracing::error!(%model, error = %e, "failed to delete model");
        }
        report.record(ResourceKind::Model, model, result.map_err(|e| e.to_string()));
    }

    Ok(report)
}
