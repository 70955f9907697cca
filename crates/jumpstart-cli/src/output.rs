use chrono::{DateTime, Utc};

use jumpstart_common::{DeleteReport, EndpointSummary, ListingResult, ModelSummary, StepOutcome};

use crate::deploy::Deployment;

fn timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).chain([header.len()]).max().unwrap_or(0)
}

/// Join rendered lines, each terminated by a newline.
fn finish(lines: Vec<String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

fn endpoints_table(lines: &mut Vec<String>, endpoints: &[EndpointSummary]) {
    lines.push("\n=== Endpoints ===\n".to_string());
    if endpoints.is_empty() {
        lines.push("No endpoints found.".to_string());
        return;
    }
    let w = column_width("Name", endpoints.iter().map(|e| e.name.as_str()));
    lines.push(format!(
        "{:<w$}  {:<20}  {:<19}  {}",
        "Name", "Status", "Created", "Models"
    ));
    lines.push("-".repeat(w + 52));
    for ep in endpoints {
        let mut models = if ep.model_names.is_empty() {
            "-".to_string()
        } else {
            ep.model_names.join(",")
        };
        if ep.orphaned {
            models.push_str(" (orphaned)");
        }
        lines.push(format!(
            "{:<w$}  {:<20}  {:<19}  {}",
            ep.name,
            ep.status.as_str(),
            timestamp(&ep.creation_time),
            models
        ));
    }
}

fn models_table(lines: &mut Vec<String>, models: &[ModelSummary]) {
    lines.push("\n=== Models ===\n".to_string());
    if models.is_empty() {
        lines.push("No models found.".to_string());
        return;
    }
    let w = column_width("Name", models.iter().map(|m| m.name.as_str()));
    lines.push(format!("{:<w$}  {:<19}  {}", "Name", "Created", "Endpoints"));
    lines.push("-".repeat(w + 40));
    for m in models {
        let endpoints = if m.endpoints.is_empty() {
            "-".to_string()
        } else {
            m.endpoints.join(",")
        };
        lines.push(format!(
            "{:<w$}  {:<19}  {}",
            m.name,
            timestamp(&m.creation_time),
            endpoints
        ));
    }
}

pub fn render_table(listing: &ListingResult) -> String {
    let mut lines = Vec::new();
    if let Some(endpoints) = &listing.endpoints {
        endpoints_table(&mut lines, endpoints);
    }
    if let Some(models) = &listing.models {
        models_table(&mut lines, models);
    }
    finish(lines)
}

pub fn render_json(listing: &ListingResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(listing)
}

pub fn render_deployment(deployment: &Deployment) -> String {
    let spec = &deployment.spec;
    let mut lines = vec![
        format!(
            "✓ Model '{}' created from {} (version {})",
            deployment.name, spec.model_id, spec.model_version
        ),
        format!(
            "✓ Endpoint config '{}' created ({} x {})",
            deployment.name, deployment.instance_type, deployment.instance_count
        ),
    ];
    lines.push(match &deployment.endpoint {
        Some(ep) => format!("✓ Endpoint '{}' is {}", ep.name, ep.status),
        None => format!(
            "✓ Endpoint '{}' creation started; check progress with `jumpstart list`",
            deployment.name
        ),
    });
    finish(lines)
}

pub fn render_delete_report(report: &DeleteReport) -> String {
    let mut lines: Vec<String> = report
        .steps
        .iter()
        .map(|step| match &step.outcome {
            StepOutcome::Deleted => format!("✓ Deleted {} '{}'", step.kind, step.name),
            StepOutcome::Failed(err) => {
                format!("✗ Failed to delete {} '{}': {}", step.kind, step.name, err)
            }
        })
        .collect();
    lines.extend(report.kept_models.iter().map(|m| format!("○ Kept model '{m}'")));
    if report.is_partial() {
        lines.push(format!(
            "\nEndpoint '{}' is gone but the resources marked ✗ remain; delete them manually.",
            report.endpoint_name
        ));
    }
    finish(lines)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use jumpstart_common::{EndpointStatus, ResourceKind};

    use super::*;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 11, 16, 20, 36).unwrap()
    }

    fn endpoint(name: &str, models: &[&str], orphaned: bool) -> EndpointSummary {
        EndpointSummary {
            name: name.to_string(),
            arn: format!("arn:aws:sagemaker:us-east-1:000000000000:endpoint/{name}"),
            status: EndpointStatus::InService,
            creation_time: created(),
            last_modified_time: created(),
            config_name: Some(name.to_string()),
            model_names: models.iter().map(|m| m.to_string()).collect(),
            orphaned,
        }
    }

    #[test]
    fn test_table_lists_both_sections() {
        let listing = ListingResult {
            endpoints: Some(vec![
                endpoint("chat", &["chat"], false),
                endpoint("old", &["gone"], true),
            ]),
            models: Some(vec![ModelSummary {
                name: "chat".to_string(),
                arn: "arn".to_string(),
                creation_time: created(),
                endpoints: vec!["chat".to_string()],
            }]),
        };
        let table = render_table(&listing);
        assert!(table.contains("=== Endpoints ==="));
        assert!(table.contains("=== Models ==="));
        assert!(table.contains("InService"));
        assert!(table.contains("2025-02-11 16:20:36"));
        assert!(table.contains("gone (orphaned)"));
    }

    #[test]
    fn test_table_respects_hidden_sections() {
        let listing = ListingResult {
            endpoints: Some(Vec::new()),
            models: None,
        };
        let table = render_table(&listing);
        assert!(table.contains("No endpoints found."));
        assert!(!table.contains("Models"));
    }

    #[test]
    fn test_json_omits_hidden_sections() {
        let listing = ListingResult {
            endpoints: None,
            models: Some(Vec::new()),
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_json(&listing).unwrap()).unwrap();
        assert!(value.get("endpoints").is_none());
        assert_eq!(value["models"], serde_json::json!([]));
    }

    #[test]
    fn test_delete_report_marks_partial_failure() {
        let mut report = DeleteReport::new("ep");
        report.record(ResourceKind::Endpoint, "ep", Ok(()));
        report.record(ResourceKind::EndpointConfig, "ep", Ok(()));
        report.record(ResourceKind::Model, "ep", Err("AccessDenied".to_string()));

        let text = render_delete_report(&report);
        assert!(text.contains("✓ Deleted endpoint 'ep'"));
        assert!(text.contains("✓ Deleted endpoint config 'ep'"));
        assert!(text.contains("✗ Failed to delete model 'ep': AccessDenied"));
        assert!(text.contains("delete them manually"));
    }

    #[test]
    fn test_table_rule_matches_name_column() {
        let listing = ListingResult {
            endpoints: Some(vec![endpoint("a-rather-long-endpoint-name", &[], false)]),
            models: None,
        };
        let table = render_table(&listing);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "=== Endpoints ===");
        assert_eq!(lines[2], "");
        assert!(lines[3].starts_with("Name "));
        assert_eq!(lines[4], "-".repeat("a-rather-long-endpoint-name".len() + 52));
        assert!(lines[5].ends_with("  -"));
        assert!(table.ends_with('\n'));
    }

    #[test]
    fn test_delete_report_lists_kept_models() {
        let mut report = DeleteReport::new("ep");
        report.record(ResourceKind::Endpoint, "ep", Ok(()));
        report.record(ResourceKind::EndpointConfig, "ep", Ok(()));
        report.kept_models = vec!["ep".to_string()];

        let text = render_delete_report(&report);
        assert_eq!(
            text,
            "✓ Deleted endpoint 'ep'\n✓ Deleted endpoint config 'ep'\n○ Kept model 'ep'\n"
        );
    }
}
