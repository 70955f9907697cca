mod args;
mod delete;
mod deploy;
mod list;
mod output;
#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;

use jumpstart_common::telemetry::{init_tracing, TelemetryConfig};
use jumpstart_platform::{Platform, SageMakerOptions, SageMakerPlatform};

use crate::args::{Args, Command};
use crate::output::{render_delete_report, render_deployment, render_json, render_table};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = init_tracing(&TelemetryConfig {
        service_name: "jumpstart".to_string(),
        otlp_endpoint: args.otlp_endpoint.clone(),
        otlp_token: args.otlp_token.clone(),
    });

    let options = SageMakerOptions {
        region: args.region.clone(),
        profile: args.profile.clone(),
    };

    match args.command {
        Command::Deploy(deploy_args) => {
            let request = deploy_args.to_request()?;
            let platform = SageMakerPlatform::connect(&options).await?;
            let catalog = deploy_args.catalog(platform.region())?;
            let deployment =
                deploy::deploy(&platform, catalog.as_ref(), &request, chrono::Utc::now()).await?;
            print!("{}", render_deployment(&deployment));
        }
        Command::List(list_args) => {
            let platform = SageMakerPlatform::connect(&options).await?;
            let listing = list::list(&platform, list_args.filter()).await?;
            if list_args.json {
                println!("{}", render_json(&listing)?);
            } else {
                print!("{}", render_table(&listing));
            }
        }
        Command::Delete(delete_args) => {
            let platform = SageMakerPlatform::connect(&options).await?;
            let report =
                delete::delete(&platform, &delete_args.endpoint_name, delete_args.keep_model)
                    .await?;
            print!("{}", render_delete_report(&report));
            if !report.is_complete() {
                let failed = report.failures().count();
                anyhow::bail!(
                    "delete of '{}' incomplete: {failed} step(s) failed",
                    report.endpoint_name
                );
            }
        }
    }

    Ok(())
}
