use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};

use jumpstart_common::{DEFAULT_INSTANCE_TYPE, DEFAULT_MODEL_ID, DEFAULT_MODEL_VERSION};

#[derive(Debug, Parser)]
#[command(name = "jumpstart")]
#[command(
    about = "Deploy, list and delete JumpStart model endpoints on SageMaker",
    long_about = None
)]
pub struct Args {
    /// AWS region (default: AWS_REGION / profile configuration)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Named AWS profile (default: AWS_PROFILE)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Export traces over OTLP/HTTP to this base URL
    #[arg(long, global = true, env = "JUMPSTART_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP collector
    #[arg(long, global = true, env = "JUMPSTART_OTLP_TOKEN", hide_env_values = true)]
    pub otlp_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy a catalog model to a new endpoint
    Deploy(DeployArgs),
    /// List endpoints and models
    List(ListArgs),
    /// Delete an endpoint, its configuration and (by default) its models
    Delete(DeleteArgs),
}

#[derive(Debug, Clone, ClapArgs)]
pub struct DeployArgs {
    /// JumpStart model identifier
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Model version; `*` picks the latest, `1.*` the latest 1.x
    #[arg(long, default_value = DEFAULT_MODEL_VERSION)]
    pub model_version: String,

    /// Instance type to host the endpoint on
    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    pub instance_type: String,

    /// Number of instances behind the endpoint
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub instance_count: u32,

    /// IAM execution role the model runs under
    #[arg(long, env = "JUMPSTART_ROLE_ARN")]
    pub role: Option<String>,

    /// Name for the model, endpoint config and endpoint (default: derived from the model id)
    #[arg(long)]
    pub endpoint_name: Option<String>,

    /// Skip the catalog and use this inference image
    #[arg(long)]
    pub image_uri: Option<String>,

    /// Fetch catalog documents from this mirror instead of the regional hub bucket
    #[arg(long, env = "JUMPSTART_CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// S3 location of the weights when --image-uri is used (`.tar.gz` archive or prefix)
    #[arg(long, requires = "image_uri")]
    pub model_data: Option<String>,

    /// Accept the model's end-user license agreement
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub accept_eula: bool,

    /// Extra container environment, repeatable
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,

    /// Container startup health-check window in seconds
    #[arg(long)]
    pub startup_timeout_secs: Option<u32>,

    /// Block until the endpoint leaves the Creating state
    #[arg(long)]
    pub wait: bool,

    /// Seconds between status checks while waiting
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 1800)]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ListArgs {
    /// Show endpoints only
    #[arg(long, conflicts_with = "models_only")]
    pub endpoints_only: bool,

    /// Show models only
    #[arg(long)]
    pub models_only: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct DeleteArgs {
    /// Endpoint to delete
    #[arg(long)]
    pub endpoint_name: String,

    /// Leave the endpoint's model resources in place
    #[arg(long)]
    pub keep_model: bool,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
