use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::Instrument;

use virtual_cluster_provider::{
    api_metrics, create_operation_span, generate_correlation_id, init_telemetry,
    virtual_cluster_schema, HttpEmrContainersClient, ProviderConfig, ResourceData, Timeouts,
    VirtualClusterResource,
};

#[derive(Parser)]
#[command(name = "vcluster")]
#[command(about = "Manage virtual clusters on a container-orchestration control plane")]
#[command(long_about = "Creates, reads, imports and deletes virtual clusters. Create and delete \
                       block until the cluster reaches RUNNING or TERMINATED, polling the control \
                       plane on a fixed interval.")]
struct Cli {
    /// Configuration file (defaults to ./virtual-cluster.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resource attribute schema as JSON
    Schema,
    #[command(flatten)]
    Lifecycle(LifecycleCommand),
}

/// Commands that talk to the control plane
#[derive(Subcommand)]
enum LifecycleCommand {
    /// Create a virtual cluster and wait until it is running
    Create {
        /// Virtual cluster name
        #[arg(long)]
        name: String,
        /// Id of the underlying container cluster
        #[arg(long)]
        provider_id: String,
        /// Container provider type
        #[arg(long, default_value = "EKS")]
        provider_type: String,
        /// Namespace the virtual cluster is scoped to
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Read a virtual cluster by id
    Read { id: String },
    /// Import an existing virtual cluster by id
    Import { id: String },
    /// Delete a virtual cluster and wait until it is terminated
    Delete { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(virtual_cluster_schema())?);
            return Ok(());
        }
        Commands::Lifecycle(command) => command,
    };

    ProviderConfig::load_env_file()?;
    let config = ProviderConfig::load(cli.config.as_deref())?;
    init_telemetry(&config.log_level)?;

    let result = tokio::runtime::Runtime::new()?.block_on(run(command, &config));
    api_metrics().log_stats();
    result
}

async fn run(command: LifecycleCommand, config: &ProviderConfig) -> Result<()> {
    let conn = HttpEmrContainersClient::from_config(config)?;
    let resource = VirtualClusterResource::new(Timeouts::from(&config.timeouts));
    let correlation_id = generate_correlation_id();

    match command {
        LifecycleCommand::Create {
            name,
            provider_id,
            provider_type,
            namespace,
        } => {
            let mut d = ResourceData::from_config(create_config(name, provider_id, provider_type, namespace));
            let span = create_operation_span("create", None, &correlation_id);
            resource.create(&conn, &mut d).instrument(span).await?;
            print_state(&d)
        }
        LifecycleCommand::Read { id } => {
            let mut d = ResourceData::with_id(&id);
            let span = create_operation_span("read", Some(&id), &correlation_id);
            resource.read(&conn, &mut d).instrument(span).await?;
            if !d.is_tracked() {
                return Err(anyhow!("virtual cluster {id} not found"));
            }
            print_state(&d)
        }
        LifecycleCommand::Import { id } => {
            let span = create_operation_span("import", Some(&id), &correlation_id);
            let mut states = Vec::new();
            for mut d in resource.import(&id) {
                resource.read(&conn, &mut d).instrument(span.clone()).await?;
                if !d.is_tracked() {
                    return Err(anyhow!("cannot import non-existent virtual cluster {id}"));
                }
                states.push(d.to_state());
            }
            println!("{}", serde_json::to_string_pretty(&states)?);
            Ok(())
        }
        LifecycleCommand::Delete { id } => {
            let mut d = ResourceData::with_id(&id);
            let span = create_operation_span("delete", Some(&id), &correlation_id);
            resource.delete(&conn, &mut d).instrument(span).await?;
            println!("Virtual cluster {id} deleted");
            Ok(())
        }
    }
}

fn create_config(
    name: String,
    provider_id: String,
    provider_type: String,
    namespace: Option<String>,
) -> Map<String, Value> {
    let mut eks_info = Map::new();
    if let Some(namespace) = namespace {
        eks_info.insert("namespace".to_string(), Value::String(namespace));
    }

    let tree = json!({
        "name": name,
        "container_provider": [{
            "id": provider_id,
            "type": provider_type,
            "info": [{ "eks_info": [Value::Object(eks_info)] }]
        }]
    });

    match tree {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn print_state(d: &ResourceData) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&d.to_state())?);
    Ok(())
}
