//! # Command Line Interface
//!
//! `lat-provisioner` commands:
//! - `synth`: run the full provisioning sequence against the in-memory platform
//! - `names`: print every deterministic resource name of a stack
//! - `ingress`: print the ingress rules a configuration derives

pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

use crate::config::{load_config, ObservabilityConfig, ProvisionConfig};
use crate::domain::naming::secret_path;
use crate::domain::{CredentialPayload, ResourceNames, Role, StackId};
use crate::observability::{init_logging, log_config_info};
use crate::platform::InMemoryPlatform;
use crate::secrets::{InMemorySecretStore, SecretString};
use crate::services::{build_ingress_rules, ProvisioningOrchestrator, ProvisioningOutputs};
use output::{print_output, print_table_header, print_table_row, OutputFormat};

/// Length of the generated admin password used by `synth`
const GENERATED_PASSWORD_LEN: usize = 32;

#[derive(Parser)]
#[command(name = "lat-provisioner")]
#[command(about = "LAT database access provisioning tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision every resource against the in-memory platform and print the outputs
    Synth {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        output: OutputFormat,

        /// Username stored in the simulated admin secret
        #[arg(long, default_value = "postgres")]
        admin_username: String,
    },

    /// Print the deterministic resource names of a stack
    Names {
        /// Deployment identifier
        #[arg(long)]
        stack_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Print the ingress rules derived from a configuration
    Ingress {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth { config, output, admin_username } => {
            let config = load(config.as_deref())?;
            init_logging(&config.observability, cli.verbose);
            log_config_info(&config);

            let outputs = synth(&config, &admin_username).await?;
            if output == OutputFormat::Table {
                print_outputs_table(&outputs);
                Ok(())
            } else {
                print_output(&outputs, output)
            }
        }

        Commands::Names { stack_id, output } => {
            init_logging(&ObservabilityConfig::default(), cli.verbose);
            let stack = StackId::parse(&stack_id)?;
            let names = ResourceNames::for_stack(&stack);
            if output == OutputFormat::Table {
                print_names_table(&names);
                Ok(())
            } else {
                print_output(&names, output)
            }
        }

        Commands::Ingress { config, output } => {
            let config = load(config.as_deref())?;
            init_logging(&config.observability, cli.verbose);

            let rules = build_ingress_rules(
                &config.network.private_cidrs,
                &config.network.perimeter_cidr,
                config.database.port,
            )?;
            if output == OutputFormat::Table {
                let columns = [("SOURCE", 20), ("PORT", 6), ("DESCRIPTION", 72)];
                print_table_header(&columns);
                for rule in &rules {
                    let source = rule.source.to_string();
                    let port = rule.port.to_string();
                    print_table_row(
                        &columns,
                        &[source.as_str(), port.as_str(), rule.description.as_str()],
                    );
                }
                Ok(())
            } else {
                print_output(&rules, output)
            }
        }
    }
}

fn load(path: Option<&std::path::Path>) -> anyhow::Result<ProvisionConfig> {
    load_config(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from the environment".to_string(),
    })
}

/// Seed the externally-owned admin secret, then run every stage in memory
pub async fn synth(
    config: &ProvisionConfig,
    admin_username: &str,
) -> anyhow::Result<ProvisioningOutputs> {
    let stack = config.stack()?;
    let secrets = Arc::new(InMemorySecretStore::new());
    let platform = Arc::new(InMemoryPlatform::new(config.region.clone()));

    let admin = CredentialPayload {
        username: admin_username.to_string(),
        password: SecretString::new(generate_password()),
    };
    let admin_location = secret_path(&stack, Role::Admin);
    secrets.seed_external(&admin_location, admin.to_secret_value()).await;
    info!(secret_name = %admin_location, "Seeded externally owned admin secret");

    let orchestrator = ProvisioningOrchestrator::new(
        config,
        secrets,
        platform.clone(),
        platform.clone(),
        platform,
    )?;

    let outputs = orchestrator
        .run(&config.network.topology())
        .await
        .context("Provisioning run failed")?;
    Ok(outputs)
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn print_outputs_table(outputs: &ProvisioningOutputs) {
    let columns = [("ROLE", 18), ("PROXY", 40), ("ENDPOINT", 80)];
    print_table_header(&columns);
    for proxy in &outputs.proxies {
        let endpoint = proxy.endpoint().to_string();
        print_table_row(&columns, &[proxy.role().as_str(), proxy.name(), endpoint.as_str()]);
    }

    println!();
    println!("Instance:      {}", outputs.instance.identifier);
    println!("Admin secret:  {}", outputs.admin_secret_name);
    println!("App secret:    {}", outputs.application_user_secret.name);
    println!("Table creator: {}", outputs.table_creator_secret.name);
    for warning in &outputs.warnings {
        println!("Warning:       {}", warning);
    }
}

fn print_names_table(names: &ResourceNames) {
    let columns = [("RESOURCE", 28), ("NAME", 64)];
    print_table_header(&columns);
    print_table_row(&columns, &["instance", names.instance.as_str()]);
    print_table_row(&columns, &["parameter_group", names.parameter_group.as_str()]);
    print_table_row(&columns, &["subnet_group", names.subnet_group.as_str()]);
    print_table_row(&columns, &["execution_identity", names.execution_identity.as_str()]);
    for (role, secret) in &names.secrets {
        let label = format!("secret/{}", role);
        print_table_row(&columns, &[label.as_str(), secret.as_str()]);
    }
    for (role, proxy) in &names.proxies {
        let label = format!("proxy/{}", role);
        print_table_row(&columns, &[label.as_str(), proxy.as_str()]);
    }
}
