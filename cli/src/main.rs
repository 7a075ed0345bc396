/*!

This is the command line interface for creating and deleting EKS sandbox clusters.

!*/

mod create;
mod delete;
mod terminal;
mod versions;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use sandbox_orchestrator::gateway::AwsGateway;
use sandbox_orchestrator::operator::{Input, Operator};
use sandbox_utils::aws::aws_config;
use sandbox_utils::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_REGION};
use sandbox_utils::init_logger;
use terminal::TerminalOperator;

const CREATE_CLUSTER: &str = "Create Cluster";
const DELETE_CLUSTER: &str = "Delete Cluster";

/// Create and delete short-lived EKS clusters, each in a VPC of its own.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// The arn of a role to assume for all AWS calls.
    #[clap(long = "assume-role")]
    assume_role: Option<String>,
    /// How many times the SDK may send each AWS request.
    #[clap(long = "max-attempts", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,
    /// Without a subcommand you are asked what to do.
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Parser)]
enum Command {
    /// Create a sandbox cluster.
    Create(create::Create),
    /// Delete a cluster and, if it owns one, its VPC.
    Delete(delete::Delete),
    /// List the available Kubernetes versions.
    Versions(versions::Versions),
}

/// How AWS clients are built for the region a subcommand works in.
#[derive(Debug, Clone)]
pub(crate) struct AwsSettings {
    assume_role: Option<String>,
    max_attempts: u32,
}

impl AwsSettings {
    pub(crate) async fn gateway(&self, region: &str) -> Result<AwsGateway> {
        let config = aws_config(region, &self.assume_role, &None, self.max_attempts)
            .await
            .context(format!("Unable to create the AWS config for '{}'", region))?;
        Ok(AwsGateway::new(&config))
    }
}

/// Use `region` if it was given, otherwise ask for it.
pub(crate) fn region(region: Option<String>, operator: &mut dyn Operator) -> Result<String> {
    match region {
        Some(region) => Ok(region),
        None => {
            let input = Input::new("Enter the AWS region:").with_default(DEFAULT_REGION);
            Ok(operator.input(&input)?)
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(env!("CARGO_CRATE_NAME"), Some(args.log_level));
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let aws = AwsSettings {
        assume_role: args.assume_role,
        max_attempts: args.max_attempts,
    };
    let mut operator = TerminalOperator::stdio();
    let command = match args.command {
        Some(command) => command,
        None => {
            let action = operator.select(
                "What action do you want to perform?",
                &[CREATE_CLUSTER.to_string(), DELETE_CLUSTER.to_string()],
            )?;
            if action == CREATE_CLUSTER {
                Command::Create(create::Create::default())
            } else {
                Command::Delete(delete::Delete::default())
            }
        }
    };
    match command {
        Command::Create(create) => create.run(&aws, &mut operator).await,
        Command::Delete(delete) => delete.run(&aws, &mut operator).await,
        Command::Versions(versions) => versions.run(&aws).await,
    }
}
