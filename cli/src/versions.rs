use crate::AwsSettings;
use anyhow::{Context, Result};
use clap::Parser;
use sandbox_orchestrator::gateway::CloudGateway;
use sandbox_orchestrator::version::{latest_version_by, VersionOrdering};
use sandbox_utils::constants::DEFAULT_REGION;

/// Print the Kubernetes versions EKS offers and the one `create` would pick.
#[derive(Debug, Parser)]
pub(crate) struct Versions {
    /// The AWS region to query.
    #[clap(long, default_value = DEFAULT_REGION)]
    region: String,

    /// How the latest version is picked [lexicographic|numeric].
    #[clap(long = "version-ordering", default_value = "lexicographic")]
    version_ordering: VersionOrdering,
}

impl Versions {
    pub(crate) async fn run(self, aws: &AwsSettings) -> Result<()> {
        let gateway = aws.gateway(&self.region).await?;
        let versions = gateway
            .cluster_versions()
            .await
            .context("Unable to list EKS cluster versions")?;
        for version in &versions {
            println!("{}", version);
        }
        let latest = latest_version_by(&versions, self.version_ordering)
            .context(format!("No EKS versions are available in '{}'", self.region))?;
        println!("Latest ({}): {}", self.version_ordering, latest);
        Ok(())
    }
}
