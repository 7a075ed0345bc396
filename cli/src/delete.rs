use crate::{region, AwsSettings};
use anyhow::{Context, Result};
use clap::Parser;
use sandbox_orchestrator::deprovision::{DeletionWait, DeprovisionOutcome, Deprovisioner};
use sandbox_orchestrator::operator::Operator;

/// Delete a cluster. A cluster that owns its VPC can have the VPC removed with it.
#[derive(Debug, Parser)]
pub(crate) struct Delete {
    /// The AWS region the cluster is in.
    #[clap(long)]
    region: Option<String>,

    /// The name of the cluster to delete. If absent you pick one from the region's clusters.
    #[clap(long)]
    cluster: Option<String>,

    /// Remove the VPC right after the cluster deletion was requested, without waiting.
    #[clap(long = "no-wait")]
    no_wait: bool,

    /// How long to wait for the cluster to be gone before removing its VPC. `0` disables waiting.
    #[clap(long = "deletion-timeout-secs", default_value = "1200")]
    deletion_timeout_secs: u64,

    /// How often to check whether the cluster is gone.
    #[clap(long = "poll-interval-secs", default_value = "15")]
    poll_interval_secs: u64,
}

impl Default for Delete {
    fn default() -> Self {
        let wait = DeletionWait::default();
        Self {
            region: None,
            cluster: None,
            no_wait: false,
            deletion_timeout_secs: wait.timeout.as_secs(),
            poll_interval_secs: wait.poll_interval.as_secs(),
        }
    }
}

impl Delete {
    pub(crate) async fn run(self, aws: &AwsSettings, operator: &mut dyn Operator) -> Result<()> {
        let region = region(self.region, operator)?;
        let gateway = aws.gateway(&region).await?;

        let wait = if self.no_wait {
            None
        } else {
            DeletionWait::from_secs(self.deletion_timeout_secs, self.poll_interval_secs)
        };
        let deprovisioner = Deprovisioner::new(&gateway).with_deletion_wait(wait);

        let cluster = match self.cluster {
            Some(cluster) => cluster,
            None => match deprovisioner
                .select_cluster(operator)
                .await
                .context("Unable to list clusters")?
            {
                Some(cluster) => cluster,
                None => {
                    println!("No clusters found in region '{}'.", region);
                    return Ok(());
                }
            },
        };

        let outcome = deprovisioner
            .deprovision(&cluster, operator)
            .await
            .context(format!("Unable to delete cluster '{}'", cluster))?;
        match outcome {
            DeprovisionOutcome::Aborted => println!("Cluster deletion aborted."),
            DeprovisionOutcome::ClusterDeleted => {
                println!("Cluster '{}' deletion initiated successfully.", cluster)
            }
            DeprovisionOutcome::ClusterAndNetworkDeleted { network_id, report } => {
                println!("{}", report);
                println!(
                    "Cluster '{}' deleted along with VPC '{}' and all of its components.",
                    cluster, network_id
                );
            }
        }
        Ok(())
    }
}
