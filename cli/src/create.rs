use crate::{region, AwsSettings};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use sandbox_orchestrator::layout::NetworkLayout;
use sandbox_orchestrator::operator::{Input, Operator};
use sandbox_orchestrator::provision::{
    sandbox_cluster_name, CreateRequest, NetworkSource, Provisioner,
};
use sandbox_orchestrator::version::{resolve_latest_version, VersionOrdering};
use std::path::PathBuf;

/// Create a sandbox cluster. Values that are not given are asked for.
#[derive(Debug, Default, Parser)]
pub(crate) struct Create {
    /// The AWS region to create the cluster in.
    #[clap(long)]
    region: Option<String>,

    /// The cluster name, without the `Sandbox-` prefix.
    #[clap(long = "cluster-name")]
    cluster_name: Option<String>,

    /// The Kubernetes version. Defaults to the latest available version.
    #[clap(long)]
    version: Option<String>,

    /// Enable EKS auto mode (managed compute, storage and load balancing).
    #[clap(long = "auto-mode")]
    auto_mode: Option<bool>,

    /// Install the coredns, kube-proxy and vpc-cni addons.
    #[clap(long)]
    addons: Option<bool>,

    /// Select an existing VPC, subnets and security groups instead of creating a VPC.
    #[clap(long = "reuse-network")]
    reuse_network: Option<bool>,

    /// Allow all inbound traffic to the new security group.
    #[clap(long = "allow-all-ingress")]
    allow_all_ingress: bool,

    /// A YAML file overriding the default network layout.
    #[clap(long, parse(from_os_str))]
    layout: Option<PathBuf>,

    /// How the latest version is picked [lexicographic|numeric].
    #[clap(long = "version-ordering", default_value = "lexicographic")]
    version_ordering: VersionOrdering,
}

impl Create {
    pub(crate) async fn run(self, aws: &AwsSettings, operator: &mut dyn Operator) -> Result<()> {
        let region = region(self.region, operator)?;
        let gateway = aws.gateway(&region).await?;

        let cluster_name = match self.cluster_name {
            Some(cluster_name) => cluster_name,
            None => operator.input(&Input::new("Enter the name of the EKS cluster:").required())?,
        };
        let cluster_name = sandbox_cluster_name(&cluster_name)?;

        let version = match self.version {
            Some(version) => version,
            None => {
                let latest = resolve_latest_version(&gateway, self.version_ordering)
                    .await
                    .context("Unable to fetch the latest EKS version")?;
                operator.input(&Input::new("Enter the Kubernetes version:").with_default(latest))?
            }
        };

        let auto_mode = match self.auto_mode {
            Some(auto_mode) => auto_mode,
            None => operator.confirm(
                "Do you want to enable auto mode for the cluster?",
                Some(true),
            )?,
        };

        let install_addons = match self.addons {
            Some(addons) => addons,
            None => operator.confirm(
                "Do you want to install the CoreDNS, kube-proxy and VPC CNI addons?",
                Some(true),
            )?,
        };

        let network = network_source(self.reuse_network, operator)?;

        let layout = match &self.layout {
            Some(path) => NetworkLayout::from_path(path)?,
            None => NetworkLayout::default(),
        };

        let request = CreateRequest {
            region,
            cluster_name,
            version,
            auto_mode,
            install_addons,
            network,
            allow_all_ingress: self.allow_all_ingress,
        };
        info!("Creating sandbox cluster '{}'", request.cluster_name);

        let cluster = Provisioner::new(&gateway, &layout)
            .provision(&request, operator)
            .await
            .context(format!(
                "Unable to create sandbox cluster '{}' (resources created so far are left in place)",
                request.cluster_name
            ))?;

        println!("{}", cluster);
        println!(
            "Cluster '{}' creation initiated successfully.",
            cluster.cluster_name
        );
        Ok(())
    }
}

/// Use `reuse_network` if it was given, otherwise ask whether to reuse an existing VPC.
fn network_source(
    reuse_network: Option<bool>,
    operator: &mut dyn Operator,
) -> sandbox_orchestrator::operator::Result<NetworkSource> {
    let reuse = match reuse_network {
        Some(reuse) => reuse,
        None => operator.confirm(
            "Reuse an existing VPC, subnets and security groups?",
            Some(false),
        )?,
    };
    Ok(if reuse {
        NetworkSource::Reuse
    } else {
        NetworkSource::Create
    })
}
