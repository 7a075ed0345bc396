/*!

The creation pipeline. Every step runs to completion before the next one starts, and the first
failure ends the run. Resources created before a failure are left in place.

!*/

use crate::constants::{
    CLUSTER_NAME_PREFIX, CLUSTER_ROLE_NAME, CLUSTER_ROLE_POLICY_ARNS, CLUSTER_SERVICE_PRINCIPAL,
    CREATED_BY_TAG, CREATED_BY_VALUE, DEFAULT_ROUTE_CIDR, HOSTING_ISOLATED, HOSTING_TAG,
    MIN_CLUSTER_SUBNETS, NETWORK_ID_TAG,
};
use crate::error::{self, Error, Result};
use crate::gateway::{
    Addon, CallerIdentity, CloudGateway, ClusterRequest, NetworkSummary, SecurityGroupSummary,
    SubnetSummary, Tags,
};
use crate::layout::NetworkLayout;
use crate::operator::{self, chosen, Operator};
use crate::tags::provenance_tags;
use log::{debug, info};
use sandbox_utils::{impl_display_as_json, json_display};
use serde::{Deserialize, Serialize};
use serde_json::json;
use snafu::{ensure, ResultExt};
use std::collections::HashSet;

/// Where the cluster's VPC, subnets and security groups come from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum NetworkSource {
    /// Build a fresh VPC from the [`NetworkLayout`].
    #[default]
    Create,
    /// Let the operator pick an existing VPC, subnets and security groups.
    Reuse,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub region: String,

    /// The effective (prefixed) cluster name, see [`sandbox_cluster_name`].
    pub cluster_name: String,

    pub version: String,

    /// Enable managed compute, storage and load balancing.
    pub auto_mode: bool,

    pub install_addons: bool,

    pub network: NetworkSource,

    /// Open the new security group to all inbound traffic. Ignored when reusing a network.
    pub allow_all_ingress: bool,
}

impl_display_as_json!(CreateRequest);

/// The network resources a cluster was created in.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedNetwork {
    pub network_id: String,
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub internet_gateway_id: Option<String>,
    pub route_table_id: Option<String>,
    /// `true` when the VPC was created for this cluster rather than selected.
    pub created: bool,
}

/// Once the pipeline has finished, this describes everything it produced.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedCluster {
    pub cluster_name: String,
    pub region: String,
    pub version: String,
    pub account_id: String,
    pub role_arn: String,
    pub network: ProvisionedNetwork,
    pub addons: Vec<Addon>,
}

impl_display_as_json!(ProvisionedCluster);

/// Trim the operator's cluster name and mark it as a sandbox resource.
pub fn sandbox_cluster_name(input: &str) -> Result<String> {
    let name = input.trim();
    ensure!(!name.is_empty(), error::EmptyClusterNameSnafu);
    Ok(format!("{}{}", CLUSTER_NAME_PREFIX, name))
}

pub fn cluster_role_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, CLUSTER_ROLE_NAME)
}

/// The cluster always carries the provenance tag. Only a cluster whose VPC was created for it is
/// classified as isolated and points back at that VPC.
pub fn cluster_tags(network: &ProvisionedNetwork) -> Tags {
    let mut tags = Tags::new();
    tags.insert(CREATED_BY_TAG.to_string(), CREATED_BY_VALUE.to_string());
    if network.created {
        tags.insert(HOSTING_TAG.to_string(), HOSTING_ISOLATED.to_string());
        tags.insert(NETWORK_ID_TAG.to_string(), network.network_id.clone());
    }
    tags
}

/// Check the cluster subnet invariant: at least two subnets in at least two availability zones.
pub fn validate_cluster_subnets(subnets: &[&SubnetSummary]) -> Result<()> {
    ensure!(
        subnets.len() >= MIN_CLUSTER_SUBNETS,
        error::InsufficientSubnetsSnafu {
            required: MIN_CLUSTER_SUBNETS,
            selected: subnets.len(),
        }
    );
    let zones: HashSet<&str> = subnets
        .iter()
        .filter_map(|subnet| subnet.availability_zone.as_deref())
        .collect();
    if zones.len() < MIN_CLUSTER_SUBNETS {
        return error::SingleZoneSnafu {
            zone: zones
                .into_iter()
                .next()
                .unwrap_or("unknown")
                .to_string(),
        }
        .fail();
    }
    Ok(())
}

fn trust_policy() -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": {
                "Service": CLUSTER_SERVICE_PRINCIPAL
            },
            "Action": "sts:AssumeRole"
        }]
    })
    .to_string()
}

fn network_label(network: &NetworkSummary) -> String {
    format!(
        "{} ({}, {})",
        network.id,
        network.cidr_block.as_deref().unwrap_or("no cidr"),
        network.name.as_deref().unwrap_or("unnamed")
    )
}

fn subnet_label(subnet: &SubnetSummary) -> String {
    format!(
        "{} ({}, {})",
        subnet.id,
        subnet.cidr_block.as_deref().unwrap_or("no cidr"),
        subnet.availability_zone.as_deref().unwrap_or("unknown zone")
    )
}

fn security_group_label(group: &SecurityGroupSummary) -> String {
    format!("{} ({})", group.id, group.name)
}

pub struct Provisioner<'a, G: ?Sized> {
    gateway: &'a G,
    layout: &'a NetworkLayout,
}

impl<'a, G> Provisioner<'a, G>
where
    G: CloudGateway + ?Sized,
{
    pub fn new(gateway: &'a G, layout: &'a NetworkLayout) -> Self {
        Self { gateway, layout }
    }

    /// Run the creation pipeline: identity, role, network, cluster, add-ons.
    pub async fn provision(
        &self,
        request: &CreateRequest,
        operator: &mut dyn Operator,
    ) -> Result<ProvisionedCluster> {
        debug!("Provisioning with request:\n{}", request);

        info!("Fetching AWS account identity");
        let identity = self.caller_identity().await?;
        info!("AWS Account ID: {}", identity.account);
        info!("Performing operations as the identity {}", identity.arn);

        self.ensure_cluster_role().await?;

        let network = match request.network {
            NetworkSource::Create => {
                self.create_network(&request.region, request.allow_all_ingress)
                    .await?
            }
            NetworkSource::Reuse => self.select_network(operator).await?,
        };
        debug!("Cluster network:\n{}", json_display(&network));

        let role_arn = cluster_role_arn(&identity.account);
        let cluster_request = ClusterRequest {
            name: request.cluster_name.clone(),
            version: request.version.clone(),
            role_arn: role_arn.clone(),
            subnet_ids: network.subnet_ids.clone(),
            security_group_ids: network.security_group_ids.clone(),
            auto_mode: request.auto_mode,
            tags: cluster_tags(&network),
        };
        info!("Creating EKS cluster '{}'", request.cluster_name);
        self.gateway
            .create_cluster(&cluster_request)
            .await
            .context(error::CreateSnafu {
                what: format!("EKS cluster '{}'", request.cluster_name),
            })?;
        info!(
            "EKS cluster '{}' creation initiated with Kubernetes version {}",
            request.cluster_name, request.version
        );

        let addons = if request.install_addons {
            self.install_addons(&request.cluster_name).await?
        } else {
            info!("Skipping addon installation");
            Vec::new()
        };

        Ok(ProvisionedCluster {
            cluster_name: request.cluster_name.clone(),
            region: request.region.clone(),
            version: request.version.clone(),
            account_id: identity.account,
            role_arn,
            network,
            addons,
        })
    }

    async fn caller_identity(&self) -> Result<CallerIdentity> {
        self.gateway
            .caller_identity()
            .await
            .context(error::IdentitySnafu)
    }

    /// Create the cluster service role if needed and attach the policies EKS requires.
    async fn ensure_cluster_role(&self) -> Result<()> {
        match self
            .gateway
            .create_role(CLUSTER_ROLE_NAME, &trust_policy())
            .await
        {
            Ok(()) => info!("Successfully created role: {}", CLUSTER_ROLE_NAME),
            Err(e) if e.is_already_exists() => {
                info!("Role {} already exists. Proceeding...", CLUSTER_ROLE_NAME)
            }
            Err(e) => {
                return Err(Error::Create {
                    what: format!("role '{}'", CLUSTER_ROLE_NAME),
                    source: e,
                })
            }
        }

        for policy_arn in CLUSTER_ROLE_POLICY_ARNS {
            self.gateway
                .attach_role_policy(CLUSTER_ROLE_NAME, policy_arn)
                .await
                .context(error::CreateSnafu {
                    what: format!(
                        "attachment of policy '{}' to role '{}'",
                        policy_arn, CLUSTER_ROLE_NAME
                    ),
                })?;
            info!("Attached policy {} to role {}", policy_arn, CLUSTER_ROLE_NAME);
        }
        Ok(())
    }

    /// Build the VPC described by the layout, one call at a time.
    async fn create_network(
        &self,
        region: &str,
        allow_all_ingress: bool,
    ) -> Result<ProvisionedNetwork> {
        let layout = self.layout;
        layout.validate()?;

        let vpc_name = layout.vpc_name();
        let network_id = self
            .gateway
            .create_network(&layout.vpc_cidr, &provenance_tags(&vpc_name))
            .await
            .context(error::CreateSnafu {
                what: format!("VPC '{}'", vpc_name),
            })?;
        info!("Created VPC ID: {}", network_id);

        let mut subnet_ids = Vec::new();
        for subnet in &layout.subnets {
            let availability_zone = format!("{}{}", region, subnet.zone_suffix);
            let subnet_id = self
                .gateway
                .create_subnet(
                    &network_id,
                    &subnet.cidr_block,
                    &availability_zone,
                    &provenance_tags(&subnet.name),
                )
                .await
                .context(error::CreateSnafu {
                    what: format!("subnet '{}'", subnet.name),
                })?;
            info!(
                "Created subnet {} ({} in {})",
                subnet_id, subnet.cidr_block, availability_zone
            );
            subnet_ids.push(subnet_id);
        }

        for subnet_id in &subnet_ids {
            self.gateway
                .enable_public_ip_on_launch(subnet_id)
                .await
                .context(error::CreateSnafu {
                    what: format!("public IPv4 auto-assignment for subnet '{}'", subnet_id),
                })?;
            info!("Enabled auto-assign public IPv4 for subnet {}", subnet_id);
        }

        let gateway_id = self
            .gateway
            .create_internet_gateway(&provenance_tags(&layout.internet_gateway_name))
            .await
            .context(error::CreateSnafu {
                what: format!("internet gateway '{}'", layout.internet_gateway_name),
            })?;
        self.gateway
            .attach_internet_gateway(&gateway_id, &network_id)
            .await
            .context(error::CreateSnafu {
                what: format!(
                    "attachment of internet gateway '{}' to VPC '{}'",
                    gateway_id, network_id
                ),
            })?;
        info!("Created Internet Gateway ID: {}", gateway_id);

        let route_table_id = self
            .gateway
            .create_route_table(&network_id, &provenance_tags(&layout.route_table_name))
            .await
            .context(error::CreateSnafu {
                what: format!("route table '{}'", layout.route_table_name),
            })?;
        info!("Created Route Table ID: {}", route_table_id);
        self.gateway
            .create_route(&route_table_id, DEFAULT_ROUTE_CIDR, &gateway_id)
            .await
            .context(error::CreateSnafu {
                what: format!(
                    "route '{}' in route table '{}'",
                    DEFAULT_ROUTE_CIDR, route_table_id
                ),
            })?;
        for subnet_id in &subnet_ids {
            self.gateway
                .associate_route_table(&route_table_id, subnet_id)
                .await
                .context(error::CreateSnafu {
                    what: format!(
                        "association of route table '{}' with subnet '{}'",
                        route_table_id, subnet_id
                    ),
                })?;
        }

        let security_group_id = self
            .gateway
            .create_security_group(
                &network_id,
                &layout.security_group_name,
                &layout.security_group_description,
                &provenance_tags(&layout.security_group_name),
            )
            .await
            .context(error::CreateSnafu {
                what: format!("security group '{}'", layout.security_group_name),
            })?;
        info!("Created Security Group ID: {}", security_group_id);
        if allow_all_ingress {
            self.gateway
                .authorize_ingress(&security_group_id, DEFAULT_ROUTE_CIDR)
                .await
                .context(error::CreateSnafu {
                    what: format!("ingress rule for security group '{}'", security_group_id),
                })?;
            info!(
                "Allowed all inbound traffic for security group {}",
                security_group_id
            );
        }

        Ok(ProvisionedNetwork {
            network_id,
            subnet_ids,
            security_group_ids: vec![security_group_id],
            internet_gateway_id: Some(gateway_id),
            route_table_id: Some(route_table_id),
            created: true,
        })
    }

    /// Ask the operator for an existing VPC, its subnets and security groups.
    async fn select_network(&self, operator: &mut dyn Operator) -> Result<ProvisionedNetwork> {
        let networks = self
            .gateway
            .list_networks()
            .await
            .context(error::InspectSnafu { what: "VPCs" })?;
        ensure!(!networks.is_empty(), error::NoNetworksSnafu);
        let labels: Vec<String> = networks.iter().map(network_label).collect();
        let selection = [operator.select("Select the VPC to use:", &labels)?];
        let network = chosen(&networks, &labels, &selection)?
            .first()
            .map(|network| network.id.clone())
            .ok_or_else(|| operator::Error::InvalidSelection {
                input: selection[0].clone(),
            })?;

        let subnets = self
            .gateway
            .list_subnets(&network)
            .await
            .context(error::InspectSnafu {
                what: format!("subnets of VPC '{}'", network),
            })?;
        ensure!(
            subnets.len() >= MIN_CLUSTER_SUBNETS,
            error::InsufficientSubnetsSnafu {
                required: MIN_CLUSTER_SUBNETS,
                selected: subnets.len(),
            }
        );
        let labels: Vec<String> = subnets.iter().map(subnet_label).collect();
        let selection = operator.multi_select(
            "Select at least two subnets in different availability zones:",
            &labels,
        )?;
        let selected_subnets = chosen(&subnets, &labels, &selection)?;
        validate_cluster_subnets(&selected_subnets)?;

        let groups = self
            .gateway
            .list_security_groups(&network)
            .await
            .context(error::InspectSnafu {
                what: format!("security groups of VPC '{}'", network),
            })?;
        let labels: Vec<String> = groups.iter().map(security_group_label).collect();
        let selection = operator.multi_select("Select the security groups to use:", &labels)?;
        let selected_groups = chosen(&groups, &labels, &selection)?;
        ensure!(!selected_groups.is_empty(), error::NoSecurityGroupsSnafu);

        Ok(ProvisionedNetwork {
            network_id: network,
            subnet_ids: selected_subnets.iter().map(|s| s.id.clone()).collect(),
            security_group_ids: selected_groups.iter().map(|g| g.id.clone()).collect(),
            internet_gateway_id: None,
            route_table_id: None,
            created: false,
        })
    }

    /// Install the core add-ons in order.
    async fn install_addons(&self, cluster_name: &str) -> Result<Vec<Addon>> {
        for addon in Addon::CORE {
            self.gateway
                .create_addon(cluster_name, addon)
                .await
                .context(error::CreateSnafu {
                    what: format!("addon '{}' on cluster '{}'", addon, cluster_name),
                })?;
            info!("Successfully installed addon {}", addon);
        }
        Ok(Addon::CORE.to_vec())
    }
}
