/*!

Cluster teardown and the dependency-ordered removal of the VPC that was created for it.

Whether the VPC may be removed is decided by the cluster's tags alone: only a cluster tagged
`HostingVPC=isolated` owns its VPC, and the VPC id is read from its `VpcId` tag. The network
teardown follows a fixed order because AWS refuses to delete a resource while something still
depends on it.

!*/

use crate::constants::{DEFAULT_SECURITY_GROUP_NAME, NETWORK_ID_TAG};
use crate::error::{self, Result};
use crate::gateway::{CloudGateway, ResourceRef};
use crate::operator::Operator;
use crate::tags::TagGuard;
use log::{debug, info, warn};
use sandbox_utils::impl_display_as_json;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use std::time::Duration;

const DEFAULT_DELETION_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

const DANGER_PROMPT: &str =
    "This cluster does not appear to be created by this tool. Are you sure you want to delete it? Danger!!";

/// What a deprovisioning run ended up doing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeprovisionOutcome {
    /// The operator declined; nothing was deleted.
    Aborted,
    ClusterDeleted,
    ClusterAndNetworkDeleted {
        network_id: String,
        report: TeardownReport,
    },
}

impl_display_as_json!(DeprovisionOutcome);

/// The resources removed (or deliberately kept) while tearing down a VPC.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownReport {
    pub network_interfaces: Vec<String>,
    pub internet_gateways: Vec<String>,
    pub subnets: Vec<String>,
    pub route_tables: Vec<String>,
    /// Main route tables, which AWS removes along with the VPC.
    pub skipped_route_tables: Vec<String>,
    pub security_groups: Vec<String>,
    /// The VPC's `default` security group.
    pub skipped_security_groups: Vec<String>,
}

impl_display_as_json!(TeardownReport);

impl TeardownReport {
    pub fn deleted(&self) -> usize {
        self.network_interfaces.len()
            + self.internet_gateways.len()
            + self.subnets.len()
            + self.route_tables.len()
            + self.security_groups.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped_route_tables.len() + self.skipped_security_groups.len()
    }
}

/// How long to wait for a deleted cluster to disappear before removing its VPC.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeletionWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for DeletionWait {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DELETION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DeletionWait {
    /// `None` when either duration is zero, which disables waiting.
    pub fn from_secs(timeout_secs: u64, poll_interval_secs: u64) -> Option<Self> {
        if timeout_secs == 0 || poll_interval_secs == 0 {
            return None;
        }
        Some(Self {
            timeout: Duration::from_secs(timeout_secs),
            poll_interval: Duration::from_secs(poll_interval_secs),
        })
    }
}

pub struct Deprovisioner<'a, G: ?Sized> {
    gateway: &'a G,
    wait: Option<DeletionWait>,
}

impl<'a, G> Deprovisioner<'a, G>
where
    G: CloudGateway + ?Sized,
{
    /// A deprovisioner that waits with the default [`DeletionWait`] before a cascade.
    pub fn new(gateway: &'a G) -> Self {
        Self {
            gateway,
            wait: Some(DeletionWait::default()),
        }
    }

    pub fn with_deletion_wait(mut self, wait: Option<DeletionWait>) -> Self {
        self.wait = wait;
        self
    }

    /// Let the operator pick one of the region's clusters. `None` when there are no clusters.
    pub async fn select_cluster(&self, operator: &mut dyn Operator) -> Result<Option<String>> {
        let clusters = self
            .gateway
            .list_clusters()
            .await
            .context(error::InspectSnafu { what: "clusters" })?;
        if clusters.is_empty() {
            info!("No clusters found in this region");
            return Ok(None);
        }
        let cluster = operator.select("Select the EKS cluster to delete:", &clusters)?;
        Ok(Some(cluster))
    }

    pub async fn deprovision(
        &self,
        cluster: &str,
        operator: &mut dyn Operator,
    ) -> Result<DeprovisionOutcome> {
        let guard = TagGuard::new(self.gateway);
        let resource = ResourceRef::Cluster(cluster.to_string());

        if !guard.is_created_by_tool(&resource).await? {
            warn!("Cluster '{}' was not created by this tool", cluster);
            if !operator.confirm(DANGER_PROMPT, Some(false))? {
                info!("Deletion of cluster '{}' aborted", cluster);
                return Ok(DeprovisionOutcome::Aborted);
            }
        }

        let mut cascade_network = None;
        if guard.is_isolated_hosting(&resource).await? {
            let network_id = guard
                .tag_value(&resource, NETWORK_ID_TAG)
                .await?
                .context(error::MissingTagSnafu {
                    cluster,
                    key: NETWORK_ID_TAG,
                })?;
            let cascade = operator.confirm(
                &format!(
                    "This cluster runs in its own VPC ({}). Delete the VPC and its resources too?",
                    network_id
                ),
                Some(true),
            )?;
            if cascade {
                cascade_network = Some(network_id);
            }
        }

        info!("Deleting EKS cluster '{}'", cluster);
        self.gateway
            .delete_cluster(cluster)
            .await
            .context(error::TeardownSnafu {
                what: format!("EKS cluster '{}'", cluster),
            })?;
        info!("EKS cluster '{}' deletion initiated", cluster);

        let network_id = match cascade_network {
            Some(network_id) => network_id,
            None => return Ok(DeprovisionOutcome::ClusterDeleted),
        };

        if let Some(wait) = self.wait {
            self.wait_for_cluster_deletion(cluster, wait).await?;
        }
        let report = teardown_network(self.gateway, &network_id).await?;
        info!(
            "Deleted VPC '{}' ({} resources removed, {} kept)",
            network_id,
            report.deleted(),
            report.skipped()
        );
        Ok(DeprovisionOutcome::ClusterAndNetworkDeleted { network_id, report })
    }

    async fn wait_for_cluster_deletion(&self, cluster: &str, wait: DeletionWait) -> Result<()> {
        info!(
            "Waiting up to {}s for cluster '{}' to be deleted",
            wait.timeout.as_secs(),
            cluster
        );
        tokio::time::timeout(wait.timeout, self.poll_until_deleted(cluster, wait.poll_interval))
            .await
            .context(error::DeletionTimeoutSnafu {
                cluster,
                timeout: wait.timeout,
            })?
    }

    async fn poll_until_deleted(&self, cluster: &str, poll_interval: Duration) -> Result<()> {
        loop {
            let exists = self
                .gateway
                .cluster_exists(cluster)
                .await
                .context(error::InspectSnafu {
                    what: format!("EKS cluster '{}'", cluster),
                })?;
            if !exists {
                info!("Cluster '{}' is gone", cluster);
                return Ok(());
            }
            debug!(
                "Cluster '{}' still exists, checking again in {}s",
                cluster,
                poll_interval.as_secs()
            );
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Remove everything inside `network_id`, then the network itself. The first failure stops the
/// teardown; resources already removed stay removed.
pub async fn teardown_network<G>(gateway: &G, network_id: &str) -> Result<TeardownReport>
where
    G: CloudGateway + ?Sized,
{
    let mut report = TeardownReport::default();

    let interfaces = gateway
        .list_network_interfaces(network_id)
        .await
        .context(error::InspectSnafu {
            what: format!("network interfaces of VPC '{}'", network_id),
        })?;
    for interface in interfaces {
        match &interface.attachment_id {
            Some(attachment_id) => {
                gateway
                    .detach_network_interface(attachment_id, true)
                    .await
                    .context(error::TeardownSnafu {
                        what: format!("attachment of network interface '{}'", interface.id),
                    })?;
                info!("Detached network interface {}", interface.id);
            }
            None => debug!("Network interface {} is not attached", interface.id),
        }
        gateway
            .delete_network_interface(&interface.id)
            .await
            .context(error::TeardownSnafu {
                what: format!("network interface '{}'", interface.id),
            })?;
        info!("Deleted network interface {}", interface.id);
        report.network_interfaces.push(interface.id);
    }

    let internet_gateways = gateway
        .list_internet_gateways(network_id)
        .await
        .context(error::InspectSnafu {
            what: format!("internet gateways of VPC '{}'", network_id),
        })?;
    for gateway_id in internet_gateways {
        gateway
            .detach_internet_gateway(&gateway_id, network_id)
            .await
            .context(error::TeardownSnafu {
                what: format!("attachment of internet gateway '{}'", gateway_id),
            })?;
        gateway
            .delete_internet_gateway(&gateway_id)
            .await
            .context(error::TeardownSnafu {
                what: format!("internet gateway '{}'", gateway_id),
            })?;
        info!("Deleted Internet Gateway {}", gateway_id);
        report.internet_gateways.push(gateway_id);
    }

    let subnets = gateway
        .list_subnets(network_id)
        .await
        .context(error::InspectSnafu {
            what: format!("subnets of VPC '{}'", network_id),
        })?;
    for subnet in subnets {
        gateway
            .delete_subnet(&subnet.id)
            .await
            .context(error::TeardownSnafu {
                what: format!("subnet '{}'", subnet.id),
            })?;
        info!("Deleted Subnet {}", subnet.id);
        report.subnets.push(subnet.id);
    }

    let route_tables = gateway
        .list_route_tables(network_id)
        .await
        .context(error::InspectSnafu {
            what: format!("route tables of VPC '{}'", network_id),
        })?;
    for route_table_id in route_tables {
        let associations = gateway
            .route_table_associations(&route_table_id)
            .await
            .context(error::InspectSnafu {
                what: format!("route table '{}'", route_table_id),
            })?;
        if associations.iter().any(|association| association.main) {
            info!("Skipping main route table {}", route_table_id);
            report.skipped_route_tables.push(route_table_id);
            continue;
        }
        gateway
            .delete_route_table(&route_table_id)
            .await
            .context(error::TeardownSnafu {
                what: format!("route table '{}'", route_table_id),
            })?;
        info!("Deleted Route Table {}", route_table_id);
        report.route_tables.push(route_table_id);
    }

    let groups = gateway
        .list_security_groups(network_id)
        .await
        .context(error::InspectSnafu {
            what: format!("security groups of VPC '{}'", network_id),
        })?;
    for group in groups {
        let group = gateway
            .describe_security_group(&group.id)
            .await
            .context(error::InspectSnafu {
                what: format!("security group '{}'", group.id),
            })?;
        if group.name == DEFAULT_SECURITY_GROUP_NAME {
            info!("Skipping default security group {}", group.id);
            report.skipped_security_groups.push(group.id);
            continue;
        }
        gateway
            .delete_security_group(&group.id)
            .await
            .context(error::TeardownSnafu {
                what: format!("security group '{}'", group.id),
            })?;
        info!("Deleted Security Group {}", group.id);
        report.security_groups.push(group.id);
    }

    gateway
        .delete_network(network_id)
        .await
        .context(error::TeardownSnafu {
            what: format!("VPC '{}'", network_id),
        })?;
    info!("Deleted VPC {}", network_id);

    Ok(report)
}

#[test]
fn zero_disables_the_deletion_wait() {
    assert_eq!(DeletionWait::from_secs(0, 15), None);
    assert_eq!(DeletionWait::from_secs(1200, 0), None);
    assert_eq!(
        DeletionWait::from_secs(1200, 15),
        Some(DeletionWait::default())
    );
}

#[test]
fn report_counts_deleted_and_skipped() {
    let report = TeardownReport {
        network_interfaces: vec!["eni-1".to_string()],
        subnets: vec!["subnet-1".to_string(), "subnet-2".to_string()],
        skipped_route_tables: vec!["rtb-main".to_string()],
        skipped_security_groups: vec!["sg-default".to_string()],
        ..Default::default()
    };
    assert_eq!(report.deleted(), 3);
    assert_eq!(report.skipped(), 2);
}
