/*!

The cloud gateway is the only way the orchestrator talks to the cloud provider. Every operation is
a single request/response call; the orchestrator awaits each call before issuing the next one.

`AwsGateway` implements [`CloudGateway`] with the AWS SDK. Tests provide their own implementation
that records the calls it receives.

!*/

mod aws;
mod error;

pub use aws::AwsGateway;
pub use error::{Error, IntoGatewayError, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Key/value tags as the cloud provider stores them.
pub type Tags = BTreeMap<String, String>;

/// A resource whose tags can be looked up.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ResourceRef {
    /// An EKS cluster, identified by name.
    Cluster(String),
    /// Any EC2 networking resource (`vpc-`, `subnet-`, `igw-`, `rtb-`, `sg-`), identified by id.
    Ec2(String),
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceRef::Cluster(name) => write!(f, "cluster '{}'", name),
            ResourceRef::Ec2(id) => write!(f, "resource '{}'", id),
        }
    }
}

/// The account and principal the gateway's credentials resolve to.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub id: String,
    pub cidr_block: Option<String>,
    /// The value of the `Name` tag, if any.
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSummary {
    pub id: String,
    pub cidr_block: Option<String>,
    pub availability_zone: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupSummary {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceSummary {
    pub id: String,
    /// `None` when the interface is not attached to anything.
    pub attachment_id: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableAssociation {
    pub id: Option<String>,
    pub subnet_id: Option<String>,
    /// Whether this association makes the table the network's main route table.
    pub main: bool,
}

/// Everything the cluster creation call needs.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    pub name: String,
    pub version: String,
    pub role_arn: String,
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
    /// Enables managed compute, block storage and load balancing in the same call.
    pub auto_mode: bool,
    pub tags: Tags,
}

/// The core add-ons that can be installed onto a new cluster.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Addon {
    #[serde(rename = "coredns")]
    CoreDns,
    #[serde(rename = "kube-proxy")]
    KubeProxy,
    #[serde(rename = "vpc-cni")]
    VpcCni,
}

impl Addon {
    /// DNS resolution, node network proxy and pod networking, in installation order.
    pub const CORE: [Addon; 3] = [Addon::CoreDns, Addon::KubeProxy, Addon::VpcCni];

    pub fn name(&self) -> &'static str {
        match self {
            Addon::CoreDns => "coredns",
            Addon::KubeProxy => "kube-proxy",
            Addon::VpcCni => "vpc-cni",
        }
    }
}

impl Display for Addon {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The capability set the orchestrator consumes. Identifiers are opaque strings assigned by the
/// provider; each `create_*` call returns the id of the resource it created.
#[async_trait::async_trait]
pub trait CloudGateway: Send + Sync {
    // Identity

    async fn caller_identity(&self) -> Result<CallerIdentity>;

    /// Returns [`Error::AlreadyExists`] when a role with this name is already present.
    async fn create_role(&self, role_name: &str, trust_policy: &str) -> Result<()>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;

    // Network

    async fn create_network(&self, cidr_block: &str, tags: &Tags) -> Result<String>;

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>>;

    async fn delete_network(&self, network_id: &str) -> Result<()>;

    async fn create_subnet(
        &self,
        network_id: &str,
        cidr_block: &str,
        availability_zone: &str,
        tags: &Tags,
    ) -> Result<String>;

    async fn enable_public_ip_on_launch(&self, subnet_id: &str) -> Result<()>;

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<SubnetSummary>>;

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()>;

    async fn create_internet_gateway(&self, tags: &Tags) -> Result<String>;

    async fn attach_internet_gateway(&self, gateway_id: &str, network_id: &str) -> Result<()>;

    /// Internet gateways attached to `network_id`.
    async fn list_internet_gateways(&self, network_id: &str) -> Result<Vec<String>>;

    async fn detach_internet_gateway(&self, gateway_id: &str, network_id: &str) -> Result<()>;

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()>;

    async fn create_route_table(&self, network_id: &str, tags: &Tags) -> Result<String>;

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr_block: &str,
        gateway_id: &str,
    ) -> Result<()>;

    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str) -> Result<()>;

    async fn list_route_tables(&self, network_id: &str) -> Result<Vec<String>>;

    async fn route_table_associations(
        &self,
        route_table_id: &str,
    ) -> Result<Vec<RouteTableAssociation>>;

    async fn delete_route_table(&self, route_table_id: &str) -> Result<()>;

    async fn create_security_group(
        &self,
        network_id: &str,
        name: &str,
        description: &str,
        tags: &Tags,
    ) -> Result<String>;

    /// Allow all inbound traffic from `cidr_ip`.
    async fn authorize_ingress(&self, group_id: &str, cidr_ip: &str) -> Result<()>;

    async fn list_security_groups(&self, network_id: &str) -> Result<Vec<SecurityGroupSummary>>;

    async fn describe_security_group(&self, group_id: &str) -> Result<SecurityGroupSummary>;

    async fn delete_security_group(&self, group_id: &str) -> Result<()>;

    async fn list_network_interfaces(
        &self,
        network_id: &str,
    ) -> Result<Vec<NetworkInterfaceSummary>>;

    async fn detach_network_interface(&self, attachment_id: &str, force: bool) -> Result<()>;

    async fn delete_network_interface(&self, interface_id: &str) -> Result<()>;

    // Cluster

    async fn create_cluster(&self, request: &ClusterRequest) -> Result<()>;

    async fn list_clusters(&self) -> Result<Vec<String>>;

    /// `false` once the provider no longer knows the cluster.
    async fn cluster_exists(&self, cluster_name: &str) -> Result<bool>;

    async fn delete_cluster(&self, cluster_name: &str) -> Result<()>;

    /// Every Kubernetes version the provider offers, including non-default ones.
    async fn cluster_versions(&self) -> Result<Vec<String>>;

    async fn create_addon(&self, cluster_name: &str, addon: Addon) -> Result<()>;

    // Tags

    /// The current tag set of `resource`. An untagged resource yields an empty map.
    async fn resource_tags(&self, resource: &ResourceRef) -> Result<Tags>;
}
