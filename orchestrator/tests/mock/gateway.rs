use sandbox_orchestrator::gateway::{
    Addon, CallerIdentity, CloudGateway, ClusterRequest, Error, NetworkInterfaceSummary,
    NetworkSummary, ResourceRef, Result, RouteTableAssociation, SecurityGroupSummary,
    SubnetSummary, Tags,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub(crate) const ACCOUNT_ID: &str = "123456789012";

#[derive(Default)]
struct Cloud {
    calls: Vec<String>,
    next_id: u32,
    role_exists: bool,
    networks: Vec<NetworkSummary>,
    subnets: Vec<(String, SubnetSummary)>,
    /// Gateway id and the network it is attached to.
    internet_gateways: Vec<(String, Option<String>)>,
    /// Network, route table id, main.
    route_tables: Vec<(String, String, bool)>,
    security_groups: Vec<(String, SecurityGroupSummary)>,
    network_interfaces: Vec<(String, NetworkInterfaceSummary)>,
    clusters: BTreeMap<String, Tags>,
    cluster_requests: Vec<ClusterRequest>,
    /// Number of `cluster_exists` polls that still report a deleted cluster as present.
    deleting_polls: u32,
    versions: Vec<String>,
    tags: BTreeMap<String, Tags>,
    /// Every call to this method fails with a request error.
    failing: Option<String>,
}

impl Cloud {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    /// Record a call, failing it when its method is the one set by `MockCloud::fail_on`.
    fn record<S: Into<String>>(&mut self, call: S) -> Result<()> {
        let call = call.into();
        let method = call.split(' ').next().unwrap_or_default().to_string();
        self.calls.push(call);
        if self.failing.as_deref() == Some(method.as_str()) {
            return Err(Error::Request {
                action: method,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// An in-memory region. Creating a network also creates its main route table and its `default`
/// security group, as AWS does.
#[derive(Default)]
pub(crate) struct MockCloud {
    cloud: Mutex<Cloud>,
}

impl MockCloud {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn with<T, F: FnOnce(&mut Cloud) -> T>(&self, f: F) -> T {
        let mut cloud = self.cloud.lock().unwrap();
        f(&mut cloud)
    }

    pub(crate) fn with_existing_role(self) -> Self {
        self.with(|cloud| cloud.role_exists = true);
        self
    }

    pub(crate) fn with_versions(self, versions: &[&str]) -> Self {
        self.with(|cloud| cloud.versions = versions.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Fail every call to `method`, for example `delete_subnet`, after recording it.
    pub(crate) fn fail_on(self, method: &str) -> Self {
        self.with(|cloud| cloud.failing = Some(method.to_string()));
        self
    }

    /// Report a deleted cluster as still present for `polls` calls to `cluster_exists`.
    pub(crate) fn with_slow_cluster_deletion(self, polls: u32) -> Self {
        self.with(|cloud| cloud.deleting_polls = polls);
        self
    }

    /// Add a network with a main route table and a `default` security group, returning its id.
    pub(crate) fn add_network(&self, cidr_block: &str) -> String {
        self.with(|cloud| add_network(cloud, cidr_block, Tags::new()))
    }

    pub(crate) fn add_subnet(&self, network_id: &str, zone: &str) -> String {
        self.with(|cloud| {
            let id = cloud.id("subnet");
            cloud.subnets.push((
                network_id.to_string(),
                SubnetSummary {
                    id: id.clone(),
                    cidr_block: None,
                    availability_zone: Some(zone.to_string()),
                },
            ));
            id
        })
    }

    pub(crate) fn add_security_group(&self, network_id: &str, name: &str) -> String {
        self.with(|cloud| {
            let id = cloud.id("sg");
            cloud.security_groups.push((
                network_id.to_string(),
                SecurityGroupSummary {
                    id: id.clone(),
                    name: name.to_string(),
                },
            ));
            id
        })
    }

    pub(crate) fn add_network_interface(&self, network_id: &str, attached: bool) -> String {
        self.with(|cloud| {
            let id = cloud.id("eni");
            let attachment_id = if attached {
                Some(cloud.id("eni-attach"))
            } else {
                None
            };
            cloud.network_interfaces.push((
                network_id.to_string(),
                NetworkInterfaceSummary {
                    id: id.clone(),
                    attachment_id,
                },
            ));
            id
        })
    }

    pub(crate) fn add_cluster(&self, name: &str, tags: Tags) {
        self.with(|cloud| cloud.clusters.insert(name.to_string(), tags));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.with(|cloud| cloud.calls.clone())
    }

    /// Calls whose method name is `method`.
    pub(crate) fn calls_to(&self, method: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.split(' ').next() == Some(method))
            .collect()
    }

    /// Index of the first call starting with `prefix`.
    pub(crate) fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|call| call.starts_with(prefix))
    }

    /// Index of the last call starting with `prefix`.
    pub(crate) fn last_position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().rposition(|call| call.starts_with(prefix))
    }

    pub(crate) fn cluster_requests(&self) -> Vec<ClusterRequest> {
        self.with(|cloud| cloud.cluster_requests.clone())
    }

    pub(crate) fn tags_of(&self, id: &str) -> Tags {
        self.with(|cloud| cloud.tags.get(id).cloned().unwrap_or_default())
    }

    pub(crate) fn network_exists(&self, network_id: &str) -> bool {
        self.with(|cloud| cloud.networks.iter().any(|n| n.id == network_id))
    }
}

fn add_network(cloud: &mut Cloud, cidr_block: &str, tags: Tags) -> String {
    let id = cloud.id("vpc");
    cloud.networks.push(NetworkSummary {
        id: id.clone(),
        cidr_block: Some(cidr_block.to_string()),
        name: tags.get("Name").cloned(),
    });
    cloud.tags.insert(id.clone(), tags);
    let main = cloud.id("rtb");
    cloud.route_tables.push((id.clone(), main, true));
    let default = cloud.id("sg");
    cloud.security_groups.push((
        id.clone(),
        SecurityGroupSummary {
            id: default,
            name: "default".to_string(),
        },
    ));
    id
}

fn missing(what: &str) -> Error {
    Error::Request {
        action: what.to_string(),
        message: "resource not found".to_string(),
    }
}

#[async_trait::async_trait]
impl CloudGateway for MockCloud {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        self.with(|cloud| {
            cloud.record("caller_identity")?;
            Ok(CallerIdentity {
                account: ACCOUNT_ID.to_string(),
                arn: format!("arn:aws:iam::{}:user/sandbox", ACCOUNT_ID),
            })
        })
    }

    async fn create_role(&self, role_name: &str, _trust_policy: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("create_role {}", role_name))?;
            if cloud.role_exists {
                return Err(Error::AlreadyExists {
                    what: format!("Role '{}'", role_name),
                });
            }
            cloud.role_exists = true;
            Ok(())
        })
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("attach_role_policy {} {}", role_name, policy_arn))?;
            Ok(())
        })
    }

    async fn create_network(&self, cidr_block: &str, tags: &Tags) -> Result<String> {
        self.with(|cloud| {
            cloud.record(format!("create_network {}", cidr_block))?;
            Ok(add_network(cloud, cidr_block, tags.clone()))
        })
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>> {
        self.with(|cloud| {
            cloud.record("list_networks")?;
            Ok(cloud.networks.clone())
        })
    }

    async fn delete_network(&self, network_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("delete_network {}", network_id))?;
            let before = cloud.networks.len();
            cloud.networks.retain(|network| network.id != network_id);
            if cloud.networks.len() == before {
                return Err(missing(network_id));
            }
            cloud.route_tables.retain(|(net, _, _)| net != network_id);
            cloud.security_groups.retain(|(net, _)| net != network_id);
            Ok(())
        })
    }

    async fn create_subnet(
        &self,
        network_id: &str,
        cidr_block: &str,
        availability_zone: &str,
        tags: &Tags,
    ) -> Result<String> {
        self.with(|cloud| {
            cloud.record(format!(
                "create_subnet {} {} {}",
                network_id, cidr_block, availability_zone
            ))?;
            let id = cloud.id("subnet");
            cloud.subnets.push((
                network_id.to_string(),
                SubnetSummary {
                    id: id.clone(),
                    cidr_block: Some(cidr_block.to_string()),
                    availability_zone: Some(availability_zone.to_string()),
                },
            ));
            cloud.tags.insert(id.clone(), tags.clone());
            Ok(id)
        })
    }

    async fn enable_public_ip_on_launch(&self, subnet_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("enable_public_ip_on_launch {}", subnet_id))?;
            Ok(())
        })
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<SubnetSummary>> {
        self.with(|cloud| {
            cloud.record(format!("list_subnets {}", network_id))?;
            Ok(cloud
                .subnets
                .iter()
                .filter(|(net, _)| net == network_id)
                .map(|(_, subnet)| subnet.clone())
                .collect())
        })
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("delete_subnet {}", subnet_id))?;
            cloud.subnets.retain(|(_, subnet)| subnet.id != subnet_id);
            Ok(())
        })
    }

    async fn create_internet_gateway(&self, tags: &Tags) -> Result<String> {
        self.with(|cloud| {
            cloud.record("create_internet_gateway")?;
            let id = cloud.id("igw");
            cloud.internet_gateways.push((id.clone(), None));
            cloud.tags.insert(id.clone(), tags.clone());
            Ok(id)
        })
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, network_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!(
                "attach_internet_gateway {} {}",
                gateway_id, network_id
            ))?;
            for (id, attachment) in cloud.internet_gateways.iter_mut() {
                if id == gateway_id {
                    *attachment = Some(network_id.to_string());
                }
            }
            Ok(())
        })
    }

    async fn list_internet_gateways(&self, network_id: &str) -> Result<Vec<String>> {
        self.with(|cloud| {
            cloud.record(format!("list_internet_gateways {}", network_id))?;
            Ok(cloud
                .internet_gateways
                .iter()
                .filter(|(_, attachment)| attachment.as_deref() == Some(network_id))
                .map(|(id, _)| id.clone())
                .collect())
        })
    }

    async fn detach_internet_gateway(&self, gateway_id: &str, network_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!(
                "detach_internet_gateway {} {}",
                gateway_id, network_id
            ))?;
            for (id, attachment) in cloud.internet_gateways.iter_mut() {
                if id == gateway_id {
                    *attachment = None;
                }
            }
            Ok(())
        })
    }

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("delete_internet_gateway {}", gateway_id))?;
            cloud.internet_gateways.retain(|(id, _)| id != gateway_id);
            Ok(())
        })
    }

    async fn create_route_table(&self, network_id: &str, tags: &Tags) -> Result<String> {
        self.with(|cloud| {
            cloud.record(format!("create_route_table {}", network_id))?;
            let id = cloud.id("rtb");
            cloud
                .route_tables
                .push((network_id.to_string(), id.clone(), false));
            cloud.tags.insert(id.clone(), tags.clone());
            Ok(id)
        })
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr_block: &str,
        gateway_id: &str,
    ) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!(
                "create_route {} {} {}",
                route_table_id, destination_cidr_block, gateway_id
            ))?;
            Ok(())
        })
    }

    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!(
                "associate_route_table {} {}",
                route_table_id, subnet_id
            ))?;
            Ok(())
        })
    }

    async fn list_route_tables(&self, network_id: &str) -> Result<Vec<String>> {
        self.with(|cloud| {
            cloud.record(format!("list_route_tables {}", network_id))?;
            Ok(cloud
                .route_tables
                .iter()
                .filter(|(net, _, _)| net == network_id)
                .map(|(_, id, _)| id.clone())
                .collect())
        })
    }

    async fn route_table_associations(
        &self,
        route_table_id: &str,
    ) -> Result<Vec<RouteTableAssociation>> {
        self.with(|cloud| {
            cloud.record(format!("route_table_associations {}", route_table_id))?;
            let (_, _, main) = cloud
                .route_tables
                .iter()
                .find(|(_, id, _)| id == route_table_id)
                .ok_or_else(|| missing(route_table_id))?;
            Ok(vec![RouteTableAssociation {
                id: Some(format!("{}-assoc", route_table_id)),
                subnet_id: None,
                main: *main,
            }])
        })
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("delete_route_table {}", route_table_id))?;
            cloud.route_tables.retain(|(_, id, _)| id != route_table_id);
            Ok(())
        })
    }

    async fn create_security_group(
        &self,
        network_id: &str,
        name: &str,
        description: &str,
        tags: &Tags,
    ) -> Result<String> {
        self.with(|cloud| {
            cloud.record(format!(
                "create_security_group {} {} {}",
                network_id, name, description
            ))?;
            let id = cloud.id("sg");
            cloud.security_groups.push((
                network_id.to_string(),
                SecurityGroupSummary {
                    id: id.clone(),
                    name: name.to_string(),
                },
            ));
            cloud.tags.insert(id.clone(), tags.clone());
            Ok(id)
        })
    }

    async fn authorize_ingress(&self, group_id: &str, cidr_ip: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("authorize_ingress {} {}", group_id, cidr_ip))?;
            Ok(())
        })
    }

    async fn list_security_groups(&self, network_id: &str) -> Result<Vec<SecurityGroupSummary>> {
        self.with(|cloud| {
            cloud.record(format!("list_security_groups {}", network_id))?;
            Ok(cloud
                .security_groups
                .iter()
                .filter(|(net, _)| net == network_id)
                .map(|(_, group)| group.clone())
                .collect())
        })
    }

    async fn describe_security_group(&self, group_id: &str) -> Result<SecurityGroupSummary> {
        self.with(|cloud| {
            cloud.record(format!("describe_security_group {}", group_id))?;
            cloud
                .security_groups
                .iter()
                .find(|(_, group)| group.id == group_id)
                .map(|(_, group)| group.clone())
                .ok_or_else(|| missing(group_id))
        })
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("delete_security_group {}", group_id))?;
            cloud.security_groups.retain(|(_, group)| group.id != group_id);
            Ok(())
        })
    }

    async fn list_network_interfaces(
        &self,
        network_id: &str,
    ) -> Result<Vec<NetworkInterfaceSummary>> {
        self.with(|cloud| {
            cloud.record(format!("list_network_interfaces {}", network_id))?;
            Ok(cloud
                .network_interfaces
                .iter()
                .filter(|(net, _)| net == network_id)
                .map(|(_, interface)| interface.clone())
                .collect())
        })
    }

    async fn detach_network_interface(&self, attachment_id: &str, force: bool) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!(
                "detach_network_interface {} {}",
                attachment_id, force
            ))?;
            for (_, interface) in cloud.network_interfaces.iter_mut() {
                if interface.attachment_id.as_deref() == Some(attachment_id) {
                    interface.attachment_id = None;
                }
            }
            Ok(())
        })
    }

    async fn delete_network_interface(&self, interface_id: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("delete_network_interface {}", interface_id))?;
            let attached = cloud
                .network_interfaces
                .iter()
                .any(|(_, i)| i.id == interface_id && i.attachment_id.is_some());
            if attached {
                return Err(Error::Request {
                    action: format!("delete network interface '{}'", interface_id),
                    message: "interface is still attached".to_string(),
                });
            }
            cloud
                .network_interfaces
                .retain(|(_, interface)| interface.id != interface_id);
            Ok(())
        })
    }

    async fn create_cluster(&self, request: &ClusterRequest) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("create_cluster {}", request.name))?;
            cloud
                .clusters
                .insert(request.name.clone(), request.tags.clone());
            cloud.cluster_requests.push(request.clone());
            Ok(())
        })
    }

    async fn list_clusters(&self) -> Result<Vec<String>> {
        self.with(|cloud| {
            cloud.record("list_clusters")?;
            Ok(cloud.clusters.keys().cloned().collect())
        })
    }

    async fn cluster_exists(&self, cluster_name: &str) -> Result<bool> {
        self.with(|cloud| {
            cloud.record(format!("cluster_exists {}", cluster_name))?;
            if cloud.clusters.contains_key(cluster_name) {
                return Ok(true);
            }
            if cloud.deleting_polls > 0 {
                cloud.deleting_polls -= 1;
                return Ok(true);
            }
            Ok(false)
        })
    }

    async fn delete_cluster(&self, cluster_name: &str) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("delete_cluster {}", cluster_name))?;
            cloud
                .clusters
                .remove(cluster_name)
                .map(|_| ())
                .ok_or_else(|| missing(cluster_name))
        })
    }

    async fn cluster_versions(&self) -> Result<Vec<String>> {
        self.with(|cloud| {
            cloud.record("cluster_versions")?;
            Ok(cloud.versions.clone())
        })
    }

    async fn create_addon(&self, cluster_name: &str, addon: Addon) -> Result<()> {
        self.with(|cloud| {
            cloud.record(format!("create_addon {} {}", cluster_name, addon))?;
            Ok(())
        })
    }

    async fn resource_tags(&self, resource: &ResourceRef) -> Result<Tags> {
        self.with(|cloud| {
            cloud.record(format!("resource_tags {}", resource))?;
            Ok(match resource {
                ResourceRef::Cluster(name) => cloud.clusters.get(name).cloned().unwrap_or_default(),
                ResourceRef::Ec2(id) => cloud.tags.get(id).cloned().unwrap_or_default(),
            })
        })
    }
}
