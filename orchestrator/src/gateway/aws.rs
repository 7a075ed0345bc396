use super::error::{self, IntoGatewayError, Result};
use super::{
    Addon, CallerIdentity, CloudGateway, ClusterRequest, NetworkInterfaceSummary, NetworkSummary,
    ResourceRef, RouteTableAssociation, SecurityGroupSummary, SubnetSummary, Tags,
};
use crate::constants::NAME_TAG;
use aws_sdk_ec2::types::{
    AttributeBooleanValue, Filter, IpPermission, IpRange, ResourceType, Tag, TagSpecification,
};
use aws_sdk_eks::types::{
    AuthenticationMode, BlockStorage, ComputeConfigRequest, CreateAccessConfigRequest,
    ElasticLoadBalancing, KubernetesNetworkConfigRequest, StorageConfigRequest, VpcConfigRequest,
};
use aws_types::SdkConfig;
use log::{debug, trace};
use std::collections::HashMap;

/// A [`CloudGateway`] backed by the AWS SDK clients for one region.
#[derive(Debug, Clone)]
pub struct AwsGateway {
    ec2_client: aws_sdk_ec2::Client,
    eks_client: aws_sdk_eks::Client,
    iam_client: aws_sdk_iam::Client,
    sts_client: aws_sdk_sts::Client,
}

impl AwsGateway {
    pub fn new(shared_config: &SdkConfig) -> Self {
        Self {
            ec2_client: aws_sdk_ec2::Client::new(shared_config),
            eks_client: aws_sdk_eks::Client::new(shared_config),
            iam_client: aws_sdk_iam::Client::new(shared_config),
            sts_client: aws_sdk_sts::Client::new(shared_config),
        }
    }
}

fn tag_specification(resource_type: ResourceType, tags: &Tags) -> TagSpecification {
    tags.iter()
        .fold(
            TagSpecification::builder().resource_type(resource_type),
            |builder, (key, value)| builder.tags(Tag::builder().key(key).value(value).build()),
        )
        .build()
}

fn filter(name: &str, value: &str) -> Filter {
    Filter::builder().name(name).values(value).build()
}

#[async_trait::async_trait]
impl CloudGateway for AwsGateway {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        let output = self
            .sts_client
            .get_caller_identity()
            .send()
            .await
            .context("get caller identity")?;
        Ok(CallerIdentity {
            account: output
                .account()
                .context("Account id missing from caller identity")?
                .to_string(),
            arn: output
                .arn()
                .context("Arn missing from caller identity")?
                .to_string(),
        })
    }

    async fn create_role(&self, role_name: &str, trust_policy: &str) -> Result<()> {
        let result = self
            .iam_client
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(trust_policy)
            .send()
            .await;
        if let Err(sdk_err) = &result {
            if sdk_err
                .as_service_error()
                .map_or(false, |e| e.is_entity_already_exists_exception())
            {
                return error::AlreadyExistsSnafu {
                    what: format!("Role '{}'", role_name),
                }
                .fail();
            }
        }
        result
            .context(format!("create role '{}'", role_name))
            .map(|_| ())
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.iam_client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .context(format!(
                "attach policy '{}' to role '{}'",
                policy_arn, role_name
            ))
            .map(|_| ())
    }

    async fn create_network(&self, cidr_block: &str, tags: &Tags) -> Result<String> {
        self.ec2_client
            .create_vpc()
            .cidr_block(cidr_block)
            .tag_specifications(tag_specification(ResourceType::Vpc, tags))
            .send()
            .await
            .context(format!("create VPC '{}'", cidr_block))?
            .vpc()
            .and_then(|vpc| vpc.vpc_id())
            .context("VPC id missing from create VPC response")
            .map(|id| id.to_string())
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>> {
        let output = self
            .ec2_client
            .describe_vpcs()
            .send()
            .await
            .context("describe VPCs")?;
        Ok(output
            .vpcs()
            .iter()
            .filter_map(|vpc| {
                vpc.vpc_id().map(|id| NetworkSummary {
                    id: id.to_string(),
                    cidr_block: vpc.cidr_block().map(|s| s.to_string()),
                    name: vpc
                        .tags()
                        .iter()
                        .find(|tag| tag.key() == Some(NAME_TAG))
                        .and_then(|tag| tag.value())
                        .map(|s| s.to_string()),
                })
            })
            .collect())
    }

    async fn delete_network(&self, network_id: &str) -> Result<()> {
        self.ec2_client
            .delete_vpc()
            .vpc_id(network_id)
            .send()
            .await
            .context(format!("delete VPC '{}'", network_id))
            .map(|_| ())
    }

    async fn create_subnet(
        &self,
        network_id: &str,
        cidr_block: &str,
        availability_zone: &str,
        tags: &Tags,
    ) -> Result<String> {
        self.ec2_client
            .create_subnet()
            .vpc_id(network_id)
            .cidr_block(cidr_block)
            .availability_zone(availability_zone)
            .tag_specifications(tag_specification(ResourceType::Subnet, tags))
            .send()
            .await
            .context(format!(
                "create subnet '{}' in '{}'",
                cidr_block, availability_zone
            ))?
            .subnet()
            .and_then(|subnet| subnet.subnet_id())
            .context("Subnet id missing from create subnet response")
            .map(|id| id.to_string())
    }

    async fn enable_public_ip_on_launch(&self, subnet_id: &str) -> Result<()> {
        self.ec2_client
            .modify_subnet_attribute()
            .subnet_id(subnet_id)
            .map_public_ip_on_launch(AttributeBooleanValue::builder().value(true).build())
            .send()
            .await
            .context(format!(
                "enable auto-assign public IPv4 for subnet '{}'",
                subnet_id
            ))
            .map(|_| ())
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<SubnetSummary>> {
        let output = self
            .ec2_client
            .describe_subnets()
            .filters(filter("vpc-id", network_id))
            .send()
            .await
            .context(format!("describe subnets of VPC '{}'", network_id))?;
        Ok(output
            .subnets()
            .iter()
            .filter_map(|subnet| {
                subnet.subnet_id().map(|id| SubnetSummary {
                    id: id.to_string(),
                    cidr_block: subnet.cidr_block().map(|s| s.to_string()),
                    availability_zone: subnet.availability_zone().map(|s| s.to_string()),
                })
            })
            .collect())
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        self.ec2_client
            .delete_subnet()
            .subnet_id(subnet_id)
            .send()
            .await
            .context(format!("delete subnet '{}'", subnet_id))
            .map(|_| ())
    }

    async fn create_internet_gateway(&self, tags: &Tags) -> Result<String> {
        self.ec2_client
            .create_internet_gateway()
            .tag_specifications(tag_specification(ResourceType::InternetGateway, tags))
            .send()
            .await
            .context("create internet gateway")?
            .internet_gateway()
            .and_then(|igw| igw.internet_gateway_id())
            .context("Internet gateway id missing from create internet gateway response")
            .map(|id| id.to_string())
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, network_id: &str) -> Result<()> {
        self.ec2_client
            .attach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(network_id)
            .send()
            .await
            .context(format!(
                "attach internet gateway '{}' to VPC '{}'",
                gateway_id, network_id
            ))
            .map(|_| ())
    }

    async fn list_internet_gateways(&self, network_id: &str) -> Result<Vec<String>> {
        let output = self
            .ec2_client
            .describe_internet_gateways()
            .filters(filter("attachment.vpc-id", network_id))
            .send()
            .await
            .context(format!(
                "describe internet gateways of VPC '{}'",
                network_id
            ))?;
        Ok(output
            .internet_gateways()
            .iter()
            .filter_map(|igw| igw.internet_gateway_id())
            .map(|id| id.to_string())
            .collect())
    }

    async fn detach_internet_gateway(&self, gateway_id: &str, network_id: &str) -> Result<()> {
        self.ec2_client
            .detach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(network_id)
            .send()
            .await
            .context(format!(
                "detach internet gateway '{}' from VPC '{}'",
                gateway_id, network_id
            ))
            .map(|_| ())
    }

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()> {
        self.ec2_client
            .delete_internet_gateway()
            .internet_gateway_id(gateway_id)
            .send()
            .await
            .context(format!("delete internet gateway '{}'", gateway_id))
            .map(|_| ())
    }

    async fn create_route_table(&self, network_id: &str, tags: &Tags) -> Result<String> {
        self.ec2_client
            .create_route_table()
            .vpc_id(network_id)
            .tag_specifications(tag_specification(ResourceType::RouteTable, tags))
            .send()
            .await
            .context(format!("create route table in VPC '{}'", network_id))?
            .route_table()
            .and_then(|table| table.route_table_id())
            .context("Route table id missing from create route table response")
            .map(|id| id.to_string())
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr_block: &str,
        gateway_id: &str,
    ) -> Result<()> {
        self.ec2_client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr_block)
            .gateway_id(gateway_id)
            .send()
            .await
            .context(format!(
                "create route '{}' via '{}' in route table '{}'",
                destination_cidr_block, gateway_id, route_table_id
            ))
            .map(|_| ())
    }

    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str) -> Result<()> {
        self.ec2_client
            .associate_route_table()
            .route_table_id(route_table_id)
            .subnet_id(subnet_id)
            .send()
            .await
            .context(format!(
                "associate route table '{}' with subnet '{}'",
                route_table_id, subnet_id
            ))
            .map(|_| ())
    }

    async fn list_route_tables(&self, network_id: &str) -> Result<Vec<String>> {
        let output = self
            .ec2_client
            .describe_route_tables()
            .filters(filter("vpc-id", network_id))
            .send()
            .await
            .context(format!("describe route tables of VPC '{}'", network_id))?;
        Ok(output
            .route_tables()
            .iter()
            .filter_map(|table| table.route_table_id())
            .map(|id| id.to_string())
            .collect())
    }

    async fn route_table_associations(
        &self,
        route_table_id: &str,
    ) -> Result<Vec<RouteTableAssociation>> {
        let output = self
            .ec2_client
            .describe_route_tables()
            .route_table_ids(route_table_id)
            .send()
            .await
            .context(format!("describe route table '{}'", route_table_id))?;
        let table = output
            .route_tables()
            .first()
            .context(format!("Route table '{}' was not found", route_table_id))?;
        Ok(table
            .associations()
            .iter()
            .map(|association| RouteTableAssociation {
                id: association
                    .route_table_association_id()
                    .map(|s| s.to_string()),
                subnet_id: association.subnet_id().map(|s| s.to_string()),
                main: association.main().unwrap_or(false),
            })
            .collect())
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        self.ec2_client
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await
            .context(format!("delete route table '{}'", route_table_id))
            .map(|_| ())
    }

    async fn create_security_group(
        &self,
        network_id: &str,
        name: &str,
        description: &str,
        tags: &Tags,
    ) -> Result<String> {
        self.ec2_client
            .create_security_group()
            .group_name(name)
            .description(description)
            .vpc_id(network_id)
            .tag_specifications(tag_specification(ResourceType::SecurityGroup, tags))
            .send()
            .await
            .context(format!(
                "create security group '{}' in VPC '{}'",
                name, network_id
            ))?
            .group_id()
            .context("Group id missing from create security group response")
            .map(|id| id.to_string())
    }

    async fn authorize_ingress(&self, group_id: &str, cidr_ip: &str) -> Result<()> {
        self.ec2_client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(
                IpPermission::builder()
                    .ip_protocol("-1")
                    .ip_ranges(IpRange::builder().cidr_ip(cidr_ip).build())
                    .build(),
            )
            .send()
            .await
            .context(format!(
                "authorize ingress from '{}' for security group '{}'",
                cidr_ip, group_id
            ))
            .map(|_| ())
    }

    async fn list_security_groups(&self, network_id: &str) -> Result<Vec<SecurityGroupSummary>> {
        let output = self
            .ec2_client
            .describe_security_groups()
            .filters(filter("vpc-id", network_id))
            .send()
            .await
            .context(format!("describe security groups of VPC '{}'", network_id))?;
        Ok(output
            .security_groups()
            .iter()
            .filter_map(|group| {
                group.group_id().map(|id| SecurityGroupSummary {
                    id: id.to_string(),
                    name: group.group_name().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    async fn describe_security_group(&self, group_id: &str) -> Result<SecurityGroupSummary> {
        let output = self
            .ec2_client
            .describe_security_groups()
            .group_ids(group_id)
            .send()
            .await
            .context(format!("describe security group '{}'", group_id))?;
        let group = output
            .security_groups()
            .first()
            .context(format!("Security group '{}' was not found", group_id))?;
        Ok(SecurityGroupSummary {
            id: group_id.to_string(),
            name: group
                .group_name()
                .context(format!("Security group '{}' has no name", group_id))?
                .to_string(),
        })
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.ec2_client
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await
            .context(format!("delete security group '{}'", group_id))
            .map(|_| ())
    }

    async fn list_network_interfaces(
        &self,
        network_id: &str,
    ) -> Result<Vec<NetworkInterfaceSummary>> {
        let output = self
            .ec2_client
            .describe_network_interfaces()
            .filters(filter("vpc-id", network_id))
            .send()
            .await
            .context(format!(
                "describe network interfaces of VPC '{}'",
                network_id
            ))?;
        Ok(output
            .network_interfaces()
            .iter()
            .filter_map(|interface| {
                interface
                    .network_interface_id()
                    .map(|id| NetworkInterfaceSummary {
                        id: id.to_string(),
                        attachment_id: interface
                            .attachment()
                            .and_then(|attachment| attachment.attachment_id())
                            .map(|s| s.to_string()),
                    })
            })
            .collect())
    }

    async fn detach_network_interface(&self, attachment_id: &str, force: bool) -> Result<()> {
        self.ec2_client
            .detach_network_interface()
            .attachment_id(attachment_id)
            .force(force)
            .send()
            .await
            .context(format!("detach network interface attachment '{}'", attachment_id))
            .map(|_| ())
    }

    async fn delete_network_interface(&self, interface_id: &str) -> Result<()> {
        self.ec2_client
            .delete_network_interface()
            .network_interface_id(interface_id)
            .send()
            .await
            .context(format!("delete network interface '{}'", interface_id))
            .map(|_| ())
    }

    async fn create_cluster(&self, request: &ClusterRequest) -> Result<()> {
        debug!("Sending create cluster request for '{}'", request.name);
        let mut create_cluster = self
            .eks_client
            .create_cluster()
            .name(&request.name)
            .version(&request.version)
            .role_arn(&request.role_arn)
            .resources_vpc_config(
                VpcConfigRequest::builder()
                    .set_subnet_ids(Some(request.subnet_ids.clone()))
                    .set_security_group_ids(Some(request.security_group_ids.clone()))
                    .build(),
            )
            .access_config(
                CreateAccessConfigRequest::builder()
                    .authentication_mode(AuthenticationMode::ApiAndConfigMap)
                    .bootstrap_cluster_creator_admin_permissions(true)
                    .build(),
            )
            .set_tags(Some(
                request
                    .tags
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<HashMap<_, _>>(),
            ));

        if request.auto_mode {
            create_cluster = create_cluster
                .compute_config(ComputeConfigRequest::builder().enabled(true).build())
                .kubernetes_network_config(
                    KubernetesNetworkConfigRequest::builder()
                        .elastic_load_balancing(
                            ElasticLoadBalancing::builder().enabled(true).build(),
                        )
                        .build(),
                )
                .storage_config(
                    StorageConfigRequest::builder()
                        .block_storage(BlockStorage::builder().enabled(true).build())
                        .build(),
                );
        }

        create_cluster
            .send()
            .await
            .context(format!("create EKS cluster '{}'", request.name))
            .map(|_| ())
    }

    async fn list_clusters(&self) -> Result<Vec<String>> {
        let mut clusters = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .eks_client
                .list_clusters()
                .set_next_token(next_token)
                .send()
                .await
                .context("list EKS clusters")?;
            clusters.extend(output.clusters().iter().cloned());
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(clusters)
    }

    async fn cluster_exists(&self, cluster_name: &str) -> Result<bool> {
        let result = self
            .eks_client
            .describe_cluster()
            .name(cluster_name)
            .send()
            .await;
        if let Err(sdk_err) = &result {
            if sdk_err
                .as_service_error()
                .map_or(false, |e| e.is_resource_not_found_exception())
            {
                return Ok(false);
            }
        }
        let output = result.context(format!("describe EKS cluster '{}'", cluster_name))?;
        trace!(
            "Cluster '{}' status: {:?}",
            cluster_name,
            output.cluster().and_then(|cluster| cluster.status())
        );
        Ok(true)
    }

    async fn delete_cluster(&self, cluster_name: &str) -> Result<()> {
        self.eks_client
            .delete_cluster()
            .name(cluster_name)
            .send()
            .await
            .context(format!("delete EKS cluster '{}'", cluster_name))
            .map(|_| ())
    }

    async fn cluster_versions(&self) -> Result<Vec<String>> {
        let mut versions = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .eks_client
                .describe_cluster_versions()
                .include_all(true)
                .set_next_token(next_token)
                .send()
                .await
                .context("fetch EKS cluster versions")?;
            versions.extend(
                output
                    .cluster_versions()
                    .iter()
                    .filter_map(|info| info.cluster_version())
                    .map(|version| version.to_string()),
            );
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(versions)
    }

    async fn create_addon(&self, cluster_name: &str, addon: Addon) -> Result<()> {
        self.eks_client
            .create_addon()
            .cluster_name(cluster_name)
            .addon_name(addon.name())
            .send()
            .await
            .context(format!(
                "install addon '{}' on cluster '{}'",
                addon, cluster_name
            ))
            .map(|_| ())
    }

    async fn resource_tags(&self, resource: &ResourceRef) -> Result<Tags> {
        match resource {
            ResourceRef::Cluster(name) => {
                let output = self
                    .eks_client
                    .describe_cluster()
                    .name(name)
                    .send()
                    .await
                    .context(format!("describe EKS cluster '{}'", name))?;
                let cluster = output.cluster().context(format!(
                    "Response for cluster '{}' is missing the cluster",
                    name
                ))?;
                Ok(cluster
                    .tags()
                    .map(|tags| {
                        tags.iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    })
                    .unwrap_or_default())
            }
            ResourceRef::Ec2(id) => {
                let mut tags = Tags::new();
                let mut next_token: Option<String> = None;
                loop {
                    let output = self
                        .ec2_client
                        .describe_tags()
                        .filters(filter("resource-id", id))
                        .set_next_token(next_token)
                        .send()
                        .await
                        .context(format!("describe tags of '{}'", id))?;
                    tags.extend(output.tags().iter().filter_map(|tag| {
                        let value = tag.value().unwrap_or_default().to_string();
                        tag.key().map(|key| (key.to_string(), value))
                    }));
                    match output.next_token() {
                        Some(token) => next_token = Some(token.to_string()),
                        None => break,
                    }
                }
                Ok(tags)
            }
        }
    }
}

#[test]
fn tag_specification_carries_every_tag() {
    let tags = maplit::btreemap! {
        "Name".to_string() => "EKS-IGW".to_string(),
        "CreatedBy".to_string() => "EKS-Sandbox-Tool".to_string(),
    };
    let spec = tag_specification(ResourceType::InternetGateway, &tags);
    assert_eq!(spec.resource_type(), Some(&ResourceType::InternetGateway));
    let keys: Vec<_> = spec.tags().iter().filter_map(|tag| tag.key()).collect();
    assert_eq!(keys, vec!["CreatedBy", "Name"]);
}
