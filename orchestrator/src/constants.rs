/// Provenance tag put on everything this tool creates.
pub const CREATED_BY_TAG: &str = "CreatedBy";
pub const CREATED_BY_VALUE: &str = "EKS-Sandbox-Tool";

/// Classification tag marking a cluster as the sole tenant of its VPC.
pub const HOSTING_TAG: &str = "HostingVPC";
pub const HOSTING_ISOLATED: &str = "isolated";

/// Back-reference from a cluster to the VPC created for it.
pub const NETWORK_ID_TAG: &str = "VpcId";

pub const NAME_TAG: &str = "Name";

pub const CLUSTER_NAME_PREFIX: &str = "Sandbox-";

pub const CLUSTER_ROLE_NAME: &str = "EKSClusterRole";
pub const CLUSTER_SERVICE_PRINCIPAL: &str = "eks.amazonaws.com";
pub const CLUSTER_ROLE_POLICY_ARNS: [&str; 2] = [
    "arn:aws:iam::aws:policy/AmazonEKSClusterPolicy",
    "arn:aws:iam::aws:policy/AmazonEKSVPCResourceController",
];

pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";
pub const DEFAULT_SECURITY_GROUP_NAME: &str = "default";

/// EKS requires subnets in at least two availability zones.
pub const MIN_CLUSTER_SUBNETS: usize = 2;
