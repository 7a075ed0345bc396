use crate::constants::MIN_CLUSTER_SUBNETS;
use crate::error::{self, Result};
use sandbox_utils::impl_display_as_json;
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};
use std::collections::HashSet;
use std::path::Path;

/// The shape of the network created for a new sandbox cluster. The defaults describe a `/16` VPC
/// with two public `/24` subnets in zones `a` and `b`. A YAML file may override any field.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkLayout {
    pub vpc_cidr: String,

    /// The VPC is named `<prefix>-<YYYY-MM-DD>`.
    pub vpc_name_prefix: String,

    pub subnets: Vec<SubnetLayout>,

    pub internet_gateway_name: String,

    pub route_table_name: String,

    pub security_group_name: String,

    pub security_group_description: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetLayout {
    pub cidr_block: String,
    /// Appended to the region to form the availability zone, e.g. `a` -> `eu-west-2a`.
    pub zone_suffix: String,
    pub name: String,
}

impl_display_as_json!(NetworkLayout);

impl Default for NetworkLayout {
    fn default() -> Self {
        Self {
            vpc_cidr: "10.0.0.0/16".to_string(),
            vpc_name_prefix: "Sandbox-EKS-VPC".to_string(),
            subnets: vec![
                SubnetLayout {
                    cidr_block: "10.0.1.0/24".to_string(),
                    zone_suffix: "a".to_string(),
                    name: "EKS-Subnet-1".to_string(),
                },
                SubnetLayout {
                    cidr_block: "10.0.2.0/24".to_string(),
                    zone_suffix: "b".to_string(),
                    name: "EKS-Subnet-2".to_string(),
                },
            ],
            internet_gateway_name: "EKS-IGW".to_string(),
            route_table_name: "EKS-Route-Table".to_string(),
            security_group_name: "EKS-SG".to_string(),
            security_group_description: "EKS Security Group".to_string(),
        }
    }
}

impl NetworkLayout {
    /// Read a layout from a YAML file. Fields missing from the file keep their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(error::ReadLayoutSnafu { path })?;
        let layout: Self =
            serde_yaml::from_str(&contents).context(error::ParseLayoutSnafu { path })?;
        layout.validate()?;
        Ok(layout)
    }

    /// A cluster needs subnets in at least two distinct availability zones.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.subnets.len() >= MIN_CLUSTER_SUBNETS,
            error::InvalidLayoutSnafu {
                reason: format!(
                    "{} subnets are defined but at least {} are required",
                    self.subnets.len(),
                    MIN_CLUSTER_SUBNETS
                )
            }
        );
        let zones: HashSet<&str> = self
            .subnets
            .iter()
            .map(|subnet| subnet.zone_suffix.as_str())
            .collect();
        ensure!(
            zones.len() >= MIN_CLUSTER_SUBNETS,
            error::InvalidLayoutSnafu {
                reason: "subnets must be placed in distinct availability zones"
            }
        );
        Ok(())
    }

    pub fn vpc_name(&self) -> String {
        format!(
            "{}-{}",
            self.vpc_name_prefix,
            chrono::Local::now().format("%Y-%m-%d")
        )
    }
}
