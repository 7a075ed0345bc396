use crate::{gateway, operator};
use snafu::Snafu;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unable to create {}: {}", what, source))]
    Create {
        what: String,
        source: gateway::Error,
    },

    #[snafu(display(
        "Timed out after {}s waiting for cluster '{}' to be deleted",
        timeout.as_secs(),
        cluster
    ))]
    DeletionTimeout {
        cluster: String,
        timeout: Duration,
        source: tokio::time::error::Elapsed,
    },

    #[snafu(display("A cluster name is required"))]
    EmptyClusterName,

    #[snafu(display("Unable to resolve the caller identity: {}", source))]
    Identity { source: gateway::Error },

    #[snafu(display("Unable to inspect {}: {}", what, source))]
    Inspect {
        what: String,
        source: gateway::Error,
    },

    #[snafu(display(
        "At least {} subnets are required to create a cluster, {} were selected",
        required,
        selected
    ))]
    InsufficientSubnets { required: usize, selected: usize },

    #[snafu(display("Network layout is invalid: {}", reason))]
    InvalidLayout { reason: String },

    #[snafu(display("Cluster '{}' is missing the '{}' tag", cluster, key))]
    MissingTag { cluster: String, key: String },

    #[snafu(display("No VPCs are available to reuse"))]
    NoNetworks,

    #[snafu(display("At least one security group is required to create a cluster"))]
    NoSecurityGroups,

    #[snafu(display("No cluster versions are available"))]
    NoVersions,

    #[snafu(context(false))]
    #[snafu(display("Operator input failed: {}", source))]
    Operator { source: operator::Error },

    #[snafu(display("Unable to parse network layout '{}': {}", path.display(), source))]
    ParseLayout {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("Unable to read network layout '{}': {}", path.display(), source))]
    ReadLayout {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display(
        "The selected subnets must span at least two availability zones, all are in '{}'",
        zone
    ))]
    SingleZone { zone: String },

    #[snafu(display("Unable to tear down {}: {}", what, source))]
    Teardown {
        what: String,
        source: gateway::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
