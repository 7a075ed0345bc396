use crate::error::{self, Result};
use crate::gateway::CloudGateway;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How "latest" is decided among the available Kubernetes versions.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// Plain string comparison. `"1.9"` sorts above `"1.10"`.
    #[default]
    Lexicographic,
    /// Compare dot-separated components as integers.
    Numeric,
}

impl FromStr for VersionOrdering {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexicographic" => Ok(Self::Lexicographic),
            "numeric" => Ok(Self::Numeric),
            other => Err(format!(
                "unknown version ordering '{}', expected 'lexicographic' or 'numeric'",
                other
            )),
        }
    }
}

impl Display for VersionOrdering {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionOrdering::Lexicographic => f.write_str("lexicographic"),
            VersionOrdering::Numeric => f.write_str("numeric"),
        }
    }
}

/// Sort `versions` in descending lexicographic order and return the first one.
pub fn latest_version(versions: &[String]) -> Option<String> {
    latest_version_by(versions, VersionOrdering::Lexicographic)
}

pub fn latest_version_by(versions: &[String], ordering: VersionOrdering) -> Option<String> {
    let mut versions = versions.to_vec();
    match ordering {
        VersionOrdering::Lexicographic => versions.sort_by(|a, b| b.cmp(a)),
        VersionOrdering::Numeric => versions.sort_by(|a, b| compare_numeric(b, a)),
    }
    versions.into_iter().next()
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    components(a).cmp(&components(b)).then_with(|| a.cmp(b))
}

// A component that is not a number counts as zero.
fn components(version: &str) -> Vec<u64> {
    version
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Fetch every available cluster version and pick the latest one.
pub async fn resolve_latest_version<G>(gateway: &G, ordering: VersionOrdering) -> Result<String>
where
    G: CloudGateway + ?Sized,
{
    let versions = gateway
        .cluster_versions()
        .await
        .context(error::InspectSnafu {
            what: "available cluster versions",
        })?;
    debug!("Available cluster versions: {:?}", versions);
    let latest = latest_version_by(&versions, ordering).context(error::NoVersionsSnafu)?;
    info!("Latest cluster version ({} ordering): {}", ordering, latest);
    Ok(latest)
}
