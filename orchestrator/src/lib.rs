/*!

`sandbox-orchestrator` creates and removes short-lived EKS sandbox clusters together with the VPC
they run in.

- [`provision::Provisioner`] runs the fixed creation pipeline: account identity, cluster role,
  network, cluster, add-ons.
- [`deprovision::Deprovisioner`] deletes a cluster and, when the cluster owns its VPC, tears the
  VPC down in dependency order.
- [`tags::TagGuard`] decides what is safe to delete from the tags AWS currently holds.
- [`version`] picks the Kubernetes version to create.

All cloud access goes through the [`gateway::CloudGateway`] trait and all questions to a person go
through [`operator::Operator`].

!*/

pub mod constants;
pub mod deprovision;
mod error;
pub mod gateway;
pub mod layout;
pub mod operator;
pub mod provision;
pub mod tags;
pub mod version;

pub use error::{Error, Result};
