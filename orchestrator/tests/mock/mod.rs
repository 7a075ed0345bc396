/*!

Mock implementations of [`CloudGateway`] and [`Operator`] so that the provisioning and teardown
flows can be tested without an AWS account or a terminal.

`MockCloud` keeps an in-memory model of one region and records every call it receives, in order,
as a string like `delete_subnet subnet-3`. `ScriptedOperator` answers questions from a fixed
script.

!*/

#![allow(dead_code)]

pub(crate) mod gateway;
pub(crate) mod operator;

pub(crate) use gateway::MockCloud;
pub(crate) use operator::{Answer, ScriptedOperator};
