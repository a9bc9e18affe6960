use crate::config::StopperConfig;
use crate::logging::CONFIRMATION_TARGET;
use crate::runtime::InvocationContext;
use crate::util::quoted_list;
use anyhow::Context;
use async_trait::async_trait;
use log::{debug, info};
use rusoto_core::HttpClient;
use rusoto_credential::DefaultCredentialsProvider;
use rusoto_ec2::{Ec2, Ec2Client, InstanceStateChange, StopInstancesRequest, StopInstancesResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub instance_id: Option<String>,
    pub previous_state: Option<String>,
    pub current_state: Option<String>,
}

impl From<InstanceStateChange> for StateTransition {
    fn from(change: InstanceStateChange) -> Self {
        StateTransition {
            instance_id: change.instance_id,
            previous_state: change.previous_state.and_then(|state| state.name),
            current_state: change.current_state.and_then(|state| state.name),
        }
    }
}

/// Outcome of one stop request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopReport {
    pub requested: Vec<String>,
    pub transitions: Vec<StateTransition>,
}

impl fmt::Display for StopReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "stopped your instances: {}", quoted_list(&self.requested))
    }
}

/// The compute call the handler depends on.
#[async_trait]
pub trait StopInstances: Send + Sync {
    async fn stop_instances(&self, instance_ids: Vec<String>)
        -> anyhow::Result<Vec<StateTransition>>;
}

#[async_trait]
impl StopInstances for Ec2Client {
    async fn stop_instances(
        &self,
        instance_ids: Vec<String>,
    ) -> anyhow::Result<Vec<StateTransition>> {
        let stop_instances_req = StopInstancesRequest {
            instance_ids,
            ..Default::default()
        };

        let result = Ec2::stop_instances(self, stop_instances_req).await?;

        Ok(transitions_from_result(result))
    }
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Builds an EC2 client scoped to the configured region, resolving
/// credentials through the default provider chain.
pub fn build_client(config: &StopperConfig) -> anyhow::Result<Ec2Client> {
    let http_client = HttpClient::new().context("Failed to create HTTP client")?;
    let credentials =
        DefaultCredentialsProvider::new().context("Failed to create credentials provider")?;

    Ok(Ec2Client::new_with(
        http_client,
        credentials,
        config.region.clone(),
    ))
}

/// Stops every configured instance with a single request. The event and
/// context are accepted for the platform's calling convention only.
pub async fn handle<C>(
    client: &C,
    config: &StopperConfig,
    _event: &serde_json::Value,
    _context: &InvocationContext,
) -> anyhow::Result<StopReport>
where
    C: StopInstances + ?Sized,
{
    let transitions = client.stop_instances(config.instances.clone()).await?;

    for transition in &transitions {
        debug!(
            "instance {} {} -> {}",
            transition.instance_id.as_deref().unwrap_or("<unknown>"),
            transition.previous_state.as_deref().unwrap_or("<unknown>"),
            transition.current_state.as_deref().unwrap_or("<unknown>"),
        );
    }

    let report = StopReport {
        requested: config.instances.clone(),
        transitions,
    };
    info!(target: CONFIRMATION_TARGET, "{}", report);

    Ok(report)
}

fn transitions_from_result(result: StopInstancesResult) -> Vec<StateTransition> {
    result
        .stopping_instances
        .unwrap_or_default()
        .into_iter()
        .map(StateTransition::from)
        .collect()
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
