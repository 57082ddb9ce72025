//! The deployment sequence: resolve the artifact, submit the deployment,
//! wait for confirmation.

use {
    crate::{
        artifact,
        config,
        network,
        traits::{ArtifactSource, DeployedContract, DeploymentNetwork},
    },
    alloy::primitives::U256,
    thiserror::Error,
};

/// The contract this binary deploys.
pub const CONTRACT_NAME: &str = "Will";

/// The value passed to the contract's only constructor parameter.
pub const CONSTRUCTOR_ARGUMENT: u64 = 100;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load configuration")]
    Config(#[source] config::Error),
    #[error("failed to resolve contract artifact")]
    Artifact(#[from] artifact::Error),
    #[error("deployment transaction was not accepted")]
    Submission(#[source] network::Error),
    #[error("deployment was not confirmed")]
    Confirmation(#[source] network::Error),
}

/// Deploys the contract and waits until the deployment is confirmed.
///
/// The first failing step aborts the sequence; nothing is retried.
pub async fn deploy(
    artifacts: &dyn ArtifactSource,
    network: &dyn DeploymentNetwork,
) -> Result<DeployedContract, Error> {
    let artifact = artifacts.resolve(CONTRACT_NAME).await?;
    tracing::info!(
        contract = %artifact.contract_name,
        source = ?artifact.source_name,
        "resolved contract artifact"
    );

    let pending = network
        .submit(&artifact, &[U256::from(CONSTRUCTOR_ARGUMENT)])
        .await
        .map_err(Error::Submission)?;
    tracing::info!(tx_hash = %pending.tx_hash, "submitted deployment, waiting for confirmation");

    let contract = network
        .confirm(pending)
        .await
        .map_err(Error::Confirmation)?;
    tracing::info!(
        address = %contract.address,
        block = ?contract.block_number,
        gas_used = contract.gas_used,
        "deployment confirmed"
    );
    Ok(contract)
}

/// The line reported to the operator for a confirmed deployment.
pub fn report(contract: &DeployedContract) -> String {
    format!("this contract deployed to {}", contract.address)
}
