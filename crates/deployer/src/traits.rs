//! Trait definitions for the external system boundaries of a deployment.
//!
//! The build pipeline and the network node are abstracted so that the
//! deployment sequence can be unit tested with mocks.

use {
    crate::{
        artifact::{self, Artifact},
        network,
    },
    alloy::primitives::{Address, TxHash, U256},
};

/// A deployment transaction the node accepted but that is not confirmed yet.
///
/// Carries no address. A contract only exists once
/// [`DeploymentNetwork::confirm`] returned a [`DeployedContract`] for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDeployment {
    pub tx_hash: TxHash,
}

/// A contract whose deployment transaction has been confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Abstracts the build pipeline that produces compiled contracts.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Looks up the compiled artifact for a contract name or fully qualified
    /// name (`contracts/Will.sol:Will`).
    async fn resolve(&self, contract_name: &str) -> Result<Artifact, artifact::Error>;
}

/// Abstracts the blockchain node the contract gets deployed to.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DeploymentNetwork: Send + Sync {
    /// Sends the deployment transaction for `artifact` with the given
    /// constructor arguments. Returns as soon as the node accepted it.
    async fn submit(
        &self,
        artifact: &Artifact,
        constructor_args: &[U256],
    ) -> Result<PendingDeployment, network::Error>;

    /// Waits until the deployment is confirmed and returns the contract.
    async fn confirm(&self, pending: PendingDeployment)
    -> Result<DeployedContract, network::Error>;
}
