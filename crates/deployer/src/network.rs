//! The blockchain node collaborator, backed by an alloy HTTP provider.

use {
    crate::{
        artifact::{self, Artifact},
        traits::{DeployedContract, DeploymentNetwork, PendingDeployment},
    },
    alloy::{
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        primitives::{Address, TxHash, U256},
        providers::{
            DynProvider,
            PendingTransactionBuilder,
            PendingTransactionError,
            Provider,
            ProviderBuilder,
        },
        rpc::{client::ClientBuilder, types::TransactionRequest},
        signers::local::PrivateKeySigner,
        transports::TransportError,
    },
    thiserror::Error,
    url::Url,
};

/// Everything needed to talk to the node. Built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub node_url: Url,
    /// Signs the deployment locally. Without one the node has to sign with
    /// one of its own accounts.
    pub signer: Option<PrivateKeySigner>,
    /// Chain the node has to be on for the deployment to be submitted.
    pub chain_id: Option<u64>,
    pub confirmations: u64,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("node is on chain {actual} but chain {expected} was configured")]
    ChainMismatch { expected: u64, actual: u64 },
    #[error("no private key configured and the node has no accounts")]
    NoAccounts,
    #[error("failed to encode the deployment")]
    Encoding(#[from] artifact::Error),
    #[error(transparent)]
    Rpc(#[from] TransportError),
    #[error(transparent)]
    Pending(#[from] PendingTransactionError),
    #[error("deployment transaction {0} reverted")]
    Reverted(TxHash),
    #[error("receipt of transaction {0} has no contract address")]
    MissingContractAddress(TxHash),
    #[error("no code at {address} after deployment transaction {tx_hash}")]
    NoCode { address: Address, tx_hash: TxHash },
}

pub struct RpcNetwork {
    provider: DynProvider,
    config: Config,
}

impl RpcNetwork {
    pub fn new(config: Config) -> Self {
        let rpc = ClientBuilder::default().http(config.node_url.clone());
        let provider = match &config.signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::new(signer.clone()))
                .connect_client(rpc)
                .erased(),
            None => ProviderBuilder::new().connect_client(rpc).erased(),
        };
        Self { provider, config }
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    async fn check_chain_id(&self) -> Result<(), Error> {
        let actual = self.provider.get_chain_id().await?;
        tracing::debug!(chain_id = actual, "connected to node");
        match self.config.chain_id {
            Some(expected) if expected != actual => Err(Error::ChainMismatch { expected, actual }),
            _ => Ok(()),
        }
    }

    async fn sender(&self) -> Result<Address, Error> {
        if let Some(signer) = &self.config.signer {
            return Ok(signer.address());
        }
        self.provider
            .get_accounts()
            .await?
            .first()
            .copied()
            .ok_or(Error::NoAccounts)
    }
}

#[async_trait::async_trait]
impl DeploymentNetwork for RpcNetwork {
    async fn submit(
        &self,
        artifact: &Artifact,
        constructor_args: &[U256],
    ) -> Result<PendingDeployment, Error> {
        let code = artifact.deployment_code(constructor_args)?;
        self.check_chain_id().await?;
        let from = self.sender().await?;
        tracing::debug!(?from, code_size = code.len(), "sending deployment transaction");

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(code);
        let pending = self.provider.send_transaction(tx).await?;
        Ok(PendingDeployment {
            tx_hash: *pending.tx_hash(),
        })
    }

    async fn confirm(&self, pending: PendingDeployment) -> Result<DeployedContract, Error> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), pending.tx_hash)
            .with_required_confirmations(self.config.confirmations)
            .get_receipt()
            .await?;

        if !receipt.status() {
            return Err(Error::Reverted(pending.tx_hash));
        }
        let address = receipt
            .contract_address()
            .ok_or(Error::MissingContractAddress(pending.tx_hash))?;
        if self.provider.get_code_at(address).await?.is_empty() {
            return Err(Error::NoCode {
                address,
                tx_hash: pending.tx_hash,
            });
        }

        Ok(DeployedContract {
            address,
            tx_hash: pending.tx_hash,
            block_number: receipt.block_number(),
            gas_used: receipt.gas_used(),
        })
    }
}
