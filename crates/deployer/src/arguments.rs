use {
    crate::network,
    alloy::signers::local::PrivateKeySigner,
    anyhow::Context,
    clap::Parser,
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
    },
    url::Url,
};

#[derive(Parser)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,deployer=info,observe=info")]
    pub log_filter: String,

    /// Output log events as JSON.
    #[clap(long, env)]
    pub use_json_logs: bool,
}

#[derive(Parser)]
#[clap(version, about = "Deploys the Will contract and prints its address")]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    /// The Ethereum node URL to connect to.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// Hex encoded private key used to sign the deployment transaction. When
    /// omitted the transaction is sent from the node's first account, which
    /// only works for development nodes that manage their own keys.
    #[clap(long, env, value_parser = private_key)]
    pub private_key: Option<PrivateKeySigner>,

    /// Chain ID the node is expected to report. The deployment is aborted
    /// before anything is submitted if the node is on a different chain.
    #[clap(long, env)]
    pub chain_id: Option<u64>,

    /// Directory containing the compiled contract artifacts.
    #[clap(long, env, default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Number of blocks, including the one the deployment was mined in, to
    /// wait for before the contract is considered deployed.
    #[clap(long, env, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    pub confirmations: u64,
}

impl Arguments {
    pub fn network_config(&self) -> network::Config {
        network::Config {
            node_url: self.node_url.clone(),
            signer: self.private_key.clone(),
            chain_id: self.chain_id,
            confirmations: self.confirmations,
        }
    }
}

fn private_key(s: &str) -> anyhow::Result<PrivateKeySigner> {
    s.trim()
        .parse()
        .context("private key is not a valid hex encoded secp256k1 key")
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            use_json_logs,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        Ok(())
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            node_url,
            private_key,
            chain_id,
            artifacts_dir,
            confirmations,
        } = self;

        write!(f, "{logging}")?;
        writeln!(f, "node_url: {node_url}")?;
        writeln!(
            f,
            "private_key: {}",
            match private_key {
                Some(signer) => format!("SECRET (address {})", signer.address()),
                None => "None (node accounts)".to_string(),
            }
        )?;
        writeln!(f, "chain_id: {chain_id:?}")?;
        writeln!(f, "artifacts_dir: {}", artifacts_dir.display())?;
        writeln!(f, "confirmations: {confirmations}")?;
        Ok(())
    }
}
