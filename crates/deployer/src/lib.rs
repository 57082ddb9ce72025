pub mod arguments;
pub mod artifact;
pub mod config;
pub mod deployment;
pub mod network;
pub mod traits;

use {
    arguments::Arguments,
    artifact::HardhatArtifacts,
    clap::Parser,
    deployment::Error,
    network::RpcNetwork,
    std::process::ExitCode,
    traits::DeployedContract,
};

/// Runs a single deployment and maps its outcome to the process exit code.
///
/// On success the only thing written to stdout is the report line. Logs and
/// errors go to stderr.
pub async fn start(args: impl IntoIterator<Item = String>) -> ExitCode {
    // Loaded before parsing so the arguments can be read from the `.env` file.
    let env_file = config::load_env_file();

    let args = match Arguments::try_parse_from(args) {
        Ok(args) => args,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };
    observe::tracing::initialize(&observe::Config::new(
        &args.logging.log_filter,
        args.logging.use_json_logs,
    ));

    let result = match env_file {
        Ok(path) => {
            match path {
                Some(path) => tracing::debug!(?path, "loaded environment file"),
                None => tracing::debug!("no environment file found"),
            }
            tracing::info!("running deployer with validated arguments:\n{}", args);
            run(args).await
        }
        Err(err) => Err(Error::Config(err)),
    };

    match result {
        Ok(contract) => {
            println!("{}", deployment::report(&contract));
            ExitCode::SUCCESS
        }
        Err(err) => {
            // Alternate display of `anyhow::Error` prints the cause chain on one line.
            let err = anyhow::Error::from(err);
            tracing::error!("deployment failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Wires the real collaborators together and deploys the contract.
pub async fn run(args: Arguments) -> Result<DeployedContract, Error> {
    let artifacts = HardhatArtifacts::new(args.artifacts_dir.clone());
    let network = RpcNetwork::new(args.network_config());
    deployment::deploy(&artifacts, &network).await
}
