use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, GlobalArgs, LogLevel};
use config::{create_client, OperatorConfig};
use controller::{informer::run_informer, Operator};
use env_logger::Target;
use flannel_operator_core::{
    kubernetes::{network_client::FlannelNetworkClient, GetApi},
    resources::{crd::v1alpha1::generate_flannel_network_definition, meta::TryNetworkMeta},
};
use kube::api::ListParams;
use log::{info, warn, LevelFilter};
use tokio::{select, sync::mpsc::unbounded_channel};
use tokio_stream::wrappers::UnboundedReceiverStream;

mod cli;
mod config;
mod controller;
mod error;
#[cfg(test)]
mod test_helpers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    configure_logging(&cli.global_args);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_operator(&cli).await?,
        Commands::Crd => print_definition()?,
        Commands::List => list_networks(&cli.global_args).await?,
    }

    Ok(())
}

async fn run_operator(cli: &Cli) -> anyhow::Result<()> {
    let config = OperatorConfig::from_args(&cli.global_args, &cli.operator_args)
        .context("Invalid operator configuration!")?;
    let operator = Operator::connect(&config)
        .await
        .context("Couldn't initialize k8s API client!")?;

    let (sender, receiver) = unbounded_channel();
    let informer = tokio::spawn(run_informer(
        operator.client().global_api(),
        config.resync_period,
        sender,
    ));

    let result = operator
        .run(UnboundedReceiverStream::new(receiver), shutdown_signal())
        .await;

    informer.abort();

    result.context("Operator couldn't start!")
}

fn print_definition() -> anyhow::Result<()> {
    let definition = serde_yaml::to_string(&generate_flannel_network_definition())
        .context("Couldn't serialize the resource definition!")?;

    print!("{definition}");

    Ok(())
}

async fn list_networks(global_args: &GlobalArgs) -> anyhow::Result<()> {
    let client = create_client(&global_args.kube_config, &global_args.kube_context)
        .await
        .context("Couldn't initialize k8s API client!")?;
    let networks = FlannelNetworkClient::all(client)
        .list(&ListParams::default())
        .await
        .context("Couldn't list networks!")?;

    println!("NAMESPACE\tNAME\tVNI\tCIDR\tCLIENT");

    for network in networks {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            network.metadata.namespace.as_deref().unwrap_or_default(),
            network.metadata.name.as_deref().unwrap_or_default(),
            network.spec.vni,
            network.spec.cidr,
            network.try_get_client_deployment_name().unwrap_or_default()
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!("Couldn't listen for Ctrl+C! Reason: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                warn!("Couldn't listen for SIGTERM! Reason: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    select! {
        _ = interrupt => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

fn configure_logging(global_args: &GlobalArgs) {
    let log_level = global_args.get_log_level();
    let mut logger = env_logger::builder();

    logger
        .default_format()
        .format_module_path(matches!(log_level, LogLevel::Trace))
        .target(Target::Stderr);

    match log_level {
        LogLevel::Normal => logger.filter_level(LevelFilter::Info),
        LogLevel::Verbose => logger
            .filter_level(LevelFilter::Info)
            .filter(Some("flannel_operator"), LevelFilter::Debug),
        LogLevel::Trace => logger.filter_level(LevelFilter::Debug),
    };

    logger.parse_default_env().init();
}
