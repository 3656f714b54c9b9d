use std::path::PathBuf;

use clap::Parser;
use simplelog::{CombinedLogger, TermLogger};
use tokio_util::sync::CancellationToken;
use valkeeper_manager::{config::AppConfig, errors::ManagerError, Manager};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    /// Config file to load
    #[arg(short, long, default_value = "valkeeper.yaml")]
    pub config_file: PathBuf,

    /// Kubernetes namespace in which the manager and managed valkey run
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Index number of this StatefulSet member
    #[arg(short, long)]
    pub index: Option<u32>,

    /// Label selector by which we may find our StatefulSet
    #[arg(short, long)]
    pub label: Option<String>,
}

#[tokio::main]
pub async fn main() -> Result<(), ManagerError> {
    let args = CmdArgs::parse();

    let mut config = AppConfig::load(args.config_file)?;
    if let Some(namespace) = args.namespace {
        config.manager.namespace = namespace;
    }
    if let Some(index) = args.index {
        config.manager.index = i64::from(index);
    }
    if let Some(label) = args.label {
        config.manager.label_selector = label;
    }
    config.validate()?;

    let level = if config.manager.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    CombinedLogger::init(vec![TermLogger::new(
        level,
        simplelog::ConfigBuilder::new().build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )])
    .unwrap();

    log::info!("valkeeper starting");

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let client = kube::Client::try_default().await?;

    Manager::new(client, config, cancel).run().await?;

    log::info!("valkeeper exited");

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            log::error!("failed to install SIGTERM handler {e}");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("interrupt received; shutting down"),
        _ = term.recv() => log::info!("termination requested; shutting down"),
    }

    cancel.cancel();
}
