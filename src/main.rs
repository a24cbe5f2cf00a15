//! node-ip-watcher daemon entry point.
//!
//! Watches the cluster's nodes, renders their external IPs through a
//! template and runs a reload command whenever the set of addresses changes.

use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use tokio::sync::{mpsc, watch};

use node_ip_watcher::config::{Config, Overrides};
use node_ip_watcher::output::{FileSink, ProcessRunner};
use node_ip_watcher::render::TemplateRenderer;
use node_ip_watcher::source::{KubeNodeSource, NodeSource};
use node_ip_watcher::trigger::RenderTrigger;
use node_ip_watcher::Watcher;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to configuration file (.yaml, .toml or .json)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    /// Log level (debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
    /// Path to kubeconfig file
    #[arg(long)]
    kubeconfig: Option<PathBuf>,
    /// Path to template file
    #[arg(long)]
    template: Option<PathBuf>,
    /// Path to output file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let overrides = Overrides {
        log_level: args.log_level,
        kube_config: args.kubeconfig,
        template_path: args.template,
        output_path: args.output,
    };
    let cfg = Config::load(&args.config, overrides)?;

    init_logging(&cfg.log_level);
    info!(
        "Starting node-ip-watcher {} with config {}",
        env!("CARGO_PKG_VERSION"),
        args.config.display()
    );

    let renderer = TemplateRenderer::from_file(&cfg.template_path)?;
    let trigger = RenderTrigger::new(
        cfg.static_ips.clone(),
        cfg.command.clone(),
        Box::new(renderer),
        Box::new(FileSink::new(cfg.output_path.clone())),
        Box::new(ProcessRunner),
    );
    let watcher = Watcher::new(cfg.min_node_count, trigger);

    let source = KubeNodeSource::connect(cfg.kube_config.as_deref()).await?;
    info!("Starting node watcher");

    // Source -> ingest loop
    let (event_tx, event_rx) = mpsc::channel(128);
    let source_handle = tokio::spawn(async move {
        if let Err(e) = source.watch(event_tx).await {
            error!("Node watch failed: {}", e);
        }
    });

    // The ingest loop checks for shutdown between events, so the event
    // currently being handled always finishes.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let result = watcher.run(event_rx, shutdown_rx).await;
    source_handle.abort();
    result?;

    info!("Shutting down gracefully");
    Ok(())
}

fn init_logging(level: &str) {
    let level = match level {
        "debug" | "info" | "warn" | "error" => level,
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Unable to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        () = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
