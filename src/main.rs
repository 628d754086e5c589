//! Manta Signer - local wallet signing daemon

use clap::Parser;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manta_signer::{
    approval::PayloadDecoder,
    config::{Args, LogFormat},
    server::{self, AppState, GatewayConfig},
    session::FileAccountStore,
    signer::Signer,
    ui::{console, EventHub},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("manta_signer={},info", args.log_level).into());
    match args.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Manta Signer {}", server::DAEMON_VERSION);
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Data dir: {}", args.data_dir.display());
    info!("Allowed origins: {}", args.origin_list().join(", "));
    info!(
        "Approval: timeout {}s, queue {:?}",
        args.approval_timeout_secs, args.approval_queue
    );
    info!("Gate timeout: {}s", args.gate_timeout_secs);
    info!("Mode: {}", if args.headless { "HEADLESS" } else { "EMBEDDED" });
    info!("======================================");

    let (signer, decoder) = signer_backend();
    let hub = Arc::new(EventHub::default());
    let store = Arc::new(FileAccountStore::new(&args.data_dir));
    info!(
        "Account flag: {} ({})",
        store.path().display(),
        if store.path().exists() { "present" } else { "absent" }
    );

    let state = Arc::new(AppState::new(
        GatewayConfig::from(&args),
        signer,
        decoder,
        hub.clone(),
        store,
    ));

    if args.headless {
        let console_state = state.clone();
        let notifications = hub.subscribe();
        tokio::spawn(async move {
            if let Err(e) = console::run_console(console_state, notifications).await {
                error!("Console stopped: {}", e);
            }
        });
    } else {
        if let Some(warning) = args.ui_surface_warning() {
            warn!("{}", warning);
        }
        let mut notifications = hub.subscribe();
        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) => debug!("UI: {}", console::describe(&notification)),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    if !args.activation_urls.is_empty() {
        let activation_state = state.clone();
        let urls = args.activation_urls.clone();
        tokio::spawn(async move {
            for url in urls {
                if let Err(e) = activation_state.activation.handle(&url).await {
                    warn!("Activation {} failed: {}", url, e);
                }
            }
        });
    }

    server::run(state, args.listen).await?;
    Ok(())
}

#[cfg(feature = "zkp")]
fn signer_backend() -> (Arc<dyn Signer>, Arc<dyn PayloadDecoder>) {
    let signer = Arc::new(manta_signer::signer::ZkpSigner::new());
    (signer.clone(), signer)
}

#[cfg(not(feature = "zkp"))]
fn signer_backend() -> (Arc<dyn Signer>, Arc<dyn PayloadDecoder>) {
    warn!("Built without the zkp feature: signing requests will fail");
    let signer = Arc::new(manta_signer::signer::UnavailableSigner);
    (signer.clone(), signer)
}
