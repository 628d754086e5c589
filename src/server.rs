//! Shared application state and the HTTP listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use crate::activation::ActivationGuard;
use crate::approval::{ApprovalBroker, ApprovalConfig, PayloadDecoder};
use crate::config::Args;
use crate::routes::create_router;
use crate::session::gate::DEFAULT_GATE_TIMEOUT;
use crate::session::{AccountService, AccountStore, Session, SessionGate, SessionState};
use crate::signer::Signer;
use crate::types::Result;
use crate::ui::UiBridge;

/// Version reported in every response envelope
pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime settings the gateway components need
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub approval: ApprovalConfig,
    pub gate_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub daemon_version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            approval: ApprovalConfig::default(),
            gate_timeout: DEFAULT_GATE_TIMEOUT,
            allowed_origins: vec![
                "http://localhost:8000".to_string(),
                "https://manta.network".to_string(),
            ],
            max_body_bytes: 4 * 1024 * 1024,
            daemon_version: DAEMON_VERSION.to_string(),
        }
    }
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        Self {
            approval: ApprovalConfig {
                timeout: args.approval_timeout(),
                queue: args.approval_queue,
            },
            gate_timeout: args.gate_timeout(),
            allowed_origins: args.origin_list(),
            max_body_bytes: args.max_body_bytes,
            daemon_version: DAEMON_VERSION.to_string(),
        }
    }
}

/// Everything a request handler or UI host can reach
pub struct AppState {
    pub config: GatewayConfig,
    pub session: SessionState,
    pub gate: SessionGate,
    pub broker: ApprovalBroker,
    pub signer: Arc<dyn Signer>,
    pub ui: Arc<dyn UiBridge>,
    pub accounts: AccountService,
    pub activation: ActivationGuard,
}

impl AppState {
    /// Wire the session, gate, broker and account service together
    ///
    /// The session starts signed out; whether the account exists comes from
    /// `store`.
    pub fn new(
        config: GatewayConfig,
        signer: Arc<dyn Signer>,
        decoder: Arc<dyn PayloadDecoder>,
        ui: Arc<dyn UiBridge>,
        store: Arc<dyn AccountStore>,
    ) -> Self {
        let session = Arc::new(Session::new(store.account_exists()));

        Self {
            gate: SessionGate::new(session.clone(), ui.clone(), config.gate_timeout),
            broker: ApprovalBroker::new(ui.clone(), decoder, config.approval.clone()),
            accounts: AccountService::new(session.clone(), store, signer.clone(), ui.clone()),
            activation: ActivationGuard::new(ui.clone()),
            session,
            signer,
            ui,
            config,
        }
    }
}

/// Serve the gateway on `listen` until Ctrl-C
pub async fn run(state: Arc<AppState>, listen: SocketAddr) -> Result<()> {
    let app = create_router(state);

    let listener = TcpListener::bind(listen).await?;
    info!("Manta Signer listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Manta Signer stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
