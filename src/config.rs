//! Configuration for the signer daemon
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::approval::QueuePolicy;
use crate::types::{Result, SignerError};

/// Manta Signer - local wallet signing daemon
///
/// Serves signing requests to the browser wallet and holds every
/// value-moving request until the user approves it in the signer UI.
#[derive(Parser, Debug, Clone)]
#[command(name = "manta-signer")]
#[command(about = "Local wallet signing daemon gated by human approval")]
#[command(version)]
pub struct Args {
    /// Address to listen on (must be loopback)
    #[arg(long, env = "SIGNER_LISTEN", default_value = "127.0.0.1:29987")]
    pub listen: SocketAddr,

    /// Directory holding the encrypted root seed (`root_seed.aes`)
    #[arg(long, env = "SIGNER_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Comma-separated list of origins allowed to call the daemon
    #[arg(
        long,
        env = "SIGNER_ALLOWED_ORIGINS",
        default_value = "http://localhost:8000,https://manta.network"
    )]
    pub allowed_origins: String,

    /// Seconds to wait for the user to approve or reject a transaction
    #[arg(long, env = "SIGNER_APPROVAL_TIMEOUT_SECS", default_value = "300")]
    pub approval_timeout_secs: u64,

    /// Seconds to wait for account creation or sign-in before abandoning a request
    #[arg(long, env = "SIGNER_GATE_TIMEOUT_SECS", default_value = "600")]
    pub gate_timeout_secs: u64,

    /// What a value-moving request does while another approval is pending
    #[arg(long, env = "SIGNER_APPROVAL_QUEUE", value_enum, default_value = "wait")]
    pub approval_queue: QueuePolicy,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "SIGNER_MAX_BODY_BYTES", default_value = "4194304")]
    pub max_body_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Drive approvals from the terminal instead of an embedding GUI
    #[arg(long, env = "SIGNER_HEADLESS", default_value = "false")]
    pub headless: bool,

    /// Activation URLs (`manta://show`) passed by the OS on launch
    #[arg(value_name = "URL")]
    pub activation_urls: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Args {
    /// Allowed CORS origins, trimmed and without empties
    pub fn origin_list(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_secs(self.gate_timeout_secs)
    }

    /// Startup warning when nothing in this process can answer the UI
    ///
    /// Without `--headless` the prompts and sign-in events go to an embedding
    /// GUI; the bare binary has none, so gated requests would only time out.
    pub fn ui_surface_warning(&self) -> Option<String> {
        if self.headless {
            return None;
        }
        Some(format!(
            "No embedding UI host attached: sign-in and approval prompts go unanswered \
             and requests fail after {}s / {}s. Run with --headless to answer them on the console.",
            self.gate_timeout_secs, self.approval_timeout_secs
        ))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.listen.ip().is_loopback() {
            return Err(SignerError::Config(format!(
                "listen address {} is not a loopback address",
                self.listen
            )));
        }

        if self.approval_timeout_secs == 0 {
            return Err(SignerError::Config(
                "SIGNER_APPROVAL_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        if self.gate_timeout_secs == 0 {
            return Err(SignerError::Config(
                "SIGNER_GATE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        if self.origin_list().is_empty() {
            return Err(SignerError::Config(
                "SIGNER_ALLOWED_ORIGINS must name at least one origin".to_string(),
            ));
        }

        Ok(())
    }
}
