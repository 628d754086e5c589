//! Manta Signer - local wallet signing daemon
//!
//! Serves the browser wallet's signing requests on a loopback HTTP port and
//! keeps the user in control of them:
//!
//! - **Session**: account and sign-in state plus the unlocked root seed
//! - **Gate**: parks requests until the account exists and the user signed in
//! - **Approval**: single-flight human approval for value-moving requests
//! - **Signer**: the zkp payload library behind a byte-buffer trait
//! - **UI**: event bridge to whatever window surface hosts the signer
//! - **Activation**: `manta://` deep links, one at a time

pub mod activation;
pub mod approval;
pub mod config;
pub mod routes;
pub mod server;
pub mod session;
pub mod signer;
pub mod types;
pub mod ui;

pub use config::Args;
pub use server::{run, AppState, GatewayConfig};
pub use types::{Result, SignerError};
