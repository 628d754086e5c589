//! Request handlers
//!
//! Every signing route follows the same pipeline: reject an empty body, pass
//! the session gate, ask the approval broker when the operation moves value,
//! then hand the root seed and the untouched body to the signer.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{error, info};

use super::envelope::SignerResponse;
use crate::approval::ApprovalOutcome;
use crate::server::AppState;
use crate::session::Requirement;
use crate::signer::SignerOperation;
use crate::types::{Result, SignerError};

/// Client version tag echoed back in the envelope
#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    #[serde(default)]
    pub app_version: String,
}

/// GET /heartbeat
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

/// POST /deriveShieldedAddress
pub async fn derive_shielded_address(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VersionQuery>,
    body: Bytes,
) -> Result<Response> {
    sign(&state, SignerOperation::DeriveShieldedAddress, query, body).await
}

/// POST /generateAsset
pub async fn generate_asset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VersionQuery>,
    body: Bytes,
) -> Result<Response> {
    sign(&state, SignerOperation::GenerateAsset, query, body).await
}

/// POST /recoverAccount
pub async fn recover_account(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VersionQuery>,
    body: Bytes,
) -> Result<Response> {
    sign(&state, SignerOperation::RecoverAccount, query, body).await
}

/// POST /generateMintData
pub async fn generate_mint_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VersionQuery>,
    body: Bytes,
) -> Result<Response> {
    sign(&state, SignerOperation::GenerateMintData, query, body).await
}

/// POST /requestGenerateReclaimData
pub async fn request_generate_reclaim_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VersionQuery>,
    body: Bytes,
) -> Result<Response> {
    sign(&state, SignerOperation::GenerateReclaimData, query, body).await
}

/// POST /requestGeneratePrivateTransferData
pub async fn request_generate_private_transfer_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VersionQuery>,
    body: Bytes,
) -> Result<Response> {
    sign(&state, SignerOperation::GeneratePrivateTransferData, query, body).await
}

async fn sign(state: &AppState, operation: SignerOperation, query: VersionQuery, body: Bytes) -> Result<Response> {
    if body.is_empty() {
        return Err(SignerError::BadRequest(format!(
            "{} request needs a body",
            operation.result_field()
        )));
    }

    state.gate.wait(Requirement::MustBeSignedIn).await?;

    if let Some(kind) = operation.approval_kind() {
        match state.broker.request_approval(kind, &body).await? {
            ApprovalOutcome::Approved => {}
            ApprovalOutcome::Rejected => {
                info!(?operation, "Transaction rejected by user");
                return Err(SignerError::Unauthorized);
            }
            ApprovalOutcome::Abandoned => {
                return Err(SignerError::Abandoned("no decision from the signer UI".into()));
            }
        }
    }

    let root_seed = state
        .session
        .root_seed()
        .await
        .ok_or_else(|| SignerError::Internal("signed in without a root seed".into()))?;

    let signer = state.signer.clone();
    let output = tokio::task::spawn_blocking(move || signer.execute(operation, &root_seed, &body))
        .await
        .map_err(|e| SignerError::Internal(format!("signer task failed: {}", e)))?;

    let status = if output.success {
        StatusCode::OK
    } else {
        error!(?operation, "Signer reported failure");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let envelope = SignerResponse::new(
        operation,
        output.payload,
        state.config.daemon_version.as_str(),
        query.app_version,
    );
    Ok((status, Json(envelope)).into_response())
}
