//! Response envelope and error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, error};

use crate::signer::SignerOperation;
use crate::types::SignerError;

/// `{<result_field>: base64, daemon_version, app_version}`
///
/// `recoverAccount` responses also carry the payload `length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerResponse {
    pub operation: SignerOperation,
    pub payload: Vec<u8>,
    pub daemon_version: String,
    pub app_version: String,
}

impl SignerResponse {
    pub fn new(
        operation: SignerOperation,
        payload: Vec<u8>,
        daemon_version: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            payload,
            daemon_version: daemon_version.into(),
            app_version: app_version.into(),
        }
    }
}

impl Serialize for SignerResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_length = self.operation == SignerOperation::RecoverAccount;
        let mut map = serializer.serialize_map(Some(if with_length { 4 } else { 3 }))?;
        if with_length {
            map.serialize_entry("length", &self.payload.len())?;
        }
        map.serialize_entry(self.operation.result_field(), &STANDARD.encode(&self.payload))?;
        map.serialize_entry("daemon_version", &self.daemon_version)?;
        map.serialize_entry("app_version", &self.app_version)?;
        map.end()
    }
}

impl IntoResponse for SignerError {
    fn into_response(self) -> Response {
        let status = match &self {
            SignerError::BadRequest(_) | SignerError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            SignerError::Unauthorized => StatusCode::UNAUTHORIZED,
            SignerError::Abandoned(_) => StatusCode::REQUEST_TIMEOUT,
            SignerError::Busy => StatusCode::CONFLICT,
            SignerError::Signer(_)
            | SignerError::Account(_)
            | SignerError::Config(_)
            | SignerError::Internal(_)
            | SignerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(%status, error = %self, "Request refused");
        }

        (status, self.to_string()).into_response()
    }
}
