//! Cryptographic signer collaborator
//!
//! Payload generation (mint, reclaim, private transfer, address derivation,
//! account recovery) lives in the zkp library. The daemon only decides
//! whether and when to call it; this module is the byte-buffer seam.

#[cfg(feature = "zkp")]
pub mod zkp;

#[cfg(feature = "zkp")]
pub use zkp::ZkpSigner;

use zeroize::Zeroizing;

use crate::approval::{PayloadDecoder, SummaryField, TransactionKind};
use crate::session::RootSeed;
use crate::types::{Result, SignerError};

/// Operations the signer performs against the loaded root seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignerOperation {
    DeriveShieldedAddress,
    GenerateAsset,
    RecoverAccount,
    GenerateMintData,
    GenerateReclaimData,
    GeneratePrivateTransferData,
}

impl SignerOperation {
    /// Response field carrying the payload
    pub fn result_field(&self) -> &'static str {
        match self {
            SignerOperation::DeriveShieldedAddress => "address",
            SignerOperation::GenerateAsset => "asset",
            SignerOperation::RecoverAccount => "recovered_account",
            SignerOperation::GenerateMintData => "mint_data",
            SignerOperation::GenerateReclaimData => "reclaim_data",
            SignerOperation::GeneratePrivateTransferData => "private_transfer_data",
        }
    }

    /// Value-moving operations need explicit human approval
    pub fn approval_kind(&self) -> Option<TransactionKind> {
        match self {
            SignerOperation::GenerateReclaimData => Some(TransactionKind::Reclaim),
            SignerOperation::GeneratePrivateTransferData => Some(TransactionKind::PrivateTransfer),
            _ => None,
        }
    }
}

/// Raw signer result: success flag plus whatever bytes came back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerOutput {
    pub success: bool,
    pub payload: Vec<u8>,
}

impl SignerOutput {
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    pub fn failed(payload: Vec<u8>) -> Self {
        Self {
            success: false,
            payload,
        }
    }
}

/// The signing module
///
/// Calls are synchronous and may be CPU heavy; the router runs them on the
/// blocking pool.
pub trait Signer: Send + Sync {
    /// Run `operation` over `input` with the user's root seed
    fn execute(&self, operation: SignerOperation, root_seed: &RootSeed, input: &[u8]) -> SignerOutput;

    /// Create a new account protected by `password`, returning its recovery phrase
    fn create_account(&self, password: &str) -> Result<Zeroizing<String>>;

    /// Decrypt the stored root seed with `password`
    fn load_root_seed(&self, password: &str) -> Result<RootSeed>;
}

/// Stand-in used when the daemon is built without the zkp library
///
/// Every operation fails, so sensitive requests still pass through the gate
/// and approval flow but answer 500, and summaries decode to empty fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSigner;

impl Signer for UnavailableSigner {
    fn execute(&self, _operation: SignerOperation, _root_seed: &RootSeed, _input: &[u8]) -> SignerOutput {
        SignerOutput::failed(Vec::new())
    }

    fn create_account(&self, _password: &str) -> Result<Zeroizing<String>> {
        Err(SignerError::Account("zkp library not available".into()))
    }

    fn load_root_seed(&self, _password: &str) -> Result<RootSeed> {
        Err(SignerError::Account("zkp library not available".into()))
    }
}

impl PayloadDecoder for UnavailableSigner {
    fn decode_field(&self, _kind: TransactionKind, _field: SummaryField, _bytes: &[u8]) -> Result<String> {
        Err(SignerError::Signer("zkp library not available".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ROOT_SEED_LEN;

    #[test]
    fn test_result_fields() {
        assert_eq!(SignerOperation::DeriveShieldedAddress.result_field(), "address");
        assert_eq!(SignerOperation::RecoverAccount.result_field(), "recovered_account");
        assert_eq!(
            SignerOperation::GeneratePrivateTransferData.result_field(),
            "private_transfer_data"
        );
    }

    #[test]
    fn test_only_value_moving_operations_need_approval() {
        assert_eq!(
            SignerOperation::GenerateReclaimData.approval_kind(),
            Some(TransactionKind::Reclaim)
        );
        assert_eq!(
            SignerOperation::GeneratePrivateTransferData.approval_kind(),
            Some(TransactionKind::PrivateTransfer)
        );
        assert_eq!(SignerOperation::GenerateMintData.approval_kind(), None);
        assert_eq!(SignerOperation::GenerateAsset.approval_kind(), None);
    }

    #[test]
    fn test_unavailable_signer_fails_everything() {
        let signer = UnavailableSigner;
        let seed = RootSeed::new([0u8; ROOT_SEED_LEN]);
        let output = signer.execute(SignerOperation::GenerateAsset, &seed, b"x");
        assert!(!output.success);
        assert!(signer.load_root_seed("pw").is_err());
        assert!(signer
            .decode_field(TransactionKind::Reclaim, SummaryField::Value, b"x")
            .is_err());
    }
}
