//! Transaction summary extraction
//!
//! Turns a raw transaction-request buffer into the four fields the approval
//! prompt displays. Each field is decoded independently; a field that fails
//! to decode is shown empty rather than failing the approval flow.

use serde::Serialize;
use tracing::debug;

use crate::types::Result;

/// Display type for reclaim requests
pub const TRANSACTION_TYPE_WITHDRAW: &str = "Withdraw";
/// Display type for private transfers
pub const TRANSACTION_TYPE_PRIVATE_TRANSFER: &str = "Private transfer";
/// Reclaims always pay out to the user's own public account
pub const RECLAIM_RECIPIENT: &str = "your public wallet";

/// Kinds of value-moving requests that need approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum TransactionKind {
    Reclaim,
    PrivateTransfer,
}

impl TransactionKind {
    /// Human-readable type shown in the prompt
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Reclaim => TRANSACTION_TYPE_WITHDRAW,
            TransactionKind::PrivateTransfer => TRANSACTION_TYPE_PRIVATE_TRANSFER,
        }
    }

    /// Whether the recipient is decoded from the request or fixed
    fn decodes_recipient(&self) -> bool {
        matches!(self, TransactionKind::PrivateTransfer)
    }
}

/// Fields the payload decoder can pull from a batch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    Value,
    CurrencySymbol,
    Recipient,
}

/// Decoder for batch-parameter fields, provided by the zkp library
pub trait PayloadDecoder: Send + Sync {
    fn decode_field(&self, kind: TransactionKind, field: SummaryField, bytes: &[u8]) -> Result<String>;
}

/// What the user sees before approving
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    pub kind: TransactionKind,
    pub value: String,
    pub denomination: String,
    pub recipient: String,
}

/// Build the display summary for `bytes`
///
/// Pure apart from the decoder calls: the same input always yields the same
/// summary.
pub fn extract_summary(
    decoder: &dyn PayloadDecoder,
    kind: TransactionKind,
    bytes: &[u8],
) -> TransactionSummary {
    let decode = |field: SummaryField| match decoder.decode_field(kind, field, bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!(?kind, ?field, error = %e, "Summary field did not decode, leaving it empty");
            String::new()
        }
    };

    let recipient = if kind.decodes_recipient() {
        decode(SummaryField::Recipient)
    } else {
        RECLAIM_RECIPIENT.to_string()
    };

    TransactionSummary {
        kind,
        value: decode(SummaryField::Value),
        denomination: decode(SummaryField::CurrencySymbol),
        recipient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignerError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Decoder backed by a fixed table, counting recipient lookups
    struct TableDecoder {
        recipient_calls: AtomicUsize,
    }

    impl TableDecoder {
        fn new() -> Self {
            Self {
                recipient_calls: AtomicUsize::new(0),
            }
        }
    }

    impl PayloadDecoder for TableDecoder {
        fn decode_field(&self, kind: TransactionKind, field: SummaryField, bytes: &[u8]) -> Result<String> {
            if bytes.is_empty() {
                return Err(SignerError::Signer("empty buffer".into()));
            }
            match (kind, field) {
                (_, SummaryField::Value) => Ok("5".into()),
                (TransactionKind::Reclaim, SummaryField::CurrencySymbol) => Ok("DOL".into()),
                (TransactionKind::PrivateTransfer, SummaryField::CurrencySymbol) => {
                    Err(SignerError::Signer("no symbol".into()))
                }
                (_, SummaryField::Recipient) => {
                    self.recipient_calls.fetch_add(1, Ordering::SeqCst);
                    Ok("dmQ1...recipient".into())
                }
            }
        }
    }

    #[test]
    fn test_reclaim_summary_uses_fixed_recipient() {
        let decoder = TableDecoder::new();
        let summary = extract_summary(&decoder, TransactionKind::Reclaim, b"reclaim");

        assert_eq!(
            summary,
            TransactionSummary {
                kind: TransactionKind::Reclaim,
                value: "5".into(),
                denomination: "DOL".into(),
                recipient: "your public wallet".into(),
            }
        );
        assert_eq!(summary.kind.label(), "Withdraw");
        assert_eq!(decoder.recipient_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_private_transfer_decodes_recipient_and_degrades_per_field() {
        let decoder = TableDecoder::new();
        let summary = extract_summary(&decoder, TransactionKind::PrivateTransfer, b"transfer");

        assert_eq!(summary.kind.label(), "Private transfer");
        assert_eq!(summary.value, "5");
        assert_eq!(summary.denomination, "", "failed field degrades to empty");
        assert_eq!(summary.recipient, "dmQ1...recipient");
    }

    #[test]
    fn test_undecodable_buffer_yields_empty_fields() {
        let decoder = TableDecoder::new();
        let summary = extract_summary(&decoder, TransactionKind::PrivateTransfer, b"");
        assert_eq!(summary.value, "");
        assert_eq!(summary.denomination, "");
        assert_eq!(summary.recipient, "");
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let decoder = TableDecoder::new();
        let first = extract_summary(&decoder, TransactionKind::PrivateTransfer, b"same");
        let second = extract_summary(&decoder, TransactionKind::PrivateTransfer, b"same");
        assert_eq!(first, second);
    }
}
