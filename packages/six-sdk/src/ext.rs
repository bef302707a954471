use chrono::{DateTime, Utc};
use cosmos_sdk_proto::cosmos::base::abci::v1beta1::TxResponse;

/// Cosmos SDK code for a wrong account sequence.
pub const CODE_WRONG_SEQUENCE: u32 = 32;

pub trait TxResponseExt {
    /// Whether the chain accepted the transaction.
    fn is_success(&self) -> bool;

    /// Parse the timestamp of this transaction.
    ///
    /// Only transactions fetched after inclusion in a block carry one.
    fn parse_timestamp(&self) -> Result<DateTime<Utc>, chrono::ParseError>;

    /// The sequence number the chain expected, if this transaction failed with an
    /// account sequence mismatch.
    ///
    /// No retry happens automatically. Callers resubmitting with
    /// [crate::TxBuilder::set_sequence] must be sure the first attempt never landed.
    fn expected_sequence(&self) -> Option<u64>;
}

impl TxResponseExt for TxResponse {
    fn is_success(&self) -> bool {
        self.code == 0
    }

    fn parse_timestamp(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        self.timestamp.parse()
    }

    fn expected_sequence(&self) -> Option<u64> {
        if self.code == 0 {
            None
        } else {
            get_expected_sequence(&self.raw_log)
        }
    }
}

/// Returned the expected account sequence mismatch based on an error message, if present
fn get_expected_sequence(message: &str) -> Option<u64> {
    message.lines().find_map(get_expected_sequence_single)
}

fn get_expected_sequence_single(message: &str) -> Option<u64> {
    let start = message.find("account sequence mismatch, expected ")?;
    let s = &message[start + "account sequence mismatch, expected ".len()..];
    let comma = s.find(',')?;
    s[..comma].parse().ok()
}
