use std::{fmt::Display, sync::Arc};

use cosmos_sdk_proto::cosmos::tx::v1beta1::TxBody;
use prost::Message;

use crate::{address::Bech32Prefixes, error::MsgError, Error};

/// A protobuf message that can be placed in a transaction.
pub trait Msg: Message + Sized + 'static {
    /// Fully qualified protobuf type URL, e.g. `/cosmos.bank.v1beta1.MsgSend`.
    const TYPE_URL: &'static str;

    /// Stateless self-check run before anything is sent to the node.
    fn validate_basic(&self, prefixes: &Bech32Prefixes) -> Result<(), MsgError>;

    /// Human readable summary used in logs.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

trait ValidateBasic: Send + Sync {
    fn validate_basic(&self, prefixes: &Bech32Prefixes) -> Result<(), MsgError>;
}

impl<T: Msg> ValidateBasic for T {
    fn validate_basic(&self, prefixes: &Bech32Prefixes) -> Result<(), MsgError> {
        Msg::validate_basic(self, prefixes)
    }
}

/// A message to include in a transaction, including the type URL string.
#[derive(Clone)]
pub struct TxMessage {
    type_url: String,
    value: Vec<u8>,
    description: String,
    check: Option<Arc<dyn ValidateBasic>>,
}

impl TxMessage {
    /// An opaque message. Its self-check always passes, the node has the final say.
    pub fn raw(any: prost_types::Any) -> Self {
        TxMessage {
            description: format!("{} ({} bytes)", any.type_url, any.value.len()),
            type_url: any.type_url,
            value: any.value,
            check: None,
        }
    }

    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn validate_basic(&self, prefixes: &Bech32Prefixes) -> Result<(), MsgError> {
        match &self.check {
            Some(check) => check.validate_basic(prefixes),
            None => Ok(()),
        }
    }

    pub fn into_protobuf(self) -> prost_types::Any {
        prost_types::Any {
            type_url: self.type_url,
            value: self.value,
        }
    }
}

impl<T: Msg> From<T> for TxMessage {
    fn from(msg: T) -> Self {
        TxMessage {
            type_url: T::TYPE_URL.to_owned(),
            value: msg.encode_to_vec(),
            description: msg.describe(),
            check: Some(Arc::new(msg)),
        }
    }
}

impl std::fmt::Debug for TxMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxMessage")
            .field("type_url", &self.type_url)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Transaction builder
///
/// Collects the messages of one transaction plus optional overrides. Anything
/// left unset is resolved by [crate::Client::submit_tx].
#[derive(Default, Clone, Debug)]
pub struct TxBuilder {
    pub(crate) messages: Vec<TxMessage>,
    pub(crate) memo: Option<String>,
    pub(crate) gas_limit: Option<u64>,
    pub(crate) account_number: Option<u64>,
    pub(crate) sequence: Option<u64>,
}

impl Display for TxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Transaction with {} message(s)", self.messages.len())?;
        for msg in &self.messages {
            write!(f, "\n* {}", msg.description)?;
        }
        if let Some(memo) = &self.memo {
            write!(f, "\nMemo: {memo}")?;
        }
        Ok(())
    }
}

impl TxBuilder {
    /// Add a message to this transaction.
    pub fn add_message(&mut self, msg: impl Into<TxMessage>) -> &mut Self {
        self.messages.push(msg.into());
        self
    }

    pub fn messages(&self) -> &[TxMessage] {
        &self.messages
    }

    /// Set the memo field.
    pub fn set_memo(&mut self, memo: impl Into<String>) -> &mut Self {
        self.memo = Some(memo.into());
        self
    }

    /// Clear the memo field
    pub fn clear_memo(&mut self) -> &mut Self {
        self.memo = None;
        self
    }

    /// Either set or clear the memo field.
    pub fn set_optional_memo(&mut self, memo: impl Into<Option<String>>) -> &mut Self {
        self.memo = memo.into();
        self
    }

    /// Request exactly this much gas instead of simulating.
    pub fn set_gas_limit(&mut self, gas_limit: Option<u64>) -> &mut Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Use this account number instead of looking it up.
    pub fn set_account_number(&mut self, account_number: Option<u64>) -> &mut Self {
        self.account_number = account_number;
        self
    }

    /// Use this sequence number instead of looking it up.
    pub fn set_sequence(&mut self, sequence: Option<u64>) -> &mut Self {
        self.sequence = sequence;
        self
    }

    /// Run every message's self-check, stopping at the first failure.
    pub fn validate(&self, prefixes: &Bech32Prefixes) -> Result<(), Error> {
        for (index, msg) in self.messages.iter().enumerate() {
            msg.validate_basic(prefixes)
                .map_err(|source| Error::Validation {
                    index,
                    type_url: msg.type_url.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    pub(crate) fn make_tx_body(&self) -> TxBody {
        TxBody {
            messages: self
                .messages
                .iter()
                .cloned()
                .map(TxMessage::into_protobuf)
                .collect(),
            memo: self.memo.clone().unwrap_or_default(),
            timeout_height: 0,
            extension_options: vec![],
            non_critical_extension_options: vec![],
        }
    }
}

impl<T: Into<TxMessage>> FromIterator<T> for TxBuilder {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut builder = TxBuilder::default();
        for msg in iter {
            builder.add_message(msg);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use cosmos_sdk_proto::cosmos::{bank::v1beta1::MsgSend, base::v1beta1::Coin};

    use super::*;

    fn send(from: &str) -> MsgSend {
        let prefixes = Bech32Prefixes::six();
        MsgSend {
            from_address: from.to_owned(),
            to_address: prefixes.account_address([2u8; 20]).to_string(),
            amount: vec![Coin {
                denom: "usix".to_owned(),
                amount: "100".to_owned(),
            }],
        }
    }

    #[test]
    fn validation_reports_offending_index() {
        let prefixes = Bech32Prefixes::six();
        let good = prefixes.account_address([1u8; 20]).to_string();

        let mut builder = TxBuilder::default();
        builder.add_message(send(&good));
        builder.add_message(send(&good));
        builder.add_message(send("not an address"));
        match builder.validate(&prefixes) {
            Err(Error::Validation {
                index, type_url, ..
            }) => {
                assert_eq!(index, 2);
                assert_eq!(type_url, "/cosmos.bank.v1beta1.MsgSend");
            }
            other => panic!("Expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn raw_messages_pass_validation() {
        let builder: TxBuilder = [TxMessage::raw(prost_types::Any {
            type_url: "/thesixnetwork.sixnft.nftmngr.MsgSomethingNew".to_owned(),
            value: vec![1, 2, 3],
        })]
        .into_iter()
        .collect();
        builder.validate(&Bech32Prefixes::six()).unwrap();
        assert_eq!(
            builder.messages()[0].description(),
            "/thesixnetwork.sixnft.nftmngr.MsgSomethingNew (3 bytes)"
        );
    }

    #[test]
    fn body_keeps_order_and_memo() {
        let prefixes = Bech32Prefixes::six();
        let from = prefixes.account_address([1u8; 20]).to_string();
        let mut builder = TxBuilder::default();
        builder
            .add_message(send(&from))
            .add_message(TxMessage::raw(prost_types::Any {
                type_url: "/custom.Msg".to_owned(),
                value: vec![],
            }))
            .set_memo("hello");
        let body = builder.make_tx_body();
        assert_eq!(body.memo, "hello");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].type_url, "/cosmos.bank.v1beta1.MsgSend");
        assert_eq!(body.messages[0].value, send(&from).encode_to_vec());
        assert_eq!(body.messages[1].type_url, "/custom.Msg");

        builder.clear_memo();
        assert_eq!(builder.make_tx_body().memo, "");
        assert!(builder.to_string().starts_with("Transaction with 2 message(s)"));
    }
}
