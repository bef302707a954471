//! Self-checks for Cosmos SDK messages, plus helpers shared by chain specific messages.

use base64::Engine;
use cosmos_sdk_proto::cosmos::{bank::v1beta1::MsgSend, base::v1beta1::Coin};

use crate::{
    address::{Address, Bech32Prefixes},
    error::MsgError,
    gas_price::is_valid_denom,
    txbuilder::Msg,
};

impl Msg for MsgSend {
    const TYPE_URL: &'static str = "/cosmos.bank.v1beta1.MsgSend";

    fn validate_basic(&self, prefixes: &Bech32Prefixes) -> Result<(), MsgError> {
        account_address("from_address", &self.from_address, prefixes)?;
        account_address("to_address", &self.to_address, prefixes)?;
        if self.amount.is_empty() {
            return Err(MsgError::EmptyField { field: "amount" });
        }
        self.amount.iter().try_for_each(positive_coin)
    }

    fn describe(&self) -> String {
        let amount = self
            .amount
            .iter()
            .map(|coin| format!("{}{}", coin.amount, coin.denom))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{} sends {amount} to {}",
            self.from_address, self.to_address
        )
    }
}

/// Parse an account address, requiring the configured account prefix.
pub(crate) fn account_address(
    field: &'static str,
    value: &str,
    prefixes: &Bech32Prefixes,
) -> Result<Address, MsgError> {
    prefixes
        .parse_account_address(value)
        .map_err(|source| MsgError::InvalidAddress { field, source })
}

pub(crate) fn non_empty(field: &'static str, value: &str) -> Result<(), MsgError> {
    if value.trim().is_empty() {
        Err(MsgError::EmptyField { field })
    } else {
        Ok(())
    }
}

/// Require a non-empty standard base64 payload.
pub(crate) fn base64_payload(field: &'static str, value: &str) -> Result<Vec<u8>, MsgError> {
    non_empty(field, value)?;
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|source| MsgError::InvalidBase64 { field, source })
}

fn positive_coin(coin: &Coin) -> Result<(), MsgError> {
    let valid = is_valid_denom(&coin.denom)
        && coin
            .amount
            .parse::<u128>()
            .map_or(false, |amount| amount > 0);
    if valid {
        Ok(())
    } else {
        Err(MsgError::InvalidCoin {
            denom: coin.denom.clone(),
            amount: coin.amount.clone(),
        })
    }
}
