//! Client library for the SIX chain.
//!
//! Import an armored key, then submit transactions and run queries against a
//! node's Tendermint RPC endpoint.

pub use address::{
    parse_raw_address, Address, AddressAnyHrp, AddressHrp, Bech32Prefixes, HasAddress,
    RawAddress, SIX_ADDRESS_PREFIX,
};
pub use armor::{decrypt_armor, encrypt_armor};
pub use client::{
    query::{AbciQuery, QueryClient},
    rpc::{tx_hash, HttpRpc, RpcTransport},
    Client, SimulatedGas,
};
pub use client_builder::{
    BroadcastMode, ClientBuilder, ClientConfig, ClientOptions, ExecutionMode, GasSetting,
};
pub use cosmos_sdk_proto as proto;
pub use cosmos_sdk_proto::cosmos::base::{abci::v1beta1::TxResponse, v1beta1::Coin};
pub use error::Error;
pub use ext::TxResponseExt;
pub use gas_adjustment::GasAdjustment;
pub use gas_price::{GasPrice, GasPrices, DEFAULT_GAS_PRICES};
pub use identity::Identity;
pub use txbuilder::{Msg, TxBuilder, TxMessage};

mod address;
mod armor;
mod client;
mod client_builder;
pub mod error;
pub mod ext;
mod gas_adjustment;
mod gas_price;
mod identity;
mod messages;
pub mod nftmngr;
mod txbuilder;

pub type Result<T, E = Error> = std::result::Result<T, E>;
