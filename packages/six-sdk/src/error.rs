//! Error types exposed by this package.

use crate::address::AddressHrp;

/// Top level error type returned by [crate::Client].
///
/// Every variant corresponds to one gate of the transaction pipeline (or to
/// client construction and queries). None of them are retried internally.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The armored key could not be decrypted or decoded.
    #[error("Unable to import private key: {0}")]
    Import(#[from] ImportError),
    /// A message failed its own self-check before anything was sent.
    #[error("Message #{index} ({type_url}) failed validation: {source}")]
    Validation {
        index: usize,
        type_url: String,
        source: MsgError,
    },
    /// Account number and sequence of the signer could not be determined.
    #[error("Unable to resolve account {address}: {source}")]
    AccountResolution {
        address: String,
        source: AccountResolutionError,
    },
    /// Gas estimation failed.
    #[error("Unable to simulate transaction: {source}")]
    Simulation { source: RpcError },
    #[error("Unable to sign transaction: {source}")]
    Signing {
        source: bitcoin::secp256k1::Error,
    },
    #[error("Unable to encode transaction: {source}")]
    Encoding { source: prost::EncodeError },
    /// Transport or node level failure while broadcasting.
    ///
    /// A transaction rejected on-chain is not an error, see the `code` field of the response.
    #[error("Unable to broadcast transaction {txhash}: {source}")]
    Broadcast { txhash: String, source: RpcError },
    #[error("Query {path} failed: {source}")]
    Query { path: String, source: RpcError },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors importing an armored private key.
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("No -----BEGIN ...----- line found in armor")]
    MissingBegin,
    #[error("No -----END {block_type}----- line found in armor")]
    MissingEnd { block_type: String },
    #[error("Unrecognized armor type {found:?}, expected {expected:?}")]
    UnexpectedBlockType {
        found: String,
        expected: &'static str,
    },
    #[error("Malformed armor header line {line:?}")]
    MalformedHeader { line: String },
    #[error("Invalid base64 in armor body: {source}")]
    InvalidBase64 { source: base64::DecodeError },
    #[error("Armor checksum mismatch: expected {expected:06X}, computed {actual:06X}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("Unrecognized KDF type: {kdf:?}")]
    UnsupportedKdf { kdf: Option<String> },
    #[error("Missing salt bytes")]
    MissingSalt,
    #[error("Invalid salt {salt:?}, expected 16 hex encoded bytes")]
    InvalidSalt { salt: String },
    #[error("Unsupported signing algorithm {algo:?}, only secp256k1 is supported")]
    UnsupportedAlgorithm { algo: String },
    #[error("Key derivation failed: {source}")]
    Bcrypt { source: bcrypt::BcryptError },
    #[error("Ciphertext is too short ({len} bytes)")]
    CiphertextTooShort { len: usize },
    #[error("Invalid account passphrase")]
    WrongPassphrase,
    #[error("Unable to encrypt private key")]
    EncryptionFailed,
    #[error("Decrypted key is not an amino encoded secp256k1 private key")]
    InvalidKeyEncoding,
    #[error("Invalid secp256k1 secret key: {source}")]
    InvalidSecretKey { source: bitcoin::secp256k1::Error },
}

/// Reasons a message can fail its self-check.
#[derive(thiserror::Error, Debug)]
pub enum MsgError {
    #[error("Invalid {field} address: {source}")]
    InvalidAddress {
        field: &'static str,
        source: AddressError,
    },
    #[error("Field {field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("Field {field} is not valid base64: {source}")]
    InvalidBase64 {
        field: &'static str,
        source: base64::DecodeError,
    },
    #[error("Invalid coin amount {amount:?} of {denom:?}")]
    InvalidCoin { denom: String, amount: String },
}

#[derive(thiserror::Error, Debug)]
pub enum AddressError {
    #[error("Invalid bech32 address {address:?}: {source}")]
    InvalidBech32 {
        address: String,
        source: bech32::Error,
    },
    #[error("Address {address:?} uses Bech32m, only Bech32 is supported")]
    Bech32mUnsupported { address: String },
    #[error("Invalid data size for an address: {actual} bytes, need either 20 or 32")]
    InvalidByteCount { actual: usize },
    #[error("Invalid address HRP {hrp:?}")]
    InvalidHrp { hrp: String },
    #[error("Address {address} has prefix {actual}, expected {expected}")]
    WrongHrp {
        address: String,
        expected: AddressHrp,
        actual: AddressHrp,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum AccountResolutionError {
    /// The chain has never seen this address, usually because it holds no funds.
    #[error("Account does not exist on chain: {log}")]
    NotFound { log: String },
    #[error(transparent)]
    Query(RpcError),
    #[error("Account response did not include an account")]
    MissingAccount,
    #[error("Unsupported account type {type_url}")]
    UnsupportedAccountType { type_url: String },
    #[error("Unable to decode {type_url}: {source}")]
    Decode {
        type_url: String,
        source: prost::DecodeError,
    },
}

/// Errors talking to a node over Tendermint JSON-RPC.
#[derive(thiserror::Error, Debug)]
pub enum RpcError {
    #[error("HTTP error calling {method}: {source}")]
    Http {
        method: &'static str,
        source: reqwest::Error,
    },
    #[error("JSON-RPC error from {method}: code {code}, {message}. {data}")]
    JsonRpc {
        method: &'static str,
        code: i64,
        message: String,
        data: String,
    },
    #[error("Unable to parse {method} response: {source}. Body: {body}")]
    InvalidJson {
        method: &'static str,
        body: String,
        source: serde_json::Error,
    },
    #[error("Invalid {method} response: {message}")]
    InvalidResponse {
        method: &'static str,
        message: String,
    },
    #[error("ABCI query {path} failed with code {code} (codespace {codespace:?}): {log}")]
    AbciQuery {
        path: String,
        code: u32,
        codespace: String,
        log: String,
    },
    #[error("Unable to decode protobuf response from {path}: {source}")]
    Decode {
        path: String,
        source: prost::DecodeError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid node URL {url:?}: {source}")]
    InvalidNodeUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Unable to build HTTP client: {source}")]
    HttpClient { source: reqwest::Error },
    #[error(transparent)]
    GasPrice(#[from] GasPriceError),
    #[error("Invalid address prefix: {0}")]
    Prefix(#[from] AddressError),
    #[error("Invalid fee granter: {source}")]
    FeeGranter { source: AddressError },
    #[error("Gas adjustment must be a finite number of at least 1.0, got {0}")]
    GasAdjustment(f64),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GasPriceError {
    #[error("No gas prices provided")]
    Empty,
    #[error("Invalid gas price {input:?}, expected an amount followed by a denom, e.g. 1.25usix")]
    Malformed { input: String },
    #[error("Gas price {input:?} has too many decimal places")]
    TooPrecise { input: String },
    #[error("Duplicate gas price denom {denom:?}")]
    DuplicateDenom { denom: String },
}
