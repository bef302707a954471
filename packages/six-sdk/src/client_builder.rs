use std::{fmt::Display, str::FromStr, time::Duration};

use serde::de::Visitor;

use crate::{
    address::{Address, Bech32Prefixes, SIX_ADDRESS_PREFIX},
    error::{ConfigError, Error},
    gas_adjustment::GasAdjustment,
    gas_price::{GasPrices, DEFAULT_GAS_PRICES},
    Client, Identity,
};

/// How long to wait for the node after submitting a transaction.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum BroadcastMode {
    /// Return as soon as the node received the bytes (`async`).
    FireAndForget,
    /// Wait for the mempool check (`sync`).
    WaitForSync,
    /// Wait until the transaction is included in a block (`block`).
    #[default]
    WaitForCommit,
}

impl BroadcastMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BroadcastMode::FireAndForget => "async",
            BroadcastMode::WaitForSync => "sync",
            BroadcastMode::WaitForCommit => "block",
        }
    }

    /// Tendermint JSON-RPC method implementing this mode.
    pub(crate) fn rpc_method(self) -> &'static str {
        match self {
            BroadcastMode::FireAndForget => "broadcast_tx_async",
            BroadcastMode::WaitForSync => "broadcast_tx_sync",
            BroadcastMode::WaitForCommit => "broadcast_tx_commit",
        }
    }
}

impl Display for BroadcastMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BroadcastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "async" => Ok(BroadcastMode::FireAndForget),
            "sync" => Ok(BroadcastMode::WaitForSync),
            "block" | "commit" => Ok(BroadcastMode::WaitForCommit),
            _ => Err(format!(
                "Unknown broadcast mode {s:?}, expected one of async, sync, block"
            )),
        }
    }
}

impl serde::Serialize for BroadcastMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for BroadcastMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(BroadcastModeVisitor)
    }
}

struct BroadcastModeVisitor;

impl<'de> Visitor<'de> for BroadcastModeVisitor {
    type Value = BroadcastMode;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("BroadcastMode")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        BroadcastMode::from_str(v).map_err(E::custom)
    }
}

/// Whether a submitted transaction is actually broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Execute,
    /// Validate and simulate, then stop without signing or broadcasting.
    SimulateOnly,
}

/// Where the gas limit of a transaction comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GasSetting {
    /// Simulate first and apply the gas adjustment.
    #[default]
    Simulate,
    /// Use this gas limit and skip simulation.
    Fixed(u64),
}

/// Options accepted by [Client::new].
///
/// Every field is optional, so this can be deserialized from a partial config file.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    /// Defaults to [BroadcastMode::WaitForCommit].
    pub broadcast_mode: Option<BroadcastMode>,
    /// Defaults to `1.25usix`.
    pub gas_prices: Option<String>,
    /// Defaults to 1.5.
    pub gas_adjustment: Option<f64>,
    /// Skip simulation and request exactly this much gas.
    pub gas: Option<u64>,
    pub simulate_only: bool,
    /// Address paying fees on behalf of the signer, through a fee grant.
    pub fee_granter: Option<String>,
    /// Base bech32 prefix. Defaults to `6x`.
    pub address_prefix: Option<String>,
    /// Transport level timeout for each HTTP request. No timeout by default.
    pub request_timeout_seconds: Option<u64>,
}

/// Used to build a [Client].
#[derive(Clone, Debug)]
pub struct ClientBuilder {
    node_url: String,
    chain_id: String,

    // Values with defaults
    broadcast_mode: Option<BroadcastMode>,
    gas_prices: Option<String>,
    gas_adjustment: Option<f64>,
    gas: Option<u64>,
    simulate_only: bool,
    fee_granter: Option<String>,
    address_prefix: Option<String>,
    request_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new [ClientBuilder] with default options where possible.
    pub fn new(node_url: impl Into<String>, chain_id: impl Into<String>) -> ClientBuilder {
        Self::from_options(node_url, chain_id, ClientOptions::default())
    }

    pub fn from_options(
        node_url: impl Into<String>,
        chain_id: impl Into<String>,
        options: ClientOptions,
    ) -> ClientBuilder {
        let ClientOptions {
            broadcast_mode,
            gas_prices,
            gas_adjustment,
            gas,
            simulate_only,
            fee_granter,
            address_prefix,
            request_timeout_seconds,
        } = options;
        ClientBuilder {
            node_url: node_url.into(),
            chain_id: chain_id.into(),
            broadcast_mode,
            gas_prices,
            gas_adjustment,
            gas,
            simulate_only,
            fee_granter,
            address_prefix,
            request_timeout: request_timeout_seconds.map(Duration::from_secs),
        }
    }

    /// Tendermint RPC endpoint, e.g. `http://localhost:26657`
    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    /// See [Self::node_url]
    pub fn set_node_url(&mut self, node_url: impl Into<String>) {
        self.node_url = node_url.into();
    }

    /// Chain ID signed into every transaction
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// See [Self::chain_id]
    pub fn set_chain_id(&mut self, chain_id: impl Into<String>) {
        self.chain_id = chain_id.into();
    }

    /// Defaults to [BroadcastMode::WaitForCommit]
    pub fn broadcast_mode(&self) -> BroadcastMode {
        self.broadcast_mode.unwrap_or_default()
    }

    /// See [Self::broadcast_mode]
    pub fn set_broadcast_mode(&mut self, broadcast_mode: Option<BroadcastMode>) {
        self.broadcast_mode = broadcast_mode;
    }

    /// Defaults to `1.25usix`
    pub fn gas_prices(&self) -> &str {
        self.gas_prices.as_deref().unwrap_or(DEFAULT_GAS_PRICES)
    }

    /// See [Self::gas_prices]
    pub fn set_gas_prices(&mut self, gas_prices: Option<String>) {
        self.gas_prices = gas_prices;
    }

    /// Defaults to 1.5
    pub fn gas_adjustment(&self) -> f64 {
        self.gas_adjustment
            .unwrap_or_else(|| GasAdjustment::DEFAULT.value())
    }

    /// See [Self::gas_adjustment]
    pub fn set_gas_adjustment(&mut self, gas_adjustment: Option<f64>) {
        self.gas_adjustment = gas_adjustment;
    }

    pub fn gas_setting(&self) -> GasSetting {
        match self.gas {
            Some(gas) => GasSetting::Fixed(gas),
            None => GasSetting::Simulate,
        }
    }

    /// Set a fixed gas limit, or `None` to simulate.
    pub fn set_gas(&mut self, gas: Option<u64>) {
        self.gas = gas;
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        if self.simulate_only {
            ExecutionMode::SimulateOnly
        } else {
            ExecutionMode::Execute
        }
    }

    /// See [ExecutionMode::SimulateOnly]
    pub fn set_simulate_only(&mut self, simulate_only: bool) {
        self.simulate_only = simulate_only;
    }

    pub fn fee_granter(&self) -> Option<&str> {
        self.fee_granter.as_deref()
    }

    /// See [Self::fee_granter]
    pub fn set_fee_granter(&mut self, fee_granter: Option<String>) {
        self.fee_granter = fee_granter;
    }

    /// Defaults to `6x`
    pub fn address_prefix(&self) -> &str {
        self.address_prefix.as_deref().unwrap_or(SIX_ADDRESS_PREFIX)
    }

    /// See [Self::address_prefix]
    pub fn set_address_prefix(&mut self, address_prefix: Option<String>) {
        self.address_prefix = address_prefix;
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// See [Self::request_timeout]
    pub fn set_request_timeout(&mut self, request_timeout: Option<Duration>) {
        self.request_timeout = request_timeout;
    }

    /// Validate everything and produce the immutable config.
    pub fn build_config(&self) -> Result<ClientConfig, ConfigError> {
        let node_url = url::Url::parse(&self.node_url).map_err(|source| {
            ConfigError::InvalidNodeUrl {
                url: self.node_url.clone(),
                source,
            }
        })?;
        let prefixes = Bech32Prefixes::from_base(self.address_prefix())?;
        let fee_granter = self
            .fee_granter
            .as_deref()
            .map(|granter| prefixes.parse_account_address(granter))
            .transpose()
            .map_err(|source| ConfigError::FeeGranter { source })?;
        Ok(ClientConfig {
            node_url,
            chain_id: self.chain_id.clone(),
            broadcast_mode: self.broadcast_mode(),
            gas_prices: self.gas_prices().parse()?,
            gas_adjustment: GasAdjustment::new(self.gas_adjustment())?,
            gas: self.gas_setting(),
            execution_mode: self.execution_mode(),
            fee_granter,
            prefixes,
            request_timeout: self.request_timeout,
        })
    }

    /// Import the armored key and connect.
    pub fn build(&self, armor: &str, passphrase: &str) -> Result<Client, Error> {
        let config = self.build_config()?;
        let identity = Identity::import_armor(armor, passphrase, config.prefixes())?;
        Client::from_parts(config, identity)
    }

    /// Connect with an identity that was already imported.
    pub fn build_with_identity(&self, identity: Identity) -> Result<Client, Error> {
        Client::from_parts(self.build_config()?, identity)
    }
}

/// Immutable, validated client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    node_url: url::Url,
    chain_id: String,
    broadcast_mode: BroadcastMode,
    gas_prices: GasPrices,
    gas_adjustment: GasAdjustment,
    gas: GasSetting,
    execution_mode: ExecutionMode,
    fee_granter: Option<Address>,
    prefixes: Bech32Prefixes,
    request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn node_url(&self) -> &url::Url {
        &self.node_url
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn broadcast_mode(&self) -> BroadcastMode {
        self.broadcast_mode
    }

    pub fn gas_prices(&self) -> &GasPrices {
        &self.gas_prices
    }

    pub fn gas_adjustment(&self) -> GasAdjustment {
        self.gas_adjustment
    }

    pub fn gas(&self) -> GasSetting {
        self.gas
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    pub fn fee_granter(&self) -> Option<&Address> {
        self.fee_granter.as_ref()
    }

    pub fn prefixes(&self) -> &Bech32Prefixes {
        &self.prefixes
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientBuilder::new("http://localhost:26657", "sixnet")
            .build_config()
            .unwrap();
        assert_eq!(config.broadcast_mode(), BroadcastMode::WaitForCommit);
        assert_eq!(config.gas_prices().to_string(), "1.25usix");
        assert_eq!(config.gas_adjustment(), GasAdjustment::DEFAULT);
        assert_eq!(config.gas(), GasSetting::Simulate);
        assert_eq!(config.execution_mode(), ExecutionMode::Execute);
        assert_eq!(config.prefixes(), &Bech32Prefixes::six());
        assert!(config.fee_granter().is_none());
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn broadcast_mode_strings() {
        for mode in [
            BroadcastMode::FireAndForget,
            BroadcastMode::WaitForSync,
            BroadcastMode::WaitForCommit,
        ] {
            assert_eq!(mode.as_str().parse::<BroadcastMode>().unwrap(), mode);
        }
        assert!("eventually".parse::<BroadcastMode>().is_err());
        assert_eq!(
            BroadcastMode::FireAndForget.rpc_method(),
            "broadcast_tx_async"
        );
    }

    #[test]
    fn options_from_json() {
        let options: ClientOptions = serde_json::from_str(
            r#"{"broadcast_mode": "async", "gas_prices": "2usix", "simulate_only": true}"#,
        )
        .unwrap();
        let config = ClientBuilder::from_options("http://node:26657", "sixnet", options)
            .build_config()
            .unwrap();
        assert_eq!(config.broadcast_mode(), BroadcastMode::FireAndForget);
        assert_eq!(config.gas_prices().to_string(), "2usix");
        assert_eq!(config.execution_mode(), ExecutionMode::SimulateOnly);

        assert!(serde_json::from_str::<ClientOptions>(r#"{"broadcast_mode": "later"}"#).is_err());
        assert!(serde_json::from_str::<ClientOptions>(r#"{"gas_price": "1usix"}"#).is_err());
    }

    #[test]
    fn invalid_config() {
        let mut builder = ClientBuilder::new("not a url", "sixnet");
        assert!(matches!(
            builder.build_config(),
            Err(ConfigError::InvalidNodeUrl { .. })
        ));

        builder.set_node_url("http://localhost:26657");
        builder.set_gas_prices(Some("cheap".to_owned()));
        assert!(matches!(
            builder.build_config(),
            Err(ConfigError::GasPrice(_))
        ));

        builder.set_gas_prices(None);
        builder.set_gas_adjustment(Some(0.5));
        assert!(matches!(
            builder.build_config(),
            Err(ConfigError::GasAdjustment(_))
        ));

        builder.set_gas_adjustment(None);
        builder.set_fee_granter(Some("osmo168gdk6r58jdwfv49kuesq2rs747jawnn4ryvyk".to_owned()));
        assert!(matches!(
            builder.build_config(),
            Err(ConfigError::FeeGranter { .. })
        ));
    }

    #[test]
    fn custom_prefix_and_fixed_gas() {
        let mut builder = ClientBuilder::new("https://rpc.example.com", "testing");
        builder.set_address_prefix(Some("cosmos".to_owned()));
        builder.set_gas(Some(300_000));
        let config = builder.build_config().unwrap();
        assert_eq!(config.prefixes().validator().as_str(), "cosmosvaloper");
        assert_eq!(config.gas(), GasSetting::Fixed(300_000));
    }
}
