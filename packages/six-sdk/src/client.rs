pub(crate) mod query;
pub(crate) mod rpc;
mod tx;

use std::sync::Arc;

use crate::{
    address::{Address, HasAddress},
    client_builder::{ClientBuilder, ClientConfig, ClientOptions},
    Identity, Result,
};

use self::{query::QueryClient, rpc::RpcTransport};

pub use self::tx::SimulatedGas;

/// A connection to one node, signing with one identity.
///
/// Cloning is cheap and clones share the transport and identity.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn RpcTransport>,
    identity: Arc<Identity>,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Import the armored key and connect to the node's Tendermint RPC endpoint.
    pub fn new(
        node_url: impl Into<String>,
        armor: &str,
        passphrase: &str,
        chain_id: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Client> {
        ClientBuilder::from_options(node_url, chain_id, options).build(armor, passphrase)
    }

    pub(crate) fn from_parts(config: ClientConfig, identity: Identity) -> Result<Client> {
        let transport = rpc::HttpRpc::new(config.node_url().clone(), config.request_timeout())?;
        Ok(Client::with_transport(config, identity, Arc::new(transport)))
    }

    /// Use a custom transport instead of HTTP.
    pub fn with_transport(
        config: ClientConfig,
        identity: Identity,
        transport: Arc<dyn RpcTransport>,
    ) -> Client {
        tracing::debug!(
            "Client for {} on {} signing as {}",
            config.node_url(),
            config.chain_id(),
            identity.address()
        );
        Client {
            transport,
            identity: Arc::new(identity),
            config: Arc::new(config),
        }
    }

    /// Account address of the signing identity.
    pub fn address(&self) -> &Address {
        self.identity.address()
    }

    /// [Self::address] as a string.
    pub fn connected_address(&self) -> String {
        self.identity.address().to_string()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A read-only query handle sharing this client's transport.
    pub fn query_client(&self) -> QueryClient {
        QueryClient::new(self.transport.clone())
    }
}

impl HasAddress for Client {
    fn get_address(&self) -> Address {
        self.address().clone()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
