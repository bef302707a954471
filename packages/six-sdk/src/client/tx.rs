use cosmos_sdk_proto::cosmos::{
    base::abci::v1beta1::TxResponse,
    crypto::secp256k1::PubKey,
    tx::{
        signing::v1beta1::SignMode,
        v1beta1::{
            mode_info, AuthInfo, Fee, ModeInfo, SignDoc, SignerInfo, SimulateRequest, Tx, TxBody,
            TxRaw,
        },
    },
};
use prost::Message;

use super::{rpc, Client};
use crate::{
    client_builder::{ExecutionMode, GasSetting},
    error::RpcError,
    txbuilder::{TxBuilder, TxMessage},
    Error, Result,
};

const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

/// Outcome of a gas simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulatedGas {
    /// Gas the node reported using.
    pub gas_used: u64,
    /// Gas limit that would be requested, after the gas adjustment.
    pub gas_limit: u64,
}

/// Account number and sequence used for one transaction.
#[derive(Clone, Copy, Debug)]
struct AccountInfo {
    account_number: u64,
    sequence: u64,
}

impl Client {
    /// Validate, simulate, sign and broadcast a transaction carrying these messages.
    ///
    /// Returns `Ok(None)` when the client is in [ExecutionMode::SimulateOnly].
    /// A transaction the chain rejects is still `Ok(Some(..))`, check its `code`.
    ///
    /// # Sequence numbers
    ///
    /// The account sequence is looked up from the node on every call and nothing
    /// guards it between lookup and broadcast. Two submits for the same signer
    /// that overlap, or follow each other before the first one is committed, can
    /// sign with the same sequence. The node then rejects the second one with
    /// code 32 (`account sequence mismatch`). That response is returned as is and
    /// never retried. Submit sequentially, or pin sequences with
    /// [TxBuilder::set_sequence].
    pub async fn submit(
        &self,
        messages: impl IntoIterator<Item = impl Into<TxMessage>>,
    ) -> Result<Option<TxResponse>> {
        self.submit_tx(&messages.into_iter().collect()).await
    }

    /// Like [Self::submit], honoring the memo and overrides of a [TxBuilder].
    pub async fn submit_tx(&self, tx: &TxBuilder) -> Result<Option<TxResponse>> {
        tx.validate(self.config.prefixes())?;
        let account = self.resolve_account(tx).await?;
        let body = tx.make_tx_body();

        let simulate_only = self.config.execution_mode() == ExecutionMode::SimulateOnly;
        let gas_setting = tx
            .gas_limit
            .map(GasSetting::Fixed)
            .unwrap_or(self.config.gas());

        let gas_limit = match gas_setting {
            GasSetting::Fixed(gas_limit) => {
                // Simulate-only still has the node check the messages
                if simulate_only {
                    self.simulate_body(&body, account.sequence).await?;
                }
                gas_limit
            }
            GasSetting::Simulate => self.simulate_body(&body, account.sequence).await?.gas_limit,
        };

        if simulate_only {
            tracing::info!("Simulation only, not broadcasting. Gas limit: {gas_limit}");
            return Ok(None);
        }

        let tx_bytes = self.sign_and_encode(body, account, gas_limit)?;
        self.broadcast(tx_bytes).await.map(Some)
    }

    /// Validate and simulate without signing or broadcasting.
    pub async fn simulate(&self, tx: &TxBuilder) -> Result<SimulatedGas> {
        tx.validate(self.config.prefixes())?;
        let account = self.resolve_account(tx).await?;
        self.simulate_body(&tx.make_tx_body(), account.sequence).await
    }

    async fn resolve_account(&self, tx: &TxBuilder) -> Result<AccountInfo> {
        if let (Some(account_number), Some(sequence)) = (tx.account_number, tx.sequence) {
            return Ok(AccountInfo {
                account_number,
                sequence,
            });
        }
        let base_account = self.query_client().account(self.address()).await?;
        let account = AccountInfo {
            account_number: tx.account_number.unwrap_or(base_account.account_number),
            sequence: tx.sequence.unwrap_or(base_account.sequence),
        };
        tracing::debug!("Resolved {}: {account:?}", self.address());
        Ok(account)
    }

    async fn simulate_body(&self, body: &TxBody, sequence: u64) -> Result<SimulatedGas> {
        // Unsigned, with no fee
        let simulate_tx = Tx {
            body: Some(body.clone()),
            auth_info: Some(AuthInfo {
                signer_infos: vec![self.signer_info(sequence)],
                fee: Some(Fee {
                    amount: vec![],
                    gas_limit: 0,
                    payer: String::new(),
                    granter: String::new(),
                }),
                ..Default::default()
            }),
            signatures: vec![vec![]],
        };

        #[allow(deprecated)]
        let simulate_req = SimulateRequest {
            tx: None,
            tx_bytes: simulate_tx.encode_to_vec(),
        };

        let simres = self
            .query_client()
            .perform(simulate_req)
            .await
            .map_err(|source| Error::Simulation { source })?;
        let gas_used = simres
            .gas_info
            .ok_or_else(|| Error::Simulation {
                source: RpcError::InvalidResponse {
                    method: "abci_query",
                    message: "Missing gas_info in SimulateResponse".to_owned(),
                },
            })?
            .gas_used;
        let gas_limit = self.config.gas_adjustment().apply(gas_used);
        tracing::debug!("Simulation used {gas_used} gas, requesting {gas_limit}");
        Ok(SimulatedGas {
            gas_used,
            gas_limit,
        })
    }

    fn signer_info(&self, sequence: u64) -> SignerInfo {
        SignerInfo {
            public_key: Some(prost_types::Any {
                type_url: SECP256K1_PUBKEY_TYPE_URL.to_owned(),
                value: PubKey {
                    key: self.identity.public_key_bytes().to_vec(),
                }
                .encode_to_vec(),
            }),
            mode_info: Some(ModeInfo {
                sum: Some(mode_info::Sum::Single(mode_info::Single {
                    mode: SignMode::Direct as i32,
                })),
            }),
            sequence,
        }
    }

    fn sign_and_encode(
        &self,
        body: TxBody,
        account: AccountInfo,
        gas_limit: u64,
    ) -> Result<Vec<u8>> {
        let auth_info = AuthInfo {
            signer_infos: vec![self.signer_info(account.sequence)],
            fee: Some(Fee {
                amount: self.config.gas_prices().fees_for(gas_limit),
                gas_limit,
                payer: String::new(),
                granter: self
                    .config
                    .fee_granter()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            }),
            ..Default::default()
        };

        let sign_doc = SignDoc {
            body_bytes: body.encode_to_vec(),
            auth_info_bytes: auth_info.encode_to_vec(),
            chain_id: self.config.chain_id().to_owned(),
            account_number: account.account_number,
        };
        let signature = self
            .identity
            .sign_bytes(&sign_doc.encode_to_vec())
            .map_err(|source| Error::Signing { source })?;

        let raw = TxRaw {
            body_bytes: sign_doc.body_bytes,
            auth_info_bytes: sign_doc.auth_info_bytes,
            signatures: vec![signature.serialize_compact().to_vec()],
        };
        let mut tx_bytes = Vec::with_capacity(raw.encoded_len());
        raw.encode(&mut tx_bytes)
            .map_err(|source| Error::Encoding { source })?;
        Ok(tx_bytes)
    }

    async fn broadcast(&self, tx_bytes: Vec<u8>) -> Result<TxResponse> {
        let txhash = rpc::tx_hash(&tx_bytes);
        let mode = self.config.broadcast_mode();
        tracing::debug!(
            "Broadcasting {txhash} ({} bytes) in {mode} mode",
            tx_bytes.len()
        );
        let res = self
            .transport
            .broadcast_tx(mode, tx_bytes)
            .await
            .map_err(|source| Error::Broadcast {
                txhash: txhash.clone(),
                source,
            })?;
        if res.code == 0 {
            tracing::info!("Broadcast {txhash} at height {}", res.height);
        } else {
            tracing::warn!(
                "Transaction {txhash} rejected with code {} ({}): {}",
                res.code,
                res.codespace,
                res.raw_log
            );
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bitcoin::hashes::{sha256, Hash};
    use bitcoin::secp256k1::{ecdsa::Signature, Message as SecpMessage, PublicKey, Secp256k1};
    use cosmos_sdk_proto::cosmos::{
        auth::v1beta1::{BaseAccount, QueryAccountRequest, QueryAccountResponse},
        base::abci::v1beta1::GasInfo,
        tx::v1beta1::SimulateResponse,
    };
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        address::Address,
        client::rpc::RpcTransport,
        client_builder::{BroadcastMode, ClientBuilder, ClientOptions},
        error::{AccountResolutionError, MsgError},
        ext::{TxResponseExt, CODE_WRONG_SEQUENCE},
        nftmngr::MsgCreateMetadata,
        Identity,
    };

    const ACCOUNT_NUMBER: u64 = 314;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Query(String),
        Broadcast(BroadcastMode, Vec<u8>),
    }

    /// In-memory node. Account queries always report `account_sequence`, as if
    /// earlier transactions were still waiting in the mempool, while broadcasts
    /// are checked against the sequence the mempool expects next.
    struct StubNode {
        account_sequence: Option<u64>,
        gas_used: Option<u64>,
        broadcast_fails: bool,
        next_sequence: Mutex<u64>,
        calls: Mutex<Vec<Call>>,
    }

    impl StubNode {
        fn new() -> Self {
            StubNode {
                account_sequence: Some(5),
                gas_used: Some(100_001),
                broadcast_fails: false,
                next_sequence: Mutex::new(5),
                calls: Mutex::new(vec![]),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn broadcasts(&self) -> Vec<Vec<u8>> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Broadcast(_, bytes) => Some(bytes),
                    Call::Query(_) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl RpcTransport for StubNode {
        async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
            self.calls.lock().push(Call::Query(path.to_owned()));
            match path {
                "/cosmos.auth.v1beta1.Query/Account" => {
                    let req = QueryAccountRequest::decode(data.as_slice()).unwrap();
                    match self.account_sequence {
                        Some(sequence) => Ok(QueryAccountResponse {
                            account: Some(prost_types::Any {
                                type_url: "/cosmos.auth.v1beta1.BaseAccount".to_owned(),
                                value: BaseAccount {
                                    address: req.address,
                                    pub_key: None,
                                    account_number: ACCOUNT_NUMBER,
                                    sequence,
                                }
                                .encode_to_vec(),
                            }),
                        }
                        .encode_to_vec()),
                        None => Err(RpcError::AbciQuery {
                            path: path.to_owned(),
                            code: 22,
                            codespace: "sdk".to_owned(),
                            log: format!("account {} not found: key not found", req.address),
                        }),
                    }
                }
                "/cosmos.tx.v1beta1.Service/Simulate" => match self.gas_used {
                    Some(gas_used) => Ok(SimulateResponse {
                        gas_info: Some(GasInfo {
                            gas_wanted: 0,
                            gas_used,
                        }),
                        ..Default::default()
                    }
                    .encode_to_vec()),
                    None => Err(RpcError::AbciQuery {
                        path: path.to_owned(),
                        code: 11,
                        codespace: "sdk".to_owned(),
                        log: "out of gas in location: WriteFlat".to_owned(),
                    }),
                },
                _ => panic!("Unexpected query {path}"),
            }
        }

        async fn broadcast_tx(
            &self,
            mode: BroadcastMode,
            tx_bytes: Vec<u8>,
        ) -> Result<TxResponse, RpcError> {
            self.calls
                .lock()
                .push(Call::Broadcast(mode, tx_bytes.clone()));
            if self.broadcast_fails {
                return Err(RpcError::InvalidResponse {
                    method: "broadcast_tx_commit",
                    message: "connection reset by peer".to_owned(),
                });
            }

            let got = auth_info(&tx_bytes).signer_infos[0].sequence;
            let txhash = rpc::tx_hash(&tx_bytes);
            let mut expected = self.next_sequence.lock();
            if got == *expected {
                *expected += 1;
                Ok(TxResponse {
                    txhash,
                    height: 100,
                    ..TxResponse::default()
                })
            } else {
                Ok(TxResponse {
                    txhash,
                    code: CODE_WRONG_SEQUENCE,
                    codespace: "sdk".to_owned(),
                    raw_log: format!(
                        "account sequence mismatch, expected {}, got {got}: incorrect account sequence",
                        *expected
                    ),
                    ..TxResponse::default()
                })
            }
        }
    }

    fn auth_info(tx_bytes: &[u8]) -> AuthInfo {
        let raw = TxRaw::decode(tx_bytes).unwrap();
        AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap()
    }

    fn make_client(node: &Arc<StubNode>, options: ClientOptions) -> Client {
        // RUST_LOG=six_sdk=debug to see the pipeline
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
        let config = ClientBuilder::from_options("http://localhost:26657", "sixnet", options)
            .build_config()
            .unwrap();
        let identity = Identity::from_secret_bytes(&[7u8; 32], config.prefixes()).unwrap();
        Client::with_transport(config, identity, node.clone())
    }

    fn metadata(creator: &Address) -> MsgCreateMetadata {
        MsgCreateMetadata {
            creator: creator.to_string(),
            nft_schema_code: "six.membership".to_owned(),
            token_id: "1".to_owned(),
            base64_nft_data: "eyJ0b2tlbl9pZCI6IjEifQ==".to_owned(),
        }
    }

    #[tokio::test]
    async fn validation_failure_makes_no_calls() {
        let node = Arc::new(StubNode::new());
        let client = make_client(&node, ClientOptions::default());
        let mut msg = metadata(client.address());
        msg.creator = "cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu".to_owned();

        match client.submit([msg]).await {
            Err(Error::Validation {
                index: 0,
                type_url,
                source: MsgError::InvalidAddress { field: "creator", .. },
            }) => assert_eq!(type_url, "/thesixnetwork.sixnft.nftmngr.MsgCreateMetadata"),
            other => panic!("Expected a validation error, got {other:?}"),
        }
        assert_eq!(node.calls(), vec![]);
    }

    #[tokio::test]
    async fn simulate_only_returns_nothing() {
        let node = Arc::new(StubNode::new());
        let client = make_client(
            &node,
            ClientOptions {
                simulate_only: true,
                ..ClientOptions::default()
            },
        );
        let res = client.submit([metadata(client.address())]).await.unwrap();
        assert!(res.is_none());
        assert_eq!(
            node.calls(),
            vec![
                Call::Query("/cosmos.auth.v1beta1.Query/Account".to_owned()),
                Call::Query("/cosmos.tx.v1beta1.Service/Simulate".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn simulate_only_with_fixed_gas_still_simulates() {
        let node = Arc::new(StubNode {
            gas_used: None,
            ..StubNode::new()
        });
        let client = make_client(
            &node,
            ClientOptions {
                simulate_only: true,
                gas: Some(200_000),
                ..ClientOptions::default()
            },
        );
        match client.submit([metadata(client.address())]).await {
            Err(Error::Simulation {
                source: RpcError::AbciQuery { code: 11, .. },
            }) => (),
            other => panic!("Expected a simulation error, got {other:?}"),
        }

        let mut tx: TxBuilder = [metadata(client.address())].into_iter().collect();
        tx.set_gas_limit(Some(200_000));
        assert!(matches!(
            client.submit_tx(&tx).await,
            Err(Error::Simulation { .. })
        ));
        assert_eq!(
            node.calls().last(),
            Some(&Call::Query("/cosmos.tx.v1beta1.Service/Simulate".to_owned()))
        );
        assert!(node.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn adjusted_gas_and_fee() {
        let node = Arc::new(StubNode::new());
        let client = make_client(&node, ClientOptions::default());
        let res = client
            .submit([metadata(client.address())])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(res.code, 0);

        let broadcasts = node.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(res.txhash, rpc::tx_hash(&broadcasts[0]));
        assert!(matches!(
            node.calls()[2],
            Call::Broadcast(BroadcastMode::WaitForCommit, _)
        ));

        // ceil(1.5 * 100_001) = 150_002, ceil(1.25 * 150_002) = 187_503
        let fee = auth_info(&broadcasts[0]).fee.unwrap();
        assert_eq!(fee.gas_limit, 150_002);
        assert_eq!(fee.amount.len(), 1);
        assert_eq!(fee.amount[0].denom, "usix");
        assert_eq!(fee.amount[0].amount, "187503");
        assert_eq!(fee.granter, "");
    }

    #[tokio::test]
    async fn signature_covers_sign_doc() {
        let node = Arc::new(StubNode::new());
        let client = make_client(&node, ClientOptions::default());
        client
            .submit([metadata(client.address())])
            .await
            .unwrap()
            .unwrap();

        let raw = TxRaw::decode(node.broadcasts()[0].as_slice()).unwrap();
        let body = TxBody::decode(raw.body_bytes.as_slice()).unwrap();
        assert_eq!(
            body.messages[0].type_url,
            "/thesixnetwork.sixnft.nftmngr.MsgCreateMetadata"
        );
        let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        let signer = &auth_info.signer_infos[0];
        assert_eq!(signer.sequence, 5);
        let public_key = signer.public_key.as_ref().unwrap();
        assert_eq!(public_key.type_url, "/cosmos.crypto.secp256k1.PubKey");
        assert_eq!(
            PubKey::decode(public_key.value.as_slice()).unwrap().key,
            client.identity().public_key_bytes()
        );

        let sign_doc = SignDoc {
            body_bytes: raw.body_bytes,
            auth_info_bytes: raw.auth_info_bytes,
            chain_id: "sixnet".to_owned(),
            account_number: ACCOUNT_NUMBER,
        };
        let digest = sha256::Hash::hash(&sign_doc.encode_to_vec());
        let msg = SecpMessage::from_slice(digest.as_ref()).unwrap();
        let signature = Signature::from_compact(&raw.signatures[0]).unwrap();
        let public_key = PublicKey::from_slice(client.identity().public_key_bytes()).unwrap();
        Secp256k1::verification_only()
            .verify_ecdsa(&msg, &signature, &public_key)
            .unwrap();
    }

    #[tokio::test]
    async fn double_submit_surfaces_sequence_mismatch() {
        let node = Arc::new(StubNode::new());
        let client = make_client(&node, ClientOptions::default());
        let msg = metadata(client.address());

        let first = client.submit([msg.clone()]).await.unwrap().unwrap();
        assert_eq!(first.code, 0);

        let second = client.submit([msg]).await.unwrap().unwrap();
        assert_eq!(second.code, CODE_WRONG_SEQUENCE);
        assert_eq!(second.expected_sequence(), Some(6));

        // One broadcast per submit, nothing retried.
        let broadcasts = node.broadcasts();
        assert_eq!(broadcasts.len(), 2);
        assert_eq!(auth_info(&broadcasts[0]).signer_infos[0].sequence, 5);
        assert_eq!(auth_info(&broadcasts[1]).signer_infos[0].sequence, 5);
    }

    #[tokio::test]
    async fn pinned_sequence_recovers() {
        let node = Arc::new(StubNode::new());
        let client = make_client(&node, ClientOptions::default());
        client
            .submit([metadata(client.address())])
            .await
            .unwrap()
            .unwrap();

        let mut tx = TxBuilder::default();
        tx.add_message(metadata(client.address()))
            .set_sequence(Some(6))
            .set_memo("second");
        let res = client.submit_tx(&tx).await.unwrap().unwrap();
        assert_eq!(res.code, 0);
    }

    #[tokio::test]
    async fn missing_account() {
        let node = Arc::new(StubNode {
            account_sequence: None,
            ..StubNode::new()
        });
        let client = make_client(&node, ClientOptions::default());
        match client.submit([metadata(client.address())]).await {
            Err(Error::AccountResolution {
                address,
                source: AccountResolutionError::NotFound { .. },
            }) => assert_eq!(address, client.connected_address()),
            other => panic!("Expected an account resolution error, got {other:?}"),
        }
        assert_eq!(node.calls().len(), 1);
    }

    #[tokio::test]
    async fn simulation_failure() {
        let node = Arc::new(StubNode {
            gas_used: None,
            ..StubNode::new()
        });
        let client = make_client(&node, ClientOptions::default());
        let res = client.submit([metadata(client.address())]).await;
        assert!(matches!(
            res,
            Err(Error::Simulation {
                source: RpcError::AbciQuery { code: 11, .. }
            })
        ));
        assert!(node.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn broadcast_failure() {
        let node = Arc::new(StubNode {
            broadcast_fails: true,
            ..StubNode::new()
        });
        let client = make_client(&node, ClientOptions::default());
        match client.submit([metadata(client.address())]).await {
            Err(Error::Broadcast { txhash, .. }) => {
                assert_eq!(txhash, rpc::tx_hash(&node.broadcasts()[0]))
            }
            other => panic!("Expected a broadcast error, got {other:?}"),
        }
        assert_eq!(node.broadcasts().len(), 1);
    }

    #[tokio::test]
    async fn fixed_gas_and_preset_account_skip_queries() {
        let node = Arc::new(StubNode::new());
        let client = make_client(
            &node,
            ClientOptions {
                broadcast_mode: Some(BroadcastMode::WaitForSync),
                ..ClientOptions::default()
            },
        );
        let mut tx = TxBuilder::default();
        tx.add_message(metadata(client.address()))
            .set_account_number(Some(ACCOUNT_NUMBER))
            .set_sequence(Some(5))
            .set_gas_limit(Some(200_000));
        client.submit_tx(&tx).await.unwrap().unwrap();

        let calls = node.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Call::Broadcast(mode, bytes) => {
                assert_eq!(*mode, BroadcastMode::WaitForSync);
                let fee = auth_info(bytes).fee.unwrap();
                assert_eq!(fee.gas_limit, 200_000);
                assert_eq!(fee.amount[0].amount, "250000");
            }
            other => panic!("Unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn fee_granter_is_attached() {
        let node = Arc::new(StubNode::new());
        let granter = crate::address::Bech32Prefixes::six()
            .account_address([0xab; 20])
            .to_string();
        let client = make_client(
            &node,
            ClientOptions {
                fee_granter: Some(granter.clone()),
                ..ClientOptions::default()
            },
        );
        client
            .submit([metadata(client.address())])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(auth_info(&node.broadcasts()[0]).fee.unwrap().granter, granter);
    }

    #[tokio::test]
    async fn standalone_simulation() {
        let node = Arc::new(StubNode::new());
        let client = make_client(&node, ClientOptions::default());
        let tx: TxBuilder = [metadata(client.address())].into_iter().collect();
        let gas = client.simulate(&tx).await.unwrap();
        assert_eq!(
            gas,
            SimulatedGas {
                gas_used: 100_001,
                gas_limit: 150_002
            }
        );
        assert!(node.broadcasts().is_empty());
    }
}
