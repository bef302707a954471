use std::sync::Arc;

use cosmos_sdk_proto::cosmos::{
    auth::v1beta1::{BaseAccount, ModuleAccount, QueryAccountRequest, QueryAccountResponse},
    bank::v1beta1::{QueryAllBalancesRequest, QueryAllBalancesResponse},
    base::{query::v1beta1::PageRequest, v1beta1::Coin},
    tx::v1beta1::{GetTxRequest, GetTxResponse, SimulateRequest, SimulateResponse},
    vesting::v1beta1::{
        BaseVestingAccount, ContinuousVestingAccount, DelayedVestingAccount,
        PeriodicVestingAccount, PermanentLockedAccount,
    },
};
use prost::Message;

use super::rpc::RpcTransport;
use crate::{
    error::{AccountResolutionError, RpcError},
    Address, Error, Result,
};

/// A protobuf request served through an ABCI query.
pub trait AbciQuery: Message {
    /// gRPC method path, e.g. `/cosmos.auth.v1beta1.Query/Account`.
    const PATH: &'static str;
    type Response: Message + Default;
}

impl AbciQuery for QueryAccountRequest {
    const PATH: &'static str = "/cosmos.auth.v1beta1.Query/Account";
    type Response = QueryAccountResponse;
}

impl AbciQuery for QueryAllBalancesRequest {
    const PATH: &'static str = "/cosmos.bank.v1beta1.Query/AllBalances";
    type Response = QueryAllBalancesResponse;
}

impl AbciQuery for GetTxRequest {
    const PATH: &'static str = "/cosmos.tx.v1beta1.Service/GetTx";
    type Response = GetTxResponse;
}

impl AbciQuery for SimulateRequest {
    const PATH: &'static str = "/cosmos.tx.v1beta1.Service/Simulate";
    type Response = SimulateResponse;
}

/// Read-only access to chain state.
///
/// Cheap to create and clone, it only shares the client's transport. Every
/// call goes straight to the node, nothing is cached.
#[derive(Clone)]
pub struct QueryClient {
    transport: Arc<dyn RpcTransport>,
}

impl QueryClient {
    pub(crate) fn new(transport: Arc<dyn RpcTransport>) -> Self {
        QueryClient { transport }
    }

    /// Perform any typed query.
    pub async fn query<Req: AbciQuery>(&self, req: Req) -> Result<Req::Response> {
        self.perform(req).await.map_err(|source| Error::Query {
            path: Req::PATH.to_owned(),
            source,
        })
    }

    pub(crate) async fn perform<Req: AbciQuery>(
        &self,
        req: Req,
    ) -> Result<Req::Response, RpcError> {
        let value = self
            .transport
            .abci_query(Req::PATH, req.encode_to_vec())
            .await?;
        Req::Response::decode(value.as_slice()).map_err(|source| RpcError::Decode {
            path: Req::PATH.to_owned(),
            source,
        })
    }

    /// Account number and sequence of an address.
    pub async fn account(&self, address: &Address) -> Result<BaseAccount> {
        self.base_account(address)
            .await
            .map_err(|source| Error::AccountResolution {
                address: address.to_string(),
                source,
            })
    }

    pub(crate) async fn base_account(
        &self,
        address: &Address,
    ) -> Result<BaseAccount, AccountResolutionError> {
        let res = self
            .perform(QueryAccountRequest {
                address: address.to_string(),
            })
            .await
            .map_err(|e| match e {
                RpcError::AbciQuery { log, .. } if log.contains("not found") => {
                    AccountResolutionError::NotFound { log }
                }
                e => AccountResolutionError::Query(e),
            })?;
        decode_base_account(res.account.ok_or(AccountResolutionError::MissingAccount)?)
    }

    pub async fn all_balances(&self, address: &Address) -> Result<Vec<Coin>> {
        let mut coins = Vec::new();
        let mut pagination = None;
        loop {
            let mut res = self
                .query(QueryAllBalancesRequest {
                    address: address.to_string(),
                    pagination: pagination.take(),
                })
                .await?;
            coins.append(&mut res.balances);
            match res.pagination {
                Some(x) if !x.next_key.is_empty() => {
                    pagination = Some(PageRequest {
                        key: x.next_key,
                        offset: 0,
                        limit: 0,
                        count_total: false,
                        reverse: false,
                    })
                }
                _ => break Ok(coins),
            }
        }
    }

    /// Look up a transaction by hash. Fails if the node does not know it (yet).
    pub async fn get_transaction(&self, txhash: impl Into<String>) -> Result<GetTxResponse> {
        self.query(GetTxRequest {
            hash: txhash.into(),
        })
        .await
    }
}

/// Extract the [BaseAccount] from the account types the auth module may return.
fn decode_base_account(
    account: prost_types::Any,
) -> Result<BaseAccount, AccountResolutionError> {
    fn decode<T: Message + Default>(
        account: &prost_types::Any,
    ) -> Result<T, AccountResolutionError> {
        T::decode(account.value.as_slice()).map_err(|source| AccountResolutionError::Decode {
            type_url: account.type_url.clone(),
            source,
        })
    }
    fn from_vesting(
        base: Option<BaseVestingAccount>,
    ) -> Result<BaseAccount, AccountResolutionError> {
        base.and_then(|base| base.base_account)
            .ok_or(AccountResolutionError::MissingAccount)
    }

    match account.type_url.as_str() {
        "/cosmos.auth.v1beta1.BaseAccount" => decode(&account),
        "/cosmos.auth.v1beta1.ModuleAccount" => decode::<ModuleAccount>(&account)?
            .base_account
            .ok_or(AccountResolutionError::MissingAccount),
        "/cosmos.vesting.v1beta1.ContinuousVestingAccount" => {
            from_vesting(decode::<ContinuousVestingAccount>(&account)?.base_vesting_account)
        }
        "/cosmos.vesting.v1beta1.DelayedVestingAccount" => {
            from_vesting(decode::<DelayedVestingAccount>(&account)?.base_vesting_account)
        }
        "/cosmos.vesting.v1beta1.PeriodicVestingAccount" => {
            from_vesting(decode::<PeriodicVestingAccount>(&account)?.base_vesting_account)
        }
        "/cosmos.vesting.v1beta1.PermanentLockedAccount" => {
            from_vesting(decode::<PermanentLockedAccount>(&account)?.base_vesting_account)
        }
        _ => Err(AccountResolutionError::UnsupportedAccountType {
            type_url: account.type_url,
        }),
    }
}
