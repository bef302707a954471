//! Messages and queries of the SIX chain's NFT manager module (`thesixnetwork.sixnft.nftmngr`).
//!
//! Only the most used queries are typed here, and the records they return are
//! left encoded for the caller to decode. Any other RPC of the module's query
//! service can be reached by implementing [AbciQuery] for its request type and
//! calling [QueryClient::query]:
//!
//! ```ignore
//! impl AbciQuery for QueryAllNftSchemaRequest {
//!     const PATH: &'static str = "/thesixnetwork.sixnft.nftmngr.Query/NFTSchemaAll";
//!     type Response = QueryAllNftSchemaResponse;
//! }
//!
//! let schemas = client.query_client().query(QueryAllNftSchemaRequest::default()).await?;
//! ```

use prost::Message;

use crate::{
    address::Bech32Prefixes,
    client::query::{AbciQuery, QueryClient},
    error::MsgError,
    messages::{account_address, base64_payload, non_empty},
    txbuilder::Msg,
    Result,
};

/// Create a new NFT schema from a base64 encoded JSON schema definition.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCreateNftSchema {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub nft_schema_base64: String,
}

impl Msg for MsgCreateNftSchema {
    const TYPE_URL: &'static str = "/thesixnetwork.sixnft.nftmngr.MsgCreateNFTSchema";

    fn validate_basic(&self, prefixes: &Bech32Prefixes) -> Result<(), MsgError> {
        account_address("creator", &self.creator, prefixes)?;
        base64_payload("nft_schema_base64", &self.nft_schema_base64)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "{} creates an NFT schema ({} base64 bytes)",
            self.creator,
            self.nft_schema_base64.len()
        )
    }
}

/// Mint metadata for one token of an existing schema.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgCreateMetadata {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub nft_schema_code: String,
    #[prost(string, tag = "3")]
    pub token_id: String,
    #[prost(string, tag = "4")]
    pub base64_nft_data: String,
}

impl Msg for MsgCreateMetadata {
    const TYPE_URL: &'static str = "/thesixnetwork.sixnft.nftmngr.MsgCreateMetadata";

    fn validate_basic(&self, prefixes: &Bech32Prefixes) -> Result<(), MsgError> {
        account_address("creator", &self.creator, prefixes)?;
        non_empty("nft_schema_code", &self.nft_schema_code)?;
        non_empty("token_id", &self.token_id)?;
        base64_payload("base64_nft_data", &self.base64_nft_data)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "{} creates metadata for {} token {}",
            self.creator, self.nft_schema_code, self.token_id
        )
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionParameter {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

/// Run a schema action on a token as the schema's admin.
///
/// `ref_id` must be unique per schema, the chain rejects a reused one.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgPerformActionByAdmin {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub nft_schema_code: String,
    #[prost(string, tag = "3")]
    pub token_id: String,
    #[prost(string, tag = "4")]
    pub action: String,
    #[prost(string, tag = "5")]
    pub ref_id: String,
    #[prost(message, repeated, tag = "6")]
    pub parameters: Vec<ActionParameter>,
}

impl Msg for MsgPerformActionByAdmin {
    const TYPE_URL: &'static str = "/thesixnetwork.sixnft.nftmngr.MsgPerformActionByAdmin";

    fn validate_basic(&self, prefixes: &Bech32Prefixes) -> Result<(), MsgError> {
        account_address("creator", &self.creator, prefixes)?;
        non_empty("nft_schema_code", &self.nft_schema_code)?;
        non_empty("token_id", &self.token_id)?;
        non_empty("action", &self.action)?;
        non_empty("ref_id", &self.ref_id)?;
        self.parameters
            .iter()
            .try_for_each(|param| non_empty("parameters.name", &param.name))
    }

    fn describe(&self) -> String {
        format!(
            "{} performs {} on {} token {} (ref {})",
            self.creator, self.action, self.nft_schema_code, self.token_id, self.ref_id
        )
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryParamsRequest {}

/// Module parameters, left encoded. Decode with [QueryParamsResponse::decode_params].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryParamsResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub params: Vec<u8>,
}

impl QueryParamsResponse {
    pub fn decode_params<T: Message + Default>(&self) -> Result<T, prost::DecodeError> {
        T::decode(self.params.as_slice())
    }
}

impl AbciQuery for QueryParamsRequest {
    const PATH: &'static str = "/thesixnetwork.sixnft.nftmngr.Query/Params";
    type Response = QueryParamsResponse;
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryGetNftSchemaRequest {
    #[prost(string, tag = "1")]
    pub code: String,
}

/// The schema record, left encoded. Empty if the chain returned none.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryGetNftSchemaResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub nft_schema: Vec<u8>,
}

impl QueryGetNftSchemaResponse {
    pub fn decode_nft_schema<T: Message + Default>(&self) -> Result<T, prost::DecodeError> {
        T::decode(self.nft_schema.as_slice())
    }
}

impl AbciQuery for QueryGetNftSchemaRequest {
    const PATH: &'static str = "/thesixnetwork.sixnft.nftmngr.Query/NFTSchema";
    type Response = QueryGetNftSchemaResponse;
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryGetNftDataRequest {
    #[prost(string, tag = "1")]
    pub nft_schema_code: String,
    #[prost(string, tag = "2")]
    pub token_id: String,
    /// Also return the schema's global attributes.
    #[prost(bool, tag = "3")]
    pub with_global: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryGetNftDataResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub nft_data: Vec<u8>,
}

impl QueryGetNftDataResponse {
    pub fn decode_nft_data<T: Message + Default>(&self) -> Result<T, prost::DecodeError> {
        T::decode(self.nft_data.as_slice())
    }
}

impl AbciQuery for QueryGetNftDataRequest {
    const PATH: &'static str = "/thesixnetwork.sixnft.nftmngr.Query/NftData";
    type Response = QueryGetNftDataResponse;
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryGetActionByRefIdRequest {
    #[prost(string, tag = "1")]
    pub nft_schema_code: String,
    #[prost(string, tag = "2")]
    pub ref_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryGetActionByRefIdResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub action_by_ref_id: Vec<u8>,
}

impl QueryGetActionByRefIdResponse {
    pub fn decode_action<T: Message + Default>(&self) -> Result<T, prost::DecodeError> {
        T::decode(self.action_by_ref_id.as_slice())
    }
}

impl AbciQuery for QueryGetActionByRefIdRequest {
    const PATH: &'static str = "/thesixnetwork.sixnft.nftmngr.Query/ActionByRefId";
    type Response = QueryGetActionByRefIdResponse;
}

impl QueryClient {
    pub async fn nftmngr_params(&self) -> Result<QueryParamsResponse> {
        self.query(QueryParamsRequest {}).await
    }

    pub async fn nft_schema(&self, code: impl Into<String>) -> Result<QueryGetNftSchemaResponse> {
        self.query(QueryGetNftSchemaRequest { code: code.into() }).await
    }

    pub async fn nft_data(
        &self,
        nft_schema_code: impl Into<String>,
        token_id: impl Into<String>,
    ) -> Result<QueryGetNftDataResponse> {
        self.query(QueryGetNftDataRequest {
            nft_schema_code: nft_schema_code.into(),
            token_id: token_id.into(),
            with_global: false,
        })
        .await
    }

    pub async fn action_by_ref_id(
        &self,
        nft_schema_code: impl Into<String>,
        ref_id: impl Into<String>,
    ) -> Result<QueryGetActionByRefIdResponse> {
        self.query(QueryGetActionByRefIdRequest {
            nft_schema_code: nft_schema_code.into(),
            ref_id: ref_id.into(),
        })
        .await
    }
}
