use crate::jsonrpc::error::SignetError;
use crate::types::{CallRequest, Data};
use lucid::Uint256;

use super::core::EthRpc;

// The query-only part of the "eth" namespace of the JSONRPC API

impl EthRpc {
    /// Executes a read call against the latest block and returns the raw
    /// return data, the only JSONRPC method the rest of this crate uses.
    pub async fn eth_call(&self, call: CallRequest) -> Result<Data, SignetError> {
        self.jsonrpc_client
            .request_method("eth_call", (call, "latest"), self.timeout)
            .await
    }

    /// Returns the EIP155 chain ID used for transaction signing at the
    /// current best block, useful to sanity check the EIP-712 domain a
    /// caller is about to sign against.
    pub async fn eth_chainid(&self) -> Result<Uint256, SignetError> {
        self.jsonrpc_client
            .request_method("eth_chainId", Vec::<String>::new(), self.timeout)
            .await
    }
}
