//! Byte-order safe and lightweight eth_call client.
//!
//! Instead of binding a heavyweight web3 implementation we craft our own
//! JSONRPC requests, every contract read in this crate bottoms out in a
//! single `eth_call` with `[{to, data}, "latest"]` parameters.

use crate::jsonrpc::error::SignetError;
use crate::types::CallRequest;
use futures::future::LocalBoxFuture;

pub mod core;
pub mod query;

// The actual client is defined in core.rs, export here
pub use core::EthRpc;

/// The one seam between this crate and the network.
///
/// Anything that can execute a read call against a contract qualifies,
/// [`EthRpc`] does it over HTTP and the permit tests do it from canned
/// byte vectors.
pub trait CallTransport {
    /// Executes the read call and returns the raw ABI encoded return data.
    fn call(&self, request: CallRequest) -> LocalBoxFuture<'_, Result<Vec<u8>, SignetError>>;
}

impl CallTransport for EthRpc {
    fn call(&self, request: CallRequest) -> LocalBoxFuture<'_, Result<Vec<u8>, SignetError>> {
        Box::pin(async move { Ok(self.eth_call(request).await?.0) })
    }
}

#[ignore]
#[test]
fn test_chain_id() {
    use actix::System;
    use lucid::Uint256;
    use std::time::Duration;
    let runner = System::new();
    let rpc = EthRpc::new("https://eth.althea.net", Duration::from_secs(30));
    runner.block_on(async move {
        assert_eq!(Uint256::from(1u8), rpc.eth_chainid().await.unwrap());
    })
}

#[ignore]
#[test]
fn test_live_name_call() {
    use actix::System;
    use lucid::abi::{decode_string, encode_call};
    use std::time::Duration;
    let runner = System::new();
    let rpc = EthRpc::new("https://eth.althea.net", Duration::from_secs(30));
    // DAI
    let dai = "0x6b175474e89094c44da98b954eedeac495271d0f".parse().unwrap();
    runner.block_on(async move {
        let payload = encode_call("name()", &[]).unwrap();
        let result = rpc
            .eth_call(CallRequest::quick_call(dai, payload))
            .await
            .unwrap();
        assert_eq!(decode_string(&result).unwrap(), "Dai Stablecoin");
    })
}
