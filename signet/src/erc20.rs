//! This module contains utility functions for reading ERC20 token state
use crate::client::EthRpc;
use crate::jsonrpc::error::SignetError;
use crate::multicall::{decode_multicall_output, encode_multicall_input, Call};
use crate::types::CallRequest;
use lucid::abi::{decode_string, decode_uint, encode_call};
use lucid::{Address, Uint256};
use num_traits::Bounded;

impl EthRpc {
    /// Queries the `target_address`'s current balance of `erc20`
    pub async fn get_erc20_balance(
        &self,
        erc20: Address,
        target_address: Address,
    ) -> Result<Uint256, SignetError> {
        let payload = encode_call("balanceOf(address)", &[target_address.into()])?;
        let balance = self
            .eth_call(CallRequest::quick_call(erc20, payload))
            .await?;

        match balance.get(0..32) {
            Some(val) => Ok(decode_uint(val)),
            None => Err(SignetError::ContractCallError(
                "Bad response from ERC20 balance".to_string(),
            )),
        }
    }

    /// Queries the balances of `target_address` across many `erc20s` with a
    /// single request batched through the `multicall` contract.
    ///
    /// Failed individual reads come back as zero, in input order.
    pub async fn get_erc20_balances(
        &self,
        multicall: Address,
        erc20s: &[Address],
        target_address: Address,
    ) -> Result<Vec<Uint256>, SignetError> {
        let balance_of = encode_call("balanceOf(address)", &[target_address.into()])?;
        let calls: Vec<Call> = erc20s
            .iter()
            .map(|erc20| Call::new(*erc20, balance_of.clone()))
            .collect();
        let payload = encode_multicall_input(false, &calls)?;
        let result = self
            .eth_call(CallRequest::quick_call(multicall, payload))
            .await?;
        Ok(decode_multicall_output(Some(&result)))
    }

    /// Checks if any given contract is approved to spend money from any given erc20 contract
    /// using any given address. What exactly this does can be hard to grok, essentially when
    /// you want contract A to be able to spend your erc20 contract funds you need to call 'approve'
    /// on the ERC20 contract with your own address and A's address so that in the future when you call
    /// contract A it can manipulate your ERC20 balances. This function checks if that has already been done.
    pub async fn check_erc20_approved(
        &self,
        erc20: Address,
        own_address: Address,
        target_contract: Address,
    ) -> Result<bool, SignetError> {
        let payload = encode_call(
            "allowance(address,address)",
            &[own_address.into(), target_contract.into()],
        )?;
        let allowance = self
            .eth_call(CallRequest::quick_call(erc20, payload))
            .await?;

        let allowance = match allowance.get(0..32) {
            Some(val) => decode_uint(val),
            None => {
                return Err(SignetError::ContractCallError(
                    "erc20 allowance(address, address) failed".to_string(),
                ))
            }
        };

        // Check if the allowance remaining is greater than half of a Uint256- it's as good
        // a test as any.
        Ok(allowance > (Uint256::max_value() / 2u32.into()))
    }

    pub async fn get_erc20_name(&self, erc20: Address) -> Result<String, SignetError> {
        let payload = encode_call("name()", &[])?;
        let name = self.eth_call(CallRequest::quick_call(erc20, payload)).await?;

        decode_string(&name)
            .map_err(|_| SignetError::ContractCallError("name is not a valid string".to_string()))
    }

    pub async fn get_erc20_symbol(&self, erc20: Address) -> Result<String, SignetError> {
        let payload = encode_call("symbol()", &[])?;
        let symbol = self.eth_call(CallRequest::quick_call(erc20, payload)).await?;

        decode_string(&symbol)
            .map_err(|_| SignetError::ContractCallError("symbol is not a valid string".to_string()))
    }

    pub async fn get_erc20_decimals(&self, erc20: Address) -> Result<Uint256, SignetError> {
        let payload = encode_call("decimals()", &[])?;
        let decimals = self
            .eth_call(CallRequest::quick_call(erc20, payload))
            .await?;

        match decimals.get(0..32) {
            Some(val) => Ok(decode_uint(val)),
            None => Err(SignetError::ContractCallError(
                "Bad response from ERC20 decimals".to_string(),
            )),
        }
    }

    pub async fn get_erc20_supply(&self, erc20: Address) -> Result<Uint256, SignetError> {
        let payload = encode_call("totalSupply()", &[])?;
        let supply = self
            .eth_call(CallRequest::quick_call(erc20, payload))
            .await?;

        match supply.get(0..32) {
            Some(val) => Ok(decode_uint(val)),
            None => Err(SignetError::ContractCallError(
                "Bad response from ERC20 Total Supply".to_string(),
            )),
        }
    }
}

#[ignore]
#[test]
fn test_erc20_metadata() {
    use actix::System;
    use std::time::Duration;
    let runner = System::new();
    let rpc = EthRpc::new("https://eth.althea.net", Duration::from_secs(30));
    let dai_address = "0x6b175474e89094c44da98b954eedeac495271d0f"
        .parse()
        .unwrap();
    runner.block_on(async move {
        assert_eq!(
            rpc.get_erc20_decimals(dai_address).await.unwrap(),
            18u8.into()
        );
        assert_eq!(rpc.get_erc20_symbol(dai_address).await.unwrap(), "DAI");
        assert_eq!(
            rpc.get_erc20_name(dai_address).await.unwrap(),
            "Dai Stablecoin"
        );
        let num: Uint256 = 1000u32.into();
        assert!(rpc.get_erc20_supply(dai_address).await.unwrap() > num);
    })
}
