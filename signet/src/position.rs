//! Decoding of NFT position manager `positions(uint256)` return data.
//!
//! The position manager packs twelve fields into its return value. Only a
//! few of them matter to us, the ordered permit nonce lives in the first
//! word and the tick range exercises the signed `int24` decoder, but the
//! whole struct is surfaced since callers display most of it.

use crate::client::{CallTransport, EthRpc};
use crate::jsonrpc::error::SignetError;
use crate::types::CallRequest;
use lucid::abi::{decode_address, decode_int24, decode_uint, encode_call};
use lucid::{Address, Uint256};

/// One liquidity position as returned by `positions(uint256)` on the
/// NFT position manager contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInfo {
    /// Ordered permit nonce, a uint96 on chain but zero padded to a full
    /// word by the ABI encoder
    pub nonce: Uint256,
    pub operator: Address,
    pub token0: Address,
    pub token1: Address,
    /// Pool fee in hundredths of a bip
    pub fee: Uint256,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: Uint256,
    pub fee_growth_inside0_last: Uint256,
    pub fee_growth_inside1_last: Uint256,
    pub tokens_owed0: Uint256,
    pub tokens_owed1: Uint256,
}

/// Decodes the twelve word `positions(uint256)` return struct.
pub fn decode_position_info(data: &[u8]) -> Result<PositionInfo, SignetError> {
    if data.len() < 12 * 32 {
        return Err(SignetError::ContractCallError(
            "Position not found".to_string(),
        ));
    }
    let word = |i: usize| &data[32 * i..32 * (i + 1)];
    Ok(PositionInfo {
        nonce: decode_uint(word(0)),
        operator: decode_address(word(1))?,
        token0: decode_address(word(2))?,
        token1: decode_address(word(3))?,
        fee: decode_uint(word(4)),
        tick_lower: decode_int24(word(5))?,
        tick_upper: decode_int24(word(6))?,
        liquidity: decode_uint(word(7)),
        fee_growth_inside0_last: decode_uint(word(8)),
        fee_growth_inside1_last: decode_uint(word(9)),
        tokens_owed0: decode_uint(word(10)),
        tokens_owed1: decode_uint(word(11)),
    })
}

impl EthRpc {
    /// Fetches and decodes the position behind `token_id` on the given
    /// NFT position manager contract.
    pub async fn get_position(
        &self,
        nft_manager: Address,
        token_id: Uint256,
    ) -> Result<PositionInfo, SignetError> {
        let payload = encode_call("positions(uint256)", &[token_id.into()])?;
        let data = self.call(CallRequest::quick_call(nft_manager, payload)).await?;
        decode_position_info(&data)
    }
}

#[test]
fn decode_full_position() {
    use lucid::utils::hex_str_to_bytes;
    let data = hex_str_to_bytes(concat!(
        // nonce
        "0000000000000000000000000000000000000000000000000000000000000005",
        // operator
        "0000000000000000000000000000000000000000000000000000000000000000",
        // token0 (wbtc)
        "0000000000000000000000002260fac5e5542a773aa44fbcfedf7c193bc2c599",
        // token1 (weth)
        "000000000000000000000000c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
        // fee, 0.3%
        "0000000000000000000000000000000000000000000000000000000000000bb8",
        // tickLower, -60
        "0000000000000000000000000000000000000000000000000000000000ffffc4",
        // tickUpper
        "00000000000000000000000000000000000000000000000000000000000000c8",
        // liquidity
        "00000000000000000000000000000000000000000000000000000001dcd65000",
        // feeGrowthInside0LastX128
        "0000000000000000000000000000000000000000000000000000000000000000",
        // feeGrowthInside1LastX128
        "0000000000000000000000000000000000000000000000000000000000000000",
        // tokensOwed0
        "0000000000000000000000000000000000000000000000000000000000000000",
        // tokensOwed1
        "0000000000000000000000000000000000000000000000000000000000000001",
    ))
    .unwrap();
    let info = decode_position_info(&data).unwrap();
    assert_eq!(info.nonce, 5u8.into());
    assert_eq!(
        info.token0,
        "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599".parse().unwrap()
    );
    assert_eq!(info.fee, 3000u32.into());
    assert_eq!(info.tick_lower, -60);
    assert_eq!(info.tick_upper, 200);
    assert_eq!(info.liquidity, 8_000_000_000u64.into());
    assert_eq!(info.tokens_owed1, 1u8.into());
}

#[test]
fn short_data_is_position_not_found() {
    let e = decode_position_info(&[]).unwrap_err();
    match e {
        SignetError::ContractCallError(msg) => assert_eq!(msg, "Position not found"),
        _ => panic!(),
    }
}
