//! Hand-rolled codec for the Multicall2 `tryBlockAndAggregate` entry point.
//!
//! Batching read calls through a multicall contract turns n RPC round trips
//! into one. The input is a dynamic array of dynamic `(address, bytes)`
//! tuples and the output is a dynamic array of dynamic `(bool, bytes)`
//! tuples, so both directions deal in nested offset pointers. Every offset
//! in here is a byte count inside a region whose own position is given by
//! another offset, one wrong word and the call reverts, which is why the
//! layout is spelled out step by step below.

use lucid::abi::{decode_uint, derive_method_id, encode_dynamic_bytes, encode_uint};
use lucid::utils::zpad;
use lucid::{Address, Error, Uint256};
use num_traits::ToPrimitive;

pub const TRY_BLOCK_AND_AGGREGATE_SIG: &str = "tryBlockAndAggregate(bool,(address,bytes)[])";

/// One entry of a multicall batch, a target contract and the complete
/// calldata to run against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub target: Address,
    pub call_data: Vec<u8>,
}

impl Call {
    pub fn new(target: Address, call_data: Vec<u8>) -> Call {
        Call { target, call_data }
    }

    /// The ABI encoding of one `(address, bytes)` tuple: the address word,
    /// a fixed 0x40 offset word pointing at the bytes block inside the
    /// tuple, then the bytes block itself.
    fn encode(&self) -> Vec<u8> {
        let mut tuple = Vec::new();
        tuple.extend(zpad(self.target.as_bytes(), 32));
        tuple.extend(zpad(&[0x40], 32));
        tuple.extend(encode_dynamic_bytes(&self.call_data));
        tuple
    }
}

/// Builds the calldata for `tryBlockAndAggregate(bool requireSuccess,
/// (address target, bytes callData)[] calls)`.
///
/// Layout after the selector:
/// word 0: requireSuccess
/// word 1: offset of the calls array, always 0x40 with two head words
/// word 2: array length
/// then one offset word per element, relative to the start of this offset
/// region, followed by the concatenated tuple encodings. Because every
/// tuple is itself dynamic the offsets accumulate the byte length of all
/// prior tuples.
///
/// An empty batch still encodes validly, a zero length word and nothing
/// after it.
pub fn encode_multicall_input(require_success: bool, calls: &[Call]) -> Result<Vec<u8>, Error> {
    let mut payload = Vec::new();
    payload.extend(derive_method_id(TRY_BLOCK_AND_AGGREGATE_SIG));
    payload.extend(encode_uint(Uint256::from(require_success as u8), 256)?);
    payload.extend(encode_uint(0x40u8.into(), 256)?);
    payload.extend(encode_uint(Uint256::from(calls.len() as u64), 256)?);

    let mut offset = 32 * calls.len();
    let mut tuples: Vec<u8> = Vec::new();
    for call in calls {
        payload.extend(zpad(&offset.to_be_bytes(), 32));
        let tuple = call.encode();
        offset += tuple.len();
        tuples.extend(tuple);
    }
    payload.extend(tuples);
    Ok(payload)
}

// `tryBlockAndAggregate` returns (uint256 blockNumber, bytes32 blockHash,
// (bool success, bytes returnData)[] returnData), 128 bytes of fixed header
// before the per element offset words start.
const RESULT_ARRAY_BASE: usize = 128;

fn word_as_usize(data: &[u8], pos: usize) -> Option<usize> {
    decode_uint(data.get(pos..pos + 32)?).to_usize()
}

/// Decodes one `(bool success, bytes returnData)` element at `pos`,
/// collapsing it to a uint, zero when the inner call failed.
fn decode_result_at(data: &[u8], pos: usize) -> Option<Uint256> {
    let success_word = data.get(pos..pos + 32)?;
    // only the last byte of the success word carries information
    if success_word[31] != 1 {
        return Some(0u8.into());
    }
    // skip the inner dynamic bytes offset word, it is always 0x40 in a
    // two word tuple
    let len = word_as_usize(data, pos + 64)?;
    let return_data = data.get(pos + 96..pos + 96 + len)?;
    Some(decode_uint(return_data))
}

/// Decodes the `tryBlockAndAggregate` return data into one uint per batched
/// call, in input order, with failed calls collapsed to zero.
///
/// Callers that batch anything other than uint shaped reads must not route
/// through this helper. A missing or empty `result` decodes to an empty
/// vector, a result shorter than any of its own offsets claim is a caller
/// error and the affected elements decode to zero.
pub fn decode_multicall_output(result: Option<&[u8]>) -> Vec<Uint256> {
    let data = match result {
        Some(data) if !data.is_empty() => data,
        _ => return Vec::new(),
    };
    // header: blockNumber word, blockHash word, array offset word, length
    let count = match word_as_usize(data, 96) {
        Some(count) => count,
        None => return Vec::new(),
    };
    let mut values = Vec::with_capacity(count);
    for i in 0..count {
        let value = word_as_usize(data, RESULT_ARRAY_BASE + 32 * i)
            .and_then(|offset| decode_result_at(data, RESULT_ARRAY_BASE + offset));
        values.push(value.unwrap_or_else(|| 0u8.into()));
    }
    values
}

#[cfg(test)]
fn hex(s: &str) -> Vec<u8> {
    lucid::utils::hex_str_to_bytes(s).unwrap()
}

#[test]
fn selector_matches_multicall2() {
    use lucid::utils::bytes_to_hex_str;
    assert_eq!(
        bytes_to_hex_str(&derive_method_id(TRY_BLOCK_AND_AGGREGATE_SIG)),
        "399542e9"
    );
}

#[test]
fn encode_two_calls() {
    use lucid::abi::encode_call;
    use lucid::utils::bytes_to_hex_str;

    let token_a: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
    let token_b: Address = "0x3333333333333333333333333333333333333333".parse().unwrap();
    let holder_a: Address = "0x2222222222222222222222222222222222222222".parse().unwrap();
    let holder_b: Address = "0x4444444444444444444444444444444444444444".parse().unwrap();

    let calls = vec![
        Call::new(
            token_a,
            encode_call("balanceOf(address)", &[holder_a.into()]).unwrap(),
        ),
        Call::new(
            token_b,
            encode_call("balanceOf(address)", &[holder_b.into()]).unwrap(),
        ),
    ];
    let encoded = encode_multicall_input(true, &calls).unwrap();
    assert_eq!(
        bytes_to_hex_str(&encoded),
        concat!(
            "399542e9",
            // requireSuccess
            "0000000000000000000000000000000000000000000000000000000000000001",
            // offset of the calls array
            "0000000000000000000000000000000000000000000000000000000000000040",
            // two elements
            "0000000000000000000000000000000000000000000000000000000000000002",
            // element offsets: 2 offset words, then 160 bytes of first tuple
            "0000000000000000000000000000000000000000000000000000000000000040",
            "00000000000000000000000000000000000000000000000000000000000000e0",
            // tuple 0: target, inner offset, calldata length, calldata
            "0000000000000000000000001111111111111111111111111111111111111111",
            "0000000000000000000000000000000000000000000000000000000000000040",
            "0000000000000000000000000000000000000000000000000000000000000024",
            "70a0823100000000000000000000000022222222222222222222222222222222",
            "2222222200000000000000000000000000000000000000000000000000000000",
            // tuple 1
            "0000000000000000000000003333333333333333333333333333333333333333",
            "0000000000000000000000000000000000000000000000000000000000000040",
            "0000000000000000000000000000000000000000000000000000000000000024",
            "70a0823100000000000000000000000044444444444444444444444444444444",
            "4444444400000000000000000000000000000000000000000000000000000000",
        )
    );
}

#[test]
fn encode_empty_batch() {
    use lucid::utils::bytes_to_hex_str;
    let encoded = encode_multicall_input(false, &[]).unwrap();
    assert_eq!(
        bytes_to_hex_str(&encoded),
        concat!(
            "399542e9",
            "0000000000000000000000000000000000000000000000000000000000000000",
            "0000000000000000000000000000000000000000000000000000000000000040",
            "0000000000000000000000000000000000000000000000000000000000000000",
        )
    );
}

#[test]
fn decode_mixed_results() {
    // hand built tryBlockAndAggregate response: block 0x112233, two
    // elements, the first returned 42 and the second reverted
    let response = hex(concat!(
        // blockNumber
        "0000000000000000000000000000000000000000000000000000000000112233",
        // blockHash
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        // offset of the result array
        "0000000000000000000000000000000000000000000000000000000000000040",
        // two elements
        "0000000000000000000000000000000000000000000000000000000000000002",
        // element offsets relative to the start of this region
        "0000000000000000000000000000000000000000000000000000000000000040",
        "00000000000000000000000000000000000000000000000000000000000000c0",
        // element 0: success, inner offset, inner length, one value word
        "0000000000000000000000000000000000000000000000000000000000000001",
        "0000000000000000000000000000000000000000000000000000000000000040",
        "0000000000000000000000000000000000000000000000000000000000000020",
        "000000000000000000000000000000000000000000000000000000000000002a",
        // element 1: failed, empty return data
        "0000000000000000000000000000000000000000000000000000000000000000",
        "0000000000000000000000000000000000000000000000000000000000000040",
        "0000000000000000000000000000000000000000000000000000000000000000",
    ));
    assert_eq!(
        decode_multicall_output(Some(&response)),
        vec![Uint256::from(42u8), Uint256::from(0u8)]
    );
}

#[test]
fn decode_missing_result() {
    assert_eq!(decode_multicall_output(None), Vec::<Uint256>::new());
    assert_eq!(decode_multicall_output(Some(&[])), Vec::<Uint256>::new());
}

#[test]
fn decode_truncated_result_degrades_to_zero() {
    // header claims one element but the element data is missing
    let response = hex(concat!(
        "0000000000000000000000000000000000000000000000000000000000112233",
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "0000000000000000000000000000000000000000000000000000000000000040",
        "0000000000000000000000000000000000000000000000000000000000000001",
        "0000000000000000000000000000000000000000000000000000000000000020",
    ));
    assert_eq!(
        decode_multicall_output(Some(&response)),
        vec![Uint256::from(0u8)]
    );
}

#[test]
fn empty_batch_round_trip() {
    assert!(encode_multicall_input(true, &[]).is_ok());
    // a response for an empty batch still carries the full header
    let response = hex(concat!(
        "0000000000000000000000000000000000000000000000000000000000112233",
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "0000000000000000000000000000000000000000000000000000000000000040",
        "0000000000000000000000000000000000000000000000000000000000000000",
    ));
    assert_eq!(decode_multicall_output(Some(&response)), Vec::<Uint256>::new());
}
