//! A module to simplify ABI encoding
//!
//! For simplicity, it is based on tokens. You have to specify a list of
//! tokens and they will be automatically encoded.
//!
//! Additionally there are helpers to help deal with deriving a function
//! signatures, and to pull single words and ABI strings back out of raw
//! return data.
//!
//! This is not a full fledged implemementation of ABI encoder, it is more
//! like a bunch of helpers that would help to successfuly encode a contract
//! call.

use crate::address::Address;
use crate::error::Error;
use crate::utils::{rpad_to_multiple, zpad};
use num256::Uint256;
use num_traits::ToPrimitive;
use sha3::{Digest, Keccak256};

/// A token represents a value of parameter of the contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Unsigned integer of a given bit width, the value must fit it.
    Uint { size: usize, value: Uint256 },
    Address(Address),
    Bool(bool),
    /// Fixed 32 byte word, hashes and the like
    Bytes32([u8; 32]),
    /// Dynamic array of bytes
    DynamicBytes(Vec<u8>),
}

/// Representation of a serialized token.
pub enum SerializedToken {
    /// This data can be safely appended to the output stream
    Static([u8; 32]),
    /// This data should be saved up in a tail buffer, and an offset
    /// word should be appended to the output stream instead.
    Dynamic(Vec<u8>),
}

impl Token {
    fn serialize(&self) -> Result<SerializedToken, Error> {
        match *self {
            Token::Uint { size, ref value } => Ok(SerializedToken::Static(encode_uint(
                *value, size,
            )?)),
            Token::Address(address) => {
                let mut res: [u8; 32] = Default::default();
                res[12..].copy_from_slice(address.as_bytes());
                Ok(SerializedToken::Static(res))
            }
            Token::Bool(value) => {
                let mut res: [u8; 32] = Default::default();
                res[31] = value as u8;
                Ok(SerializedToken::Static(res))
            }
            Token::Bytes32(value) => Ok(SerializedToken::Static(value)),
            Token::DynamicBytes(ref value) => {
                Ok(SerializedToken::Dynamic(encode_dynamic_bytes(value)))
            }
        }
    }
}

impl From<u8> for Token {
    fn from(v: u8) -> Token {
        Token::Uint {
            size: 8,
            value: v.into(),
        }
    }
}

impl From<u32> for Token {
    fn from(v: u32) -> Token {
        Token::Uint {
            size: 32,
            value: v.into(),
        }
    }
}

impl From<u64> for Token {
    fn from(v: u64) -> Token {
        Token::Uint {
            size: 64,
            value: v.into(),
        }
    }
}

impl From<Uint256> for Token {
    fn from(v: Uint256) -> Token {
        Token::Uint {
            size: 256,
            value: v,
        }
    }
}

impl From<Address> for Token {
    fn from(v: Address) -> Token {
        Token::Address(v)
    }
}

impl From<bool> for Token {
    fn from(v: bool) -> Token {
        Token::Bool(v)
    }
}

impl From<Vec<u8>> for Token {
    fn from(v: Vec<u8>) -> Token {
        Token::DynamicBytes(v)
    }
}

/// Encodes an unsigned value into a single 32 byte word, left padded
/// with zeros.
///
/// `bits` must be a multiple of 8 no larger than 256 and the value must
/// fit in it, so `encode_uint(256u16.into(), 8)` is an error.
pub fn encode_uint(value: Uint256, bits: usize) -> Result<[u8; 32], Error> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(Error::InvalidArgument(format!(
            "uint{bits} is not a valid abi type"
        )));
    }
    let word = value.to_be_bytes();
    // every byte above the requested width must already be zero
    if word[..32 - bits / 8].iter().any(|b| *b != 0) {
        return Err(Error::UintOutOfRange { bits });
    }
    Ok(word)
}

/// Validates that the input is exactly one 32 byte word and returns it
/// as a fixed size array, used for the `r` and `s` signature components.
pub fn encode_bytes32(value: &[u8]) -> Result<[u8; 32], Error> {
    if value.len() != 32 {
        return Err(Error::InvalidLength {
            got: value.len(),
            expected: 32,
        });
    }
    let mut res: [u8; 32] = Default::default();
    res.copy_from_slice(value);
    Ok(res)
}

/// Encodes a dynamic bytes block, one length word followed by the payload
/// right padded with zeros up to the next 32 byte boundary.
pub fn encode_dynamic_bytes(value: &[u8]) -> Vec<u8> {
    let mut res = Vec::new();
    res.extend(zpad(&value.len().to_be_bytes(), 32));
    res.extend(rpad_to_multiple(value, 32));
    res
}

/// Given a signature it derives a Method ID
pub fn derive_method_id(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    debug_assert!(digest.len() >= 4);
    let mut result: [u8; 4] = Default::default();
    result.copy_from_slice(&digest[0..4]);
    result
}

/// This one is a very simplified ABI encoder that takes a bunch of tokens,
/// and serializes them.
///
/// Statics land in the head as is, each dynamic token leaves a pointer word
/// in the head and appends its block to a shared tail. This covers contract
/// calls with scalar and `bytes` parameters, it does not support nested
/// arrays.
pub fn encode_tokens(tokens: &[Token]) -> Result<Vec<u8>, Error> {
    let head_size = 32 * tokens.len();
    let mut head = Vec::with_capacity(head_size);
    let mut tail: Vec<u8> = Vec::new();
    for token in tokens.iter() {
        match token.serialize()? {
            SerializedToken::Static(data) => head.extend(&data),
            SerializedToken::Dynamic(data) => {
                let offset = head_size + tail.len();
                head.extend(zpad(&offset.to_be_bytes(), 32));
                tail.extend(data);
            }
        }
    }
    head.extend(tail);
    Ok(head)
}

/// Derives the method id from the signature and encodes provided tokens
/// right after it, producing complete calldata.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Result<Vec<u8>, Error> {
    let mut payload = Vec::new();
    payload.extend(derive_method_id(signature));
    payload.extend(encode_tokens(tokens)?);
    Ok(payload)
}

/// Interprets up to the first 32 bytes of the input as a big-endian
/// unsigned integer.
pub fn decode_uint(word: &[u8]) -> Uint256 {
    Uint256::from_be_bytes(&word[..word.len().min(32)])
}

/// Pulls an address out of a 32 byte return word, the address occupies
/// the low order 20 bytes.
pub fn decode_address(word: &[u8]) -> Result<Address, Error> {
    if word.len() < 32 {
        return Err(Error::InvalidLength {
            got: word.len(),
            expected: 32,
        });
    }
    Address::from_slice(&word[12..32])
}

/// Decodes a Solidity `int24` out of a 32 byte return word.
///
/// The value lives in the low order 3 bytes, anything at or above 2^23
/// is a two's complement negative and gets sign extended.
pub fn decode_int24(word: &[u8]) -> Result<i32, Error> {
    if word.len() < 32 {
        return Err(Error::InvalidLength {
            got: word.len(),
            expected: 32,
        });
    }
    let raw = ((word[29] as u32) << 16) | ((word[30] as u32) << 8) | word[31] as u32;
    if raw >= 1 << 23 {
        Ok((raw as i64 - (1 << 24)) as i32)
    } else {
        Ok(raw as i32)
    }
}

/// Decodes an ABI encoded `string` return value.
///
/// Follows the leading offset word to the length word, takes that many
/// bytes and truncates at the first NUL, some contracts pad names with
/// them.
pub fn decode_string(data: &[u8]) -> Result<String, Error> {
    if data.len() < 64 {
        return Err(Error::InvalidCallError(
            "Return data too short for a string".to_string(),
        ));
    }
    let offset = decode_uint(&data[0..32])
        .to_usize()
        .ok_or_else(|| Error::InvalidCallError("String offset overflow".to_string()))?;
    if data.len() < offset + 32 {
        return Err(Error::InvalidCallError(
            "String offset points past the end of data".to_string(),
        ));
    }
    let len = decode_uint(&data[offset..offset + 32])
        .to_usize()
        .ok_or_else(|| Error::InvalidCallError("String length overflow".to_string()))?;
    if data.len() < offset + 32 + len {
        return Err(Error::InvalidCallError(
            "String length points past the end of data".to_string(),
        ));
    }
    let mut bytes = &data[offset + 32..offset + 32 + len];
    if let Some(nul) = bytes.iter().position(|b| *b == 0) {
        bytes = &bytes[..nul];
    }
    Ok(std::str::from_utf8(bytes)?.to_string())
}

#[test]
fn derive_baz() {
    use crate::utils::bytes_to_hex_str;
    assert_eq!(
        bytes_to_hex_str(&derive_method_id("baz(uint32,bool)")),
        "cdcd77c0"
    );
}

#[test]
fn derive_sam() {
    use crate::utils::bytes_to_hex_str;
    assert_eq!(
        bytes_to_hex_str(&derive_method_id("sam(bytes,bool,uint256[])")),
        "a5643bf2"
    );
}

#[test]
fn derive_balance_of() {
    use crate::utils::bytes_to_hex_str;
    assert_eq!(
        bytes_to_hex_str(&derive_method_id("balanceOf(address)")),
        "70a08231"
    );
}

#[test]
fn derive_transfer() {
    use crate::utils::bytes_to_hex_str;
    assert_eq!(
        bytes_to_hex_str(&derive_method_id("transfer(address,uint256)")),
        "a9059cbb"
    );
}

#[test]
fn derive_positions() {
    use crate::utils::bytes_to_hex_str;
    assert_eq!(
        bytes_to_hex_str(&derive_method_id("positions(uint256)")),
        "99fbab88"
    );
}

#[test]
fn encode_simple() {
    use crate::utils::bytes_to_hex_str;
    let result = encode_tokens(&[69u32.into(), true.into()]).unwrap();
    assert_eq!(
        bytes_to_hex_str(&result),
        concat!(
            "0000000000000000000000000000000000000000000000000000000000000045",
            "0000000000000000000000000000000000000000000000000000000000000001"
        )
    );
}

#[test]
fn encode_dynamic() {
    use crate::utils::bytes_to_hex_str;
    let result = encode_tokens(&[
        Token::Uint {
            size: 256,
            value: 0x123u32.into(),
        },
        Token::DynamicBytes(vec![0xde, 0xad, 0xbe, 0xef]),
    ])
    .unwrap();
    assert_eq!(
        bytes_to_hex_str(&result),
        concat!(
            "0000000000000000000000000000000000000000000000000000000000000123",
            "0000000000000000000000000000000000000000000000000000000000000040",
            "0000000000000000000000000000000000000000000000000000000000000004",
            "deadbeef00000000000000000000000000000000000000000000000000000000"
        )
    );
}

#[test]
fn encode_empty_dynamic() {
    use crate::utils::bytes_to_hex_str;
    let result = encode_tokens(&[Token::DynamicBytes(Vec::new())]).unwrap();
    assert_eq!(
        bytes_to_hex_str(&result),
        concat!(
            "0000000000000000000000000000000000000000000000000000000000000020",
            "0000000000000000000000000000000000000000000000000000000000000000"
        )
    );
}

#[test]
fn uint_round_trip() {
    use num_traits::Bounded;
    for value in [
        Uint256::from(0u8),
        Uint256::from(1u8),
        Uint256::from(255u8),
        Uint256::max_value(),
    ] {
        assert_eq!(decode_uint(&encode_uint(value, 256).unwrap()), value);
    }
    for value in 0u32..=255 {
        let value: Uint256 = value.into();
        assert_eq!(decode_uint(&encode_uint(value, 8).unwrap()), value);
    }
}

#[test]
fn uint_width_overflow() {
    let e = encode_uint(256u32.into(), 8).unwrap_err();
    match e {
        Error::UintOutOfRange { bits: 8 } => {}
        _ => panic!(),
    }
    assert!(encode_uint(255u32.into(), 8).is_ok());
    assert!(encode_uint(65536u32.into(), 16).is_err());
}

#[test]
fn bytes32_length_check() {
    assert!(encode_bytes32(&[0x11u8; 32]).is_ok());
    let e = encode_bytes32(&[0x11u8; 31]).unwrap_err();
    match e {
        Error::InvalidLength {
            got: 31,
            expected: 32,
        } => {}
        _ => panic!(),
    }
}

#[test]
fn address_round_trip() {
    use std::str::FromStr;
    let address = Address::from_str("0x6b175474e89094c44da98b954eedeac495271d0f").unwrap();
    let serialized = match Token::Address(address).serialize().unwrap() {
        SerializedToken::Static(word) => word,
        _ => panic!(),
    };
    assert_eq!(decode_address(&serialized).unwrap(), address);
}

#[test]
fn int24_sign_extension() {
    let mut word = [0u8; 32];
    word[29..].copy_from_slice(&[0xff, 0xff, 0xff]);
    assert_eq!(decode_int24(&word).unwrap(), -1);

    word[29..].copy_from_slice(&[0x80, 0x00, 0x00]);
    assert_eq!(decode_int24(&word).unwrap(), -8_388_608);

    word[29..].copy_from_slice(&[0x7f, 0xff, 0xff]);
    assert_eq!(decode_int24(&word).unwrap(), 8_388_607);

    word[29..].copy_from_slice(&[0x00, 0x00, 0x01]);
    assert_eq!(decode_int24(&word).unwrap(), 1);

    // the usual tick spacing of a 0.3% fee pool
    word[29..].copy_from_slice(&[0xff, 0xff, 0xc4]);
    assert_eq!(decode_int24(&word).unwrap(), -60);
}

#[test]
fn string_decode() {
    use crate::utils::hex_str_to_bytes;
    // "Uniswap V3 Positions NFT-V1" encoded as an ABI string
    let data = hex_str_to_bytes(concat!(
        "0000000000000000000000000000000000000000000000000000000000000020",
        "000000000000000000000000000000000000000000000000000000000000001b",
        "556e697377617020563320506f736974696f6e73204e46542d56310000000000"
    ))
    .unwrap();
    assert_eq!(
        decode_string(&data).unwrap(),
        "Uniswap V3 Positions NFT-V1"
    );
}

#[test]
fn string_decode_stops_at_nul() {
    use crate::utils::hex_str_to_bytes;
    // length claims 32 bytes but the name is NUL padded in the payload itself
    let data = hex_str_to_bytes(concat!(
        "0000000000000000000000000000000000000000000000000000000000000020",
        "0000000000000000000000000000000000000000000000000000000000000020",
        "4461690000000000000000000000000000000000000000000000000000000000"
    ))
    .unwrap();
    assert_eq!(decode_string(&data).unwrap(), "Dai");
}

#[test]
fn string_decode_rejects_short_data() {
    assert!(decode_string(&[0u8; 32]).is_err());
    let mut data = [0u8; 64];
    // offset pointing past the end
    data[31] = 0xff;
    assert!(decode_string(&data).is_err());
}
