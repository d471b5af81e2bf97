use lucid::utils::{bytes_to_hex_str, hex_str_to_bytes};
use lucid::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Deref;

/// Serializes slice of data as "UNFORMATTED DATA" format required
/// by Ethereum JSONRPC API.
///
/// See more https://ethereum.org/en/developers/docs/apis/json-rpc/#hex-encoding
pub fn data_serialize<S>(x: &[u8], s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&format!("0x{}", bytes_to_hex_str(x)))
}

/// Deserializes slice of data as "UNFORMATTED DATA" format required
/// by Ethereum JSONRPC API.
///
/// See more https://ethereum.org/en/developers/docs/apis/json-rpc/#hex-encoding
pub fn data_deserialize<'de, D>(d: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    hex_str_to_bytes(&s).map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq, Hash)]
pub struct Data(
    #[serde(
        serialize_with = "data_serialize",
        deserialize_with = "data_deserialize"
    )]
    pub Vec<u8>,
);

impl Deref for Data {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl From<Vec<u8>> for Data {
    fn from(v: Vec<u8>) -> Self {
        Data(v)
    }
}

/// The transaction-shaped first parameter of `eth_call`.
///
/// Read calls do not need gas fields or a sender, so this carries only the
/// target contract, the calldata and an optional `from` override.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Data,
}

impl CallRequest {
    pub fn quick_call(to: Address, payload: Vec<u8>) -> CallRequest {
        CallRequest {
            from: None,
            to,
            data: payload.into(),
        }
    }
}

#[test]
fn serialize_data() {
    let data: Data = vec![0xde, 0xad, 0xbe, 0xef].into();
    let encoded = serde_json::to_string(&data).unwrap();
    assert_eq!(encoded, r#""0xdeadbeef""#);
    let decoded: Data = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn serialize_call_request() {
    let call = CallRequest::quick_call(
        "0x6b175474e89094c44da98b954eedeac495271d0f".parse().unwrap(),
        vec![0x06, 0xfd, 0xde, 0x03],
    );
    let encoded = serde_json::to_string(&call).unwrap();
    // no gas, no from, exactly the shape of a bare read call
    assert_eq!(
        encoded,
        r#"{"to":"0x6b175474e89094c44da98b954eedeac495271d0f","data":"0x06fdde03"}"#
    );
}
