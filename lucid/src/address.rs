use crate::error::Error;
use crate::utils::{bytes_to_hex_str, hex_str_to_bytes};
use serde::de::Deserialize;
use serde::de::Deserializer;
use serde::Serialize;
use serde::Serializer;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Representation of an Ethereum address.
///
/// Addresses are 20 bytes long, they are usually displayed in the mixed-case
/// checksum encoding described by EIP-55 and that is what `Display` produces.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// Get raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Creates an `Address` out of a slice, which must be exactly
    /// 20 bytes long.
    pub fn from_slice(data: &[u8]) -> Result<Address, Error> {
        if data.len() != 20 {
            return Err(Error::InvalidAddressLength {
                got: data.len(),
                expected: 20,
            });
        }
        let mut bytes: [u8; 20] = Default::default();
        bytes.copy_from_slice(data);
        Ok(Address(bytes))
    }

    /// Parses an address string and additionally rejects mixed-case
    /// input that does not match the EIP-55 checksum encoding.
    ///
    /// All-lowercase and all-uppercase input carries no checksum and is
    /// accepted as is, exactly like `from_str`.
    pub fn parse_and_validate(s: &str) -> Result<Address, Error> {
        let hex_body = s.strip_prefix("0x").unwrap_or(s);
        if !uniform_case(hex_body) && !is_checksum_address(s) {
            return Err(Error::InvalidEip55);
        }
        s.parse()
    }
}

impl From<[u8; 20]> for Address {
    fn from(val: [u8; 20]) -> Address {
        Address(val)
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses a string into a valid Ethereum address.
    ///
    /// # Supported formats
    ///
    /// * `0x` prefixed address
    /// * Raw bytes of an address represented by a bytes as an hexadecimal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::str::FromStr;
    /// use lucid::Address;
    /// // Method 1
    /// Address::from_str("0x0102030405060708090a0b0c0d0e0f1011121314").unwrap();
    /// // Method 1 (without 0x prefix)
    /// Address::from_str("0102030405060708090a0b0c0d0e0f1011121314").unwrap();
    /// // Method 2
    /// let _address : Address = "14131211100f0e0d0c0b0a090807060504030201".parse().unwrap();
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 40 {
            return Err(Error::InvalidAddressLength {
                got: s.len(),
                expected: 40,
            });
        }
        Address::from_slice(&hex_str_to_bytes(s)?)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            write!(f, "0x")?;
        }
        write!(f, "{}", bytes_to_hex_str(&self.0))
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            write!(f, "0x")?;
        }
        write!(f, "{}", bytes_to_hex_str(&self.0).to_uppercase())
    }
}

impl fmt::Display for Address {
    /// Creates the checksummed textual representation of the `Address`
    /// per EIP-55, always `0x` prefixed.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", checksum_body(&bytes_to_hex_str(&self.0)))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // JSONRPC wants "UNFORMATTED DATA", lowercase hex is the least
        // surprising form on the wire
        serializer.serialize_str(&format!("{self:#x}"))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Applies the EIP-55 case pattern to a lowercase 40 character hex body.
///
/// Each nibble of the Keccak-256 hash of the lowercase body decides the case
/// of the corresponding character, letters go uppercase when the nibble is
/// greater than 7.
fn checksum_body(body: &str) -> String {
    let lower = body.to_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());
    lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble > 7 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

/// True when the string does not mix upper and lowercase letters,
/// digits are ignored.
fn uniform_case(s: &str) -> bool {
    let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
    !(has_lower && has_upper)
}

fn is_hex_body(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validates the EIP-55 checksum of a mixed-case address string.
///
/// The `0x` prefix is optional. Returns false for anything that is not a
/// 40 hex digit body or where any single character carries the wrong case.
pub fn is_checksum_address(address: &str) -> bool {
    let body = address.strip_prefix("0x").unwrap_or(address);
    if body.len() != 40 || !is_hex_body(body) {
        return false;
    }
    checksum_body(body) == body
}

/// Checks whether a string is an acceptable address.
///
/// Accepts 40 hex digit bodies that are all-lowercase, all-uppercase or
/// checksum-valid mixed case, and 64 hex digit bodies (non-EVM style
/// identifiers) as long as they do not mix case.
pub fn is_valid_address(address: &str) -> bool {
    let body = address.strip_prefix("0x").unwrap_or(address);
    if !is_hex_body(body) {
        return false;
    }
    match body.len() {
        40 => uniform_case(body) || is_checksum_address(address),
        64 => uniform_case(body),
        _ => false,
    }
}

#[test]
#[should_panic]
fn decode_invalid_length() {
    "123".parse::<Address>().unwrap();
}

#[test]
#[should_panic]
fn decode_invalid_character() {
    "\u{012345}123456789012345678901234567890123456"
        .parse::<Address>()
        .unwrap();
}

#[test]
fn decode() {
    let address: Address = "1234567890123456789012345678901234567890"
        .parse::<Address>()
        .unwrap();

    assert_eq!(
        address,
        Address::from([
            0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56, 0x78,
            0x90, 0x12, 0x34, 0x56, 0x78, 0x90
        ])
    );
}

#[test]
fn handle_prefixed() {
    let address: Address = "0x000000000000000000000000000b9331677e6ebf"
        .parse()
        .unwrap();
    assert_eq!(
        address,
        Address::from([
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0b, 0x93, 0x31, 0x67, 0x7e, 0x6e, 0xbf
        ])
    );
}

#[test]
fn hashed() {
    // One of the use cases for Address could be a key in a HashMap to store some
    // additional values per address.
    use std::collections::HashMap;
    let a = Address::from_str("0x000000000000000000000000000b9331677e6ebf").unwrap();
    let b = Address::from_str("0x00000000000000000000000000000000deadbeef").unwrap();
    let mut map = HashMap::new();
    map.insert(a, "Foo");
    map.insert(b, "Bar");

    assert_eq!(map.get(&a).unwrap(), &"Foo");
    assert_eq!(map.get(&b).unwrap(), &"Bar");
}

#[test]
fn ordered() {
    let a = Address::from_str("0x000000000000000000000000000000000000000a").unwrap();
    let b = Address::from_str("0x000000000000000000000000000000000000000b").unwrap();
    let c = Address::from_str("0x000000000000000000000000000000000000000c").unwrap();
    assert!(c > b);
    assert!(b > a);
    assert!(b < c);
    assert!(a < c);
    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);
}

#[test]
fn to_hex() {
    let address: Address = "1234567890123456789ABCDEF678901234567890"
        .parse::<Address>()
        .unwrap();

    assert_eq!(
        format!("{:x}", address),
        "1234567890123456789abcdef678901234567890",
    );
    assert_eq!(
        format!("{:#x}", address),
        "0x1234567890123456789abcdef678901234567890",
    );
    assert_eq!(
        format!("{:#X}", address),
        "0x1234567890123456789ABCDEF678901234567890",
    );
}

#[test]
fn eip55_display() {
    // Test vectors straight out of the EIP-55 document
    for valid in [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ] {
        let parsed: Address = valid.parse().unwrap();
        assert_eq!(parsed.to_string(), valid);
    }
}

#[test]
fn eip55_checksum_validation() {
    assert!(is_checksum_address(
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
    ));
    // flip the case of a single character
    assert!(!is_checksum_address(
        "0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
    ));
    assert!(!is_checksum_address(
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"
    ));
    // all lowercase carries no checksum information
    assert!(!is_checksum_address(
        "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
    ));
}

#[test]
fn accepts_uniform_case() {
    assert!(is_valid_address("0x52908400098527886E0F7030069857D2E4169EE7"));
    assert!(is_valid_address("0xde709f2102306220921060314715629080e2fb77"));
    assert!(is_valid_address("0x27b1fdb04752bbc536007a920d24acb045561c26"));
    assert!(is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    // bad checksum
    assert!(!is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"));
    // wrong length
    assert!(!is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAe"));
    assert!(!is_valid_address(""));
}

#[test]
fn accepts_64_digit_identifiers() {
    assert!(is_valid_address(
        "0c8b9331677e6ebf0c8b9331677e6ebf0c8b9331677e6ebf0c8b9331677e6ebf"
    ));
    assert!(is_valid_address(
        "0x0C8B9331677E6EBF0C8B9331677E6EBF0C8B9331677E6EBF0C8B9331677E6EBF"
    ));
    // mixed case 64 digit identifiers carry no checksum and are rejected
    assert!(!is_valid_address(
        "0c8B9331677e6ebf0c8b9331677e6ebf0c8b9331677e6ebf0c8b9331677e6ebf"
    ));
}

#[test]
fn parse_and_validate_enforces_checksum() {
    assert!(Address::parse_and_validate("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_ok());
    assert!(Address::parse_and_validate("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_ok());
    let e = Address::parse_and_validate("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD").unwrap_err();
    match e {
        Error::InvalidEip55 => {}
        _ => panic!(),
    }
}

#[test]
fn serialize_to_json_string() {
    let address: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
    let encoded = serde_json::to_string(&address).unwrap();
    assert_eq!(encoded, r#""0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed""#);
    let decoded: Address = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, address);
}
