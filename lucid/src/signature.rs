use crate::error::Error;
use crate::utils::{bytes_to_hex_str, hex_str_to_bytes};
use std::fmt::{self, Display};
use std::str::FromStr;

/// A flat 65 byte `r || s || v` signature as produced by wallets for
/// `eth_signTypedData_v4` and friends.
///
/// No key recovery happens in this crate, the components are only carried
/// around so permit payloads can be encoded from them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    v: u8,
    r: [u8; 32],
    s: [u8; 32],
}

impl Signature {
    pub fn new(v: u8, r: [u8; 32], s: [u8; 32]) -> Signature {
        Signature { v, r, s }
    }

    /// Parses the wallet wire format, exactly 65 bytes of `r || s || v`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Signature, Error> {
        if bytes.len() != 65 {
            return Err(Error::InvalidSignatureLength);
        }
        let mut r: [u8; 32] = Default::default();
        let mut s: [u8; 32] = Default::default();
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Signature {
            v: bytes[64],
            r,
            s,
        })
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    pub fn get_v(&self) -> u8 {
        self.v
    }

    pub fn get_r(&self) -> [u8; 32] {
        self.r
    }

    pub fn get_s(&self) -> [u8; 32] {
        self.s
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::from_bytes(&hex_str_to_bytes(s)?)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", bytes_to_hex_str(&self.to_bytes()))
    }
}

#[test]
fn flat_round_trip() {
    let sig = Signature::new(0x1c, [0x11; 32], [0x22; 32]);
    let bytes = sig.to_bytes();
    assert_eq!(bytes.len(), 65);
    assert_eq!(bytes[64], 0x1c);
    assert_eq!(Signature::from_bytes(&bytes).unwrap(), sig);
}

#[test]
fn rejects_wrong_length() {
    let e = Signature::from_bytes(&[0u8; 64]).unwrap_err();
    match e {
        Error::InvalidSignatureLength => {}
        _ => panic!(),
    }
    assert!(Signature::from_bytes(&[0u8; 66]).is_err());
}

#[test]
fn parses_hex() {
    let hex = format!("0x{}{}{}", "11".repeat(32), "22".repeat(32), "1b");
    let sig: Signature = hex.parse().unwrap();
    assert_eq!(sig.get_v(), 0x1b);
    assert_eq!(sig.get_r(), [0x11; 32]);
    assert_eq!(sig.get_s(), [0x22; 32]);
    assert_eq!(sig.to_string(), hex);
}
