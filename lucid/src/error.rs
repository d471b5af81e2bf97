use std::fmt;
use std::num::ParseIntError;
use std::str::Utf8Error;

/// Custom error implementation that describes possible
/// error states.
///
/// This is shared by a whole crate.
#[derive(Debug)]
pub enum Error {
    InvalidAddressLength { got: usize, expected: usize },
    InvalidUtf8(Utf8Error),
    InvalidHex(ParseIntError),
    InvalidEip55,
    /// A value does not fit in the bit width it is being encoded into
    UintOutOfRange { bits: usize },
    /// A fixed size byte value with the wrong length, bytes32 and friends
    InvalidLength { got: usize, expected: usize },
    InvalidCallError(String),
    InvalidArgument(String),
    InvalidSignatureLength,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidAddressLength { got, expected } => {
                write!(f, "Invalid address length, got {got}, expected {expected}")
            }
            Error::InvalidUtf8(_) => write!(f, "Failed to parse bytes as utf8"),
            Error::InvalidHex(_) => write!(f, "Invalid hex character"),
            Error::InvalidEip55 => write!(f, "Invalid EIP-55 Address encoding"),
            Error::UintOutOfRange { bits } => {
                write!(f, "Value does not fit in a uint{bits}")
            }
            Error::InvalidLength { got, expected } => {
                write!(f, "Invalid byte length, got {got}, expected {expected}")
            }
            Error::InvalidCallError(val) => write!(f, "Invalid function call {val}"),
            Error::InvalidArgument(val) => write!(f, "Invalid argument {val}"),
            Error::InvalidSignatureLength => write!(f, "Signature should be exactly 65 bytes long"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidHex(inner) => Some(inner),
            Error::InvalidUtf8(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(e: Utf8Error) -> Self {
        Error::InvalidUtf8(e)
    }
}

impl From<ParseIntError> for Error {
    fn from(e: ParseIntError) -> Self {
        Error::InvalidHex(e)
    }
}
