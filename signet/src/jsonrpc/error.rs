use awc::error::SendRequestError as ActixError;
use lucid::Error as CodecError;
use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;
use std::num::ParseIntError;

#[derive(Debug)]
pub enum SignetError {
    BadResponse(String),
    FailedToSend(ActixError),
    JsonRpcError {
        code: i64,
        message: String,
        data: String,
    },
    BadInput(String),
    CodecError(CodecError),
    /// An eth_call went through but the returned bytes do not have the
    /// shape the contract ABI promised
    ContractCallError(String),
    /// The contract has no readable `name()`, signing a permit against it
    /// is hopeless since the EIP-712 domain cannot be built
    ContractNameError,
    /// The external wallet refused or failed to produce a signature
    SignerError(String),
}

impl From<ParseIntError> for SignetError {
    fn from(error: ParseIntError) -> Self {
        SignetError::BadResponse(format!("{error}"))
    }
}

impl From<CodecError> for SignetError {
    fn from(error: CodecError) -> Self {
        SignetError::CodecError(error)
    }
}

impl Display for SignetError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            SignetError::BadResponse(val) => write!(f, "Signet bad response {val}"),
            SignetError::BadInput(val) => write!(f, "Signet bad input {val}"),
            SignetError::FailedToSend(val) => write!(f, "Signet failed to send {val}"),
            SignetError::CodecError(val) => write!(f, "CodecError {val}"),
            SignetError::ContractCallError(val) => {
                write!(f, "Error performing Ethereum contract call {val}")
            }
            SignetError::ContractNameError => {
                write!(f, "Contract returned an empty or unparseable name")
            }
            SignetError::SignerError(val) => write!(f, "Typed data signer failed {val}"),
            SignetError::JsonRpcError {
                code,
                message,
                data,
            } => write!(
                f,
                "Signet response error code {code} message {message} data {data:?}"
            ),
        }
    }
}

impl Error for SignetError {}
