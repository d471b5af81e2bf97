//! # Introduction
//! Lucid is a low-level Ethereum contract-call codec written in pure Rust.
//!
//! ## Features
//! * Function selector derivation from human readable signatures
//! * ABI encoding for the data types used in contract calls (see `abi::Token` variants)
//! * Decoding of static words and ABI strings out of raw return data
//! * EIP-55 checksummed address parsing and validation
//! * Lossless decimal string <-> base unit conversion for token amounts
//!
//! ## Getting started
//! Building the calldata for an ERC20 `balanceOf` query:
//! ```rust
//! use lucid::abi::{decode_uint, encode_call};
//! use lucid::utils::bytes_to_hex_str;
//! use lucid::Address;
//!
//! let holder: Address = "0x6b175474e89094c44da98b954eedeac495271d0f"
//!     .parse()
//!     .unwrap();
//! let payload = encode_call("balanceOf(address)", &[holder.into()]).unwrap();
//! assert!(bytes_to_hex_str(&payload).starts_with("70a08231"));
//! ```
//!
//! No networking happens in this crate, every function is a pure transform.
//! The companion `signet` crate drives these encoders over JSONRPC.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

extern crate num_traits;
extern crate serde;
extern crate sha3;

pub mod abi;
mod address;
mod error;
mod signature;
pub mod units;
pub mod utils;

pub use address::{is_checksum_address, is_valid_address, Address};
pub use error::Error;
pub use num256::Uint256;
pub use signature::Signature;
