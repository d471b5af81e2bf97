//! Signet drives the `lucid` codec over JSONRPC.
//!
//! It crafts its own `eth_call` requests instead of pulling in a full ABI
//! library, batches reads through the Multicall2 `tryBlockAndAggregate`
//! contract, and runs the EIP-712 permit signing flow for NFT position
//! manager contracts, supporting both the ordered nonce (v3) and the
//! timestamp nonce (v4) permit schemes with automatic version detection.
//!
//! Networking is a single seam, the [`client::CallTransport`] trait, so
//! everything above it can be exercised against mocks.

#![warn(clippy::all)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::pedantic)]

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub mod client;
pub mod erc20;
pub mod jsonrpc;
pub mod multicall;
pub mod permit;
pub mod position;
pub mod types;
