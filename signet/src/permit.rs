//! EIP-712 permit signing for NFT position manager contracts.
//!
//! Two incompatible permit schemes exist in the wild. The legacy position
//! manager (called v3 here) keeps an ordered nonce inside the position
//! struct and takes the signature as split `(v, r, s)` words, the newer
//! manager (v4) has no on chain nonce at all, takes a timestamp nonce and
//! the signature as dynamic bytes, and drops the `version` field from its
//! EIP-712 domain. Nothing on chain labels which scheme a contract speaks,
//! the only tell is whether `positions(uint256)` answers, so the session
//! probes that call once and commits to a strategy for its lifetime.
//!
//! The session is an explicit state machine. Consumers render straight off
//! [`PermitState`], a permit payload only exists inside the `Signed`
//! variant so it cannot be observed half built.

use crate::client::CallTransport;
use crate::jsonrpc::error::SignetError;
use crate::types::CallRequest;
use futures::future::LocalBoxFuture;
use lucid::abi::{
    decode_string, decode_uint, encode_bytes32, encode_call, encode_dynamic_bytes, encode_uint,
};
use lucid::{Address, Signature, Uint256};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

/// The external wallet collaborator.
///
/// Implementations perform the `eth_signTypedData_v4` request against
/// whatever holds the key and hand back the flat 65 byte signature. The
/// account is expected to be serialized lowercase on the wire, which is
/// what `format!("{account:#x}")` produces.
pub trait TypedDataSigner {
    fn sign_typed_data(
        &self,
        account: Address,
        typed_data: String,
    ) -> LocalBoxFuture<'_, Result<Signature, SignetError>>;
}

/// The permit scheme a contract speaks, either pinned by the caller or
/// detected by probing the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermitVersion {
    /// Ordered nonce, legacy position manager ABI
    V3,
    /// Unordered timestamp nonce ABI
    V4,
}

/// The strategy committed to after version resolution. The v3 variant
/// keeps the probe's return data around since the ordered nonce lives in
/// its first word.
enum ResolvedVersion {
    V3 { positions: Vec<u8> },
    V4,
}

impl ResolvedVersion {
    fn version(&self) -> PermitVersion {
        match self {
            ResolvedVersion::V3 { .. } => PermitVersion::V3,
            ResolvedVersion::V4 => PermitVersion::V4,
        }
    }

    /// The nonce to sign with.
    ///
    /// v3 reads the first return word of the cached `positions()` data, the
    /// on chain field is a uint96 but the ABI encoder zero pads it so a
    /// full word decode is safe. v4 has no on chain nonce, the current Unix
    /// second stands in, which means two permits requested within the same
    /// second for the same position would collide. The target contracts
    /// only require a nonce to be unused, so this is accepted rather than
    /// guarded against.
    fn nonce(&self) -> Result<Uint256, SignetError> {
        match self {
            ResolvedVersion::V3 { positions } => match positions.get(0..32) {
                Some(word) => Ok(decode_uint(word)),
                None => Err(SignetError::ContractCallError(
                    "Failed to fetch V3 nonce, positions() returned short data".to_string(),
                )),
            },
            ResolvedVersion::V4 => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default();
                Ok(now.as_secs().into())
            }
        }
    }

    /// Encodes the bytes the caller will later submit on chain alongside
    /// the permit call.
    ///
    /// v3 contracts take the signature split apart:
    /// deadline word, v as a uint8 word, r, s.
    /// v4 contracts take the nonce and the whole signature as dynamic
    /// bytes: deadline word, nonce word, a fixed 0x60 offset word, then
    /// the length prefixed signature padded to a word boundary.
    fn encode_permit_data(
        &self,
        deadline: Uint256,
        nonce: Uint256,
        signature: &Signature,
    ) -> Result<Vec<u8>, SignetError> {
        let mut data = Vec::new();
        data.extend(encode_uint(deadline, 256)?);
        match self {
            ResolvedVersion::V3 { .. } => {
                data.extend(encode_uint(signature.get_v().into(), 8)?);
                data.extend(encode_bytes32(&signature.get_r())?);
                data.extend(encode_bytes32(&signature.get_s())?);
            }
            ResolvedVersion::V4 => {
                data.extend(encode_uint(nonce, 256)?);
                data.extend(encode_uint(0x60u8.into(), 256)?);
                data.extend(encode_dynamic_bytes(&signature.to_bytes()));
            }
        }
        Ok(data)
    }
}

/// The final payload of a successful signing round, immutable once
/// produced. `permit_data` is what goes on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitResult {
    pub deadline: Uint256,
    pub nonce: Uint256,
    pub signature: Signature,
    pub permit_data: Vec<u8>,
}

/// Where a [`PermitSession`] currently stands. Each variant carries only
/// the data valid in it, there is no way to read a permit out of a session
/// that has not finished signing.
#[derive(Debug)]
pub enum PermitState {
    /// Required parameters are incomplete, overrides everything else
    NotApplicable,
    ReadyToSign,
    Signing,
    Signed(PermitResult),
    Failed(SignetError),
}

/// Everything the signing flow needs, any missing field keeps the session
/// in `NotApplicable`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermitConfig {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub nft_manager: Option<Address>,
    pub token_id: Option<Uint256>,
    pub spender: Option<Address>,
    /// Skips version detection when set
    pub version: Option<PermitVersion>,
}

#[derive(Clone, Copy)]
struct PermitParams {
    account: Address,
    chain_id: u64,
    nft_manager: Address,
    token_id: Uint256,
    spender: Address,
    pinned: Option<PermitVersion>,
}

impl PermitConfig {
    fn complete(&self) -> Option<PermitParams> {
        Some(PermitParams {
            account: self.account?,
            chain_id: self.chain_id?,
            nft_manager: self.nft_manager?,
            token_id: self.token_id?,
            spender: self.spender?,
            pinned: self.version,
        })
    }
}

/// One permit signing session against one position.
///
/// Owns its state exclusively, collaborators are borrowed narrow traits so
/// the whole flow runs against mocks in tests.
pub struct PermitSession<'a> {
    transport: &'a dyn CallTransport,
    signer: &'a dyn TypedDataSigner,
    config: PermitConfig,
    resolved: Option<ResolvedVersion>,
    state: PermitState,
}

impl<'a> PermitSession<'a> {
    pub fn new(
        transport: &'a dyn CallTransport,
        signer: &'a dyn TypedDataSigner,
        config: PermitConfig,
    ) -> PermitSession<'a> {
        let state = match config.complete() {
            Some(_) => PermitState::ReadyToSign,
            None => PermitState::NotApplicable,
        };
        PermitSession {
            transport,
            signer,
            config,
            resolved: None,
            state,
        }
    }

    /// Replaces the session parameters, resetting the session when they
    /// become incomplete and discarding the cached version detection when
    /// the target position changes.
    pub fn set_config(&mut self, config: PermitConfig) {
        let target_changed = config.nft_manager != self.config.nft_manager
            || config.token_id != self.config.token_id
            || config.chain_id != self.config.chain_id;
        if target_changed {
            self.resolved = None;
        }
        let changed = config != self.config;
        self.config = config;
        match self.config.complete() {
            None => self.state = PermitState::NotApplicable,
            Some(_) => {
                if changed || matches!(self.state, PermitState::NotApplicable) {
                    self.state = PermitState::ReadyToSign;
                }
            }
        }
    }

    pub fn state(&self) -> &PermitState {
        &self.state
    }

    pub fn error(&self) -> Option<&SignetError> {
        match &self.state {
            PermitState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn permit(&self) -> Option<&PermitResult> {
        match &self.state {
            PermitState::Signed(result) => Some(result),
            _ => None,
        }
    }

    /// The version committed to by the last resolution, if any happened yet.
    pub fn detected_version(&self) -> Option<PermitVersion> {
        self.resolved.as_ref().map(|r| r.version())
    }

    /// Runs the whole signing flow: resolve the contract version, fetch the
    /// contract name and the nonce, have the external signer sign the
    /// EIP-712 payload and encode the on chain permit bytes.
    ///
    /// Only a session in `ReadyToSign` or `Failed` may enter, anything else
    /// is a no-op returning `None`, so a second request while one is in
    /// flight is dropped rather than queued. On failure the error lands in
    /// `Failed` and `None` is returned, the next call retries from scratch.
    pub async fn sign_permit_nft(&mut self, deadline: Uint256) -> Option<PermitResult> {
        let params = match (
            self.config.complete(),
            matches!(self.state, PermitState::ReadyToSign | PermitState::Failed(_)),
        ) {
            (Some(params), true) => params,
            _ => {
                warn!("sign_permit_nft called in state {:?}, ignoring", self.state);
                return None;
            }
        };
        self.state = PermitState::Signing;
        match self.sign_inner(params, deadline).await {
            Ok(result) => {
                self.state = PermitState::Signed(result.clone());
                Some(result)
            }
            Err(e) => {
                error!("NFT permit signing failed: {e}");
                self.state = PermitState::Failed(e);
                None
            }
        }
    }

    async fn sign_inner(
        &mut self,
        params: PermitParams,
        deadline: Uint256,
    ) -> Result<PermitResult, SignetError> {
        let transport = self.transport;

        if self.resolved.is_none() {
            self.resolved = Some(resolve_version(transport, params).await?);
        }
        // the cache line above makes this infallible, but stay graceful
        let resolved = match self.resolved.as_ref() {
            Some(resolved) => resolved,
            None => return Err(SignetError::BadInput("version resolution failed".to_string())),
        };

        let name = fetch_contract_name(transport, params.nft_manager).await?;
        let nonce = resolved.nonce()?;

        let typed_data = build_typed_data(
            resolved.version(),
            &name,
            params.chain_id,
            params.nft_manager,
            params.spender,
            params.token_id,
            nonce,
            deadline,
        );
        debug!("signing typed data {typed_data}");

        let signature = self
            .signer
            .sign_typed_data(params.account, typed_data)
            .await?;

        let permit_data = resolved.encode_permit_data(deadline, nonce, &signature)?;
        Ok(PermitResult {
            deadline,
            nonce,
            signature,
            permit_data,
        })
    }
}

/// Probes `positions(uint256)` to classify the contract.
///
/// A non empty answer means the legacy ordered nonce ABI is present, any
/// failure or empty result classifies the contract as v4. A caller pinned
/// v3 still issues the probe since the nonce comes out of it.
async fn resolve_version(
    transport: &dyn CallTransport,
    params: PermitParams,
) -> Result<ResolvedVersion, SignetError> {
    match params.pinned {
        Some(PermitVersion::V4) => Ok(ResolvedVersion::V4),
        Some(PermitVersion::V3) => {
            let positions = probe_positions(transport, params).await?;
            if positions.is_empty() {
                return Err(SignetError::ContractCallError(
                    "Position not found".to_string(),
                ));
            }
            Ok(ResolvedVersion::V3 { positions })
        }
        None => match probe_positions(transport, params).await {
            Ok(positions) if !positions.is_empty() => Ok(ResolvedVersion::V3 { positions }),
            _ => Ok(ResolvedVersion::V4),
        },
    }
}

async fn probe_positions(
    transport: &dyn CallTransport,
    params: PermitParams,
) -> Result<Vec<u8>, SignetError> {
    let payload = encode_call("positions(uint256)", &[params.token_id.into()])?;
    transport
        .call(CallRequest::quick_call(params.nft_manager, payload))
        .await
}

/// Fetches and decodes the contract's `name()`, which anchors the EIP-712
/// domain. An empty or undecodable name is a hard error, a signature over
/// the wrong domain would be silently useless.
async fn fetch_contract_name(
    transport: &dyn CallTransport,
    contract: Address,
) -> Result<String, SignetError> {
    let payload = encode_call("name()", &[])?;
    let data = transport
        .call(CallRequest::quick_call(contract, payload))
        .await?;
    match decode_string(&data) {
        Ok(name) if !name.is_empty() => Ok(name),
        _ => Err(SignetError::ContractNameError),
    }
}

/// Serializes the EIP-712 payload for `eth_signTypedData_v4`.
///
/// The v3 domain carries a `version` field fixed at "1", the v4 domain has
/// no version field at all. That asymmetry is a real on chain
/// incompatibility between the two position managers, not an oversight,
/// adding the field to a v4 domain changes the domain separator and the
/// contract rejects the signature.
#[allow(clippy::too_many_arguments)]
fn build_typed_data(
    version: PermitVersion,
    name: &str,
    chain_id: u64,
    verifying_contract: Address,
    spender: Address,
    token_id: Uint256,
    nonce: Uint256,
    deadline: Uint256,
) -> String {
    let mut domain_type = vec![json!({"name": "name", "type": "string"})];
    if let PermitVersion::V3 = version {
        domain_type.push(json!({"name": "version", "type": "string"}));
    }
    domain_type.push(json!({"name": "chainId", "type": "uint256"}));
    domain_type.push(json!({"name": "verifyingContract", "type": "address"}));

    let mut domain = json!({
        "name": name,
        "chainId": chain_id,
        "verifyingContract": format!("{verifying_contract:#x}"),
    });
    if let PermitVersion::V3 = version {
        domain["version"] = json!("1");
    }

    json!({
        "types": {
            "EIP712Domain": domain_type,
            "Permit": [
                {"name": "spender", "type": "address"},
                {"name": "tokenId", "type": "uint256"},
                {"name": "nonce", "type": "uint256"},
                {"name": "deadline", "type": "uint256"},
            ],
        },
        "domain": domain,
        "primaryType": "Permit",
        "message": {
            "spender": format!("{spender:#x}"),
            "tokenId": token_id.to_string(),
            "nonce": nonce.to_string(),
            "deadline": deadline.to_string(),
        },
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use lucid::abi::derive_method_id;
    use lucid::utils::{bytes_to_hex_str, hex_str_to_bytes};
    use std::cell::RefCell;

    // an ABI encoded string return for name()
    fn abi_name(name: &str) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(encode_uint(0x20u8.into(), 256).unwrap());
        data.extend(encode_dynamic_bytes(name.as_bytes()));
        data
    }

    fn positions_with_nonce(nonce: u8) -> Vec<u8> {
        let mut data = vec![0u8; 12 * 32];
        data[31] = nonce;
        data
    }

    /// Serves canned responses keyed by selector and records every request.
    struct MockTransport {
        positions: Result<Vec<u8>, String>,
        name: RefCell<Vec<u8>>,
        requests: RefCell<Vec<CallRequest>>,
    }

    impl MockTransport {
        fn new(positions: Result<Vec<u8>, String>, name: Vec<u8>) -> MockTransport {
            MockTransport {
                positions,
                name: RefCell::new(name),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl CallTransport for MockTransport {
        fn call(&self, request: CallRequest) -> LocalBoxFuture<'_, Result<Vec<u8>, SignetError>> {
            Box::pin(async move {
                let selector = request.data.0[0..4].to_vec();
                self.requests.borrow_mut().push(request);
                if selector == derive_method_id("positions(uint256)") {
                    self.positions
                        .clone()
                        .map_err(SignetError::ContractCallError)
                } else if selector == derive_method_id("name()") {
                    Ok(self.name.borrow().clone())
                } else {
                    Err(SignetError::BadInput(format!(
                        "unexpected selector {}",
                        bytes_to_hex_str(&selector)
                    )))
                }
            })
        }
    }

    struct MockSigner {
        signature: Signature,
    }

    impl MockSigner {
        fn new() -> MockSigner {
            MockSigner {
                signature: Signature::new(0x1b, [0x11; 32], [0x22; 32]),
            }
        }
    }

    impl TypedDataSigner for MockSigner {
        fn sign_typed_data(
            &self,
            _account: Address,
            _typed_data: String,
        ) -> LocalBoxFuture<'_, Result<Signature, SignetError>> {
            Box::pin(async move { Ok(self.signature.clone()) })
        }
    }

    fn full_config() -> PermitConfig {
        PermitConfig {
            account: Some("0x1111111111111111111111111111111111111111".parse().unwrap()),
            chain_id: Some(1),
            nft_manager: Some("0xc36442b4a4522e871399cd717abdd847ab11fe88".parse().unwrap()),
            token_id: Some(424242u32.into()),
            spender: Some("0x2222222222222222222222222222222222222222".parse().unwrap()),
            version: None,
        }
    }

    #[test]
    fn v3_detection_and_payload() {
        let transport = MockTransport::new(
            Ok(positions_with_nonce(5)),
            abi_name("Uniswap V3 Positions NFT-V1"),
        );
        let signer = MockSigner::new();
        let mut session = PermitSession::new(&transport, &signer, full_config());

        let result = block_on(session.sign_permit_nft(1_700_000_000u64.into())).unwrap();

        assert_eq!(session.detected_version(), Some(PermitVersion::V3));
        assert_eq!(result.nonce, 5u8.into());
        // deadline word, v word, r, s
        let mut expected = Vec::new();
        expected.extend(encode_uint(1_700_000_000u64.into(), 256).unwrap());
        expected.extend(hex_str_to_bytes(
            "000000000000000000000000000000000000000000000000000000000000001b",
        )
        .unwrap());
        expected.extend([0x11; 32]);
        expected.extend([0x22; 32]);
        assert_eq!(result.permit_data, expected);
        assert_eq!(result.permit_data.len(), 128);
        assert!(matches!(session.state(), PermitState::Signed(_)));
    }

    #[test]
    fn v4_detection_and_payload() {
        let transport = MockTransport::new(
            Err("execution reverted".to_string()),
            abi_name("Uniswap v4 Positions NFT"),
        );
        let signer = MockSigner::new();
        let mut session = PermitSession::new(&transport, &signer, full_config());

        let before: Uint256 = unix_now_for_test();
        let result = block_on(session.sign_permit_nft(1_700_000_000u64.into())).unwrap();
        let after: Uint256 = unix_now_for_test();

        assert_eq!(session.detected_version(), Some(PermitVersion::V4));
        assert!(result.nonce >= before && result.nonce <= after);

        // deadline word, nonce word, 0x60 offset word, length word, padded sig
        assert_eq!(result.permit_data.len(), 224);
        assert_eq!(
            &result.permit_data[0..32],
            &encode_uint(1_700_000_000u64.into(), 256).unwrap()
        );
        assert_eq!(decode_uint(&result.permit_data[32..64]), result.nonce);
        assert_eq!(decode_uint(&result.permit_data[64..96]), 0x60u8.into());
        assert_eq!(decode_uint(&result.permit_data[96..128]), 65u8.into());
        assert_eq!(&result.permit_data[128..193], &result.signature.to_bytes());
        assert_eq!(&result.permit_data[193..224], &[0u8; 31]);
    }

    fn unix_now_for_test() -> Uint256 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .into()
    }

    #[test]
    fn pinned_version_skips_probe() {
        let transport = MockTransport::new(
            Ok(positions_with_nonce(5)),
            abi_name("Uniswap v4 Positions NFT"),
        );
        let signer = MockSigner::new();
        let mut config = full_config();
        config.version = Some(PermitVersion::V4);
        let mut session = PermitSession::new(&transport, &signer, config);

        block_on(session.sign_permit_nft(1_700_000_000u64.into())).unwrap();

        assert_eq!(session.detected_version(), Some(PermitVersion::V4));
        // only name() was fetched, never positions()
        for request in transport.requests.borrow().iter() {
            assert_eq!(&request.data.0[0..4], &derive_method_id("name()"));
        }
    }

    #[test]
    fn missing_spender_is_not_applicable() {
        let transport = MockTransport::new(Ok(positions_with_nonce(5)), abi_name("NFT"));
        let signer = MockSigner::new();
        let mut config = full_config();
        config.spender = None;
        let mut session = PermitSession::new(&transport, &signer, config);

        assert!(matches!(session.state(), PermitState::NotApplicable));
        assert!(block_on(session.sign_permit_nft(1_700_000_000u64.into())).is_none());
        assert!(matches!(session.state(), PermitState::NotApplicable));
        assert!(transport.requests.borrow().is_empty());
    }

    #[test]
    fn second_sign_after_success_is_a_noop() {
        let transport = MockTransport::new(
            Ok(positions_with_nonce(5)),
            abi_name("Uniswap V3 Positions NFT-V1"),
        );
        let signer = MockSigner::new();
        let mut session = PermitSession::new(&transport, &signer, full_config());

        assert!(block_on(session.sign_permit_nft(1_700_000_000u64.into())).is_some());
        let requests_after_first = transport.requests.borrow().len();

        // the session is Signed, a second request must not re-enter
        assert!(block_on(session.sign_permit_nft(1_700_000_000u64.into())).is_none());
        assert!(matches!(session.state(), PermitState::Signed(_)));
        assert_eq!(transport.requests.borrow().len(), requests_after_first);
    }

    #[test]
    fn empty_name_fails_and_retry_recovers() {
        let transport = MockTransport::new(Ok(positions_with_nonce(7)), Vec::new());
        let signer = MockSigner::new();
        let mut session = PermitSession::new(&transport, &signer, full_config());

        assert!(block_on(session.sign_permit_nft(1_700_000_000u64.into())).is_none());
        assert!(matches!(session.error(), Some(SignetError::ContractNameError)));

        // the contract starts answering, a retry from Failed succeeds
        *transport.name.borrow_mut() = abi_name("Uniswap V3 Positions NFT-V1");
        let result = block_on(session.sign_permit_nft(1_700_000_000u64.into())).unwrap();
        assert_eq!(result.nonce, 7u8.into());
        assert!(matches!(session.state(), PermitState::Signed(_)));
    }

    #[test]
    fn token_change_resets_detection() {
        let transport = MockTransport::new(
            Ok(positions_with_nonce(5)),
            abi_name("Uniswap V3 Positions NFT-V1"),
        );
        let signer = MockSigner::new();
        let mut session = PermitSession::new(&transport, &signer, full_config());

        block_on(session.sign_permit_nft(1_700_000_000u64.into())).unwrap();
        assert_eq!(session.detected_version(), Some(PermitVersion::V3));

        let mut config = full_config();
        config.token_id = Some(515151u32.into());
        session.set_config(config);
        assert!(matches!(session.state(), PermitState::ReadyToSign));
        assert_eq!(session.detected_version(), None);

        // losing the account pushes the session into NotApplicable
        let mut config = full_config();
        config.account = None;
        session.set_config(config);
        assert!(matches!(session.state(), PermitState::NotApplicable));
    }

    #[test]
    fn typed_data_domain_shape() {
        let contract: Address = "0xc36442b4a4522e871399cd717abdd847ab11fe88".parse().unwrap();
        let spender: Address = "0x2222222222222222222222222222222222222222".parse().unwrap();
        let v3 = build_typed_data(
            PermitVersion::V3,
            "Uniswap V3 Positions NFT-V1",
            1,
            contract,
            spender,
            42u8.into(),
            5u8.into(),
            1_700_000_000u64.into(),
        );
        let v3: serde_json::Value = serde_json::from_str(&v3).unwrap();
        assert_eq!(v3["domain"]["version"], "1");
        assert_eq!(v3["domain"]["chainId"], 1);
        assert_eq!(v3["primaryType"], "Permit");
        assert_eq!(v3["message"]["nonce"], "5");
        assert_eq!(v3["message"]["tokenId"], "42");
        assert_eq!(
            v3["message"]["spender"],
            "0x2222222222222222222222222222222222222222"
        );
        assert_eq!(v3["types"]["EIP712Domain"].as_array().unwrap().len(), 4);

        let v4 = build_typed_data(
            PermitVersion::V4,
            "Uniswap v4 Positions NFT",
            1,
            contract,
            spender,
            42u8.into(),
            5u8.into(),
            1_700_000_000u64.into(),
        );
        let v4: serde_json::Value = serde_json::from_str(&v4).unwrap();
        // no version field in a v4 domain, this is a real incompatibility
        assert!(v4["domain"].get("version").is_none());
        assert_eq!(v4["types"]["EIP712Domain"].as_array().unwrap().len(), 3);
    }
}
