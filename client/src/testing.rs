// Scripted wallet and helpers shared by unit tests

use async_trait::async_trait;
use ethers_core::types::{Address, H256, U64};
use futures::future::LocalBoxFuture;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::time::Duration;

use crate::error::{codes, RpcError};
use crate::provider::Eip1193;
use crate::timer::Timer;

/// Network the bundled artifact is deployed on
pub const NETWORK_ID: &str = "1337";

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

/// App address `nameToApp` reports for registered names
pub fn existing_app() -> Address {
    Address::repeat_byte(0x99)
}

pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[derive(Default)]
struct WalletState {
    accounts: Vec<Address>,
    reject_accounts: bool,
    legacy_only: bool,
    methods: Vec<String>,
    sent: Vec<Value>,
    send_error: Option<RpcError>,
    mined: Option<(u64, bool)>,
    head: Option<u64>,
    groups: Vec<[u8; 32]>,
}

/// In-memory EIP-1193 provider
///
/// Receipts stay pending until `mine` is called, after which every hash is
/// reported as included in the given block.
pub struct MockWallet {
    state: RefCell<WalletState>,
}

impl MockWallet {
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            state: RefCell::new(WalletState {
                accounts,
                ..WalletState::default()
            }),
        }
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        let mut state = self.state.borrow_mut();
        state.accounts = accounts;
        state.reject_accounts = false;
    }

    pub fn reject_accounts(&self) {
        self.state.borrow_mut().reject_accounts = true;
    }

    /// Only the pre-EIP-1102 `enable()` path works
    pub fn legacy_only(&self) {
        self.state.borrow_mut().legacy_only = true;
    }

    pub fn reject_send(&self) {
        self.fail_send(RpcError::new(
            codes::USER_REJECTED,
            "MetaMask Tx Signature: User denied transaction signature.",
        ));
    }

    pub fn fail_send(&self, err: RpcError) {
        self.state.borrow_mut().send_error = Some(err);
    }

    pub fn accept_send(&self) {
        self.state.borrow_mut().send_error = None;
    }

    pub fn mine(&self, block: u64, success: bool) {
        self.state.borrow_mut().mined = Some((block, success));
    }

    pub fn set_head(&self, block: u64) {
        self.state.borrow_mut().head = Some(block);
    }

    pub fn register_group(&self, fixed_name: [u8; 32]) {
        self.state.borrow_mut().groups.push(fixed_name);
    }

    /// Every method requested so far, in order
    pub fn methods(&self) -> Vec<String> {
        self.state.borrow().methods.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state
            .borrow()
            .methods
            .iter()
            .filter(|m| *m == method)
            .count()
    }

    /// Transaction objects passed to `eth_sendTransaction`
    pub fn sent_transactions(&self) -> Vec<Value> {
        self.state.borrow().sent.clone()
    }

    fn accounts(&self) -> Result<Value, RpcError> {
        let state = self.state.borrow();
        if state.reject_accounts {
            return Err(RpcError::new(codes::USER_REJECTED, "User rejected the request."));
        }
        Ok(json!(state.accounts))
    }

    fn name_to_app(&self, params: &Value) -> Result<Value, RpcError> {
        let data = params[0]["data"].as_str().unwrap_or_default();
        let bytes = hex::decode(data.trim_start_matches("0x"))
            .map_err(|e| RpcError::new(codes::INTERNAL_ERROR, e.to_string()))?;
        let name = bytes.get(4..36).unwrap_or_default();

        let taken = self.state.borrow().groups.iter().any(|g| g[..] == *name);
        let app = if taken { existing_app() } else { Address::zero() };
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(app.as_bytes());
        Ok(json!(format!("0x{}", hex::encode(word))))
    }

    fn receipt(&self, params: &Value) -> Value {
        match self.state.borrow().mined {
            Some((block, success)) => json!({
                "transactionHash": params[0],
                "blockNumber": U64::from(block),
                "status": if success { "0x1" } else { "0x0" },
                "gasUsed": "0x5208",
            }),
            None => Value::Null,
        }
    }
}

#[async_trait(?Send)]
impl Eip1193 for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.state.borrow_mut().methods.push(method.to_string());

        match method {
            "eth_requestAccounts" => {
                if self.state.borrow().legacy_only {
                    return Err(RpcError::new(codes::METHOD_NOT_FOUND, "method not found"));
                }
                self.accounts()
            }
            "eth_call" => self.name_to_app(&params),
            "eth_sendTransaction" => {
                let mut state = self.state.borrow_mut();
                state.sent.push(params[0].clone());
                if let Some(err) = state.send_error.clone() {
                    return Err(err);
                }
                Ok(json!(H256::from_low_u64_be(state.sent.len() as u64)))
            }
            "eth_getTransactionReceipt" => Ok(self.receipt(&params)),
            "eth_blockNumber" => {
                let state = self.state.borrow();
                let head = state
                    .head
                    .or(state.mined.map(|(block, _)| block))
                    .unwrap_or(0);
                Ok(json!(U64::from(head)))
            }
            other => Err(RpcError::new(
                codes::METHOD_NOT_FOUND,
                format!("{} not scripted", other),
            )),
        }
    }

    async fn enable(&self) -> Result<Value, RpcError> {
        self.state.borrow_mut().methods.push("enable".to_string());
        self.accounts()
    }
}
