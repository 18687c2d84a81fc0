//! Injected wallet provider access
//!
//! [`Eip1193`] is the seam to whatever the browser injects (`window.ethereum`
//! in the web build, a scripted wallet in tests). [`ProviderBinding`] turns it
//! into the connect capability, and [`Signer`] is the per-account capability
//! that authorizes state-changing calls.

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U256, U64};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::rc::Rc;

use crate::error::{codes, ChainError, ConnectError, RpcError};

/// EIP-1193 request surface of an injected provider
#[async_trait(?Send)]
pub trait Eip1193 {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Legacy `ethereum.enable()` entry point, still exposed by older wallets
    async fn enable(&self) -> Result<Value, RpcError> {
        Err(RpcError::unsupported("enable"))
    }
}

/// Stateless connect capability over an optional injected provider
#[derive(Clone)]
pub struct ProviderBinding {
    provider: Option<Rc<dyn Eip1193>>,
}

impl ProviderBinding {
    pub fn new(provider: Option<Rc<dyn Eip1193>>) -> Self {
        Self { provider }
    }

    /// No provider injected; the page should offer an install link
    pub fn missing() -> Self {
        Self { provider: None }
    }

    pub fn is_present(&self) -> bool {
        self.provider.is_some()
    }

    /// Ask the wallet for account access and return the primary account
    pub async fn connect(&self) -> Result<Address, ConnectError> {
        let provider = self.provider.as_ref().ok_or(ConnectError::ProviderMissing)?;

        tracing::info!("Requesting wallet account access");
        let accounts = match provider.request("eth_requestAccounts", json!([])).await {
            Ok(accounts) => accounts,
            Err(e) if e.is_unsupported() => {
                tracing::debug!("eth_requestAccounts unsupported, falling back to enable()");
                provider.enable().await.map_err(connect_error)?
            }
            Err(e) => return Err(connect_error(e)),
        };

        let accounts: Vec<Address> = serde_json::from_value(accounts).map_err(|e| {
            ConnectError::Provider(RpcError::new(
                codes::INTERNAL_ERROR,
                format!("Malformed account list: {}", e),
            ))
        })?;

        match accounts.first() {
            Some(address) => {
                tracing::info!("Wallet connected: {:?}", address);
                Ok(*address)
            }
            None => {
                tracing::warn!("Wallet granted access but returned no accounts");
                Err(ConnectError::UserRejected)
            }
        }
    }

    /// Signing capability for an account this provider has authorized
    pub fn signer_for(&self, address: Address) -> Option<Signer> {
        self.provider.as_ref().map(|provider| Signer {
            address,
            provider: Rc::clone(provider),
        })
    }
}

fn connect_error(err: RpcError) -> ConnectError {
    if err.is_user_rejection() || err.code == codes::UNAUTHORIZED {
        ConnectError::UserRejected
    } else {
        ConnectError::Provider(err)
    }
}

/// Inclusion record of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: H256,
    pub block_number: u64,
    pub gas_used: Option<U256>,
    pub succeeded: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: H256,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    gas_used: Option<U256>,
}

/// One authorized account on the injected provider
#[derive(Clone)]
pub struct Signer {
    address: Address,
    provider: Rc<dyn Eip1193>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Read-only call against the latest block
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx = json!({ "from": self.address, "to": to, "data": data });
        let result = self
            .provider
            .request("eth_call", json!([tx, "latest"]))
            .await?;
        decode(result, "eth_call")
    }

    /// Have the wallet sign and broadcast; resolves once a hash exists
    pub async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, ChainError> {
        let tx = json!({ "from": self.address, "to": to, "data": data });
        let result = self
            .provider
            .request("eth_sendTransaction", json!([tx]))
            .await?;
        decode(result, "eth_sendTransaction")
    }

    /// `None` while the transaction is still pending
    pub async fn transaction_receipt(&self, hash: H256) -> Result<Option<TxReceipt>, ChainError> {
        let result = self
            .provider
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        let raw: Option<RawReceipt> = decode(result, "eth_getTransactionReceipt")?;

        Ok(raw.and_then(|raw| {
            raw.block_number.map(|block| TxReceipt {
                transaction_hash: raw.transaction_hash,
                block_number: block.as_u64(),
                gas_used: raw.gas_used,
                // Pre-Byzantium receipts carry no status; treat them as success
                succeeded: raw.status.map_or(true, |s| !s.is_zero()),
            })
        }))
    }

    pub async fn block_number(&self) -> Result<u64, ChainError> {
        let result = self
            .provider
            .request("eth_blockNumber", json!([]))
            .await?;
        let block: U64 = decode(result, "eth_blockNumber")?;
        Ok(block.as_u64())
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, method: &str) -> Result<T, ChainError> {
    serde_json::from_value(value)
        .map_err(|e| ChainError::Decode(format!("{} returned {}", method, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{alice, bob, MockWallet};

    fn binding(wallet: &Rc<MockWallet>) -> ProviderBinding {
        let provider: Rc<dyn Eip1193> = wallet.clone();
        ProviderBinding::new(Some(provider))
    }

    #[tokio::test]
    async fn connect_without_provider_reports_missing() {
        let err = ProviderBinding::missing().connect().await.unwrap_err();
        assert_eq!(err, ConnectError::ProviderMissing);
    }

    #[tokio::test]
    async fn connect_returns_primary_account() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice(), bob()]));
        let address = binding(&wallet).connect().await.unwrap();
        assert_eq!(address, alice());
        assert_eq!(wallet.methods(), vec!["eth_requestAccounts"]);
    }

    #[tokio::test]
    async fn rejected_access_maps_to_user_rejected() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        wallet.reject_accounts();
        let err = binding(&wallet).connect().await.unwrap_err();
        assert_eq!(err, ConnectError::UserRejected);
    }

    #[tokio::test]
    async fn empty_account_list_is_a_rejection() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![]));
        let err = binding(&wallet).connect().await.unwrap_err();
        assert_eq!(err, ConnectError::UserRejected);
    }

    #[tokio::test]
    async fn legacy_wallets_connect_through_enable() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![bob()]));
        wallet.legacy_only();
        let address = binding(&wallet).connect().await.unwrap();
        assert_eq!(address, bob());
        assert_eq!(wallet.methods(), vec!["eth_requestAccounts", "enable"]);
    }

    #[tokio::test]
    async fn pending_receipt_is_none_and_mined_receipt_decodes() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let signer = binding(&wallet).signer_for(alice()).unwrap();
        let hash = H256::repeat_byte(0xab);

        assert_eq!(signer.transaction_receipt(hash).await.unwrap(), None);

        wallet.mine(0x10, true);
        let receipt = signer.transaction_receipt(hash).await.unwrap().unwrap();
        assert_eq!(receipt.transaction_hash, hash);
        assert_eq!(receipt.block_number, 0x10);
        assert!(receipt.succeeded);
    }
}
