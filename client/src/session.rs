// Wallet session lifecycle
// Disconnected on page load, connected only by explicit user action, never auto-reconnects

use ethers_core::types::Address;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{ConnectError, SessionError};
use crate::provider::{ProviderBinding, Signer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected { address: Address },
}

/// What to do when `connect` is called on an already-connected session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectPolicy {
    /// Return the current account without prompting
    #[default]
    ReuseExisting,
    /// Prompt the wallet again, possibly switching accounts
    Reauthenticate,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connected {
        address: Address,
        epoch: u64,
        signer: Signer,
    },
}

type SessionListener = Rc<dyn Fn(&SessionEvent)>;

/// Shared wallet session handle
///
/// Clones share state. The provider binding is only written by `connect`;
/// everything else reads.
#[derive(Clone)]
pub struct WalletSession {
    inner: Rc<SessionInner>,
}

struct SessionInner {
    binding: ProviderBinding,
    state: Cell<SessionState>,
    epoch: Cell<u64>,
    listeners: RefCell<Vec<SessionListener>>,
}

impl WalletSession {
    pub fn new(binding: ProviderBinding) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                binding,
                state: Cell::new(SessionState::Disconnected),
                epoch: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.get()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), SessionState::Connected { .. })
    }

    pub fn address(&self) -> Option<Address> {
        match self.state() {
            SessionState::Connected { address } => Some(address),
            SessionState::Disconnected => None,
        }
    }

    /// Incremented on every successful connect
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.get()
    }

    pub fn provider_present(&self) -> bool {
        self.inner.binding.is_present()
    }

    pub async fn connect(&self, policy: ConnectPolicy) -> Result<Address, ConnectError> {
        if let (Some(address), ConnectPolicy::ReuseExisting) = (self.address(), policy) {
            tracing::debug!("Session already connected as {:?}", address);
            return Ok(address);
        }

        let address = match self.inner.binding.connect().await {
            Ok(address) => address,
            Err(e) => {
                // A failed re-authentication leaves the previous account in place
                tracing::warn!("Wallet connect failed: {}", e);
                return Err(e);
            }
        };
        let signer = self
            .inner
            .binding
            .signer_for(address)
            .ok_or(ConnectError::ProviderMissing)?;

        let epoch = self.inner.epoch.get() + 1;
        self.inner.epoch.set(epoch);
        self.inner.state.set(SessionState::Connected { address });
        tracing::info!("Session connected: {:?} (epoch {})", address, epoch);

        self.emit(SessionEvent::Connected {
            address,
            epoch,
            signer,
        });
        Ok(address)
    }

    /// Signing capability; fails fast while disconnected
    pub fn signer(&self) -> Result<Signer, SessionError> {
        let address = self.address().ok_or(SessionError::NotConnected)?;
        self.inner
            .binding
            .signer_for(address)
            .ok_or(SessionError::NotConnected)
    }

    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn emit(&self, event: SessionEvent) {
        let listeners: Vec<SessionListener> = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Eip1193;
    use crate::testing::{alice, bob, MockWallet};

    fn session_over(wallet: &Rc<MockWallet>) -> WalletSession {
        let provider: Rc<dyn Eip1193> = wallet.clone();
        WalletSession::new(ProviderBinding::new(Some(provider)))
    }

    #[test]
    fn starts_disconnected_without_signer() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let session = session_over(&wallet);
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.signer().unwrap_err(), SessionError::NotConnected);
        assert!(wallet.methods().is_empty());
    }

    #[tokio::test]
    async fn reconnect_reuses_existing_account_without_prompt() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let session = session_over(&wallet);

        assert_eq!(session.connect(ConnectPolicy::default()).await.unwrap(), alice());
        assert_eq!(session.connect(ConnectPolicy::ReuseExisting).await.unwrap(), alice());

        assert_eq!(wallet.methods(), vec!["eth_requestAccounts"]);
        assert_eq!(session.epoch(), 1);
    }

    #[tokio::test]
    async fn reauthenticate_prompts_and_notifies_subscribers() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let session = session_over(&wallet);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(move |SessionEvent::Connected { address, epoch, .. }| {
            sink.borrow_mut().push((*address, *epoch));
        });

        session.connect(ConnectPolicy::ReuseExisting).await.unwrap();
        wallet.set_accounts(vec![bob()]);
        session.connect(ConnectPolicy::Reauthenticate).await.unwrap();

        assert_eq!(*events.borrow(), vec![(alice(), 1), (bob(), 2)]);
        assert_eq!(session.signer().unwrap().address(), bob());
    }

    #[tokio::test]
    async fn rejection_keeps_session_disconnected_and_is_retryable() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        wallet.reject_accounts();
        let session = session_over(&wallet);

        let err = session.connect(ConnectPolicy::default()).await.unwrap_err();
        assert_eq!(err, ConnectError::UserRejected);
        assert!(!session.is_connected());

        wallet.set_accounts(vec![alice()]);
        assert_eq!(session.connect(ConnectPolicy::default()).await.unwrap(), alice());
    }

    #[tokio::test]
    async fn missing_provider_is_reported_not_panicked() {
        let session = WalletSession::new(ProviderBinding::missing());
        assert!(!session.provider_present());
        let err = session.connect(ConnectPolicy::default()).await.unwrap_err();
        assert_eq!(err, ConnectError::ProviderMissing);
    }
}
