//! Group factory contract handle
//!
//! A [`GroupFactory`] is a deployment record bound to one [`Signer`]. The
//! [`ContractSlot`] keeps the current handle in step with the wallet session,
//! rebinding whenever the session (re)connects.

use ethers_core::abi::{Function, Token};
use ethers_core::types::{Address, Bytes, H256};
use futures::future::{self, Either};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::codec::EncodedGroupArgs;
use crate::error::{BindError, ChainError, SessionError, SubmitError};
use crate::provider::{Signer, TxReceipt};
use crate::registry::DeploymentRegistry;
use crate::session::{SessionEvent, WalletSession};
use crate::timer::Timer;

pub const NAME_TO_APP: &str = "nameToApp";
pub const CREATE_NEW_GROUP: &str = "createNewGroup";

/// How long and how deep to wait for a broadcast transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Blocks including the transaction's own; 1 means "mined"
    pub confirmations: u64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(1500),
            confirmations: 1,
        }
    }
}

#[derive(Clone)]
pub struct GroupFactory {
    address: Address,
    name_to_app: Function,
    create_new_group: Function,
    signer: Signer,
}

impl GroupFactory {
    /// Resolve `network_id` to a deployment and bind it to `signer`
    pub fn bind(
        registry: &DeploymentRegistry,
        network_id: &str,
        signer: Signer,
    ) -> Result<Self, BindError> {
        let record = registry.get(network_id)?;
        let function = |name: &'static str| {
            record
                .abi
                .function(name)
                .cloned()
                .map_err(|_| BindError::MissingFunction(name))
        };
        let name_to_app = function(NAME_TO_APP)?;
        let create_new_group = function(CREATE_NEW_GROUP)?;

        tracing::info!(
            "Bound group factory {:?} on network {} for {:?}",
            record.address,
            network_id,
            signer.address()
        );
        Ok(Self {
            address: record.address,
            name_to_app,
            create_new_group,
            signer,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Address of the group registered under `fixed_name`, if any
    pub async fn lookup_existing(&self, fixed_name: [u8; 32]) -> Result<Option<Address>, ChainError> {
        let function = &self.name_to_app;
        let data = function
            .encode_input(&[Token::FixedBytes(fixed_name.to_vec())])
            .map_err(|e| ChainError::Abi(format!("nameToApp input: {}", e)))?;

        let output = self.signer.call(self.address, data.into()).await?;
        let tokens = function
            .decode_output(&output)
            .map_err(|e| ChainError::Decode(format!("nameToApp output: {}", e)))?;

        match tokens.as_slice() {
            [Token::Address(app)] if app.is_zero() => Ok(None),
            [Token::Address(app)] => Ok(Some(*app)),
            other => Err(ChainError::Decode(format!(
                "nameToApp returned {:?}",
                other
            ))),
        }
    }

    /// ABI-encoded `createNewGroup` calldata
    pub fn create_call(&self, args: &EncodedGroupArgs) -> Result<Bytes, ChainError> {
        self.create_new_group
            .encode_input(&args.to_tokens())
            .map(Bytes::from)
            .map_err(|e| ChainError::Abi(format!("createNewGroup input: {}", e)))
    }

    /// Ask the wallet to sign and broadcast the call
    pub async fn send_create(&self, calldata: Bytes) -> Result<PendingTx, ChainError> {
        let hash = self.signer.send_transaction(self.address, calldata).await?;
        tracing::info!("createNewGroup broadcast: {:?}", hash);
        Ok(PendingTx {
            hash,
            signer: self.signer.clone(),
        })
    }

    /// Sign, broadcast, and wait for the receipt in one step
    pub async fn submit_create(
        &self,
        args: &EncodedGroupArgs,
        policy: &ConfirmationPolicy,
        timer: &dyn Timer,
    ) -> Result<TxReceipt, ChainError> {
        let calldata = self.create_call(args)?;
        let pending = self.send_create(calldata).await?;
        pending.confirm(policy, timer).await
    }
}

/// A broadcast transaction; dropping it only stops watching, the chain keeps it
pub struct PendingTx {
    hash: H256,
    signer: Signer,
}

impl PendingTx {
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Wait for the receipt and the configured depth, up to `policy.timeout`
    pub async fn confirm(
        &self,
        policy: &ConfirmationPolicy,
        timer: &dyn Timer,
    ) -> Result<TxReceipt, ChainError> {
        let wait = self.poll_receipt(policy, timer);
        futures::pin_mut!(wait);

        match future::select(wait, timer.sleep(policy.timeout)).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => {
                tracing::warn!(
                    "No receipt for {:?} after {:?}",
                    self.hash,
                    policy.timeout
                );
                Err(ChainError::NetworkTimeout)
            }
        }
    }

    async fn poll_receipt(
        &self,
        policy: &ConfirmationPolicy,
        timer: &dyn Timer,
    ) -> Result<TxReceipt, ChainError> {
        loop {
            if let Some(receipt) = self.signer.transaction_receipt(self.hash).await? {
                if !receipt.succeeded {
                    return Err(ChainError::Reverted { reason: None });
                }
                if policy.confirmations <= 1 {
                    return Ok(receipt);
                }
                let head = self.signer.block_number().await?;
                let depth = head.saturating_sub(receipt.block_number) + 1;
                if depth >= policy.confirmations {
                    return Ok(receipt);
                }
                tracing::debug!(
                    "{:?} has {}/{} confirmations",
                    self.hash,
                    depth,
                    policy.confirmations
                );
            }
            timer.sleep(policy.poll_interval).await;
        }
    }
}

/// The factory handle for the session's current signer
///
/// Rebinds on every session connect. A bind failure is kept and reported on
/// use rather than falling back to another network.
#[derive(Clone)]
pub struct ContractSlot {
    bound: Rc<RefCell<Option<Result<GroupFactory, BindError>>>>,
}

impl ContractSlot {
    pub fn attach(
        session: &WalletSession,
        registry: Rc<DeploymentRegistry>,
        network_id: impl Into<String>,
    ) -> Self {
        let network_id = network_id.into();
        let slot = Self {
            bound: Rc::new(RefCell::new(None)),
        };

        if let Ok(signer) = session.signer() {
            *slot.bound.borrow_mut() = Some(bind_logged(&registry, &network_id, signer));
        }

        let bound = Rc::clone(&slot.bound);
        session.subscribe(move |event| match event {
            SessionEvent::Connected { signer, .. } => {
                *bound.borrow_mut() = Some(bind_logged(&registry, &network_id, signer.clone()));
            }
        });

        slot
    }

    /// Handle for the current session account, or why there is none
    pub fn current(&self, session: &WalletSession) -> Result<GroupFactory, SubmitError> {
        let account = session.address().ok_or(SessionError::NotConnected)?;
        match &*self.bound.borrow() {
            None => Err(SessionError::NotConnected.into()),
            Some(Err(e)) => Err(e.clone().into()),
            Some(Ok(factory)) if factory.signer().address() != account => {
                Err(SessionError::StaleBinding {
                    bound: factory.signer().address(),
                    current: account,
                }
                .into())
            }
            Some(Ok(factory)) => Ok(factory.clone()),
        }
    }
}

fn bind_logged(
    registry: &DeploymentRegistry,
    network_id: &str,
    signer: Signer,
) -> Result<GroupFactory, BindError> {
    GroupFactory::bind(registry, network_id, signer).map_err(|e| {
        tracing::error!("Failed to bind group factory: {}", e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{validate_draft, CodecParams};
    use crate::draft::GroupDraft;
    use crate::provider::{Eip1193, ProviderBinding};
    use crate::registry::{DeploymentRecord, GROUP_DEPLOYER_ARTIFACT};
    use crate::session::ConnectPolicy;
    use crate::testing::{alice, bob, MockWallet, TokioTimer, NETWORK_ID};
    use ethers_core::abi::Abi;

    fn registry() -> Rc<DeploymentRegistry> {
        Rc::new(DeploymentRegistry::from_artifact(GROUP_DEPLOYER_ARTIFACT).unwrap())
    }

    fn session_over(wallet: &Rc<MockWallet>) -> WalletSession {
        let provider: Rc<dyn Eip1193> = wallet.clone();
        WalletSession::new(ProviderBinding::new(Some(provider)))
    }

    fn args_for(name: &str, beneficiary: Address) -> EncodedGroupArgs {
        let draft = GroupDraft {
            name: name.into(),
            accepted_rate: "0.05".into(),
            token_name: "AlphaToken".into(),
            token_symbol: "ALT".into(),
            loan_duration_months: "12".into(),
            interest_rate: "3".into(),
            ..GroupDraft::default()
        };
        let checked = validate_draft(&draft, &CodecParams::default()).unwrap();
        EncodedGroupArgs::new(checked, beneficiary)
    }

    #[test]
    fn bind_rejects_unknown_network_and_incomplete_abi() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let provider: Rc<dyn Eip1193> = wallet.clone();
        let signer = ProviderBinding::new(Some(provider)).signer_for(alice()).unwrap();

        let err = GroupFactory::bind(&registry(), "80001", signer.clone()).err();
        assert_eq!(err, Some(BindError::UnknownNetwork("80001".into())));

        let mut partial = DeploymentRegistry::new();
        partial.insert(
            "5",
            DeploymentRecord {
                address: Address::repeat_byte(7),
                abi: Rc::new(serde_json::from_str::<Abi>("[]").unwrap()),
            },
        );
        let err = GroupFactory::bind(&partial, "5", signer).err();
        assert_eq!(err, Some(BindError::MissingFunction(NAME_TO_APP)));
    }

    #[tokio::test]
    async fn slot_is_empty_until_connect_then_follows_account() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let session = session_over(&wallet);
        let slot = ContractSlot::attach(&session, registry(), NETWORK_ID);

        assert_eq!(
            slot.current(&session).err(),
            Some(SubmitError::Session(SessionError::NotConnected))
        );

        session.connect(ConnectPolicy::default()).await.unwrap();
        assert_eq!(slot.current(&session).unwrap().signer().address(), alice());

        wallet.set_accounts(vec![bob()]);
        session.connect(ConnectPolicy::Reauthenticate).await.unwrap();
        assert_eq!(slot.current(&session).unwrap().signer().address(), bob());
    }

    #[tokio::test]
    async fn slot_surfaces_bind_failure() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let session = session_over(&wallet);
        let slot = ContractSlot::attach(&session, registry(), "3");

        session.connect(ConnectPolicy::default()).await.unwrap();
        assert_eq!(
            slot.current(&session).err(),
            Some(SubmitError::Bind(BindError::UnknownNetwork("3".into())))
        );
    }

    #[tokio::test]
    async fn lookup_distinguishes_free_and_taken_names() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let session = session_over(&wallet);
        let slot = ContractSlot::attach(&session, registry(), NETWORK_ID);
        session.connect(ConnectPolicy::default()).await.unwrap();
        let factory = slot.current(&session).unwrap();

        let taken = args_for("Taken", alice());
        wallet.register_group(taken.fixed_name);

        assert_eq!(
            factory.lookup_existing(args_for("Free", alice()).fixed_name).await.unwrap(),
            None
        );
        assert!(factory.lookup_existing(taken.fixed_name).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_create_waits_for_mined_receipt() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        wallet.mine(0x20, true);
        let session = session_over(&wallet);
        let slot = ContractSlot::attach(&session, registry(), NETWORK_ID);
        session.connect(ConnectPolicy::default()).await.unwrap();
        let factory = slot.current(&session).unwrap();

        let args = args_for("Alpha", alice());
        let receipt = factory
            .submit_create(&args, &ConfirmationPolicy::default(), &TokioTimer)
            .await
            .unwrap();

        assert_eq!(receipt.block_number, 0x20);
        let sent = wallet.sent_transactions();
        assert_eq!(sent.len(), 1);
        let expected = factory.create_call(&args).unwrap();
        assert_eq!(sent[0]["data"], serde_json::to_value(&expected).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_times_out_without_receipt() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let session = session_over(&wallet);
        let slot = ContractSlot::attach(&session, registry(), NETWORK_ID);
        session.connect(ConnectPolicy::default()).await.unwrap();
        let factory = slot.current(&session).unwrap();

        let policy = ConfirmationPolicy {
            timeout: Duration::from_secs(30),
            ..ConfirmationPolicy::default()
        };
        let err = factory
            .submit_create(&args_for("Alpha", alice()), &policy, &TokioTimer)
            .await
            .unwrap_err();
        assert_eq!(err, ChainError::NetworkTimeout);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_and_confirmation_depth() {
        let wallet = Rc::new(MockWallet::with_accounts(vec![alice()]));
        let session = session_over(&wallet);
        let slot = ContractSlot::attach(&session, registry(), NETWORK_ID);
        session.connect(ConnectPolicy::default()).await.unwrap();
        let factory = slot.current(&session).unwrap();
        let calldata = factory.create_call(&args_for("Alpha", alice())).unwrap();

        wallet.mine(0x10, false);
        let pending = factory.send_create(calldata.clone()).await.unwrap();
        assert_eq!(
            pending
                .confirm(&ConfirmationPolicy::default(), &TokioTimer)
                .await
                .unwrap_err(),
            ChainError::Reverted { reason: None }
        );

        wallet.mine(0x10, true);
        wallet.set_head(0x11);
        let deep = ConfirmationPolicy {
            confirmations: 3,
            timeout: Duration::from_secs(10),
            ..ConfirmationPolicy::default()
        };
        let pending = factory.send_create(calldata).await.unwrap();
        assert_eq!(
            pending.confirm(&deep, &TokioTimer).await.unwrap_err(),
            ChainError::NetworkTimeout
        );
        wallet.set_head(0x12);
        assert_eq!(pending.confirm(&deep, &TokioTimer).await.unwrap().block_number, 0x10);
    }
}
