//! Group creation submission pipeline
//!
//! One [`SubmissionController`] drives a submission through
//! `Idle -> Validating -> Encoding -> AwaitingSignature -> AwaitingConfirmation`
//! and ends in `Succeeded` or `Failed`. Only one submission is in flight at a
//! time. A failure leaves the form and the dialog exactly as the user left
//! them so the attempt can be corrected and retried.

use ethers_core::types::H256;
use futures::future::{AbortHandle, Abortable};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::codec::{validate_draft, CodecParams, EncodedGroupArgs};
use crate::contract::{ConfirmationPolicy, ContractSlot};
use crate::draft::FormState;
use crate::error::{SubmitError, SurfacedError};
use crate::provider::TxReceipt;
use crate::session::WalletSession;
use crate::timer::Timer;
use crate::watch::{ModalVisibility, Watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    Encoding,
    AwaitingSignature,
    AwaitingConfirmation,
    Succeeded,
    Failed,
}

impl SubmissionState {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            SubmissionState::Validating
                | SubmissionState::Encoding
                | SubmissionState::AwaitingSignature
                | SubmissionState::AwaitingConfirmation
        )
    }

    /// Status line for the dialog
    pub fn label(self) -> &'static str {
        match self {
            SubmissionState::Idle => "",
            SubmissionState::Validating => "Checking inputs...",
            SubmissionState::Encoding => "Preparing transaction...",
            SubmissionState::AwaitingSignature => "Confirm the transaction in your wallet",
            SubmissionState::AwaitingConfirmation => "Waiting for confirmation...",
            SubmissionState::Succeeded => "Group created",
            SubmissionState::Failed => "Group creation failed",
        }
    }
}

/// Everything a submission reads from or writes to
pub struct SubmissionDeps {
    pub session: WalletSession,
    pub contract: ContractSlot,
    pub form: FormState,
    pub modal: ModalVisibility,
    pub timer: Rc<dyn Timer>,
    pub params: CodecParams,
    pub confirmation: ConfirmationPolicy,
}

#[derive(Clone)]
pub struct SubmissionController {
    inner: Rc<ControllerInner>,
}

struct ControllerInner {
    deps: SubmissionDeps,
    state: Watch<SubmissionState>,
    last_error: RefCell<Option<SurfacedError>>,
    last_receipt: RefCell<Option<TxReceipt>>,
    pending: Cell<Option<H256>>,
    abort: RefCell<Option<AbortHandle>>,
}

impl SubmissionController {
    pub fn new(deps: SubmissionDeps) -> Self {
        Self {
            inner: Rc::new(ControllerInner {
                deps,
                state: Watch::default(),
                last_error: RefCell::new(None),
                last_receipt: RefCell::new(None),
                pending: Cell::new(None),
                abort: RefCell::new(None),
            }),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.inner.state.get()
    }

    pub fn last_error(&self) -> Option<SurfacedError> {
        self.inner.last_error.borrow().clone()
    }

    pub fn last_receipt(&self) -> Option<TxReceipt> {
        self.inner.last_receipt.borrow().clone()
    }

    /// Hash of the broadcast transaction of the current or last attempt
    pub fn pending_transaction(&self) -> Option<H256> {
        self.inner.pending.get()
    }

    pub fn subscribe(&self, listener: impl Fn(&SubmissionState) + 'static) {
        self.inner.state.subscribe(listener);
    }

    /// Create a group from the current form contents
    ///
    /// Rejected with [`SubmitError::Busy`] while another submission is in
    /// flight; the running one is unaffected. `Succeeded` and `Failed` are
    /// terminal but not blocking: submitting from either starts a fresh
    /// attempt, so a failure can be retried without an explicit [`reset`].
    ///
    /// Dropping the returned future before it resolves abandons the attempt
    /// and leaves the controller `Failed` with [`SubmitError::Cancelled`].
    ///
    /// [`reset`]: SubmissionController::reset
    pub async fn submit(&self) -> Result<TxReceipt, SubmitError> {
        if self.state().is_in_flight() {
            tracing::warn!("Submit ignored: {:?} in progress", self.state());
            return Err(SubmitError::Busy);
        }

        self.inner.last_error.replace(None);
        self.inner.last_receipt.replace(None);
        self.inner.pending.set(None);

        let mut guard = AbandonGuard {
            controller: self,
            armed: true,
        };
        let result = self.run().await;
        guard.armed = false;
        match &result {
            Ok(receipt) => {
                tracing::info!(
                    "Group created in block {} ({:?})",
                    receipt.block_number,
                    receipt.transaction_hash
                );
                self.inner.last_receipt.replace(Some(receipt.clone()));
                self.inner.deps.modal.close();
                self.inner.deps.form.clear();
                self.transition(SubmissionState::Succeeded);
            }
            Err(e) => {
                tracing::error!("Group creation failed: {}", e);
                self.inner.last_error.replace(Some(e.surface()));
                self.transition(SubmissionState::Failed);
            }
        }
        result
    }

    async fn run(&self) -> Result<TxReceipt, SubmitError> {
        let deps = &self.inner.deps;

        // No RPC traffic at all without a usable signer
        let factory = deps.contract.current(&deps.session)?;

        self.transition(SubmissionState::Validating);
        let draft = deps.form.snapshot();
        let checked = validate_draft(&draft, &deps.params)?;

        self.transition(SubmissionState::Encoding);
        let args = EncodedGroupArgs::new(checked, factory.signer().address());
        let calldata = factory
            .create_call(&args)
            .map_err(|e| SubmitError::Encoding(e.to_string()))?;
        if let Some(address) = factory.lookup_existing(args.fixed_name).await? {
            return Err(SubmitError::GroupExists {
                name: args.name,
                address,
            });
        }

        self.transition(SubmissionState::AwaitingSignature);
        let pending = factory.send_create(calldata).await?;
        self.inner.pending.set(Some(pending.hash()));

        self.transition(SubmissionState::AwaitingConfirmation);
        let (handle, registration) = AbortHandle::new_pair();
        self.inner.abort.replace(Some(handle));
        let confirmed = Abortable::new(
            pending.confirm(&deps.confirmation, deps.timer.as_ref()),
            registration,
        )
        .await;
        self.inner.abort.replace(None);

        match confirmed {
            Ok(receipt) => Ok(receipt?),
            Err(_aborted) => Err(SubmitError::Cancelled),
        }
    }

    /// Stop waiting for the pending transaction
    ///
    /// Only effective while awaiting confirmation; a broadcast transaction
    /// may still be mined afterwards. Returns whether anything was cancelled.
    pub fn cancel(&self) -> bool {
        match self.inner.abort.borrow_mut().take() {
            Some(handle) => {
                tracing::info!("Cancelling confirmation wait");
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Back to `Idle` after the page has shown the outcome
    pub fn reset(&self) {
        if self.state().is_in_flight() {
            return;
        }
        self.inner.last_error.replace(None);
        self.transition(SubmissionState::Idle);
    }

    fn transition(&self, next: SubmissionState) {
        let current = self.state();
        tracing::debug!("Submission {:?} -> {:?}", current, next);
        self.inner.state.set(next);
    }
}

/// Settles a submission whose future was dropped mid-flight
struct AbandonGuard<'a> {
    controller: &'a SubmissionController,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let controller = self.controller;
        tracing::warn!("Submission abandoned while {:?}", controller.state());
        controller.inner.abort.replace(None);
        controller
            .inner
            .last_error
            .replace(Some(SubmitError::Cancelled.surface()));
        controller.transition(SubmissionState::Failed);
    }
}
