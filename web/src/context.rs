// Global app context using Dioxus context API
// One instance per page load; every handle inside is an Rc clone of the same state

use anyhow::{Context, Result};
use dioxus::prelude::*;
use ethers_core::types::{Address, H256};
use staircase_client::session::SessionEvent;
use staircase_client::{
    ClientConfig, ContractSlot, DeploymentRegistry, DraftField, DurationUnit, Eip1193, FormState,
    GroupDraft, ModalVisibility, ProviderBinding, SubmissionController, SubmissionDeps,
    SubmissionState, WalletSession, GROUP_DEPLOYER_ARTIFACT,
};
use std::rc::Rc;

use crate::services::{GlooTimer, InjectedProvider};

const EMBEDDED_CONFIG: &str = include_str!("../staircase.toml");

#[derive(Clone)]
pub struct AppContext {
    pub session: WalletSession,
    pub form: FormState,
    pub modal: ModalVisibility,
    pub controller: SubmissionController,
    pub duration_unit: DurationUnit,
    pub network_id: Rc<str>,
}

// Contexts are compared by identity only
impl PartialEq for AppContext {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.network_id, &other.network_id)
    }
}

impl AppContext {
    pub fn from_embedded_config() -> Result<Self> {
        let config = ClientConfig::from_toml_str(EMBEDDED_CONFIG)
            .context("Invalid embedded staircase.toml")?;
        let registry = DeploymentRegistry::from_artifact(GROUP_DEPLOYER_ARTIFACT)
            .context("Invalid bundled GroupDeployer artifact")?;

        let provider = InjectedProvider::detect().map(|p| Rc::new(p) as Rc<dyn Eip1193>);
        let session = WalletSession::new(ProviderBinding::new(provider));
        let contract = ContractSlot::attach(&session, Rc::new(registry), config.network.id.clone());

        let form = FormState::new();
        let modal = ModalVisibility::new();
        let controller = SubmissionController::new(SubmissionDeps {
            session: session.clone(),
            contract,
            form: form.clone(),
            modal: modal.clone(),
            timer: Rc::new(GlooTimer),
            params: config.codec_params(),
            confirmation: config.confirmation_policy(),
        });

        Ok(Self {
            session,
            form,
            modal,
            controller,
            duration_unit: config.codec.duration_unit,
            network_id: Rc::from(config.network.id.as_str()),
        })
    }
}

/// A group this page created during the current visit
#[derive(Clone, Debug, PartialEq)]
pub struct CreatedGroup {
    pub name: String,
    pub symbol: String,
    pub transaction: H256,
}

/// Reactive mirrors of the client state, owned by the root component
///
/// The client crate notifies through plain callbacks; each one is forwarded
/// into a signal here so components re-render.
#[derive(Clone, Copy)]
pub struct UiSignals {
    pub account: Signal<Option<Address>>,
    pub modal_open: Signal<bool>,
    pub submission: Signal<SubmissionState>,
    pub draft: Signal<GroupDraft>,
    pub created: Signal<Vec<CreatedGroup>>,
    pub field_errors: Signal<Vec<(DraftField, String)>>,
    pub banner: Signal<Option<String>>,
}

impl UiSignals {
    pub fn wire(ctx: &AppContext) -> Self {
        let ui = Self {
            account: Signal::new(ctx.session.address()),
            modal_open: Signal::new(ctx.modal.is_open()),
            submission: Signal::new(ctx.controller.state()),
            draft: Signal::new(ctx.form.snapshot()),
            created: Signal::new(Vec::new()),
            field_errors: Signal::new(Vec::new()),
            banner: Signal::new(None),
        };

        ctx.session.subscribe(move |event| match event {
            SessionEvent::Connected { address, epoch, .. } => {
                log::info!("Wallet session {} connected as {:?}", epoch, address);
                let mut account = ui.account;
                account.set(Some(*address));
            }
        });
        ctx.modal.subscribe(move |open| {
            let mut modal_open = ui.modal_open;
            modal_open.set(open);
        });
        ctx.controller.subscribe(move |state| {
            let mut submission = ui.submission;
            submission.set(*state);
        });
        ctx.form.subscribe(move |draft| {
            let mut mirror = ui.draft;
            mirror.set(draft.clone());
        });

        ui
    }
}
