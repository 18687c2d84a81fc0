//! Wallet session and lending-group creation client
//!
//! Target-agnostic core of the Staircase front-end. The browser build plugs
//! in `window.ethereum` through [`Eip1193`] and a `setTimeout` [`Timer`];
//! tests plug in a scripted wallet and the tokio clock.

pub mod codec;
pub mod config;
pub mod contract;
pub mod controller;
pub mod draft;
pub mod error;
pub mod provider;
pub mod registry;
pub mod session;
pub mod timer;
pub mod watch;

#[cfg(test)]
mod testing;

pub use codec::{validate_draft, CodecParams, DurationUnit, EncodedGroupArgs};
pub use config::ClientConfig;
pub use contract::{ConfirmationPolicy, ContractSlot, GroupFactory};
pub use controller::{SubmissionController, SubmissionDeps, SubmissionState};
pub use draft::{DraftField, FormState, GroupDraft};
pub use error::{ConnectError, ErrorKind, SubmitError, SurfacedError};
pub use provider::{Eip1193, ProviderBinding, Signer, TxReceipt};
pub use registry::{DeploymentRegistry, GROUP_DEPLOYER_ARTIFACT};
pub use session::{ConnectPolicy, SessionState, WalletSession};
pub use timer::Timer;
pub use watch::{ModalVisibility, Watch};
