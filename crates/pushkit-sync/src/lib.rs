//! Update resolution and sync orchestration for over-the-air bundle releases.
//!
//! [`UpdateClient`] is the entry point: it checks a release source for a
//! newer release, decides whether it is installable, drives
//! download/install under the caller's [`pushkit_core::SyncOptions`] and
//! reports install outcomes back through the host's lifecycle bridge.

mod checker;
mod client;
mod coordinator;
mod error;
mod lifecycle;
mod policy;
mod reporter;
mod source;

pub use checker::UpdateChecker;
pub use client::UpdateClient;
pub use coordinator::{SyncCallbacks, SyncState};
pub use error::SyncError;
pub use lifecycle::AppLifecycle;
pub use policy::{should_ignore_offer, RollbackRetryPolicy};
pub use reporter::{ReadyError, StatusReporter};
pub use source::ReleaseSource;
