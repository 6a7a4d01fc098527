//! Filesystem emulation of the native half of an over-the-air update
//! client: the installed-release store, launch and rollback bookkeeping,
//! status report persistence and the download/install pipeline.

mod download;
mod layout;
mod state;
mod store;

pub use layout::DeviceLayout;
pub use state::{CurrentState, LastReport};
pub use store::{FsDeviceStore, LaunchOutcome};
