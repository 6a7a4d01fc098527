use std::fmt;
use std::sync::Arc;

use pushkit_core::{ReleaseHistoryFetcher, UpdateOracle};

/// Where update checks are answered. Chosen once when the client is built.
#[derive(Clone)]
pub enum ReleaseSource {
    /// Release history resolved on the device.
    History(Arc<dyn ReleaseHistoryFetcher>),
    /// Legacy service that answers each check with a single descriptor.
    Oracle(Arc<dyn UpdateOracle>),
}

impl ReleaseSource {
    pub fn history(fetcher: impl ReleaseHistoryFetcher + 'static) -> Self {
        Self::History(Arc::new(fetcher))
    }

    pub fn oracle(oracle: impl UpdateOracle + 'static) -> Self {
        Self::Oracle(Arc::new(oracle))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::History(_) => "history",
            Self::Oracle(_) => "oracle",
        }
    }
}

impl fmt::Debug for ReleaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReleaseSource").field(&self.kind()).finish()
    }
}
