use std::sync::Arc;

use anyhow::Result;
use pushkit_core::{Clock, LifecycleBridge, RemoteOffer, RollbackInfo, SyncOptions};
use tracing::{debug, info, warn};

const MILLIS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;

/// Decides whether an offer that previously rolled back should be skipped.
pub struct RollbackRetryPolicy {
    lifecycle: Arc<dyn LifecycleBridge>,
    clock: Arc<dyn Clock>,
}

impl RollbackRetryPolicy {
    pub fn new(lifecycle: Arc<dyn LifecycleBridge>, clock: Arc<dyn Clock>) -> Self {
        Self { lifecycle, clock }
    }

    pub fn should_ignore(&self, offer: Option<&RemoteOffer>, options: &SyncOptions) -> bool {
        should_ignore_offer(offer, options, self.clock.now_unix_millis(), || {
            self.lifecycle.latest_rollback_info()
        })
    }
}

/// Fails closed: any invalid option or stale rollback record ignores the offer.
/// Rollback info is only loaded once the options have been validated.
pub fn should_ignore_offer<F>(
    offer: Option<&RemoteOffer>,
    options: &SyncOptions,
    now_unix_millis: u64,
    load_rollback_info: F,
) -> bool
where
    F: FnOnce() -> Result<Option<RollbackInfo>>,
{
    let Some(offer) = offer.filter(|offer| offer.failed_install) else {
        return false;
    };
    if !options.ignore_failed_updates {
        return false;
    }

    let Some(retry) = options.rollback_retry else {
        return true;
    };
    if let Err(err) = retry.validate() {
        warn!(error = %err, "invalid rollback retry options");
        return true;
    }

    let info = match load_rollback_info() {
        Ok(info) => info,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "failed to read the latest rollback info");
            return true;
        }
    };
    let Some(info) = info.filter(|info| {
        info.time != 0 && info.count != 0 && info.package_hash == offer.package_hash
    }) else {
        info!(package_hash = %offer.package_hash, "the latest rollback info is not valid");
        return true;
    };

    let hours_since_rollback =
        now_unix_millis.saturating_sub(info.time) as f64 / MILLIS_PER_HOUR;
    if hours_since_rollback >= retry.delay_in_hours
        && i64::from(info.count) <= retry.max_retry_attempts
    {
        info!(
            package_hash = %offer.package_hash,
            rollback_count = info.count,
            "previous rollback is ignored due to rollback retry options"
        );
        return false;
    }

    debug!(
        package_hash = %offer.package_hash,
        hours_since_rollback,
        rollback_count = info.count,
        "release is still within its rollback retry window"
    );
    true
}
