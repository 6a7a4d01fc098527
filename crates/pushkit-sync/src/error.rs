use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("an update dialog was requested but no dialog presenter is configured")]
    DialogUnavailable,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}
