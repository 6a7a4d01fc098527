mod resolve;
mod types;

pub use resolve::resolve_release;
pub use types::{ResolveQuery, Resolution, ResolvedRelease};
