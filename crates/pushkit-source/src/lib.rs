//! Release sources the update checker can ask: release histories published
//! on a filesystem or over HTTP, and the legacy HTTP update oracle.

mod fs_history;
mod history_path;
mod http_history;
mod oracle;
mod signed;
mod transport;

pub use fs_history::FsHistorySource;
pub use history_path::history_path;
pub use http_history::HttpHistorySource;
pub use oracle::HttpUpdateOracle;

#[cfg(test)]
mod tests;
