//! CLI command handlers, one per file.

mod checksum;
mod fetch;
mod resolve;

pub use checksum::run_checksum;
pub use fetch::{run_fetch, FetchArgs};
pub use resolve::run_resolve;
