//! Fetch, verify and unpack Turris medkit rootfs images.

pub mod arch;
pub mod checksum;
pub mod config;
pub mod control;
pub mod downloader;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fetch_head;
pub mod location;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod policy;
pub mod probe;
pub mod retry;
pub mod url_model;

#[cfg(test)]
mod test_support;

pub use control::CancelToken;
pub use error::SourceError;
pub use pipeline::{Pipeline, PipelineSettings, RunReport};
