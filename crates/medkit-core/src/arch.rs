//! Mapping from logical architecture names to Turris board path segments.

use std::collections::BTreeMap;

use crate::error::SourceError;

/// Built-in mappings: architecture → vendor path segment.
const BUILTIN: &[(&str, &str)] = &[
    ("armv7l", "omnia"),
    ("aarch64", "mox"),
    ("powerpc", "turris1x"),
];

/// Resolve `architecture` against the built-in table.
pub fn resolve_architecture(architecture: &str) -> Result<&'static str, SourceError> {
    BUILTIN
        .iter()
        .find(|(arch, _)| *arch == architecture)
        .map(|(_, path)| *path)
        .ok_or_else(|| SourceError::UnsupportedArchitecture {
            architecture: architecture.to_string(),
        })
}

/// Built-in table extended with mappings from configuration.
///
/// Extra entries override built-in ones with the same key. An entry mapped to
/// an empty path is treated as unsupported.
#[derive(Debug, Clone, Default)]
pub struct ArchitectureTable {
    extra: BTreeMap<String, String>,
}

impl ArchitectureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra(extra: BTreeMap<String, String>) -> Self {
        Self { extra }
    }

    pub fn resolve(&self, architecture: &str) -> Result<String, SourceError> {
        let path = match self.extra.get(architecture) {
            Some(p) => p.trim().to_string(),
            None => resolve_architecture(architecture)?.to_string(),
        };
        if path.is_empty() {
            return Err(SourceError::UnsupportedArchitecture {
                architecture: architecture.to_string(),
            });
        }
        Ok(path)
    }
}
