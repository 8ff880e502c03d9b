//! Parser for `sha256sum`-style checksum manifests.
//!
//! Each line is `<hex digest> <space><space|*><filename>`. Blank lines and
//! `#` comments are ignored. Digests are stored lowercased. A leading `\`
//! marks a line whose filename carries coreutils escapes for backslash,
//! newline or CR.

use std::collections::HashMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is not UTF-8 text")]
    NotText,
    #[error("manifest line {line}: expected `<digest>  <filename>`")]
    Malformed { line: usize },
    #[error("manifest line {line}: digest is not hex")]
    BadDigest { line: usize },
    /// The entry's digest length does not fit the configured hash algorithm.
    #[error("digest for {filename} has {actual} hex characters, {algorithm} needs {expected}")]
    DigestLength {
        filename: String,
        algorithm: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: HashMap<String, String>,
}

impl Manifest {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ManifestError::NotText)?;
        Self::parse(text)
    }

    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut entries = HashMap::new();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (escaped, line) = match line.strip_prefix('\\') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let (digest, rest) = line
                .split_once(char::is_whitespace)
                .ok_or(ManifestError::Malformed { line: line_no })?;
            // sha256sum marks binary mode with '*' before the name.
            let name = rest.trim_start().trim_start_matches('*');
            let name = name.strip_prefix("./").unwrap_or(name);
            if name.is_empty() {
                return Err(ManifestError::Malformed { line: line_no });
            }
            if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ManifestError::BadDigest { line: line_no });
            }
            let name = if escaped {
                unescape_name(name).ok_or(ManifestError::Malformed { line: line_no })?
            } else {
                name.to_string()
            };
            entries.insert(name, digest.to_ascii_lowercase());
        }
        Ok(Self { entries })
    }

    /// Expected digest for `filename`, lowercase hex.
    pub fn digest_for(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Undo coreutils filename escaping (`\\`, `\n`, `\r`).
fn unescape_name(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }
    Some(out)
}
