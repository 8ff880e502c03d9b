use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum::HashAlgorithm;
use crate::downloader::TransferOptions;
use crate::retry::RetryPolicy;

/// Image source definition for one pipeline run (`--definition` file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root of the vendor release tree, e.g. `https://repo.turris.cz/hbs`.
    pub base_url: String,
    /// Release name; `hbs` selects the rolling snapshot.
    pub release: String,
    /// Logical architecture (`armv7l`, `aarch64`, `powerpc`, or a configured extra).
    pub architecture: String,
    #[serde(default)]
    pub skip_verification: bool,
    /// Signing key identifiers. Non-empty selects manifest verification.
    #[serde(default)]
    pub trusted_keys: BTreeSet<String>,
}

impl SourceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read definition {}", path.display()))?;
        let cfg: SourceConfig = toml::from_str(&data)
            .with_context(|| format!("parse definition {}", path.display()))?;
        Ok(cfg)
    }
}

/// What the pipeline does when the reachability probe gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbePolicy {
    /// Abort the run before any download.
    #[default]
    Fatal,
    /// Log a warning and continue to the download.
    Advisory,
}

/// Reachability probe parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Maximum number of HEAD attempts (including the first).
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds (0 = retry immediately).
    pub delay_ms: u64,
    pub policy: ProbePolicy,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 0,
            policy: ProbePolicy::Fatal,
        }
    }
}

impl ProbeConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::from_millis(self.delay_ms);
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: delay,
            max_delay: delay,
        }
    }
}

/// curl timeouts (optional `[transfer]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub connect_timeout_secs: u64,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Wall-clock limit for one whole transfer.
    pub timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        let opts = TransferOptions::default();
        Self {
            connect_timeout_secs: opts.connect_timeout.as_secs(),
            low_speed_limit: opts.low_speed_limit,
            low_speed_time_secs: opts.low_speed_time.as_secs(),
            timeout_secs: opts.timeout.as_secs(),
        }
    }
}

impl TransferConfig {
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_limit: self.low_speed_limit,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/medkit/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedkitConfig {
    /// Where downloaded artifacts and manifests are kept. Defaults to the XDG cache dir.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Extra architecture → board path mappings on top of the built-in table.
    #[serde(default)]
    pub architectures: BTreeMap<String, String>,
}

impl MedkitConfig {
    /// Configured cache dir, or `$XDG_CACHE_HOME/medkit`.
    pub fn resolved_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(xdg::BaseDirectories::with_prefix("medkit")?
                .get_cache_home()
                .join("medkit")),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("medkit")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MedkitConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<MedkitConfig> {
    if !path.exists() {
        let default_cfg = MedkitConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: MedkitConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
