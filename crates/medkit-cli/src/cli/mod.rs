//! CLI for the medkit rootfs source provider.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use medkit_core::checksum::HashAlgorithm;
use medkit_core::config::{self, ProbePolicy};
use std::path::PathBuf;

use commands::{run_checksum, run_fetch, run_resolve, FetchArgs};

/// Top-level CLI for medkit.
#[derive(Debug, Parser)]
#[command(name = "medkit")]
#[command(about = "Fetch, verify and unpack Turris medkit root filesystems", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download the medkit for an image definition, verify it and unpack it.
    Fetch {
        /// Image definition (TOML with base_url, release, architecture, ...).
        #[arg(long, value_name = "FILE")]
        definition: PathBuf,
        /// Directory to unpack the root filesystem into.
        #[arg(long, value_name = "DIR")]
        rootfs: PathBuf,
        /// What to do when the source does not answer the HEAD probe (overrides config).
        #[arg(long, value_enum)]
        probe_policy: Option<ProbePolicyArg>,
        /// Where to keep downloaded files (overrides config).
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,
    },

    /// Print the artifact and manifest URLs for a release without downloading.
    Resolve {
        #[arg(long)]
        release: String,
        /// Logical architecture, e.g. armv7l.
        #[arg(long)]
        arch: String,
        /// Base URL of the release tree.
        #[arg(long)]
        url: String,
    },

    /// Compute the digest of a local file.
    Checksum {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = AlgorithmArg::Sha256)]
        algorithm: AlgorithmArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProbePolicyArg {
    Fatal,
    Advisory,
}

impl From<ProbePolicyArg> for ProbePolicy {
    fn from(arg: ProbePolicyArg) -> Self {
        match arg {
            ProbePolicyArg::Fatal => ProbePolicy::Fatal,
            ProbePolicyArg::Advisory => ProbePolicy::Advisory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Sha256,
    Sha512,
}

impl From<AlgorithmArg> for HashAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Sha256 => HashAlgorithm::Sha256,
            AlgorithmArg::Sha512 => HashAlgorithm::Sha512,
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                definition,
                rootfs,
                probe_policy,
                cache_dir,
            } => {
                let args = FetchArgs {
                    definition,
                    rootfs,
                    probe_policy: probe_policy.map(Into::into),
                    cache_dir,
                };
                run_fetch(&cfg, args).await?
            }
            CliCommand::Resolve { release, arch, url } => {
                run_resolve(&cfg, &release, &arch, &url)?
            }
            CliCommand::Checksum { path, algorithm } => run_checksum(&path, algorithm.into())?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
