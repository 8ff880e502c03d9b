//! `medkit fetch`: run the whole pipeline for one image definition.

use anyhow::{Context, Result};
use medkit_core::config::{MedkitConfig, ProbePolicy, SourceConfig};
use medkit_core::downloader::CurlDownloader;
use medkit_core::extract::TarExtractor;
use medkit_core::{CancelToken, Pipeline, PipelineSettings};
use std::path::PathBuf;

#[derive(Debug)]
pub struct FetchArgs {
    pub definition: PathBuf,
    pub rootfs: PathBuf,
    pub probe_policy: Option<ProbePolicy>,
    pub cache_dir: Option<PathBuf>,
}

pub async fn run_fetch(cfg: &MedkitConfig, args: FetchArgs) -> Result<()> {
    let source = SourceConfig::load(&args.definition)?;
    let mut settings = PipelineSettings::from_config(cfg, args.rootfs);
    if let Some(policy) = args.probe_policy {
        settings.probe_policy = policy;
    }
    let cache_dir = match args.cache_dir {
        Some(dir) => dir,
        None => cfg.resolved_cache_dir()?,
    };

    let downloader = CurlDownloader::new(cache_dir).with_options(cfg.transfer.transfer_options());
    tracing::debug!(cache_dir = %downloader.cache_dir().display(), "using download cache");

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = tokio::task::spawn_blocking(move || {
        let report = Pipeline::new(&source, &settings, &downloader, &TarExtractor).run(&cancel)?;
        Ok::<_, medkit_core::SourceError>((report, settings.rootfs_dir))
    })
    .await
    .context("pipeline task failed")?;
    signal.abort();

    let (report, rootfs) = result?;
    println!("artifact:     {}", report.location.artifact_url());
    println!("verification: {}", report.checksum_source.label());
    if let Some(digest) = &report.download.verified_hash {
        println!("digest:       {}", digest);
    }
    if !report.probe_reachable {
        println!("warning: source did not answer the reachability probe");
    }
    println!(
        "unpacked {} entries into {}",
        report.extracted_entries,
        rootfs.display()
    );
    Ok(())
}
