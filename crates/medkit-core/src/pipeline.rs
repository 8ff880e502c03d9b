//! Pipeline driver: resolve, probe, decide, fetch, extract.
//!
//! Stages run strictly in order on the calling thread. Any failure after the
//! verification policy is decided aborts the run; nothing falls back to a
//! weaker guarantee.

use std::path::PathBuf;

use crate::arch::ArchitectureTable;
use crate::checksum::HashAlgorithm;
use crate::config::{MedkitConfig, ProbePolicy, SourceConfig};
use crate::control::CancelToken;
use crate::downloader::Downloader;
use crate::error::SourceError;
use crate::extract::{extract_artifact, Extractor};
use crate::fetch::{fetch, DownloadResult};
use crate::location::{build_location, ResolvedLocation};
use crate::policy::{self, ChecksumSource};
use crate::probe::{probe, ProbeOutcome};
use crate::retry::RetryPolicy;

/// Per-run knobs that do not come from the image definition.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Destination root filesystem directory.
    pub rootfs_dir: PathBuf,
    pub probe_retry: RetryPolicy,
    pub probe_policy: ProbePolicy,
    pub hash_algorithm: HashAlgorithm,
    pub architectures: ArchitectureTable,
}

impl PipelineSettings {
    pub fn new(rootfs_dir: impl Into<PathBuf>) -> Self {
        Self {
            rootfs_dir: rootfs_dir.into(),
            probe_retry: RetryPolicy::default(),
            probe_policy: ProbePolicy::default(),
            hash_algorithm: HashAlgorithm::default(),
            architectures: ArchitectureTable::new(),
        }
    }

    pub fn from_config(cfg: &MedkitConfig, rootfs_dir: impl Into<PathBuf>) -> Self {
        Self {
            rootfs_dir: rootfs_dir.into(),
            probe_retry: cfg.probe.retry_policy(),
            probe_policy: cfg.probe.policy,
            hash_algorithm: cfg.hash_algorithm,
            architectures: ArchitectureTable::with_extra(cfg.architectures.clone()),
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub location: ResolvedLocation,
    pub checksum_source: ChecksumSource,
    /// False when the probe failed under the advisory policy.
    pub probe_reachable: bool,
    pub download: DownloadResult,
    /// Entries written into the rootfs directory.
    pub extracted_entries: usize,
}

pub struct Pipeline<'a> {
    source: &'a SourceConfig,
    settings: &'a PipelineSettings,
    downloader: &'a dyn Downloader,
    extractor: &'a dyn Extractor,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a SourceConfig,
        settings: &'a PipelineSettings,
        downloader: &'a dyn Downloader,
        extractor: &'a dyn Extractor,
    ) -> Self {
        Self {
            source,
            settings,
            downloader,
            extractor,
        }
    }

    /// Resolve the artifact location without touching the network.
    pub fn resolve(&self) -> Result<ResolvedLocation, SourceError> {
        let arch_path = self
            .settings
            .architectures
            .resolve(&self.source.architecture)?;
        build_location(&self.source.release, &arch_path, &self.source.base_url)
    }

    pub fn run(&self, cancel: &CancelToken) -> Result<RunReport, SourceError> {
        let location = self.resolve()?;
        tracing::info!(
            release = %self.source.release,
            architecture = %self.source.architecture,
            url = %location.artifact_url(),
            "resolved medkit artifact"
        );

        check_cancel(cancel)?;
        let probe_reachable = self.probe_stage(&location, cancel)?;

        check_cancel(cancel)?;
        let checksum_source = policy::decide(self.source, &location)?;
        tracing::info!(verification = checksum_source.label(), "verification policy decided");

        let download = fetch(
            self.downloader,
            &location,
            &checksum_source,
            self.settings.hash_algorithm,
            cancel,
        )?;

        check_cancel(cancel)?;
        let extracted = extract_artifact(
            self.extractor,
            &download.local_path,
            &self.settings.rootfs_dir,
        )?;

        Ok(RunReport {
            location,
            checksum_source,
            probe_reachable,
            download,
            extracted_entries: extracted.entries,
        })
    }

    /// Returns whether the source answered; errors only when the probe policy is fatal.
    fn probe_stage(
        &self,
        location: &ResolvedLocation,
        cancel: &CancelToken,
    ) -> Result<bool, SourceError> {
        let url = location.artifact_url();
        match probe(self.downloader, &url, &self.settings.probe_retry, cancel)? {
            ProbeOutcome::Reachable(head) => {
                tracing::debug!(
                    url = %url,
                    status = head.status,
                    content_length = ?head.content_length,
                    accept_ranges = head.accept_ranges,
                    "source reachable"
                );
                Ok(true)
            }
            ProbeOutcome::Unreachable { attempts, cause } => match self.settings.probe_policy {
                ProbePolicy::Fatal => Err(SourceError::Unreachable {
                    url,
                    attempts,
                    cause,
                }),
                ProbePolicy::Advisory => {
                    tracing::warn!(url = %url, attempts, error = %cause, "source probe failed; continuing");
                    Ok(false)
                }
            },
        }
    }
}

fn check_cancel(cancel: &CancelToken) -> Result<(), SourceError> {
    if cancel.is_cancelled() {
        return Err(SourceError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sha256_hex, Call, MemoryDownloader, RecordingExtractor};
    use std::collections::BTreeSet;

    const BODY: &[u8] = b"pretend this is a gzip tarball";

    fn source(base_url: &str, skip: bool, keys: &[&str]) -> SourceConfig {
        SourceConfig {
            base_url: base_url.to_string(),
            release: "hbs".to_string(),
            architecture: "armv7l".to_string(),
            skip_verification: skip,
            trusted_keys: keys.iter().map(|k| k.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn location_for(src: &SourceConfig) -> ResolvedLocation {
        build_location(&src.release, "omnia", &src.base_url).unwrap()
    }

    fn downloads(calls: &[Call]) -> Vec<Call> {
        calls
            .iter()
            .filter(|c| matches!(c, Call::Download(_)))
            .cloned()
            .collect()
    }

    fn extracted(calls: &[Call]) -> bool {
        calls.iter().any(|c| matches!(c, Call::Extract { .. }))
    }

    #[test]
    fn keyed_run_verifies_and_extracts() {
        let src = source("http://repo.example/hbs", false, &["0xABCD"]);
        let loc = location_for(&src);
        let digest = sha256_hex(BODY);
        let d = MemoryDownloader::new()
            .serve(&loc.manifest_url(), format!("{digest}  {}\n", loc.filename).as_bytes())
            .serve(&loc.artifact_url(), BODY);
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path().join("rootfs"));

        let report = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap();

        assert!(report.probe_reachable);
        assert_eq!(report.download.verified_hash.as_deref(), Some(digest.as_str()));
        assert_eq!(
            d.calls(),
            vec![
                Call::Head(loc.artifact_url()),
                Call::Download(loc.manifest_url()),
                Call::Download(loc.artifact_url()),
                Call::Extract {
                    archive: report.download.local_path.clone(),
                    dest: settings.rootfs_dir.clone(),
                },
            ]
        );
        assert!(settings.rootfs_dir.join(".extracted").exists());
        assert_eq!(report.extracted_entries, 1);
    }

    #[test]
    fn mismatch_never_reaches_extractor() {
        let src = source("https://repo.example/hbs", false, &["0xABCD"]);
        let loc = location_for(&src);
        let d = MemoryDownloader::new()
            .serve(
                &loc.manifest_url(),
                format!("{}  {}\n", sha256_hex(b"other"), loc.filename).as_bytes(),
            )
            .serve(&loc.artifact_url(), BODY);
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path());

        let err = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, SourceError::IntegrityMismatch { .. }));
        assert!(!extracted(&d.calls()));
    }

    #[test]
    fn skip_verification_fetches_no_manifest() {
        let src = source("http://repo.example/hbs", true, &["0xABCD"]);
        let loc = location_for(&src);
        let d = MemoryDownloader::new().serve(&loc.artifact_url(), BODY);
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path());

        let report = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap();
        assert_eq!(report.checksum_source, ChecksumSource::None);
        assert!(report.download.verified_hash.is_none());
        assert_eq!(downloads(&d.calls()), vec![Call::Download(loc.artifact_url())]);
    }

    #[test]
    fn insecure_source_rejected_before_any_download() {
        let src = source("http://repo.example/hbs", false, &[]);
        let loc = location_for(&src);
        let d = MemoryDownloader::new().serve(&loc.artifact_url(), BODY);
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path());

        let err = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, SourceError::InsecureSourceRejected { .. }));
        assert!(downloads(&d.calls()).is_empty());
        assert!(!extracted(&d.calls()));
    }

    #[test]
    fn https_without_keys_downloads_unhashed() {
        let src = source("https://repo.example/hbs", false, &[]);
        let loc = location_for(&src);
        let d = MemoryDownloader::new().serve(&loc.artifact_url(), BODY);
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path());

        let report = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap();
        assert_eq!(report.checksum_source, ChecksumSource::SignatureRequired);
        assert!(report.download.verified_hash.is_none());
    }

    #[test]
    fn fatal_probe_aborts_before_download() {
        let src = source("https://repo.example/hbs", true, &[]);
        let loc = location_for(&src);
        let d = MemoryDownloader::new()
            .serve(&loc.artifact_url(), BODY)
            .head_fails_with(503);
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path());

        let err = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap_err();
        match err {
            SourceError::Unreachable { url, attempts, .. } => {
                assert_eq!(url, loc.artifact_url());
                assert_eq!(attempts, 3);
            }
            other => panic!("expected Unreachable, got {other:?}"),
        }
        let heads = d.calls().iter().filter(|c| matches!(c, Call::Head(_))).count();
        assert_eq!(heads, 3);
        assert!(downloads(&d.calls()).is_empty());
    }

    #[test]
    fn advisory_probe_continues() {
        let src = source("https://repo.example/hbs", true, &[]);
        let loc = location_for(&src);
        let d = MemoryDownloader::new()
            .serve(&loc.artifact_url(), BODY)
            .head_fails_with(405);
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let mut settings = PipelineSettings::new(rootfs.path());
        settings.probe_policy = ProbePolicy::Advisory;

        let report = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap();
        assert!(!report.probe_reachable);
        assert!(extracted(&d.calls()));
    }

    #[test]
    fn unsupported_architecture_touches_nothing() {
        let mut src = source("https://repo.example/hbs", true, &[]);
        src.architecture = "x86_64".to_string();
        let d = MemoryDownloader::new();
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path());

        let err = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedArchitecture { .. }));
        assert!(d.calls().is_empty());
    }

    #[test]
    fn extraction_failure_is_wrapped() {
        let src = source("https://repo.example/hbs", true, &[]);
        let loc = location_for(&src);
        let d = MemoryDownloader::new().serve(&loc.artifact_url(), BODY);
        let x = RecordingExtractor::failing(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path());

        let err = Pipeline::new(&src, &settings, &d, &x)
            .run(&CancelToken::new())
            .unwrap_err();
        match err {
            SourceError::ExtractionFailed { archive, dest, .. } => {
                assert_eq!(archive, d.path_for(&loc.artifact_url()));
                assert_eq!(dest, settings.rootfs_dir);
            }
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_run_does_nothing() {
        let src = source("https://repo.example/hbs", true, &[]);
        let d = MemoryDownloader::new();
        let x = RecordingExtractor::new(&d);
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::new(rootfs.path());
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = Pipeline::new(&src, &settings, &d, &x).run(&cancel).unwrap_err();
        assert!(matches!(err, SourceError::Cancelled));
        assert!(d.calls().is_empty());
    }

    #[test]
    fn configured_architecture_is_used() {
        let mut src = source("https://repo.example/hbs", true, &[]);
        src.architecture = "riscv64".to_string();
        let mut cfg = MedkitConfig::default();
        cfg.architectures
            .insert("riscv64".to_string(), "shield".to_string());
        let rootfs = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::from_config(&cfg, rootfs.path());
        let d = MemoryDownloader::new();
        let x = RecordingExtractor::new(&d);

        let loc = Pipeline::new(&src, &settings, &d, &x).resolve().unwrap();
        assert_eq!(loc.filename, "shield-medkit-latest.tar.gz");
    }
}
