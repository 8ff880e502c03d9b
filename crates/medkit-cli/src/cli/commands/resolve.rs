//! `medkit resolve`: show where a release lives without touching the network.

use anyhow::Result;
use medkit_core::arch::ArchitectureTable;
use medkit_core::config::MedkitConfig;
use medkit_core::location::build_location;

pub fn run_resolve(cfg: &MedkitConfig, release: &str, arch: &str, base_url: &str) -> Result<()> {
    let table = ArchitectureTable::with_extra(cfg.architectures.clone());
    let arch_path = table.resolve(arch)?;
    let location = build_location(release, &arch_path, base_url)?;
    println!("artifact: {}", location.artifact_url());
    println!("manifest: {}", location.manifest_url());
    println!("filename: {}", location.filename);
    Ok(())
}
