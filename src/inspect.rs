//! Offline commands: list input files, dry-run validation, and checkpoint
//! maintenance. None of these touch the network.

use anyhow::Result;
use lead_ingest_core::HeaderMapping;
use std::path::PathBuf;

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::csv_stream::{validate_file, ParseStats};
use crate::progress::format_number;
use crate::scanner::scan_csv_files;

/// One input file and whether it has already been uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub checkpointed: bool,
}

pub async fn scan_with_status(config: &Config) -> Result<Vec<ScanEntry>> {
    let checkpoint = CheckpointStore::new(&config.checkpoint.path);
    let mut entries = Vec::new();
    for path in scan_csv_files(&config.input)? {
        let checkpointed = checkpoint.is_file_checkpointed(&path).await?;
        entries.push(ScanEntry { path, checkpointed });
    }
    Ok(entries)
}

/// `lead-ingest scan`
pub async fn run_scan(config: &Config) -> Result<()> {
    let entries = scan_with_status(config).await?;
    let pending = entries.iter().filter(|e| !e.checkpointed).count();

    println!("scan {}", config.input.root.display());
    for entry in &entries {
        let status = if entry.checkpointed { "done" } else { "pending" };
        println!("  {:<8} {}", status, entry.path.display());
    }
    println!("  files: {}", entries.len());
    println!("  pending: {}", pending);
    Ok(())
}

/// `lead-ingest validate`: parse every input file without uploading.
///
/// Per-file failures (unreadable file, broken quoting) are reported and
/// counted; the command fails at the end if any occurred.
pub async fn run_validate(config: &Config) -> Result<()> {
    let mapping = HeaderMapping::standard();
    let files = scan_csv_files(&config.input)?;
    let mut total = ParseStats::default();
    let mut failed = 0usize;

    println!("validate {}", config.input.root.display());
    for path in &files {
        match validate_file(path, &mapping).await {
            Ok(stats) => {
                println!(
                    "  {}  rows {}  valid {}  invalid {}",
                    path.display(),
                    format_number(stats.total_rows),
                    format_number(stats.valid_rows),
                    format_number(stats.invalid_rows)
                );
                total += stats;
            }
            Err(e) => {
                println!("  {}  error: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }
    println!("  files: {}", files.len());
    println!("  rows: {}", format_number(total.total_rows));
    println!("  valid: {}", format_number(total.valid_rows));
    println!("  invalid: {}", format_number(total.invalid_rows));

    if failed > 0 {
        anyhow::bail!("{} of {} files could not be parsed", failed, files.len());
    }
    println!("ok");
    Ok(())
}

/// `lead-ingest checkpoint stats`
pub async fn run_checkpoint_stats(config: &Config) -> Result<()> {
    let store = CheckpointStore::new(&config.checkpoint.path);
    let stats = store.stats().await?;
    println!("checkpoint {}", store.path().display());
    println!("  files uploaded: {}", stats.total_checkpointed);
    println!("  last updated: {}", stats.last_updated.to_rfc3339());
    Ok(())
}

/// `lead-ingest checkpoint list`
pub async fn run_checkpoint_list(config: &Config) -> Result<()> {
    let store = CheckpointStore::new(&config.checkpoint.path);
    for path in store.checkpointed_files().await? {
        println!("{}", path.display());
    }
    Ok(())
}

/// `lead-ingest checkpoint clear`
pub async fn run_checkpoint_clear(config: &Config) -> Result<()> {
    let store = CheckpointStore::new(&config.checkpoint.path);
    let before = store.stats().await?.total_checkpointed;
    store.clear().await?;
    tracing::info!(path = %store.path().display(), cleared = before, "checkpoint cleared");
    println!("checkpoint cleared ({} files)", before);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn scan_reports_checkpoint_status() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("a.csv"), "Full name\nAda\n").unwrap();
        fs::write(data.join("b.csv"), "Full name\nGrace\n").unwrap();

        let mut config = Config::default();
        config.input.root = data.clone();
        config.checkpoint.path = tmp.path().join("cp.json");

        let a = fs::canonicalize(data.join("a.csv")).unwrap();
        CheckpointStore::new(&config.checkpoint.path)
            .checkpoint_file(&a)
            .await
            .unwrap();

        let entries = scan_with_status(&config).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].path.ends_with("a.csv") && entries[0].checkpointed);
        assert!(entries[1].path.ends_with("b.csv") && !entries[1].checkpointed);
    }
}
