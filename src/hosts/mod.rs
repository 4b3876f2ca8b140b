//! Reading domain lists and writing selected endpoints back out as hosts
//! files, dated snapshots and a README section.

use crate::pipeline::RunReport;
use crate::rank::RankedEndpoint;
use crate::utils::{NetworkError, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub mod domains;
pub mod history;

pub use domains::*;
pub use history::*;

pub const DEFAULT_TITLE: &str = "GitHub Hosts";
pub const DEFAULT_README_MARKER: &str = "## Hosts";

fn hosts_line(endpoint: &RankedEndpoint) -> String {
    let sources = if endpoint.sources.is_empty() {
        "Unknown".to_string()
    } else {
        endpoint
            .sources
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("{}\t{}\t# DNS from: {}", endpoint.address, endpoint.domain, sources)
}

/// Render every selected endpoint of `report` as hosts-file text.
pub fn render_hosts(report: &RunReport, title: &str, generated_at: NaiveDateTime) -> String {
    let entries: Vec<String> = report.endpoints().map(hosts_line).collect();

    let mut lines = Vec::with_capacity(entries.len() + 6);
    lines.push(format!("# {title}"));
    lines.push(format!(
        "# Generated at {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push(format!("# Total: {} entries", entries.len()));
    lines.push(String::new());
    lines.extend(entries);
    lines.push(String::new());
    lines.push("# DNS END".to_string());

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

pub fn write_hosts(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Replace everything after the marker line (keeping the marker and the two
/// lines that follow it) with a fenced block holding `hosts`.
///
/// Returns `Ok(false)` and leaves the file alone when no line contains
/// `marker`.
pub fn embed_in_readme(path: &Path, marker: &str, hosts: &str) -> Result<bool> {
    let readme = std::fs::read_to_string(path)?;
    let Some(updated) = embed_hosts_block(&readme, marker, hosts) else {
        log::warn!("{}: marker {:?} not found", path.display(), marker);
        return Ok(false);
    };
    std::fs::write(path, updated)?;
    log::info!("Updated {}", path.display());
    Ok(true)
}

fn embed_hosts_block(readme: &str, marker: &str, hosts: &str) -> Option<String> {
    let lines: Vec<&str> = readme.split_inclusive('\n').collect();
    let index = lines.iter().position(|line| line.contains(marker))?;
    let keep = (index + 3).min(lines.len());

    let mut out: String = lines[..keep].concat();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("\n```txt\n");
    out.push_str(hosts);
    if !hosts.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```\n");
    Some(out)
}

/// Where a finished run gets written.
#[derive(Debug, Clone)]
pub struct HostsOutputs {
    pub output: PathBuf,
    pub data_dir: PathBuf,
    pub snapshot: bool,
    pub readme: Option<PathBuf>,
    pub readme_marker: String,
    pub title: String,
    pub keep_days: u32,
}

impl HostsOutputs {
    pub fn new(output: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            output,
            data_dir,
            snapshot: true,
            readme: None,
            readme_marker: DEFAULT_README_MARKER.to_string(),
            title: DEFAULT_TITLE.to_string(),
            keep_days: DEFAULT_RETENTION_DAYS,
        }
    }

    /// Write the hosts file, the dated snapshot and the README section, then
    /// prune old snapshots.
    ///
    /// Each step runs even when an earlier one failed; the failures are
    /// returned in step order. Nothing is written when `report` selected no
    /// endpoint, but history is still pruned.
    pub fn publish(&self, report: &RunReport, now: NaiveDateTime) -> Vec<NetworkError> {
        let mut errors = Vec::new();

        if report.endpoints().next().is_none() {
            log::warn!(
                "No endpoints selected, leaving {} untouched",
                self.output.display()
            );
        } else {
            let text = render_hosts(report, &self.title, now);
            if let Err(e) = write_hosts(&self.output, &text) {
                errors.push(e);
            }
            if self.snapshot {
                if let Err(e) = write_hosts(&snapshot_path(&self.data_dir, now.date()), &text) {
                    errors.push(e);
                }
            }
            if let Some(readme) = &self.readme {
                if let Err(e) = embed_in_readme(readme, &self.readme_marker, &text) {
                    errors.push(e);
                }
            }
        }

        if let Err(e) = clean_history(&self.data_dir, now.date(), self.keep_days) {
            errors.push(e);
        }

        for error in &errors {
            log::warn!("Output step failed: {}", error);
        }
        errors
    }
}
