use crate::utils::Result;
use std::path::Path;

/// A plausible domain: non-empty, dotted, no whitespace.
pub fn is_valid_domain(entry: &str) -> bool {
    !entry.is_empty() && entry.contains('.') && !entry.chars().any(char::is_whitespace)
}

/// Parse a domain list: one entry per line, blank lines and `#` comments
/// ignored, malformed entries skipped with a warning.
pub fn parse_domains(text: &str) -> Vec<String> {
    let mut domains = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if is_valid_domain(line) {
            domains.push(line.to_string());
        } else {
            log::warn!("Skipping malformed domain on line {}: {:?}", number + 1, line);
        }
    }

    domains
}

pub fn load_domains(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    let domains = parse_domains(&text);
    log::info!("Read {} domains from {}", domains.len(), path.display());
    Ok(domains)
}
