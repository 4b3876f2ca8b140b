use crate::utils::{NetworkError, Result};
use chrono::{Days, NaiveDate};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_DATE_FORMAT: &str = "%Y_%m_%d";
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// `dir/YYYY_MM_DD.txt` for `date`.
pub fn snapshot_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.txt", date.format(SNAPSHOT_DATE_FORMAT)))
}

fn snapshot_date(path: &Path) -> Option<NaiveDate> {
    if path.extension()? != "txt" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, SNAPSHOT_DATE_FORMAT).ok()
}

/// Delete dated snapshots in `dir` that are `retention_days` or more days
/// older than `today`. Anything that is not a snapshot is left alone.
///
/// A zero retention would delete today's snapshot and is rejected, as is a
/// window reaching before the earliest representable date.
pub fn clean_history(dir: &Path, today: NaiveDate, retention_days: u32) -> Result<Vec<PathBuf>> {
    if retention_days == 0 {
        return Err(NetworkError::Config(
            "history retention must be at least 1 day".to_string(),
        ));
    }
    let cutoff = today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .ok_or_else(|| {
            NetworkError::Config(format!(
                "history retention of {retention_days} days is out of range"
            ))
        })?;

    let mut removed = Vec::new();
    if !dir.is_dir() {
        return Ok(removed);
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match snapshot_date(&path) {
            Some(date) if date <= cutoff => {
                std::fs::remove_file(&path)?;
                log::info!("Removed old snapshot {}", path.display());
                removed.push(path);
            }
            _ => {}
        }
    }

    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_snapshot_path() {
        let path = snapshot_path(Path::new("data"), date(2024, 3, 9));
        assert_eq!(path, PathBuf::from("data/2024_03_09.txt"));
        assert_eq!(snapshot_date(&path), Some(date(2024, 3, 9)));
        assert_eq!(snapshot_date(Path::new("data/notes.txt")), None);
        assert_eq!(snapshot_date(Path::new("data/2024_03_09.md")), None);
    }

    #[test]
    fn test_clean_history_keeps_recent_snapshots() {
        let dir = std::env::temp_dir().join(format!("fasthosts-history-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let today = date(2024, 5, 20);
        for name in [
            "2024_05_20.txt",
            "2024_05_14.txt",
            "2024_05_13.txt",
            "2023_01_01.txt",
            "README.txt",
        ] {
            std::fs::write(dir.join(name), "x").unwrap();
        }

        let removed = clean_history(&dir, today, 7).unwrap();

        assert_eq!(
            removed,
            vec![dir.join("2023_01_01.txt"), dir.join("2024_05_13.txt")]
        );
        assert!(dir.join("2024_05_20.txt").exists());
        assert!(dir.join("2024_05_14.txt").exists());
        assert!(dir.join("README.txt").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_clean_history_rejects_zero_retention() {
        let dir = std::env::temp_dir().join(format!("fasthosts-zero-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let today = date(2024, 5, 20);
        let snapshot = snapshot_path(&dir, today);
        std::fs::write(&snapshot, "x").unwrap();

        let result = clean_history(&dir, today, 0);

        assert!(matches!(result, Err(NetworkError::Config(_))));
        assert!(snapshot.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_clean_history_rejects_out_of_range_retention() {
        let dir = std::env::temp_dir().join(format!("fasthosts-range-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("2024_05_01.txt"), "x").unwrap();

        let result = clean_history(&dir, date(2024, 5, 20), u32::MAX);

        assert!(matches!(result, Err(NetworkError::Config(_))));
        assert!(dir.join("2024_05_01.txt").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_clean_history_one_day_keeps_today() {
        let dir = std::env::temp_dir().join(format!("fasthosts-one-day-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let today = date(2024, 5, 20);
        std::fs::write(snapshot_path(&dir, today), "x").unwrap();
        std::fs::write(snapshot_path(&dir, date(2024, 5, 19)), "x").unwrap();

        let removed = clean_history(&dir, today, 1).unwrap();

        assert_eq!(removed, vec![snapshot_path(&dir, date(2024, 5, 19))]);
        assert!(snapshot_path(&dir, today).exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_clean_history_missing_dir() {
        let dir = std::env::temp_dir().join("fasthosts-no-such-history-dir");
        assert!(clean_history(&dir, date(2024, 1, 1), 7).unwrap().is_empty());
    }
}
