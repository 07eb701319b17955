//! Snapshot store: one JSON file per calendar date, named `YYYY-MM-DD`.
//!
//! Intra-day cycles overwrite the same file. Corrupt or missing files
//! read as absent; write failures are reported but never fatal.

use crate::error::QuoteError;
use crate::types::Snapshot;
use chrono::NaiveDate;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub struct SnapshotStore {
    dir: PathBuf,
    /// Last-resort baseline date when no prior snapshot exists on disk.
    anchor_date: Option<NaiveDate>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, anchor_date: Option<NaiveDate>) -> Self {
        Self {
            dir: dir.into(),
            anchor_date,
        }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{date}.json"))
    }

    /// Write the snapshot for `date`, overwriting any existing file.
    pub fn save(&self, date: NaiveDate, snapshot: &Snapshot) -> Result<(), QuoteError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| QuoteError::PersistenceFailure(format!("create {:?}: {e}", self.dir)))?;
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| QuoteError::PersistenceFailure(format!("serialize {date}: {e}")))?;
        let path = self.path_for(date);
        fs::write(&path, json)
            .map_err(|e| QuoteError::PersistenceFailure(format!("write {path:?}: {e}")))
    }

    /// Load the snapshot for exactly `date`. Absent or unreadable files
    /// yield `None`.
    pub fn load_exact(&self, date: NaiveDate) -> Option<Snapshot> {
        let path = self.path_for(date);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("no snapshot at {path:?}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snap) => Some(snap),
            Err(e) => {
                warn!("corrupt snapshot {path:?}: {e}");
                None
            }
        }
    }

    /// Baseline search order: the day before `reference`, then the most
    /// recent date strictly before it, then the anchor date.
    pub fn load_baseline(&self, reference: NaiveDate) -> Option<(NaiveDate, Snapshot)> {
        if let Some(yesterday) = reference.pred_opt() {
            if let Some(snap) = self.load_exact(yesterday) {
                return Some((yesterday, snap));
            }
        }
        if let Some(date) = self.most_recent_before(reference) {
            if let Some(snap) = self.load_exact(date) {
                return Some((date, snap));
            }
        }
        if let Some(anchor) = self.anchor_date {
            if let Some(snap) = self.load_exact(anchor) {
                return Some((anchor, snap));
            }
        }
        None
    }

    /// Scan the store directory for the latest dated file strictly
    /// before `reference`.
    fn most_recent_before(&self, reference: NaiveDate) -> Option<NaiveDate> {
        let entries = fs::read_dir(&self.dir).ok()?;
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| date_from_filename(&e.path()))
            .filter(|d| *d < reference)
            .max()
    }
}

fn date_from_filename(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    if path.extension()?.to_str()? != "json" {
        return None;
    }
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Brand, MillionsValue, QuoteValue};
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot_with_time(time: &str) -> Snapshot {
        let mut snap = Snapshot::default();
        snap.gold.update_time = time.to_string();
        snap.gold.brands.get_mut(&Brand::Sjc).unwrap().bar.buy =
            QuoteValue::Available(MillionsValue::from_millis(140_500));
        snap
    }

    #[test]
    fn test_save_load_round_trip_and_overwrite() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), None);
        let d = date(2025, 10, 17);

        store.save(d, &snapshot_with_time("09:00")).unwrap();
        store.save(d, &snapshot_with_time("09:05")).unwrap();

        let back = store.load_exact(d).unwrap();
        assert_eq!(back.gold.update_time, "09:05");
        assert!(back.gold.brands[&Brand::Sjc].bar.buy.is_available());
    }

    #[test]
    fn test_missing_and_corrupt_read_as_absent() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), None);
        assert!(store.load_exact(date(2025, 10, 17)).is_none());

        std::fs::write(dir.path().join("2025-10-17.json"), "{ not json").unwrap();
        assert!(store.load_exact(date(2025, 10, 17)).is_none());
    }

    #[test]
    fn test_baseline_prefers_yesterday() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), None);
        store.save(date(2025, 10, 15), &snapshot_with_time("old")).unwrap();
        store.save(date(2025, 10, 16), &snapshot_with_time("yesterday")).unwrap();

        let (d, snap) = store.load_baseline(date(2025, 10, 17)).unwrap();
        assert_eq!(d, date(2025, 10, 16));
        assert_eq!(snap.gold.update_time, "yesterday");
    }

    #[test]
    fn test_baseline_falls_back_to_most_recent_before() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), None);
        store.save(date(2025, 10, 10), &snapshot_with_time("gap")).unwrap();
        // A later snapshot must never serve as baseline.
        store.save(date(2025, 10, 20), &snapshot_with_time("future")).unwrap();

        let (d, snap) = store.load_baseline(date(2025, 10, 17)).unwrap();
        assert_eq!(d, date(2025, 10, 10));
        assert_eq!(snap.gold.update_time, "gap");
    }

    #[test]
    fn test_baseline_anchor_then_none() {
        let dir = tempdir().unwrap();
        let anchor = date(2025, 10, 7);
        let store = SnapshotStore::new(dir.path(), Some(anchor));
        assert!(store.load_baseline(date(2025, 10, 17)).is_none());

        store.save(anchor, &snapshot_with_time("anchor")).unwrap();
        // Reference before the anchor: the directory scan finds nothing
        // strictly earlier, so only the explicit anchor step can hit.
        let (d, _) = store.load_baseline(date(2025, 10, 1)).unwrap();
        assert_eq!(d, anchor);
    }
}
