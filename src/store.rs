use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::models::SleepRecord;

/// Number of days retained in the sleep history.
pub const HISTORY_CAP: usize = 14;

/// Persisted, date-ordered sleep history with one record per date.
pub trait HistoryStore {
    /// Returns the stored history, or an empty history when nothing usable is stored.
    fn load(&self) -> Vec<SleepRecord>;

    /// Persists `records` after sorting by date and keeping the last [`HISTORY_CAP`].
    fn save(&self, records: Vec<SleepRecord>) -> anyhow::Result<()>;

    /// Replaces the record for `record.date`, or appends it, then saves.
    fn upsert(&self, record: SleepRecord) -> anyhow::Result<()> {
        let mut records = self.load();
        match records.iter_mut().find(|existing| existing.date == record.date) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.save(records)
    }
}

fn cap_history(mut records: Vec<SleepRecord>) -> Vec<SleepRecord> {
    records.sort_by(|a, b| a.date.cmp(&b.date));
    let excess = records.len().saturating_sub(HISTORY_CAP);
    records.drain(..excess);
    records
}

/// History kept as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> Vec<SleepRecord> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                log::debug!("no sleep history at {}: {err}", self.path.display());
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                log::warn!(
                    "ignoring unreadable sleep history at {}: {err}",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    fn save(&self, records: Vec<SleepRecord>) -> anyhow::Result<()> {
        let records = cap_history(records);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create history directory {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write sleep history to {}", self.path.display()))?;
        log::debug!(
            "saved {} sleep records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// History held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<Vec<SleepRecord>>,
}

impl MemoryStore {
    pub fn new(records: Vec<SleepRecord>) -> Self {
        Self {
            records: RefCell::new(cap_history(records)),
        }
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> Vec<SleepRecord> {
        self.records.borrow().clone()
    }

    fn save(&self, records: Vec<SleepRecord>) -> anyhow::Result<()> {
        *self.records.borrow_mut() = cap_history(records);
        Ok(())
    }
}

/// Upserts every row of a CSV file of sleep records and returns the row count.
pub fn import_csv(store: &impl HistoryStore, csv_path: &Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut records = store.load();
    let mut imported = 0usize;

    for result in reader.deserialize::<SleepRecord>() {
        let record = result.with_context(|| format!("bad row in {}", csv_path.display()))?;
        match records.iter_mut().find(|existing| existing.date == record.date) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        imported += 1;
    }

    store.save(records)?;
    Ok(imported)
}

pub fn export_csv(records: &[SleepRecord], out: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
