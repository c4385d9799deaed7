//! Mission record persistence.
//!
//! One JSON file per mission under the missions directory. A mission id is
//! archived at most once; a second attempt is rejected, not overwritten.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::ArchiveError;
use crate::mission::MissionRecord;

/// Persistence seam for completed missions.
pub trait ArchiveWriter: Send + Sync {
    /// Persist the record, returning where it landed. Rejects a mission id
    /// that is already archived.
    fn store(&self, record: &MissionRecord) -> Result<PathBuf, ArchiveError>;

    /// All archived records, most recent first.
    fn list_records(&self) -> Result<Vec<MissionRecord>>;
}

/// Writes `mission_<id>.json` files with pretty JSON.
pub struct JsonArchiveWriter {
    missions_dir: PathBuf,
}

impl JsonArchiveWriter {
    pub fn new(missions_dir: &Path) -> Self {
        Self {
            missions_dir: missions_dir.to_path_buf(),
        }
    }

    fn record_path(&self, record: &MissionRecord) -> PathBuf {
        self.missions_dir
            .join(format!("mission_{}.json", record.mission_id))
    }
}

impl ArchiveWriter for JsonArchiveWriter {
    fn store(&self, record: &MissionRecord) -> Result<PathBuf, ArchiveError> {
        let path = self.record_path(record);

        fs::create_dir_all(&self.missions_dir).map_err(|source| ArchiveError::WriteFailed {
            path: self.missions_dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(record).map_err(ArchiveError::Serialize)?;

        // create_new makes the duplicate check atomic: concurrent missions
        // with distinct ids land in distinct files, a duplicate id loses.
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ArchiveError::AlreadyArchived {
                    mission_id: record.mission_id,
                });
            }
            Err(source) => return Err(ArchiveError::WriteFailed { path, source }),
        };

        file.write_all(json.as_bytes())
            .map_err(|source| ArchiveError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        info!(mission_id = %record.mission_id, path = %path.display(), "mission archived");
        Ok(path)
    }

    fn list_records(&self) -> Result<Vec<MissionRecord>> {
        if !self.missions_dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.missions_dir).context("Failed to read missions directory")? {
            let path = entry.context("Failed to read missions directory entry")?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read mission record {}", path.display()))?;
                let record: MissionRecord = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse mission record {}", path.display()))?;
                records.push(record);
            }
        }

        records.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Output;
    use crate::mission::MissionStatus;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;
    use uuid::Uuid;

    fn record(goal: &str) -> MissionRecord {
        MissionRecord {
            mission_id: Uuid::new_v4(),
            goal: goal.to_string(),
            status: MissionStatus::Approved,
            final_output: Output::new("story", "storyteller_01", 0),
            verdict_trail: vec![],
            debrief: String::new(),
            awards: vec![],
            reflections: vec![],
            history: vec![],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_store_and_list_roundtrip() {
        let dir = tempdir().unwrap();
        let writer = JsonArchiveWriter::new(dir.path());

        let rec = record("write a story");
        let path = writer.store(&rec).unwrap();
        assert!(path.exists());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("mission_")
        );

        let listed = writer.list_records().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].mission_id, rec.mission_id);
        assert_eq!(listed[0].goal, "write a story");
    }

    #[test]
    fn test_second_store_of_same_mission_is_rejected() {
        let dir = tempdir().unwrap();
        let writer = JsonArchiveWriter::new(dir.path());

        let rec = record("goal");
        writer.store(&rec).unwrap();
        let err = writer.store(&rec).unwrap_err();
        match err {
            ArchiveError::AlreadyArchived { mission_id } => {
                assert_eq!(mission_id, rec.mission_id)
            }
            other => panic!("Expected AlreadyArchived, got {other:?}"),
        }

        // The original file is untouched.
        assert_eq!(writer.list_records().unwrap().len(), 1);
    }

    #[test]
    fn test_distinct_missions_store_independently() {
        let dir = tempdir().unwrap();
        let writer = JsonArchiveWriter::new(dir.path());

        writer.store(&record("first")).unwrap();
        writer.store(&record("second")).unwrap();
        assert_eq!(writer.list_records().unwrap().len(), 2);
    }

    #[test]
    fn test_list_is_most_recent_first() {
        let dir = tempdir().unwrap();
        let writer = JsonArchiveWriter::new(dir.path());

        let mut older = record("older");
        older.finished_at = Utc::now() - Duration::hours(2);
        let newer = record("newer");

        writer.store(&older).unwrap();
        writer.store(&newer).unwrap();

        let listed = writer.list_records().unwrap();
        assert_eq!(listed[0].goal, "newer");
        assert_eq!(listed[1].goal, "older");
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let writer = JsonArchiveWriter::new(&dir.path().join("missing"));
        assert!(writer.list_records().unwrap().is_empty());
    }
}
