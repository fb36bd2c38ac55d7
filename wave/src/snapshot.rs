//! On-disk snapshots of fetched histories, group membership and filter
//! results.
//!
//! ```text
//! <snapshot_dir>/
//!   <snapshot> - origin.json        raw job history
//!   <snapshot>.json                 sanitized job history
//!   group info.json                 update group -> instances
//!   <selector> - <version>.json     matched builds
//!   <selector> - <version> - invalid.json
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::correlate::FilteredBuilds;
use crate::error::{Result, WaveError};
use crate::groups::DeploymentGroups;
use crate::model::BuildHistory;

const GROUP_INFO: &str = "group info";

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open the store, creating `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| WaveError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Write via a `.tmp` sibling so readers never see a partial file.
    fn atomic_write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let write_err = |source| WaveError::Write {
            path: path.to_path_buf(),
            source,
        };
        std::fs::write(&tmp, data).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(write_err)?;
        Ok(())
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.path_for(name);
        let json = serde_json::to_string_pretty(value)?;
        self.atomic_write(&path, json.as_bytes())?;
        tracing::debug!("wrote {}", path.display());
        Ok(path)
    }

    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path_for(name);
        let content = std::fs::read_to_string(&path).map_err(|source| WaveError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| WaveError::Json { path, source })
    }

    pub fn write_raw_history(&self, snapshot: &str, raw: &Value) -> Result<PathBuf> {
        self.write_json(&format!("{snapshot} - origin"), raw)
    }

    pub fn read_raw_history(&self, snapshot: &str) -> Result<Value> {
        self.read_json(&format!("{snapshot} - origin"))
    }

    pub fn write_history(&self, snapshot: &str, history: &BuildHistory) -> Result<PathBuf> {
        self.write_json(snapshot, history)
    }

    pub fn read_history(&self, snapshot: &str) -> Result<BuildHistory> {
        self.read_json(snapshot)
    }

    pub fn write_groups(&self, groups: &DeploymentGroups) -> Result<PathBuf> {
        self.write_json(GROUP_INFO, groups)
    }

    pub fn read_groups(&self) -> Result<DeploymentGroups> {
        self.read_json(GROUP_INFO)
    }

    /// Store matched builds as `<label> - <version>` and the builds lacking
    /// instance or version as `<label> - <version> - invalid`.
    pub fn write_filtered(&self, label: &str, version: &str, filtered: &FilteredBuilds) -> Result<()> {
        self.write_json(&format!("{label} - {version}"), &filtered.matched)?;
        self.write_json(&format!("{label} - {version} - invalid"), &filtered.invalid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BuildRecord;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn open_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("snapshots");
        let store = SnapshotStore::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[test]
    fn histories_use_snapshot_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let raw = json!({"allBuilds": [{"number": 1, "timestamp": 0}]});
        let history: BuildHistory = serde_json::from_value(raw.clone()).unwrap();

        store.write_raw_history("fpa log", &raw).unwrap();
        store.write_history("fpa log", &history).unwrap();

        assert!(tmp.path().join("fpa log - origin.json").is_file());
        assert!(tmp.path().join("fpa log.json").is_file());
        assert_eq!(store.read_raw_history("fpa log").unwrap(), raw);
        assert_eq!(store.read_history("fpa log").unwrap(), history);
        assert!(!tmp.path().join("fpa log.json.tmp").exists());
    }

    #[test]
    fn filtered_results_always_write_invalid_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let filtered = FilteredBuilds {
            matched: vec![BuildRecord::new(3, 0, 0)],
            invalid: Vec::new(),
        };

        store.write_filtered("Group1-EU", "2017.21", &filtered).unwrap();

        let matched: Vec<BuildRecord> = store.read_json("Group1-EU - 2017.21").unwrap();
        let invalid: Vec<BuildRecord> = store.read_json("Group1-EU - 2017.21 - invalid").unwrap();
        assert_eq!(matched.len(), 1);
        assert!(invalid.is_empty());
    }

    #[test]
    fn group_info_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let groups: DeploymentGroups =
            [("Group1-EU".to_string(), vec!["epmprod81".to_string()])].into_iter().collect();

        store.write_groups(&groups).unwrap();

        assert!(tmp.path().join("group info.json").is_file());
        assert_eq!(store.read_groups().unwrap(), groups);
    }

    #[test]
    fn missing_and_corrupt_files_are_reported_with_path() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();

        let missing = store.read_history("epm log").unwrap_err();
        assert!(matches!(missing, WaveError::Read { .. }));

        std::fs::write(tmp.path().join("epm log.json"), "{not json").unwrap();
        let corrupt = store.read_history("epm log").unwrap_err();
        match corrupt {
            WaveError::Json { path, .. } => assert!(path.ends_with("epm log.json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
