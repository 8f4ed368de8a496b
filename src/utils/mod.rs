//! JSON persistence helpers and the append-only record writer

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use serde::{Serialize, Deserialize};
use tempfile::NamedTempFile;
use tracing::info;
use crate::Result;

/// Save object to JSON file
///
/// The JSON goes to a temporary file next to `path` that then replaces it,
/// so an interrupted save leaves the previous file intact.
pub fn save_json<T: Serialize, P: AsRef<Path>>(obj: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(obj)?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(json.as_bytes())?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Load object from JSON file
pub fn load_json<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> Result<T> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let obj = serde_json::from_str(&contents)?;
    Ok(obj)
}

/// Line-delimited JSON writer; every record is flushed as soon as it is written
pub struct JsonlWriter {
    writer: BufWriter<File>,
    written: usize,
}

impl JsonlWriter {
    /// Create (or truncate) the file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(JsonlWriter {
            writer: BufWriter::new(File::create(path)?),
            written: 0,
        })
    }

    /// Append one record
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far
    pub fn written(&self) -> usize {
        self.written
    }
}

/// Persists model state at epoch and validation boundaries
pub trait CheckpointStore<M> {
    /// Write `model` to `path`, replacing any previous checkpoint
    fn save(&mut self, path: &Path, model: &M) -> Result<()>;
}

/// Checkpoint store writing the model as pretty-printed JSON
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCheckpointStore;

impl<M: Serialize> CheckpointStore<M> for JsonCheckpointStore {
    fn save(&mut self, path: &Path, model: &M) -> Result<()> {
        save_json(model, path)?;
        info!("Saved the model to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.json");
        let mut obj = BTreeMap::new();
        obj.insert("a".to_string(), vec![1, 2]);
        save_json(&obj, &path).unwrap();
        let loaded: BTreeMap<String, Vec<i32>> = load_json(&path).unwrap();
        assert_eq!(loaded, obj);
    }

    #[test]
    fn test_jsonl_lines_visible_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let mut writer = JsonlWriter::create(&path).unwrap();
        writer.write(&serde_json::json!({"iter": 1})).unwrap();
        writer.write(&serde_json::json!({"iter": 2})).unwrap();

        // Read back while the writer is still open
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\"iter\":1}\n{\"iter\":2}\n");
        assert_eq!(writer.written(), 2);
    }

    #[test]
    fn test_checkpoint_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut store = JsonCheckpointStore;
        store.save(&path, &vec![1.0f32]).unwrap();
        store.save(&path, &vec![2.0f32]).unwrap();
        let loaded: Vec<f32> = load_json(&path).unwrap();
        assert_eq!(loaded, vec![2.0]);
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "old").unwrap();
        save_json(&vec![3, 4], &path).unwrap();
        save_json(&vec![5], &path).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("model.json")]);
        let loaded: Vec<i32> = load_json(&path).unwrap();
        assert_eq!(loaded, vec![5]);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("model.json");
        assert!(save_json(&vec![1], &path).is_err());
        assert!(!path.exists());
    }
}
