use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_error, engine_info};
use mirror_core::Record;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::MirrorError;

/// Name of the failure ledger inside the store directory. Never treated as a record.
pub const LEDGER_FILENAME: &str = "failed_games.json";

const PLACEHOLDER: &[u8] = b"{}";

/// A record file found on disk together with its parse result.
#[derive(Debug)]
pub struct StoredRecord {
    pub slug: String,
    pub path: PathBuf,
    pub record: Result<Record, MirrorError>,
}

/// One JSON file per item at `{dir}/{slug}.json`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    writer: AtomicFileWriter,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.into()),
        }
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir().join(file_name(slug))
    }

    pub fn exists(&self, slug: &str) -> bool {
        self.path_for(slug).is_file()
    }

    /// Write `{}` for `slug` unless a file is already there.
    pub fn ensure_placeholder(&self, slug: &str) -> Result<bool, PersistError> {
        if self.exists(slug) {
            return Ok(false);
        }
        self.writer.write(&file_name(slug), PLACEHOLDER)?;
        Ok(true)
    }

    /// Full overwrite of the record file.
    pub fn save(&self, slug: &str, record: &Record) -> Result<PathBuf, PersistError> {
        self.writer.write_json(&file_name(slug), record)
    }

    pub fn load(&self, slug: &str) -> Result<Record, MirrorError> {
        read_record(&self.path_for(slug))
    }

    pub fn remove(&self, slug: &str) -> Result<bool, PersistError> {
        self.writer.remove(&file_name(slug))
    }

    /// Slugs of every record file currently on disk.
    pub fn slugs(&self) -> Result<BTreeSet<String>, PersistError> {
        Ok(self
            .record_paths()?
            .into_iter()
            .filter_map(|path| slug_of(&path))
            .collect())
    }

    /// Every record file with its parse result, ordered by file name.
    pub fn scan(&self) -> Result<Vec<StoredRecord>, PersistError> {
        let mut out = Vec::new();
        for path in self.record_paths()? {
            let Some(slug) = slug_of(&path) else {
                continue;
            };
            let record = read_record(&path);
            out.push(StoredRecord { slug, path, record });
        }
        Ok(out)
    }

    /// Records whose title contains `query`, case-insensitively. Unreadable files are skipped.
    pub fn search(&self, query: &str) -> Result<Vec<Record>, PersistError> {
        let needle = query.to_lowercase();
        Ok(self
            .scan()?
            .into_iter()
            .filter_map(|stored| stored.record.ok())
            .filter(|record| record.title.to_lowercase().contains(&needle))
            .collect())
    }

    /// Delete every `.json` file in the store, the ledger included.
    pub fn clean(&self) -> Result<usize, PersistError> {
        let mut deleted = 0;
        for path in self.json_paths()? {
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(err) => engine_error!("Failed to delete {:?}: {}", path, err),
            }
        }
        engine_info!("Deleted {} file(s) from {:?}", deleted, self.dir());
        Ok(deleted)
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>, PersistError> {
        Ok(self
            .json_paths()?
            .into_iter()
            .filter(|path| path.file_name().and_then(|n| n.to_str()) != Some(LEDGER_FILENAME))
            .collect())
    }

    fn json_paths(&self) -> Result<Vec<PathBuf>, PersistError> {
        let entries = match fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                engine_debug!("Store directory {:?} does not exist yet", self.dir());
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

fn file_name(slug: &str) -> String {
    format!("{slug}.json")
}

fn slug_of(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
}

fn read_record(path: &Path) -> Result<Record, MirrorError> {
    let text = fs::read_to_string(path).map_err(PersistError::from)?;
    serde_json::from_str(&text).map_err(|err| MirrorError::integrity(path, err.to_string()))
}
