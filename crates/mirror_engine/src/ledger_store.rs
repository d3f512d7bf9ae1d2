use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_error, engine_info, engine_warn};
use mirror_core::{FailureEntry, FailureLedger};

use crate::persist::{AtomicFileWriter, PersistError};
use crate::store::LEDGER_FILENAME;

/// The failure set backed by `{dir}/failed_games.json`.
///
/// The file is always rewritten whole; a malformed or unreadable file loads
/// as an empty ledger.
#[derive(Debug, Clone)]
pub struct PersistentLedger {
    ledger: FailureLedger,
    writer: AtomicFileWriter,
}

impl PersistentLedger {
    /// Empty ledger bound to `dir`, without touching the disk.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            ledger: FailureLedger::new(),
            writer: AtomicFileWriter::new(dir.into()),
        }
    }

    /// Bind to `dir` and load whatever is on disk.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let mut ledger = Self::new(dir);
        ledger.load_all();
        ledger
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(LEDGER_FILENAME)
    }

    /// Replace the in-memory set with the file contents. Returns the entry count.
    pub fn load_all(&mut self) -> usize {
        self.ledger = read_entries(&self.path())
            .map(FailureLedger::from_entries)
            .unwrap_or_default();
        self.ledger.len()
    }

    pub fn save_all(&self) -> Result<PathBuf, PersistError> {
        self.writer
            .write_json(LEDGER_FILENAME, self.ledger.entries())
    }

    /// [`Self::save_all`], logging instead of returning the error.
    pub fn save_or_log(&self) {
        if let Err(err) = self.save_all() {
            engine_error!("Could not save failure ledger {:?}: {}", self.path(), err);
        }
    }

    pub fn add(&mut self, title: impl Into<String>, url: impl Into<String>) -> bool {
        self.ledger.add(title, url)
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut FailureLedger {
        &mut self.ledger
    }

    pub fn entries(&self) -> &[FailureEntry] {
        self.ledger.entries()
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }
}

fn read_entries(path: &Path) -> Option<Vec<FailureEntry>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            engine_warn!("Could not read failure ledger {:?}: {}", path, err);
            return None;
        }
    };
    match serde_json::from_str::<Vec<FailureEntry>>(&text) {
        Ok(entries) => {
            engine_info!(
                "Loaded {} failed item(s) from previous session",
                entries.len()
            );
            Some(entries)
        }
        Err(err) => {
            engine_error!("Could not parse failure ledger {:?}: {}", path, err);
            None
        }
    }
}
