use serde::{Deserialize, Serialize};

use crate::normalize_title;

/// A harvest attempt that did not complete. Serialized as `{title, url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub title: String,
    pub url: String,
}

impl FailureEntry {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Same normalized title and exactly the same url.
    pub fn same_as(&self, title: &str, url: &str) -> bool {
        self.url == url && normalize_title(&self.title) == normalize_title(title)
    }
}

/// In-memory failure set. Order of insertion is kept so the persisted file
/// and sequential retries are stable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FailureLedger {
    entries: Vec<FailureEntry>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<FailureEntry>) -> Self {
        let mut ledger = Self::new();
        for entry in entries {
            ledger.add(entry.title, entry.url);
        }
        ledger
    }

    /// Insert unless an equal entry exists; returns whether it was inserted.
    pub fn add(&mut self, title: impl Into<String>, url: impl Into<String>) -> bool {
        let title = title.into();
        let url = url.into();
        if self.contains(&title, &url) {
            return false;
        }
        self.entries.push(FailureEntry { title, url });
        true
    }

    pub fn contains(&self, title: &str, url: &str) -> bool {
        self.entries.iter().any(|entry| entry.same_as(title, url))
    }

    /// Url of the first entry whose normalized title matches.
    pub fn url_for_title(&self, title: &str) -> Option<&str> {
        let wanted = normalize_title(title);
        self.entries
            .iter()
            .find(|entry| normalize_title(&entry.title) == wanted)
            .map(|entry| entry.url.as_str())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the whole set, e.g. with the still-failing entries of a retry.
    pub fn replace(&mut self, entries: Vec<FailureEntry>) {
        *self = Self::from_entries(entries);
    }

    pub fn entries(&self) -> &[FailureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
