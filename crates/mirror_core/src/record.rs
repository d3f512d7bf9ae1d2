use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One harvested catalog item, persisted as one JSON file.
///
/// Every field defaults so that placeholder files (`{}`) and partially written
/// records still deserialize; completeness is judged by [`Record::is_suspect`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub page_url: String,
    pub title: String,
    pub description: String,
    pub screenshots: Vec<String>,
    pub requirements: BTreeMap<String, String>,
    pub details: BTreeMap<String, String>,
    pub acquisition_links: Vec<String>,
    pub cover_image: Option<String>,
}

impl Record {
    pub fn has_links(&self) -> bool {
        !self.acquisition_links.is_empty()
    }

    /// The page lists itself as its only way to acquire the item, which the
    /// listing site uses to mean "no real download available".
    pub fn links_back_to(&self, page_url: &str) -> bool {
        self.acquisition_links.iter().any(|link| link == page_url)
    }

    /// Missing title or no acquisition links.
    pub fn is_suspect(&self) -> bool {
        self.title.trim().is_empty() || !self.has_links()
    }
}

/// One `(title, page url)` pair published by the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub url: String,
}

impl CatalogEntry {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    pub fn slug(&self) -> String {
        crate::record_slug(&self.title)
    }
}
