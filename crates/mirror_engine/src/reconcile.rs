use std::path::PathBuf;

use engine_logging::{engine_info, engine_warn};
use mirror_core::{best_match, normalize_title, CatalogEntry, FailureLedger, SIMILARITY_FLOOR};

use crate::harvest::Harvester;
use crate::persist::PersistError;

/// A stored record that lacks a title or acquisition links, or does not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspect {
    pub slug: String,
    pub path: PathBuf,
    /// Stored title, if non-blank.
    pub title: Option<String>,
    /// Stored page url, if non-blank.
    pub page_url: Option<String>,
    pub link_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries newly added to the ledger.
    pub added: usize,
    /// Resolved entries the ledger already held.
    pub already_known: usize,
    /// Slugs for which no title or no url could be found.
    pub unresolved: Vec<String>,
}

impl Harvester {
    /// Audit every stored record. Never modifies the store.
    pub fn scan_suspects(&self) -> Result<Vec<Suspect>, PersistError> {
        let mut suspects = Vec::new();
        for stored in self.store.scan()? {
            let suspect = match stored.record {
                Ok(record) if !record.is_suspect() => continue,
                Ok(record) => Suspect {
                    slug: stored.slug,
                    path: stored.path,
                    title: non_blank(&record.title),
                    page_url: non_blank(&record.page_url),
                    link_count: record.acquisition_links.len(),
                },
                Err(err) => {
                    engine_warn!("Unreadable record {:?}: {}", stored.path, err);
                    Suspect {
                        slug: stored.slug,
                        path: stored.path,
                        title: None,
                        page_url: None,
                        link_count: 0,
                    }
                }
            };
            suspects.push(suspect);
        }
        engine_info!("Found {} suspicious or incomplete record(s)", suspects.len());
        Ok(suspects)
    }

    /// Recover `(title, url)` for each suspect and add it to the ledger, which
    /// is saved once at the end. Suspects that cannot be resolved are reported,
    /// never guessed.
    pub async fn reconcile(&mut self, suspects: &[Suspect]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if suspects.is_empty() {
            return report;
        }
        engine_info!("Fetching the catalog to recover missing urls");
        let catalog = self.fetch_catalog().await.unwrap_or_default();

        for suspect in suspects {
            let Some(title) = suspect
                .title
                .clone()
                .or_else(|| infer_title(&suspect.slug, &catalog))
            else {
                engine_warn!("Missing title in {:?}, not adding it to the ledger", suspect.path);
                report.unresolved.push(suspect.slug.clone());
                continue;
            };
            let Some(url) = source_url(suspect, &title, self.ledger.ledger(), &catalog) else {
                engine_warn!("Url not found for '{}', not adding it to the ledger", title);
                report.unresolved.push(suspect.slug.clone());
                continue;
            };
            if self.ledger.add(title, url) {
                report.added += 1;
            } else {
                report.already_known += 1;
            }
        }

        self.ledger.save_or_log();
        engine_info!(
            "Ledger updated with {} new entr{}",
            report.added,
            if report.added == 1 { "y" } else { "ies" }
        );
        report
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Catalog title for a file slug: exact slug match first, then the single
/// closest slug at or above [`SIMILARITY_FLOOR`].
pub fn infer_title(slug: &str, catalog: &[CatalogEntry]) -> Option<String> {
    let slugs: Vec<String> = catalog.iter().map(CatalogEntry::slug).collect();
    let idx = slugs
        .iter()
        .position(|candidate| candidate == slug)
        .or_else(|| best_match(slug, slugs.iter().map(String::as_str), SIMILARITY_FLOOR))?;
    Some(catalog[idx].title.clone())
}

/// Page url for `title`: the suspect's own field, then the ledger, then the
/// catalog, each matched on normalized title.
pub fn source_url(
    suspect: &Suspect,
    title: &str,
    ledger: &FailureLedger,
    catalog: &[CatalogEntry],
) -> Option<String> {
    if let Some(url) = &suspect.page_url {
        return Some(url.clone());
    }
    if let Some(url) = ledger.url_for_title(title) {
        return Some(url.to_string());
    }
    let wanted = normalize_title(title);
    catalog
        .iter()
        .find(|entry| normalize_title(&entry.title) == wanted)
        .map(|entry| entry.url.clone())
}
