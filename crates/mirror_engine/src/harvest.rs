use std::sync::Arc;

use engine_logging::{engine_error, engine_info, engine_warn};
use futures_util::stream::{self, StreamExt};
use mirror_core::{normalize_title, CatalogEntry, FailureEntry};

use crate::catalog::CatalogSource;
use crate::extract::RecordExtractor;
use crate::ledger_store::PersistentLedger;
use crate::store::RecordStore;
use crate::{HarvestSummary, ItemOutcome, ItemReport, MirrorError, PersistError};

pub const DEFAULT_LISTING_URL: &str = "https://steamrip.com/games-list-page/";
pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSettings {
    pub listing_url: String,
    /// Width of the bulk-harvest worker pool.
    pub concurrency: usize,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Drives bulk, incremental and retry harvests against one store and ledger.
///
/// The ledger is only ever touched from the calling task; workers report back
/// with [`ItemReport`]s.
pub struct Harvester {
    extractor: Arc<dyn RecordExtractor>,
    catalog: Arc<dyn CatalogSource>,
    pub(crate) store: RecordStore,
    pub(crate) ledger: PersistentLedger,
    settings: HarvestSettings,
}

impl Harvester {
    pub fn new(
        extractor: Arc<dyn RecordExtractor>,
        catalog: Arc<dyn CatalogSource>,
        store: RecordStore,
        ledger: PersistentLedger,
        settings: HarvestSettings,
    ) -> Self {
        Self {
            extractor,
            catalog,
            store,
            ledger,
            settings,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn ledger(&self) -> &PersistentLedger {
        &self.ledger
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    /// True when the store holds no record files at all.
    pub fn store_is_empty(&self) -> bool {
        match self.store.slugs() {
            Ok(slugs) => slugs.is_empty(),
            Err(err) => {
                engine_warn!("Could not list {:?}: {}", self.store.dir(), err);
                true
            }
        }
    }

    /// Delete every stored file, the ledger included, and empty the
    /// in-memory ledger with it.
    pub fn clean_store(&mut self) -> Result<usize, PersistError> {
        let deleted = self.store.clean()?;
        self.ledger.ledger_mut().clear();
        Ok(deleted)
    }

    /// Current catalog. Failures and an empty listing both come back as `None`
    /// after a warning; callers no-op on it.
    pub(crate) async fn fetch_catalog(&self) -> Option<Vec<CatalogEntry>> {
        match self.catalog.list(&self.settings.listing_url).await {
            Ok(entries) if entries.is_empty() => {
                engine_warn!("No items found on listing page {}", self.settings.listing_url);
                None
            }
            Ok(entries) => Some(entries),
            Err(err) => {
                engine_warn!(
                    "Listing page {} unavailable: {}",
                    self.settings.listing_url,
                    err
                );
                None
            }
        }
    }

    /// Harvest the whole catalog through the worker pool. The ledger ends up
    /// holding exactly this run's failures.
    pub async fn run_bulk_harvest(&mut self) -> HarvestSummary {
        engine_info!("Starting bulk harvest of {}", self.settings.listing_url);
        let mut summary = HarvestSummary::default();
        let Some(catalog) = self.fetch_catalog().await else {
            return summary;
        };

        for entry in &catalog {
            if let Err(err) = self.store.ensure_placeholder(&entry.slug()) {
                engine_error!("Failed creating placeholder for '{}': {}", entry.title, err);
            }
        }

        let total = catalog.len();
        let width = self.settings.concurrency.max(1);
        let extractor = Arc::clone(&self.extractor);
        let store = self.store.clone();
        let mut reports = stream::iter(catalog)
            .map(move |entry| {
                let extractor = Arc::clone(&extractor);
                let store = store.clone();
                let fallback = entry.clone();
                let handle =
                    tokio::spawn(async move { harvest_one(extractor.as_ref(), &store, &entry).await });
                async move {
                    handle.await.unwrap_or_else(|join_err| {
                        report(&fallback, ItemOutcome::Failed {
                            reason: format!("worker aborted: {join_err}"),
                        })
                    })
                }
            })
            .buffer_unordered(width);

        let mut failed = Vec::new();
        let mut done = 0;
        while let Some(item) = reports.next().await {
            done += 1;
            log_report(done, total, &item);
            summary.record(&item);
            if item.is_failure() {
                failed.push(FailureEntry::new(item.title, item.url));
            }
        }

        let ledger = self.ledger.ledger_mut();
        ledger.clear();
        for entry in failed {
            ledger.add(entry.title, entry.url);
        }
        self.ledger.save_or_log();

        engine_info!("Bulk harvest finished. {}", summary);
        summary
    }

    /// Harvest only catalog entries whose slug has no file yet, one at a time.
    /// Failures are appended to the ledger.
    pub async fn check_for_updates(&mut self) -> HarvestSummary {
        engine_info!("Checking {} for new or updated items", self.settings.listing_url);
        let mut summary = HarvestSummary::default();
        let Some(catalog) = self.fetch_catalog().await else {
            return summary;
        };
        let known = match self.store.slugs() {
            Ok(slugs) => slugs,
            Err(err) => {
                engine_error!("Could not list {:?}: {}", self.store.dir(), err);
                return summary;
            }
        };

        let fresh: Vec<CatalogEntry> = catalog
            .into_iter()
            .filter(|entry| !known.contains(&entry.slug()))
            .collect();
        let total = fresh.len();
        for (idx, entry) in fresh.iter().enumerate() {
            engine_info!(
                "[UPDATE] New or updated item '{}' (slug: {})",
                entry.title,
                entry.slug()
            );
            let item = harvest_one(self.extractor.as_ref(), &self.store, entry).await;
            log_report(idx + 1, total, &item);
            summary.record(&item);
            if item.is_failure() {
                self.ledger.add(item.title, item.url);
            }
        }

        if total == 0 {
            engine_info!("No new or updated items found");
        } else {
            engine_info!("Update check finished. {}", summary);
        }
        self.ledger.save_or_log();
        summary
    }

    /// Re-harvest every ledger entry sequentially. The ledger is replaced by
    /// the entries that still fail; returns how many remain.
    pub async fn retry_all(&mut self) -> usize {
        if self.ledger.is_empty() {
            engine_info!("No failed items to retry");
            return 0;
        }
        let pending = self.ledger.entries().to_vec();
        let total = pending.len();
        engine_info!("Retrying {} failed item(s) sequentially", total);

        let mut summary = HarvestSummary::default();
        let mut still_failed = Vec::new();
        for (idx, failure) in pending.into_iter().enumerate() {
            let entry = CatalogEntry::new(failure.title, failure.url);
            if let Err(err) = self.store.ensure_placeholder(&entry.slug()) {
                engine_error!("Failed creating placeholder for '{}': {}", entry.title, err);
            }
            let item = harvest_one(self.extractor.as_ref(), &self.store, &entry).await;
            log_report(idx + 1, total, &item);
            summary.record(&item);
            if item.is_failure() {
                still_failed.push(FailureEntry::new(item.title, item.url));
            }
        }

        self.ledger.ledger_mut().replace(still_failed);
        self.ledger.save_or_log();
        engine_info!(
            "Retry finished. {}. Still failed: {}",
            summary,
            self.ledger.len()
        );
        self.ledger.len()
    }
}

fn report(entry: &CatalogEntry, outcome: ItemOutcome) -> ItemReport {
    ItemReport {
        title: entry.title.clone(),
        url: entry.url.clone(),
        outcome,
    }
}

fn log_report(done: usize, total: usize, item: &ItemReport) {
    match item.outcome {
        ItemOutcome::Failed { .. } => engine_warn!("[{}/{}] {}", done, total, item),
        _ => engine_info!("[{}/{}] {}", done, total, item),
    }
}

/// Extract, judge and persist one catalog entry. Never fails; errors become
/// a failed report carrying the entry's title and url.
pub(crate) async fn harvest_one(
    extractor: &dyn RecordExtractor,
    store: &RecordStore,
    entry: &CatalogEntry,
) -> ItemReport {
    let outcome = match try_harvest(extractor, store, entry).await {
        Ok(outcome) => outcome,
        Err(err) => ItemOutcome::Failed {
            reason: err.to_string(),
        },
    };
    report(entry, outcome)
}

async fn try_harvest(
    extractor: &dyn RecordExtractor,
    store: &RecordStore,
    entry: &CatalogEntry,
) -> Result<ItemOutcome, MirrorError> {
    let mut record = extractor.extract(&entry.url).await?;
    if !record.has_links() {
        return Err(MirrorError::EmptyResult);
    }

    let slug = entry.slug();
    if record.links_back_to(&entry.url) {
        store.remove(&slug)?;
        return Ok(ItemOutcome::Skipped);
    }

    let cleaned = normalize_title(&record.title);
    record.title = if cleaned.is_empty() {
        normalize_title(&entry.title)
    } else {
        cleaned
    };
    if record.page_url.is_empty() {
        record.page_url = entry.url.clone();
    }
    store.save(&slug, &record)?;
    Ok(ItemOutcome::Saved)
}
