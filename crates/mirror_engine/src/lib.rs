//! Mirror engine: everything that touches the network or the disk. Harvest
//! orchestration, the record store and failure ledger files, reconciliation,
//! acquisition-link resolution and verified transfer.
mod browser;
mod catalog;
#[cfg(feature = "chromium")]
mod chromium;
mod decode;
mod extract;
mod fetch;
mod filename;
mod harvest;
mod intercept;
mod ledger_store;
mod persist;
mod reconcile;
mod resolve;
mod store;
mod transfer;
mod types;

pub use browser::{BrowserLauncher, BrowserSession};
pub use catalog::{parse_catalog, CatalogSource, HtmlCatalogSource};
#[cfg(feature = "chromium")]
pub use chromium::{ChromiumLauncher, ChromiumSettings};
pub use decode::{decode_page, DecodedPage};
pub use extract::{parse_record, HtmlRecordExtractor, RecordExtractor};
pub use fetch::{FetchSettings, FetchedPage, PageFetcher, DEFAULT_USER_AGENT};
pub use filename::download_filename;
pub use harvest::{HarvestSettings, Harvester, DEFAULT_CONCURRENCY, DEFAULT_LISTING_URL};
pub use intercept::{InterceptSettings, Interceptor};
pub use ledger_store::PersistentLedger;
pub use persist::{ensure_data_dir, AtomicFileWriter, PersistError};
pub use reconcile::{infer_title, source_url, ReconcileReport, Suspect};
pub use resolve::AcquisitionResolver;
pub use store::{RecordStore, StoredRecord, LEDGER_FILENAME};
pub use transfer::{TransferReport, TransferSettings, VerifiedTransfer};
pub use types::{
    BoxError, FailureKind, FetchError, HarvestSummary, ItemOutcome, ItemReport, MirrorError,
};
