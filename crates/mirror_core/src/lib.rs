//! Mirror core: pure domain types, title/slug rules, the failure set and the
//! download-interception state machine. No I/O.
mod effect;
mod fuzzy;
mod ledger;
mod msg;
mod record;
mod rewrite;
mod state;
mod title;
mod update;

pub use effect::InterceptEffect;
pub use fuzzy::{best_match, SIMILARITY_FLOOR};
pub use ledger::{FailureEntry, FailureLedger};
pub use msg::{is_challenge_page, ObservedResponse, Observation};
pub use record::{CatalogEntry, Record};
pub use rewrite::{RewriteFn, RewriteTable};
pub use state::{InterceptState, InterceptTiming};
pub use title::{normalize_title, record_slug, slugify, DEFAULT_SLUG};
pub use update::step;
