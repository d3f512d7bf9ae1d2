use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use engine_logging::engine_info;
use mirror_core::{Record, RewriteTable};
use mirror_engine::{
    download_filename, ensure_data_dir, AcquisitionResolver, Harvester, HtmlCatalogSource,
    HtmlRecordExtractor, PageFetcher, PersistentLedger, RecordStore, VerifiedTransfer,
};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use super::console::Console;
use super::settings::MirrorSettings;

/// One operator session: the runtime plus every engine component, built once.
pub(crate) struct App {
    runtime: Runtime,
    harvester: Harvester,
    resolver: AcquisitionResolver,
    transfer: VerifiedTransfer,
}

impl App {
    pub fn new(settings: &MirrorSettings) -> anyhow::Result<Self> {
        ensure_data_dir(&settings.data_dir)
            .with_context(|| format!("data directory {:?} is not usable", settings.data_dir))?;
        let fetcher = PageFetcher::new(settings.fetch()).context("building the page client")?;
        let harvester = Harvester::new(
            Arc::new(HtmlRecordExtractor::new(fetcher.clone())),
            Arc::new(HtmlCatalogSource::new(fetcher)),
            RecordStore::new(settings.data_dir.clone()),
            PersistentLedger::open(settings.data_dir.clone()),
            settings.harvest(),
        );
        let transfer =
            VerifiedTransfer::new(settings.transfer()).context("building the transfer client")?;
        Self::from_parts(harvester, build_resolver(settings), transfer)
    }

    pub fn from_parts(
        harvester: Harvester,
        resolver: AcquisitionResolver,
        transfer: VerifiedTransfer,
    ) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("starting the async runtime")?;
        Ok(Self {
            runtime,
            harvester,
            resolver,
            transfer,
        })
    }

    /// A first run has nothing to search, so harvest before showing the menu.
    pub fn harvest_if_empty<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
    ) -> io::Result<()> {
        if !self.harvester.store_is_empty() {
            return Ok(());
        }
        writeln!(console.out, "[INFO] Database empty. Harvesting now...")?;
        self.bulk_harvest(console)
    }

    pub fn search<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        query: &str,
    ) -> io::Result<()> {
        if query.is_empty() {
            writeln!(console.out, "[WARNING] Search term cannot be empty.")?;
            return Ok(());
        }
        let matches = match self.harvester.store().search(query) {
            Ok(matches) => matches,
            Err(err) => {
                writeln!(console.out, "[ERROR] Could not read the database: {err}")?;
                return Ok(());
            }
        };
        if matches.is_empty() {
            writeln!(console.out, "[INFO] No results found.")?;
            return Ok(());
        }
        writeln!(console.out, "\n[INFO] Found {} result(s):", matches.len())?;
        for (idx, record) in matches.iter().enumerate() {
            writeln!(console.out, "\n{}. {}", idx + 1, record.title)?;
            if record.has_links() {
                writeln!(console.out, "   Download links:")?;
                for link in &record.acquisition_links {
                    writeln!(console.out, "    - {link}")?;
                }
            }
        }
        Ok(())
    }

    pub fn refresh<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        assume_yes: bool,
    ) -> io::Result<()> {
        if !assume_yes && !console.confirm("This will overwrite existing files. Continue?")? {
            writeln!(console.out, "[INFO] Refresh cancelled.")?;
            return Ok(());
        }
        self.bulk_harvest(console)
    }

    fn bulk_harvest<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> io::Result<()> {
        let summary = self.runtime.block_on(self.harvester.run_bulk_harvest());
        if summary.total() == 0 {
            writeln!(
                console.out,
                "[WARNING] Nothing harvested; the listing page returned no items."
            )?;
            return Ok(());
        }
        writeln!(console.out, "[INFO] Harvest finished. {summary}")
    }

    pub fn clean<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        assume_yes: bool,
    ) -> io::Result<()> {
        if !assume_yes
            && !console.confirm("Are you sure you want to delete ALL database files?")?
        {
            writeln!(console.out, "[INFO] Clean cancelled.")?;
            return Ok(());
        }
        match self.harvester.clean_store() {
            Ok(deleted) => writeln!(console.out, "[INFO] Deleted {deleted} file(s)."),
            Err(err) => writeln!(console.out, "[ERROR] Could not clean the database: {err}"),
        }
    }

    pub fn retry<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> io::Result<()> {
        let pending = self.harvester.ledger().len();
        if pending == 0 {
            writeln!(console.out, "[INFO] No failed items to retry.")?;
            return Ok(());
        }
        writeln!(console.out, "[INFO] Retrying {pending} failed item(s)...")?;
        let remaining = self.runtime.block_on(self.harvester.retry_all());
        writeln!(
            console.out,
            "[INFO] Retry finished. {} recovered, {remaining} still failing.",
            pending - remaining.min(pending)
        )
    }

    pub fn quickcheck<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        assume_yes: bool,
    ) -> io::Result<()> {
        let suspects = match self.harvester.scan_suspects() {
            Ok(suspects) => suspects,
            Err(err) => {
                writeln!(console.out, "[ERROR] Could not scan the database: {err}")?;
                return Ok(());
            }
        };
        if suspects.is_empty() {
            writeln!(console.out, "[INFO] No suspicious or incomplete files found.")?;
            return Ok(());
        }

        writeln!(
            console.out,
            "\n[INFO] Found {} suspicious/incomplete file(s):",
            suspects.len()
        )?;
        for (idx, suspect) in suspects.iter().enumerate() {
            let file = suspect
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| suspect.slug.clone());
            writeln!(
                console.out,
                "{}. File: {file}, Title: {}, Download links: {}",
                idx + 1,
                suspect.title.as_deref().unwrap_or("-"),
                suspect.link_count
            )?;
        }

        if !assume_yes && !console.confirm("Mark these as failed for retry?")? {
            writeln!(console.out, "[INFO] Quickcheck cancelled.")?;
            return Ok(());
        }
        let report = self.runtime.block_on(self.harvester.reconcile(&suspects));
        for slug in &report.unresolved {
            writeln!(
                console.out,
                "[WARNING] No title or url found for '{slug}', not added to the failure ledger."
            )?;
        }
        writeln!(
            console.out,
            "[INFO] Updated failure ledger with {} entries ({} already listed).",
            report.added, report.already_known
        )
    }

    pub fn updates<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> io::Result<()> {
        let summary = self.runtime.block_on(self.harvester.check_for_updates());
        if summary.total() == 0 {
            writeln!(console.out, "[INFO] No new items found.")?;
            return Ok(());
        }
        writeln!(console.out, "[INFO] Update check finished. {summary}")
    }

    /// Guided download: pick a record and one of its links, resolve it and
    /// run a verified transfer into `output` (asked for when `None`).
    pub fn download<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        query: Option<String>,
        output: Option<PathBuf>,
    ) -> io::Result<()> {
        let query = match query {
            Some(query) => query,
            None => console
                .ask("\nEnter game title or part of it to download: ")?
                .unwrap_or_default(),
        };
        if query.is_empty() {
            writeln!(console.out, "[WARNING] Title cannot be empty.")?;
            return Ok(());
        }
        let matches = match self.harvester.store().search(&query) {
            Ok(matches) => matches,
            Err(err) => {
                writeln!(console.out, "[ERROR] Could not read the database: {err}")?;
                return Ok(());
            }
        };
        if matches.is_empty() {
            writeln!(console.out, "[INFO] No matching games found.")?;
            return Ok(());
        }

        writeln!(console.out, "\nFound {} match(es):", matches.len())?;
        for (idx, record) in matches.iter().enumerate() {
            writeln!(console.out, "{}. {}", idx + 1, record.title)?;
        }
        let Some(choice) = console.choose("Select a game to download", matches.len())? else {
            return Ok(());
        };
        let record = &matches[choice];
        if !record.has_links() {
            writeln!(console.out, "[INFO] No download links found for this game.")?;
            return Ok(());
        }

        writeln!(console.out, "\nAvailable download links:")?;
        for (idx, link) in record.acquisition_links.iter().enumerate() {
            writeln!(console.out, "{}. {link}", idx + 1)?;
        }
        let Some(choice) =
            console.choose("Select a download link", record.acquisition_links.len())?
        else {
            return Ok(());
        };
        let link = &record.acquisition_links[choice];

        writeln!(console.out, "[INFO] Retrieving direct download URL for: {link}")?;
        if !self.resolver.is_static(link) && self.resolver.can_intercept() {
            writeln!(
                console.out,
                "[INFO] A browser will open. Solve any challenge shown there; Ctrl-C gives up."
            )?;
        }
        let Some(direct) = self.resolve(link) else {
            writeln!(console.out, "[ERROR] Could not retrieve direct download URL.")?;
            return Ok(());
        };

        let folder = match output {
            Some(folder) => folder,
            None => {
                let answer = console
                    .ask("Download folder (empty for current directory): ")?
                    .unwrap_or_default();
                if answer.is_empty() {
                    PathBuf::from(".")
                } else {
                    PathBuf::from(answer)
                }
            }
        };
        self.transfer_into(console, record, link, &direct, &folder)
    }

    fn transfer_into<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        record: &Record,
        link: &str,
        direct: &str,
        folder: &Path,
    ) -> io::Result<()> {
        if let Err(err) = ensure_data_dir(folder) {
            writeln!(console.out, "[ERROR] Cannot write to {}: {err}", folder.display())?;
            return Ok(());
        }
        let title = Some(record.title.as_str()).filter(|t| !t.trim().is_empty());
        let dest = folder.join(download_filename(direct, title));

        writeln!(console.out, "[INFO] Starting download from direct URL: {direct}")?;
        match self.runtime.block_on(self.transfer.download(direct, &dest)) {
            Ok(report) => {
                writeln!(
                    console.out,
                    "[SUCCESS] Saved {} bytes to {}",
                    report.bytes,
                    report.path.display()
                )?;
                writeln!(console.out, "  final url: {}", report.final_url)?;
                writeln!(console.out, "  sha256: {}", report.sha256)
            }
            Err(err) => {
                writeln!(console.out, "[WARNING] Direct download failed: {err}")?;
                writeln!(console.out, "[INFO] Original download page: {link}")
            }
        }
    }

    /// Resolves `link`; a browser session is torn down on Ctrl-C.
    fn resolve(&self, link: &str) -> Option<String> {
        if self.resolver.is_static(link) {
            return self.runtime.block_on(self.resolver.resolve(link));
        }
        self.runtime.block_on(async {
            let cancel = CancellationToken::new();
            let watcher = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        engine_info!("Interrupted, closing the browser session");
                        cancel.cancel();
                    }
                }
            });
            let direct = self.resolver.resolve_until(link, &cancel).await;
            watcher.abort();
            direct
        })
    }
}

#[cfg(feature = "chromium")]
fn build_resolver(settings: &MirrorSettings) -> AcquisitionResolver {
    use mirror_engine::{ChromiumLauncher, Interceptor};

    let launcher = Arc::new(ChromiumLauncher::new(settings.chromium()));
    AcquisitionResolver::new(
        RewriteTable::builtin(),
        Interceptor::new(launcher, settings.intercept()),
    )
}

#[cfg(not(feature = "chromium"))]
fn build_resolver(_settings: &MirrorSettings) -> AcquisitionResolver {
    use engine_logging::engine_warn;

    engine_warn!("Built without the chromium feature; only rewritable links can be resolved");
    AcquisitionResolver::rewrites_only(RewriteTable::builtin())
}
