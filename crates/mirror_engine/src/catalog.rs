use engine_logging::{engine_info, engine_warn};
use mirror_core::CatalogEntry;
use scraper::{Html, Selector};
use url::Url;

use crate::extract::base_url;
use crate::fetch::PageFetcher;
use crate::MirrorError;

/// Enumerates what the listing page currently publishes.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Entries in listing order. An empty list is a valid answer.
    async fn list(&self, listing_url: &str) -> Result<Vec<CatalogEntry>, MirrorError>;
}

/// Reads the A–Z link block of the listing page.
#[derive(Debug, Clone)]
pub struct HtmlCatalogSource {
    fetcher: PageFetcher,
}

impl HtmlCatalogSource {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl CatalogSource for HtmlCatalogSource {
    async fn list(&self, listing_url: &str) -> Result<Vec<CatalogEntry>, MirrorError> {
        let page = self.fetcher.fetch(listing_url).await?;
        let entries = parse_catalog(&page.html, &page.final_url)?;
        engine_info!("Listing {} publishes {} item(s)", listing_url, entries.len());
        Ok(entries)
    }
}

const CONTAINER: &str = ".az-link-posts-block";

/// Every `a[href]` inside the listing container, relative hrefs resolved
/// against `listing_url`.
pub fn parse_catalog(html: &str, listing_url: &str) -> Result<Vec<CatalogEntry>, MirrorError> {
    let base = base_url(listing_url)?;
    let doc = Html::parse_document(html);
    let container = Selector::parse(CONTAINER)
        .map_err(|err| MirrorError::extraction(format!("bad selector: {err}")))?;
    let anchors = Selector::parse("a[href]")
        .map_err(|err| MirrorError::extraction(format!("bad selector: {err}")))?;

    let Some(block) = doc.select(&container).next() else {
        engine_warn!("Container {} not found on {}", CONTAINER, listing_url);
        return Ok(Vec::new());
    };

    let entries = block
        .select(&anchors)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            let url = match Url::parse(href) {
                Ok(url) => url.to_string(),
                Err(_) => base.join(href).ok()?.to_string(),
            };
            let title = a
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Some(CatalogEntry::new(title, url))
        })
        .collect();
    Ok(entries)
}
