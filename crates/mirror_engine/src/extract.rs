use std::collections::BTreeMap;

use ego_tree::NodeRef;
use mirror_core::Record;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::PageFetcher;
use crate::MirrorError;

/// Turns one item page into a [`Record`].
#[async_trait::async_trait]
pub trait RecordExtractor: Send + Sync {
    async fn extract(&self, page_url: &str) -> Result<Record, MirrorError>;
}

/// Extractor for the listing site's article layout.
#[derive(Debug, Clone)]
pub struct HtmlRecordExtractor {
    fetcher: PageFetcher,
}

impl HtmlRecordExtractor {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl RecordExtractor for HtmlRecordExtractor {
    async fn extract(&self, page_url: &str) -> Result<Record, MirrorError> {
        let page = self.fetcher.fetch(page_url).await?;
        parse_record(&page.html, page_url)
    }
}

const TITLE_KEYWORDS: &[&str] = &["download", "free", "direct"];
const LAZY_IMAGE_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-main-img"];
const NO_LONGER_WORKING: &str = "fix is no longer working.";

/// Parse an item page. Fails only when required anchors are missing; an empty
/// link list is returned as-is for the caller to judge.
pub fn parse_record(html: &str, page_url: &str) -> Result<Record, MirrorError> {
    let doc = Html::parse_document(html);
    let base = base_url(page_url)?;

    let cover_image = match doc.select(&selector("figure.single-featured-image")?).next() {
        Some(figure) => {
            let img = figure.select(&selector("img")?).next().ok_or_else(|| {
                MirrorError::extraction("expected <img> inside the cover figure")
            })?;
            Some(real_image_url(img, &base))
        }
        None => None,
    };

    let post = doc
        .select(&selector("article#the-post")?)
        .next()
        .ok_or_else(|| MirrorError::extraction("expected <article id=\"the-post\">"))?;
    let content = post
        .select(&selector("div.entry-content")?)
        .next()
        .ok_or_else(|| MirrorError::extraction("expected <div class=\"entry-content\"> in article"))?;

    let title = find_title(content)?
        .replace("Direct Download", "")
        .trim()
        .to_string();

    let mut acquisition_links: Vec<String> = content
        .select(&selector("a[href]")?)
        .filter(|a| element_text(*a).to_lowercase().contains("download"))
        .filter_map(|a| a.value().attr("href"))
        .map(|href| match href.strip_prefix("//") {
            Some(rest) => format!("https://{rest}"),
            None => href.to_string(),
        })
        .collect();
    if acquisition_links.is_empty()
        && element_text(content).to_lowercase().contains(NO_LONGER_WORKING)
    {
        acquisition_links.push(page_url.to_string());
    }

    Ok(Record {
        page_url: page_url.to_string(),
        title,
        description: description(content),
        screenshots: screenshots(content, &base)?,
        requirements: labelled_list(content, "div.checklist")?,
        details: labelled_list(content, "div.plus")?,
        acquisition_links,
        cover_image,
    })
}

/// Page urls must be absolute; relative links are resolved against them.
pub(crate) fn base_url(page_url: &str) -> Result<Url, MirrorError> {
    Url::parse(page_url).map_err(|err| {
        MirrorError::extraction_caused_by(format!("page url {page_url:?} is not absolute"), err)
    })
}

fn selector(css: &str) -> Result<Selector, MirrorError> {
    Selector::parse(css)
        .map_err(|err| MirrorError::extraction(format!("bad selector {css:?}: {err}")))
}

/// Trimmed text fragments joined by single spaces.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mentions_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    TITLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn find_title(content: ElementRef<'_>) -> Result<String, MirrorError> {
    for tag in ["h2", "h1", "h3"] {
        let hit = content
            .select(&selector(tag)?)
            .map(element_text)
            .find(|text| mentions_keyword(text));
        if let Some(title) = hit {
            return Ok(title);
        }
    }
    content
        .select(&selector("p")?)
        .take(5)
        .map(element_text)
        .find(|text| mentions_keyword(text))
        .ok_or_else(|| {
            MirrorError::extraction("no heading or leading paragraph names a download title")
        })
}

fn child_elements(content: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    content.children().filter_map(ElementRef::wrap)
}

fn following_elements(node: NodeRef<'_, Node>) -> impl Iterator<Item = ElementRef<'_>> {
    node.next_siblings().filter_map(ElementRef::wrap)
}

/// Direct-child paragraphs before the first direct-child `h4`.
fn description(content: ElementRef<'_>) -> String {
    child_elements(content)
        .take_while(|el| el.value().name() != "h4")
        .filter(|el| el.value().name() == "p")
        .map(element_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn screenshots(content: ElementRef<'_>, base: &Url) -> Result<Vec<String>, MirrorError> {
    let heading = content
        .select(&selector("h4")?)
        .find(|h4| element_text(*h4).to_uppercase().contains("SCREENSHOTS"));
    let Some(heading) = heading else {
        return Ok(Vec::new());
    };
    let anchors = selector("a[href]")?;
    Ok(following_elements(*heading)
        .take_while(|el| el.value().name() != "h4")
        .flat_map(|el| el.select(&anchors).collect::<Vec<_>>())
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve(href, base))
        .collect())
}

/// `<li><strong>Label:</strong> value</li>` rows under the first `container`.
fn labelled_list(
    content: ElementRef<'_>,
    container: &str,
) -> Result<BTreeMap<String, String>, MirrorError> {
    let mut table = BTreeMap::new();
    let Some(block) = content.select(&selector(container)?).next() else {
        return Ok(table);
    };
    let strong = selector("strong")?;
    for li in block.select(&selector("li")?) {
        let Some(label) = li.select(&strong).next().map(element_text) else {
            continue;
        };
        let value = element_text(li)
            .replacen(&label, "", 1)
            .trim_matches(|c: char| c == ':' || c.is_whitespace())
            .to_string();
        table.insert(label.trim_end_matches(':').trim().to_string(), value);
    }
    Ok(table)
}

fn real_image_url(img: ElementRef<'_>, base: &Url) -> String {
    let attrs = img.value();
    let src = attrs.attr("src").unwrap_or_default();
    if !src.starts_with("data:image/") {
        return resolve(src, base).unwrap_or_else(|| src.to_string());
    }
    let lazy = LAZY_IMAGE_ATTRS
        .iter()
        .filter_map(|name| attrs.attr(name))
        .find(|candidate| !candidate.starts_with("data:image/"));
    let from_srcset = || {
        attrs
            .attr("srcset")
            .and_then(|set| set.split(',').next())
            .and_then(|first| first.split_whitespace().next())
            .filter(|first| !first.starts_with("data:image/"))
    };
    match lazy.or_else(from_srcset) {
        Some(found) => resolve(found, base).unwrap_or_else(|| found.to_string()),
        None => src.to_string(),
    }
}

fn resolve(reference: &str, base: &Url) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url.into());
    }
    base.join(trimmed).ok().map(Into::into)
}
