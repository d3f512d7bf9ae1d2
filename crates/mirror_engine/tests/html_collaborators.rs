use mirror_core::CatalogEntry;
use mirror_engine::{
    parse_catalog, parse_record, CatalogSource, FetchSettings, HtmlCatalogSource,
    HtmlRecordExtractor, MirrorError, PageFetcher, RecordExtractor,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ITEM_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<figure class="single-featured-image">
  <img src="data:image/gif;base64,R0lGOD" data-src="/covers/foo.jpg">
</figure>
<article id="the-post">
  <div class="entry-content">
    <p>Foo is a game about foo.</p>
    <p>It has <b>bold</b> moments.</p>
    <h2>Foo Free Download (v1.2)</h2>
    <h4>SCREENSHOTS</h4>
    <p><a href="/shots/1.jpg">1</a><a href="https://img.example/2.jpg">2</a></p>
    <h4>SYSTEM REQUIREMENTS</h4>
    <div class="checklist"><ul>
      <li><strong>OS:</strong> Windows 10</li>
      <li><strong>Memory:</strong> 8 GB RAM</li>
    </ul></div>
    <div class="plus"><ul>
      <li><strong>Size:</strong> 2.1 GB</li>
    </ul></div>
    <p><a href="//cdn.example/foo.zip">DOWNLOAD HERE</a></p>
    <p><a href="https://mirror.example/foo">Mirror download</a></p>
    <p><a href="https://site.example/about">About us</a></p>
  </div>
</article>
</body></html>"#;

#[test]
fn parses_a_full_item_page() {
    let record = parse_record(ITEM_PAGE, "https://site.example/foo-free-download/").unwrap();

    assert_eq!(record.page_url, "https://site.example/foo-free-download/");
    assert_eq!(record.title, "Foo Free Download (v1.2)");
    assert_eq!(
        record.description,
        "Foo is a game about foo.\nIt has bold moments."
    );
    assert_eq!(
        record.cover_image.as_deref(),
        Some("https://site.example/covers/foo.jpg")
    );
    assert_eq!(
        record.screenshots,
        vec![
            "https://site.example/shots/1.jpg".to_string(),
            "https://img.example/2.jpg".to_string(),
        ]
    );
    assert_eq!(record.requirements.get("OS").map(String::as_str), Some("Windows 10"));
    assert_eq!(
        record.requirements.get("Memory").map(String::as_str),
        Some("8 GB RAM")
    );
    assert_eq!(record.details.get("Size").map(String::as_str), Some("2.1 GB"));
    assert_eq!(
        record.acquisition_links,
        vec![
            "https://cdn.example/foo.zip".to_string(),
            "https://mirror.example/foo".to_string(),
        ]
    );
}

#[test]
fn missing_article_is_an_extraction_error() {
    let err = parse_record("<html><body><p>nothing</p></body></html>", "https://x/").unwrap_err();
    assert!(matches!(err, MirrorError::Extraction { .. }));
}

#[test]
fn page_without_links_that_is_no_longer_working_lists_itself() {
    let html = r#"<article id="the-post"><div class="entry-content">
        <h1>Bar Direct Download</h1>
        <p>This fix is no longer working.</p>
    </div></article>"#;
    let record = parse_record(html, "https://site.example/bar/").unwrap();

    assert_eq!(record.title, "Bar");
    assert_eq!(record.acquisition_links, vec!["https://site.example/bar/".to_string()]);
    assert!(record.links_back_to("https://site.example/bar/"));
}

#[test]
fn page_without_links_parses_with_empty_list() {
    let html = r#"<article id="the-post"><div class="entry-content">
        <h3>Baz Free</h3>
    </div></article>"#;
    let record = parse_record(html, "https://site.example/baz/").unwrap();
    assert!(record.acquisition_links.is_empty());
}

#[test]
fn relative_page_url_is_an_extraction_error_with_its_cause() {
    use std::error::Error;

    let err = parse_record(ITEM_PAGE, "/foo-free-download/").unwrap_err();
    assert!(matches!(err, MirrorError::Extraction { .. }));
    let cause = err.source().expect("parse error kept as source");
    assert!(cause.downcast_ref::<url::ParseError>().is_some());

    let err = parse_catalog("<html></html>", "games-list-page").unwrap_err();
    assert!(err.source().is_some());
}

const LISTING: &str = r#"<html><body>
<nav><a href="/elsewhere">Not listed</a></nav>
<div class="az-link-posts-block">
  <ul>
    <li><a href="/foo-free-download/">Foo Free Download</a></li>
    <li><a href="https://other.example/bar/">Bar</a></li>
  </ul>
</div>
</body></html>"#;

#[test]
fn catalog_reads_only_the_link_block() {
    let entries = parse_catalog(LISTING, "https://site.example/games-list-page/").unwrap();
    assert_eq!(
        entries,
        vec![
            CatalogEntry::new("Foo Free Download", "https://site.example/foo-free-download/"),
            CatalogEntry::new("Bar", "https://other.example/bar/"),
        ]
    );
}

#[test]
fn catalog_without_container_is_empty() {
    let entries = parse_catalog("<html><a href='/x'>x</a></html>", "https://site.example/").unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn html_collaborators_fetch_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/games-list-page/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LISTING, "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/foo-free-download/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ITEM_PAGE, "text/html"))
        .mount(&server)
        .await;
    let fetcher = PageFetcher::new(FetchSettings::default()).unwrap();

    let catalog = HtmlCatalogSource::new(fetcher.clone());
    let entries = catalog
        .list(&format!("{}/games-list-page/", server.uri()))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].url, format!("{}/foo-free-download/", server.uri()));

    let extractor = HtmlRecordExtractor::new(fetcher);
    let record = extractor.extract(&entries[0].url).await.unwrap();
    assert_eq!(record.title, "Foo Free Download (v1.2)");
    assert_eq!(record.acquisition_links.len(), 2);
}

#[tokio::test]
async fn extractor_reports_network_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let extractor = HtmlRecordExtractor::new(PageFetcher::new(FetchSettings::default()).unwrap());

    let err = extractor
        .extract(&format!("{}/gone/", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, MirrorError::Network(_)));
}
