use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use crate::meta::{self, PageMeta};

/// The body could not be turned into a queryable document.
///
/// The display string doubles as the note reported for the URL.
#[derive(Debug, thiserror::Error)]
#[error("HTML parsing error")]
pub struct ParseError;

/// A parsed page that can be queried with CSS selectors.
///
/// All methods return matches in document order. An invalid selector yields
/// no matches rather than an error; the selectors the engine uses are fixed.
pub trait Document {
    /// Text content of every element matching `css`.
    fn select_text(&self, css: &str) -> Vec<String>;
    /// The `attr` attribute of every element matching `css`, where present.
    fn select_attr(&self, css: &str, attr: &str) -> Vec<String>;
    /// Every hyperlink target on the page. Relative hrefs are resolved
    /// against `base`; unresolvable ones are skipped.
    fn links(&self, base: &str) -> Vec<String>;
}

/// The parse capability consumed by the crawl engine.
pub trait HtmlParse: Send + Sync {
    fn parse(&self, body: &[u8]) -> Result<Box<dyn Document>, ParseError>;
}

/// Parser backed by the `scraper` crate. Rejects bodies that are not valid
/// UTF-8; anything else parses, however malformed.
pub struct SelectorParser;

impl HtmlParse for SelectorParser {
    fn parse(&self, body: &[u8]) -> Result<Box<dyn Document>, ParseError> {
        let text = std::str::from_utf8(body).map_err(|_| ParseError)?;
        Ok(Box::new(ScraperDocument {
            html: Html::parse_document(text),
        }))
    }
}

struct ScraperDocument {
    html: Html,
}

impl Document for ScraperDocument {
    fn select_text(&self, css: &str) -> Vec<String> {
        let Some(selector) = compile(css) else {
            return Vec::new();
        };
        self.html
            .select(&selector)
            .map(|element| element.text().collect::<String>().trim().to_string())
            .collect()
    }

    fn select_attr(&self, css: &str, attr: &str) -> Vec<String> {
        let Some(selector) = compile(css) else {
            return Vec::new();
        };
        self.html
            .select(&selector)
            .filter_map(|element| element.value().attr(attr))
            .map(str::to_string)
            .collect()
    }

    fn links(&self, base: &str) -> Vec<String> {
        let Some(selector) = compile("a[href]") else {
            return Vec::new();
        };
        let Ok(base) = Url::parse(base) else {
            tracing::warn!(url = base, "cannot resolve links against invalid base url");
            return Vec::new();
        };
        self.html
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| match Url::parse(href) {
                Ok(url) => Some(url.to_string()),
                // likely relative, resolve the way a browser would
                Err(_) => base.join(href).ok().map(|url| url.to_string()),
            })
            .collect()
    }
}

fn compile(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            tracing::warn!(selector = css, "invalid css selector: {err}");
            None
        }
    }
}

/// Extracts the six body metadata fields through fixed selectors. Every
/// field is present in the result, holding the placeholder when the page
/// has no match.
pub(crate) fn extract_meta(doc: &dyn Document) -> PageMeta {
    PageMeta {
        title: Some(meta::collapse(doc.select_text("title"))),
        desc: Some(meta::collapse(
            doc.select_attr("meta[name=description]", "content"),
        )),
        kw: Some(meta::collapse(
            doc.select_attr("meta[name=keywords]", "content"),
        )),
        canonical: Some(meta::collapse(
            doc.select_attr("link[rel=canonical]", "href"),
        )),
        h1: Some(meta::collapse(doc.select_text("h1"))),
        h2: Some(meta::collapse(doc.select_text("h2"))),
        ..PageMeta::default()
    }
}

/// Collects the page's outbound links that stay on the crawled site.
///
/// "Same site" is a plain prefix match against the seed URL, not an origin
/// comparison: `http://x.test2/` passes a prefix of `http://x.test`. Kept
/// as documented behavior.
pub(crate) fn same_site_links(doc: &dyn Document, base: &str, page_url: &str) -> HashSet<String> {
    doc.links(page_url)
        .into_iter()
        .filter(|link| link.starts_with(base))
        .collect()
}
