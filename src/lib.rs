//! A concurrent same-site crawler that extracts SEO metadata.
//!
//! The engine crawls breadth-first from a seed URL with a pool of fetch
//! workers and a single parse worker, all reporting to a dispatcher that
//! serializes every mutation of the shared crawl state. Fetching, parsing,
//! and result consumption are trait seams: bring your own or use the
//! bundled [`HttpFetcher`], [`SelectorParser`], and [`Collector`].

pub mod crawler;
mod fetch;
mod meta;
mod parse;
mod signal;
mod sink;

pub use crawler::{CrawlControls, Crawler, CrawlerOptions, Statistics};
pub use fetch::{Fetch, FetchError, FetchedPage, HttpFetcher};
pub use meta::{PageMeta, FIELD_DEFAULT};
pub use parse::{Document, HtmlParse, ParseError, SelectorParser};
pub use signal::Signal;
pub use sink::{Collector, Sink, UrlRecord};
