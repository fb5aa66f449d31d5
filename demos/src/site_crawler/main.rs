use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing_subscriber::{prelude::*, EnvFilter};

use sitecrawler::{Crawler, CrawlerOptions, HttpFetcher, SelectorParser};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("info"))
                .expect("telemetry: Creating EnvFilter"),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(seed) = args.next() else {
        eprintln!("usage: site-crawler <seed-url> [fetch-workers]");
        std::process::exit(1);
    };
    let mut options = CrawlerOptions::default();
    if let Some(workers) = args.next().and_then(|value| value.parse().ok()) {
        options.fetch_workers = workers;
    }
    // the ten minute default suits unattended runs; interactive ones want
    // completion detected much sooner
    options.idle_timeout = Duration::from_secs(30);

    let fetcher = match HttpFetcher::new(Duration::from_secs(20)) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(err) => {
            eprintln!("failed to build http client: {err}");
            std::process::exit(1);
        }
    };

    let (crawler, controls) = Crawler::new(options);
    tokio::spawn(async move {
        // first ctrl-c drains, second one pulls the plug
        if signal::ctrl_c().await.is_ok() {
            controls.stop();
        }
        if signal::ctrl_c().await.is_ok() {
            controls.stop_abrupt();
        }
    });

    crawler
        .run(
            seed,
            fetcher,
            Arc::new(SelectorParser),
            Arc::new(printing::PrintSink),
        )
        .await;
}

mod printing {
    use async_trait::async_trait;
    use sitecrawler::{PageMeta, Sink};

    /// Writes crawl progress to stdout, one line per event.
    pub struct PrintSink;

    #[async_trait]
    impl Sink for PrintSink {
        async fn on_new_url(&self, url: &str) {
            println!("{url} added");
        }
        async fn on_metadata(&self, url: &str, meta: &PageMeta) {
            match meta.title.as_deref() {
                Some(title) => println!("{url} meta received (title: {title})"),
                None => println!("{url} meta received"),
            }
        }
        async fn on_note(&self, url: &str, note: &str) {
            println!("new note for {url}: {note}");
        }
    }
}
