use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::fetch::Fetch;
use crate::parse::{self, HtmlParse};
use crate::signal::{Signal, SignalReceiver, SignalSender};
use crate::sink::Sink;

mod dispatcher;
mod frontier;
mod statistics;

use dispatcher::Dispatcher;
use frontier::Frontier;
pub use statistics::Statistics;

/// Tunable knobs for a crawl.
#[derive(Debug, Clone)]
pub struct CrawlerOptions {
    /// Number of concurrent fetch workers.
    pub fetch_workers: usize,
    /// How long the dispatcher waits for a signal before treating the
    /// crawl as naturally complete.
    pub idle_timeout: Duration,
    /// How long in-flight work gets to finish after a graceful stop.
    pub drain_timeout: Duration,
    /// How long the dispatcher waits for workers to exit during shutdown
    /// before giving up on them.
    pub join_timeout: Duration,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            fetch_workers: 3,
            idle_timeout: Duration::from_secs(600),
            drain_timeout: Duration::from_secs(10),
            join_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for stopping a running crawl from outside.
#[derive(Debug, Clone)]
pub struct CrawlControls {
    signals: SignalSender,
    abrupt: CancellationToken,
}

impl CrawlControls {
    /// Requests a graceful stop: queued URLs are still fetched, nothing new
    /// is admitted.
    pub fn stop(&self) {
        let _ = self.signals.send(Signal::Stop);
    }

    /// Requests an immediate stop, discarding queued work. The token is
    /// cancelled directly so workers wake even while the dispatcher is
    /// busy joining them.
    pub fn stop_abrupt(&self) {
        self.abrupt.cancel();
        let _ = self.signals.send(Signal::StopAbrupt);
    }
}

/// The crawl engine: a pool of fetch workers, one parse worker, and a
/// dispatcher serializing every mutation of the shared crawl state.
pub struct Crawler {
    options: CrawlerOptions,
    signal_tx: SignalSender,
    signal_rx: SignalReceiver,
    stopping: CancellationToken,
    abrupt: CancellationToken,
}

impl Crawler {
    pub fn new(options: CrawlerOptions) -> (Self, CrawlControls) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let abrupt = CancellationToken::new();
        let controls = CrawlControls {
            signals: signal_tx.clone(),
            abrupt: abrupt.clone(),
        };
        (
            Self {
                options,
                signal_tx,
                signal_rx,
                stopping: CancellationToken::new(),
                abrupt,
            },
            controls,
        )
    }

    /// Crawls the site under `seed` until it is exhausted or a stop is
    /// requested, reporting everything to `sink`.
    pub async fn run(
        self,
        seed: impl Into<String>,
        fetcher: Arc<dyn Fetch>,
        parser: Arc<dyn HtmlParse>,
        sink: Arc<dyn Sink>,
    ) {
        let Self {
            options,
            signal_tx,
            signal_rx,
            stopping,
            abrupt,
        } = self;
        let seed = seed.into();
        tracing::info!(seed, fetch_workers = options.fetch_workers, "starting crawl");
        let starting_time = Instant::now();
        let statistics = Statistics::default();

        let (frontier, pending_rx) = Frontier::new();
        let (content_tx, content_rx) = mpsc::unbounded_channel();
        let tracker = TaskTracker::new();

        launch_fetchers(
            &tracker,
            options.fetch_workers,
            fetcher,
            pending_rx,
            signal_tx.clone(),
            statistics.clone(),
            abrupt.clone(),
        );
        launch_parser(
            &tracker,
            parser,
            seed.clone(),
            content_rx,
            signal_tx.clone(),
            statistics.clone(),
            stopping.clone(),
            abrupt.clone(),
        );
        tracker.close();

        // the seed takes the same admission path as discovered links, so
        // the sink hears about it before its first fetch
        let _ = signal_tx.send(Signal::AddUrls(HashSet::from([seed])));
        drop(signal_tx);

        let dispatcher = Dispatcher::new(
            signal_rx, frontier, content_tx, sink, stopping, abrupt, &options,
        );
        let phase = dispatcher.run(&tracker).await;
        tracing::debug!(?phase, "crawler: control loop exited");

        statistics.write_to_log(starting_time.elapsed());
    }
}

fn launch_fetchers(
    tracker: &TaskTracker,
    concurrency: usize,
    fetcher: Arc<dyn Fetch>,
    pending: mpsc::UnboundedReceiver<String>,
    signals: SignalSender,
    statistics: Statistics,
    abrupt: CancellationToken,
) {
    let pool_abrupt = abrupt.clone();
    tracker.spawn(async move {
        let pool = UnboundedReceiverStream::new(pending).for_each_concurrent(concurrency, |url| {
            let fetcher = fetcher.clone();
            let signals = signals.clone();
            let statistics = statistics.clone();
            let abrupt = abrupt.clone();
            async move {
                tokio::select! {
                    biased;
                    _ = abrupt.cancelled() => {}
                    () = fetch_one(&*fetcher, url, &signals, &statistics) => {}
                }
            }
        });
        tokio::select! {
            _ = pool_abrupt.cancelled() => {}
            () = pool => {}
        }
    });
}

async fn fetch_one(
    fetcher: &dyn Fetch,
    url: String,
    signals: &SignalSender,
    statistics: &Statistics,
) {
    statistics.num_fetches.fetch_add(1, Ordering::SeqCst);
    match fetcher.fetch(&url).await {
        Err(err) => {
            statistics.num_fetch_errors.fetch_add(1, Ordering::SeqCst);
            tracing::error!(url, "fetch error: {err}");
            let _ = signals.send(Signal::Note(url, err.to_string()));
        }
        Ok(page) => {
            if page.final_url != url {
                let _ = signals.send(Signal::Note(
                    url.clone(),
                    format!("redirected to {}", page.final_url),
                ));
            }
            let meta = page.header_meta();
            if let Some(body) = page.body {
                let _ = signals.send(Signal::AddContent(url.clone(), body));
            }
            let _ = signals.send(Signal::UrlMeta(url, meta));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn launch_parser(
    tracker: &TaskTracker,
    parser: Arc<dyn HtmlParse>,
    base_url: String,
    mut content: mpsc::UnboundedReceiver<(String, Vec<u8>)>,
    signals: SignalSender,
    statistics: Statistics,
    stopping: CancellationToken,
    abrupt: CancellationToken,
) {
    tracker.spawn(async move {
        loop {
            let item = tokio::select! {
                biased;
                _ = abrupt.cancelled() => None,
                item = content.recv() => item,
            };
            let Some((url, body)) = item else { break };
            parse_one(
                &*parser,
                &base_url,
                url,
                &body,
                &signals,
                &statistics,
                &stopping,
            );
        }
    });
}

// deliberately synchronous: the parsed document never crosses an await
fn parse_one(
    parser: &dyn HtmlParse,
    base_url: &str,
    url: String,
    body: &[u8],
    signals: &SignalSender,
    statistics: &Statistics,
    stopping: &CancellationToken,
) {
    statistics.num_parses.fetch_add(1, Ordering::SeqCst);
    let doc = match parser.parse(body) {
        Ok(doc) => doc,
        Err(err) => {
            statistics.num_parse_errors.fetch_add(1, Ordering::SeqCst);
            tracing::error!(url, "parse error: {err}");
            let _ = signals.send(Signal::Note(url, err.to_string()));
            return;
        }
    };

    // once a stop is in, discoveries would be dropped anyway
    if !stopping.is_cancelled() {
        let links = parse::same_site_links(doc.as_ref(), base_url, &url);
        if !links.is_empty() {
            let _ = signals.send(Signal::AddUrls(links));
        }
    }

    let meta = parse::extract_meta(doc.as_ref());
    let _ = signals.send(Signal::UrlMeta(url, meta));
}
