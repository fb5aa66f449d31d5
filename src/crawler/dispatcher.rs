use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::frontier::Frontier;
use super::CrawlerOptions;
use crate::signal::{Signal, SignalReceiver};
use crate::sink::Sink;

/// Where the dispatcher is in its shutdown state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Accepting new work; a long idle window doubles as completion
    /// detection.
    Running,
    /// No new work is admitted; in-flight work finishes under the short
    /// drain window.
    Draining,
    /// Pending work is discarded and the workers are woken to exit.
    Aborting,
    /// The control loop has returned.
    Terminated,
}

/// The sole consumer of the signal bus and the sole mutator of the
/// frontier and the content queue. Routing every mutation through this one
/// task is what makes at-most-once admission race-free without exposing a
/// lock to the workers.
pub(crate) struct Dispatcher {
    signals: SignalReceiver,
    frontier: Frontier,
    content: Option<mpsc::UnboundedSender<(String, Vec<u8>)>>,
    sink: Arc<dyn Sink>,
    stopping: CancellationToken,
    abrupt: CancellationToken,
    idle_timeout: Duration,
    drain_timeout: Duration,
    join_timeout: Duration,
    phase: Phase,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        signals: SignalReceiver,
        frontier: Frontier,
        content: mpsc::UnboundedSender<(String, Vec<u8>)>,
        sink: Arc<dyn Sink>,
        stopping: CancellationToken,
        abrupt: CancellationToken,
        options: &CrawlerOptions,
    ) -> Self {
        Self {
            signals,
            frontier,
            content: Some(content),
            sink,
            stopping,
            abrupt,
            idle_timeout: options.idle_timeout,
            drain_timeout: options.drain_timeout,
            join_timeout: options.join_timeout,
            phase: Phase::Running,
        }
    }

    pub(crate) async fn run(mut self, tracker: &TaskTracker) -> Phase {
        while !matches!(self.phase, Phase::Aborting | Phase::Terminated) {
            let window = match self.phase {
                Phase::Running => self.idle_timeout,
                _ => self.drain_timeout,
            };
            match timeout(window, self.signals.recv()).await {
                Ok(Some(signal)) => self.handle(signal).await,
                // every sender is gone, nothing can arrive anymore
                Ok(None) => break,
                Err(_) => {
                    if self.phase == Phase::Running {
                        tracing::info!(
                            idle = ?self.idle_timeout,
                            seen = self.frontier.seen(),
                            "no signals within the idle window, draining"
                        );
                        self.begin_drain();
                    } else {
                        // a full drain window passed with nothing in flight
                        break;
                    }
                }
            }
        }

        if self.phase == Phase::Aborting {
            tracing::info!("aborting: pending work is discarded");
        } else {
            self.begin_drain();
            // the parse worker exits once its buffered bodies are handled
            self.content = None;
        }

        if timeout(self.join_timeout, tracker.wait()).await.is_err() {
            tracing::error!(
                join = ?self.join_timeout,
                "workers did not exit within the join window, giving up on them"
            );
        }
        self.phase = Phase::Terminated;
        self.phase
    }

    async fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::AddUrls(urls) => {
                for url in urls {
                    if self.frontier.offer(url.clone()) {
                        tracing::debug!(url, "queueing");
                        self.sink.on_new_url(&url).await;
                    }
                }
            }
            Signal::AddContent(url, body) => {
                if let Some(content) = &self.content {
                    let _ = content.send((url, body));
                }
            }
            Signal::UrlMeta(url, meta) => self.sink.on_metadata(&url, &meta).await,
            Signal::Note(url, note) => self.sink.on_note(&url, &note).await,
            Signal::Stop => {
                tracing::info!("stop requested, finishing queued work only");
                self.begin_drain();
            }
            Signal::StopAbrupt => {
                tracing::info!("abrupt stop requested");
                self.abort();
            }
        }
    }

    fn begin_drain(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.phase = Phase::Draining;
        self.stopping.cancel();
        self.frontier.close();
    }

    fn abort(&mut self) {
        self.phase = Phase::Aborting;
        self.stopping.cancel();
        self.frontier.close();
        // dropping the sender discards buffered bodies along with the channel
        self.content = None;
        self.abrupt.cancel();
    }
}
