use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::meta::PageMeta;

/// A typed message sent from a worker to the dispatcher.
///
/// Signals are immutable once constructed; ownership moves to the bus on
/// send and to the dispatcher on receive. The bus itself is an unbounded
/// channel so workers never block while reporting.
#[derive(Debug)]
pub enum Signal {
    /// Candidate URLs discovered on a page, not yet deduplicated.
    AddUrls(HashSet<String>),
    /// A fetched HTML body awaiting parsing.
    AddContent(String, Vec<u8>),
    /// Extracted metadata for a URL.
    UrlMeta(String, PageMeta),
    /// A human-readable annotation that carries no structured metadata,
    /// such as a fetch error or a redirect notice.
    Note(String, String),
    /// Request graceful shutdown: finish what is pending, accept nothing new.
    Stop,
    /// Request immediate shutdown: discard pending work.
    StopAbrupt,
}

pub(crate) type SignalSender = mpsc::UnboundedSender<Signal>;
pub(crate) type SignalReceiver = mpsc::UnboundedReceiver<Signal>;
