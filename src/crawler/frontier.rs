use std::collections::HashSet;

use tokio::sync::mpsc;

/// The deduplicating pending-URL work queue.
///
/// Only the dispatcher holds a `Frontier`, so admission and the `seen`
/// insert happen in one step on one task and the set needs no lock. Fetch
/// workers consume the receiving half returned by [`Frontier::new`].
pub(crate) struct Frontier {
    seen: HashSet<String>,
    pending: Option<mpsc::UnboundedSender<String>>,
}

impl Frontier {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                seen: HashSet::new(),
                pending: Some(tx),
            },
            rx,
        )
    }

    /// Admits `url` iff it has never been offered before and the frontier
    /// is still open. Returns whether the URL was admitted.
    pub(crate) fn offer(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        let Some(pending) = &self.pending else {
            return false;
        };
        if pending.send(url.clone()).is_err() {
            return false;
        }
        self.seen.insert(url);
        true
    }

    /// Stops accepting new work. Takers drain whatever is already queued
    /// and then see the stream end.
    pub(crate) fn close(&mut self) {
        self.pending = None;
    }

    pub(crate) fn seen(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_urls_rejected() {
        let (mut frontier, mut pending) = Frontier::new();
        assert!(frontier.offer("http://x.test/a".to_string()));
        assert!(!frontier.offer("http://x.test/a".to_string()));
        assert!(frontier.offer("http://x.test/b".to_string()));
        assert_eq!(frontier.seen(), 2);

        assert_eq!(pending.recv().await.as_deref(), Some("http://x.test/a"));
        assert_eq!(pending.recv().await.as_deref(), Some("http://x.test/b"));
        assert!(pending.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_rejects_new_work_and_ends_the_stream() {
        let (mut frontier, mut pending) = Frontier::new();
        assert!(frontier.offer("http://x.test/a".to_string()));
        frontier.close();
        assert!(!frontier.offer("http://x.test/b".to_string()));

        // what was already queued is still delivered
        assert_eq!(pending.recv().await.as_deref(), Some("http://x.test/a"));
        assert_eq!(pending.recv().await, None);
    }
}
