//! Incremental search plumbing: input debouncing and last-request-wins
//! ordering of responses.

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::timeout;

/// Quiet period after the last keystroke before a query counts as settled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Identifies one issued request. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Hands out increasing tickets and knows which one is current.
#[derive(Debug, Default)]
pub struct Sequencer {
    latest: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket that supersedes every earlier one.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }
}

/// Where an incremental search stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchStatus<T> {
    Idle,
    Loading { ticket: Ticket },
    Ready { ticket: Ticket, result: T },
    Failed { ticket: Ticket, message: String },
}

/// Holds the newest search result, ignoring responses that arrive after a
/// newer request has been issued.
#[derive(Debug)]
pub struct LatestSlot<T> {
    sequencer: Sequencer,
    status: SearchStatus<T>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            sequencer: Sequencer::new(),
            status: SearchStatus::Idle,
        }
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request; anything still in flight becomes stale.
    pub fn begin(&mut self) -> Ticket {
        let ticket = self.sequencer.issue();
        self.status = SearchStatus::Loading { ticket };
        ticket
    }

    /// Records the outcome of the request behind `ticket`.
    ///
    /// Returns false, leaving the state untouched, when a newer request has
    /// been issued since.
    pub fn complete<E: std::fmt::Display>(&mut self, ticket: Ticket, result: Result<T, E>) -> bool {
        if !self.sequencer.is_current(ticket) {
            tracing::debug!(ticket = ticket.value(), "Dropping stale search response");
            return false;
        }
        self.status = match result {
            Ok(result) => SearchStatus::Ready { ticket, result },
            Err(e) => SearchStatus::Failed {
                ticket,
                message: e.to_string(),
            },
        };
        true
    }

    pub fn status(&self) -> &SearchStatus<T> {
        &self.status
    }

    pub fn result(&self) -> Option<&T> {
        match &self.status {
            SearchStatus::Ready { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Waits for the first value from `input`, then keeps replacing it with newer
/// values until `window` passes without one. Returns `None` once `input` is
/// exhausted with nothing pending.
pub async fn next_settled<S, T>(input: &mut S, window: Duration) -> Option<T>
where
    S: Stream<Item = T> + Unpin,
{
    let mut pending = input.next().await?;
    loop {
        match timeout(window, input.next()).await {
            Ok(Some(newer)) => pending = newer,
            // input closed or went quiet: the pending value has settled
            Ok(None) | Err(_) => return Some(pending),
        }
    }
}

/// Coalesces bursts from `input` into the last value of each burst.
pub fn debounce<S, T>(input: S, window: Duration) -> impl Stream<Item = T>
where
    S: Stream<Item = T> + Unpin,
{
    stream::unfold(input, move |mut input| async move {
        let value = next_settled(&mut input, window).await?;
        Some((value, input))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::{advance, sleep};

    fn receiver_stream<T: Send + 'static>(
        mut rx: mpsc::UnboundedReceiver<T>,
    ) -> impl Stream<Item = T> + Unpin {
        Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx)))
    }

    #[test]
    fn test_sequencer_tracks_latest() {
        let sequencer = Sequencer::new();
        let first = sequencer.issue();
        let second = sequencer.issue();
        assert!(second > first);
        assert!(!sequencer.is_current(first));
        assert!(sequencer.is_current(second));
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut slot: LatestSlot<Vec<&str>> = LatestSlot::new();
        let old = slot.begin();
        let new = slot.begin();

        assert!(slot.complete::<String>(new, Ok(vec!["CPSC 1150"])));
        // the older request resolves late and must not overwrite
        assert!(!slot.complete::<String>(old, Ok(vec!["MATH 1171"])));
        assert_eq!(slot.result(), Some(&vec!["CPSC 1150"]));
    }

    #[test]
    fn test_failure_is_distinct_from_loading() {
        let mut slot: LatestSlot<u32> = LatestSlot::new();
        assert_eq!(slot.status(), &SearchStatus::Idle);

        let ticket = slot.begin();
        assert!(matches!(slot.status(), SearchStatus::Loading { .. }));

        slot.complete(ticket, Err("timed out"));
        assert!(matches!(
            slot.status(),
            SearchStatus::Failed { message, .. } if message == "timed out"
        ));
        assert!(slot.result().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_bursts() {
        let (tx, rx) = mpsc::unbounded_channel();
        let window = DEFAULT_DEBOUNCE;

        let producer = tokio::spawn(async move {
            for q in ["c", "cp", "cps", "cpsc"] {
                tx.send(q.to_string()).unwrap();
                sleep(Duration::from_millis(50)).await;
            }
            sleep(Duration::from_millis(500)).await;
            tx.send("math".to_string()).unwrap();
        });

        let settled: Vec<String> = debounce(receiver_stream(rx), window).collect().await;
        producer.await.unwrap();
        assert_eq!(settled, vec!["cpsc".to_string(), "math".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_settled_waits_for_quiet() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut input = receiver_stream(rx);

        tx.send(1).unwrap();
        let waiter = tokio::spawn(async move {
            next_settled(&mut input, Duration::from_millis(200)).await
        });

        advance(Duration::from_millis(100)).await;
        tx.send(2).unwrap();
        advance(Duration::from_millis(300)).await;

        assert_eq!(waiter.await.unwrap(), Some(2));
        drop(tx);
    }
}
