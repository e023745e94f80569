//! Depth cache for tracking multiple markets
//!
//! An explicitly owned cache object, shared by `Arc`. Each market's book sits
//! behind its own mutex, so updates to one market never block another.
//!
//! The per-market mutex only prevents torn books. When several producers call
//! [`DepthCache::apply`] for the same market concurrently, the order in which
//! their events land is undefined. Feed a market from a single consumer, for
//! example through [`DepthCache::spawn_writer`], when arrival order matters
//! (it always does for delta streams).

use crate::depth::aggregate::{self, DepthVolume, ValueMode};
use crate::depth::types::{DepthBook, DepthError, DepthEvent, DepthSnapshot, Side};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Sending half of a depth cache writer channel
pub type DepthEventSender = mpsc::UnboundedSender<(String, DepthEvent)>;

/// Order books keyed by market
#[derive(Default)]
pub struct DepthCache {
    books: RwLock<HashMap<String, Arc<Mutex<DepthBook>>>>,
}

impl std::fmt::Debug for DepthCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepthCache")
            .field("markets", &self.books.read().len())
            .finish()
    }
}

impl DepthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book handle for a market, created empty on first use
    fn book(&self, market: &str) -> Arc<Mutex<DepthBook>> {
        if let Some(book) = self.books.read().get(market) {
            return Arc::clone(book);
        }

        let mut books = self.books.write();
        let book = books.entry(market.to_string()).or_insert_with(|| {
            debug!(market = %market, "Creating depth book");
            Arc::new(Mutex::new(DepthBook::new()))
        });
        Arc::clone(book)
    }

    /// Runs `f` against a market's book, or against an empty book when the
    /// market has never been seen
    fn read_book<R>(&self, market: &str, f: impl FnOnce(&DepthBook) -> R) -> R {
        let book = self.books.read().get(market).map(Arc::clone);
        match book {
            Some(book) => f(&*book.lock()),
            None => f(&DepthBook::default()),
        }
    }

    /// Snapshot of a market's book
    ///
    /// Never fails: an unknown market yields an empty book.
    pub fn get(&self, market: &str) -> DepthBook {
        self.read_book(market, DepthBook::clone)
    }

    /// Applies one depth delta event to a market
    ///
    /// A malformed price level rejects the whole event and leaves the book as
    /// it was. Sequence gaps are logged and counted, not repaired.
    pub fn apply(&self, market: &str, event: &DepthEvent) -> Result<(), DepthError> {
        let book = self.book(market);
        let mut book = book.lock();

        if let Some(gap) = book.apply(event)? {
            warn!(
                market = %market,
                expected = gap.expected,
                received = gap.received,
                gaps = book.gap_count,
                "Depth sequence gap, book may have drifted"
            );
        }

        debug!(
            market = %market,
            sequence = event.sequence,
            bid_updates = event.bids.len(),
            ask_updates = event.asks.len(),
            "Applied depth event"
        );

        Ok(())
    }

    /// Replaces a market's book with a REST snapshot
    pub fn apply_snapshot(&self, market: &str, snapshot: DepthSnapshot) {
        let book = self.book(market);
        let mut book = book.lock();
        *book = DepthBook::from_snapshot(snapshot);

        info!(
            market = %market,
            sequence = book.sequence,
            bid_levels = book.bids.len(),
            ask_levels = book.asks.len(),
            "Depth book seeded from snapshot"
        );
    }

    /// Markets with a book, sorted
    pub fn markets(&self) -> Vec<String> {
        let mut markets: Vec<String> = self.books.read().keys().cloned().collect();
        markets.sort();
        markets
    }

    /// Drops a market's book. Returns whether it existed.
    pub fn clear(&self, market: &str) -> bool {
        self.books.write().remove(market).is_some()
    }

    /// Sorted view of one side of a market's book
    ///
    /// See [`aggregate::sorted_view`]. Unknown markets give an empty view.
    pub fn sorted_view(
        &self,
        market: &str,
        side: Side,
        limit: Option<usize>,
        mode: ValueMode,
    ) -> Vec<(Decimal, Decimal)> {
        self.read_book(market, |book| {
            aggregate::sorted_view(book.levels(side), side, limit, mode)
        })
    }

    /// Buy/sell volume of a market's book; zeros for unknown markets
    pub fn volume(&self, market: &str) -> DepthVolume {
        self.read_book(market, aggregate::volume)
    }

    /// Starts a single-writer task that applies events in channel order
    ///
    /// Malformed events are logged and skipped. The task ends once every
    /// sender is dropped.
    pub fn spawn_writer(self: Arc<Self>) -> (DepthEventSender, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<(String, DepthEvent)>();

        let handle = tokio::spawn(async move {
            while let Some((market, event)) = receiver.recv().await {
                if let Err(e) = self.apply(&market, &event) {
                    error!(
                        market = %market,
                        error = %e,
                        "Failed to apply depth event"
                    );
                }
            }

            debug!("Depth event channel closed");
        });

        (sender, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seeded_cache() -> DepthCache {
        let cache = DepthCache::new();
        cache
            .apply(
                "BTC_CLAM",
                &DepthEvent::new(1, 1000)
                    .bid("10.0", "2")
                    .bid("9.5", "1")
                    .ask("10.5", "3")
                    .ask("11.0", "1"),
            )
            .unwrap();
        cache
    }

    #[test]
    fn test_unknown_market_is_empty() {
        let cache = DepthCache::new();
        let book = cache.get("NOPE");
        assert!(book.is_empty());
        assert!(cache.sorted_view("NOPE", Side::Bid, None, ValueMode::Quantity).is_empty());
        assert_eq!(cache.volume("NOPE"), DepthVolume::default());
        // reads never create books
        assert!(cache.markets().is_empty());
    }

    #[test]
    fn test_cumulative_view_and_volume() {
        let cache = seeded_cache();

        let view = cache.sorted_view("BTC_CLAM", Side::Bid, None, ValueMode::Cumulative);
        assert_eq!(view, vec![(dec!(10.0), dec!(2)), (dec!(9.5), dec!(3))]);

        let volume = cache.volume("BTC_CLAM");
        assert_eq!(volume.bid_notional, dec!(29.5));
        assert_eq!(volume.ask_notional, dec!(42.5));
        assert_eq!(volume.bid_qty, dec!(3));
        assert_eq!(volume.ask_qty, dec!(4));
    }

    #[test]
    fn test_zero_update_removes_bid() {
        let cache = seeded_cache();
        cache
            .apply("BTC_CLAM", &DepthEvent::new(2, 1001).bid("10.0", "0.00000000"))
            .unwrap();

        let book = cache.get("BTC_CLAM");
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.bids.get(&dec!(9.5)), Some(&dec!(1)));
        assert_eq!(book.asks.len(), 2);
        assert_eq!(book.sequence, 2);
    }

    #[test]
    fn test_views_do_not_mutate() {
        let cache = seeded_cache();
        let before = cache.get("BTC_CLAM");
        let _ = cache.sorted_view("BTC_CLAM", Side::Ask, Some(1), ValueMode::Notional);
        let _ = cache.volume("BTC_CLAM");
        assert_eq!(cache.get("BTC_CLAM"), before);
    }

    #[test]
    fn test_snapshot_then_clear() {
        let cache = DepthCache::new();
        let mut snapshot = DepthSnapshot {
            sequence: 42,
            ..Default::default()
        };
        snapshot.asks.insert(dec!(1.1), dec!(5));
        cache.apply_snapshot("BTC_ETH", snapshot);

        assert_eq!(cache.markets(), vec!["BTC_ETH".to_string()]);
        assert_eq!(cache.get("BTC_ETH").sequence, 42);

        assert!(cache.clear("BTC_ETH"));
        assert!(!cache.clear("BTC_ETH"));
        assert!(cache.get("BTC_ETH").is_empty());
    }

    #[test]
    fn test_markets_are_independent() {
        let cache = seeded_cache();
        cache
            .apply("BTC_ETH", &DepthEvent::new(1, 1).ask("0.05", "7"))
            .unwrap();
        assert_eq!(cache.get("BTC_CLAM").asks.len(), 2);
        assert_eq!(cache.get("BTC_ETH").asks.len(), 1);
        assert!(cache.get("BTC_ETH").bids.is_empty());
    }

    #[tokio::test]
    async fn test_writer_applies_in_order() {
        let cache = Arc::new(DepthCache::new());
        let (sender, handle) = Arc::clone(&cache).spawn_writer();

        sender
            .send(("BTC_CLAM".to_string(), DepthEvent::new(1, 1).bid("10", "1")))
            .unwrap();
        sender
            .send(("BTC_CLAM".to_string(), DepthEvent::new(2, 2).bid("oops", "1")))
            .unwrap();
        sender
            .send(("BTC_CLAM".to_string(), DepthEvent::new(3, 3).bid("10", "0")))
            .unwrap();
        sender
            .send(("BTC_CLAM".to_string(), DepthEvent::new(4, 4).bid("11", "2")))
            .unwrap();
        drop(sender);
        handle.await.unwrap();

        let book = cache.get("BTC_CLAM");
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.bids.get(&dec!(11)), Some(&dec!(2)));
        assert_eq!(book.sequence, 4);
    }
}
