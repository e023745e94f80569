//! Depth cache data structures
//!
//! Order book state per market plus the depth delta events that drive it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Price level map: price → quantity, ascending by price
pub type PriceLevels = BTreeMap<Decimal, Decimal>;

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side, best price is the highest
    Bid,
    /// Sell side, best price is the lowest
    Ask,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// Depth cache errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepthError {
    #[error("Malformed {side} price level: [{price:?}, {quantity:?}]")]
    MalformedPriceLevel {
        side: Side,
        price: String,
        quantity: String,
    },
}

/// Depth delta event as delivered by the exchange stream
///
/// Accepts both the compact stream keys (`E`, `U`, `u`, `b`, `a`) and the
/// long form (`eventTime`, `sequence`, `bids`, `asks`). Levels stay textual
/// until [`DepthBook::apply`] parses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthEvent {
    #[serde(rename = "s", alias = "symbol", alias = "market", default)]
    pub market: Option<String>,

    #[serde(rename = "E", alias = "eventTime", default)]
    pub event_time: i64,

    /// First update covered by this event, when the stream reports it
    #[serde(rename = "U", alias = "firstSequence", default)]
    pub first_sequence: Option<u64>,

    #[serde(rename = "u", alias = "sequence")]
    pub sequence: u64,

    #[serde(rename = "b", alias = "bids")]
    pub bids: Vec<[String; 2]>, // [price, qty]

    #[serde(rename = "a", alias = "asks")]
    pub asks: Vec<[String; 2]>, // [price, qty]
}

impl DepthEvent {
    pub fn new(sequence: u64, event_time: i64) -> Self {
        Self {
            market: None,
            event_time,
            first_sequence: None,
            sequence,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn bid(mut self, price: &str, quantity: &str) -> Self {
        self.bids.push([price.to_string(), quantity.to_string()]);
        self
    }

    pub fn ask(mut self, price: &str, quantity: &str) -> Self {
        self.asks.push([price.to_string(), quantity.to_string()]);
        self
    }
}

/// Full order book snapshot from the REST `/depth` endpoint, already parsed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DepthSnapshot {
    pub sequence: u64,
    pub bids: PriceLevels,
    pub asks: PriceLevels,
}

/// Discontinuity between a book's last sequence and an incoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceGap {
    /// Sequence the book expected next
    pub expected: u64,
    /// First sequence carried by the event
    pub received: u64,
}

/// Order book state for a single market
///
/// Both sides are stored ascending; bids are read in reverse for best-first
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DepthBook {
    pub bids: PriceLevels,
    pub asks: PriceLevels,

    /// Sequence of the last applied event or snapshot (0 = none yet)
    pub sequence: u64,

    /// Event time of the last applied event (ms since Unix epoch)
    pub event_time: i64,

    /// Number of sequence discontinuities seen since creation
    pub gap_count: u64,
}

impl DepthBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a book from a REST snapshot
    pub fn from_snapshot(snapshot: DepthSnapshot) -> Self {
        Self {
            bids: snapshot.bids,
            asks: snapshot.asks,
            sequence: snapshot.sequence,
            event_time: 0,
            gap_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Highest bid price
    pub fn best_bid(&self) -> Option<&Decimal> {
        self.bids.keys().next_back()
    }

    /// Lowest ask price
    pub fn best_ask(&self) -> Option<&Decimal> {
        self.asks.keys().next()
    }

    pub fn levels(&self, side: Side) -> &PriceLevels {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Update a bid level (remove if quantity is zero)
    pub fn update_bid(&mut self, price: Decimal, quantity: Decimal) {
        update_level(&mut self.bids, price, quantity);
    }

    /// Update an ask level (remove if quantity is zero)
    pub fn update_ask(&mut self, price: Decimal, quantity: Decimal) {
        update_level(&mut self.asks, price, quantity);
    }

    /// Applies one depth delta event
    ///
    /// Every level is parsed before the book is touched, so a malformed
    /// event leaves the book unchanged. On success the event's sequence and
    /// event time become the book's freshness markers. A discontinuity with
    /// the previous sequence is returned (and counted) but does not stop the
    /// event from being applied.
    pub fn apply(&mut self, event: &DepthEvent) -> Result<Option<SequenceGap>, DepthError> {
        let bids = parse_levels(Side::Bid, &event.bids)?;
        let asks = parse_levels(Side::Ask, &event.asks)?;

        let gap = self.check_sequence(event);
        if gap.is_some() {
            self.gap_count += 1;
        }

        for (price, quantity) in bids {
            self.update_bid(price, quantity);
        }
        for (price, quantity) in asks {
            self.update_ask(price, quantity);
        }

        self.sequence = event.sequence;
        self.event_time = event.event_time;

        Ok(gap)
    }

    fn check_sequence(&self, event: &DepthEvent) -> Option<SequenceGap> {
        if self.sequence == 0 {
            return None;
        }

        // Nothing can follow u64::MAX, so there is no expectation to break
        let expected = self.sequence.checked_add(1)?;
        let first = event.first_sequence.unwrap_or(event.sequence);

        // Overlap with already applied updates is fine as long as the event
        // reaches past the book's last sequence.
        if first > expected || event.sequence < expected {
            Some(SequenceGap {
                expected,
                received: first,
            })
        } else {
            None
        }
    }
}

fn update_level(levels: &mut PriceLevels, price: Decimal, quantity: Decimal) {
    if quantity.is_zero() {
        levels.remove(&price);
    } else {
        levels.insert(price, quantity);
    }
}

/// Parses textual `[price, qty]` pairs
///
/// Non-numeric or negative values fail with
/// [`DepthError::MalformedPriceLevel`].
pub fn parse_levels(side: Side, raw: &[[String; 2]]) -> Result<Vec<(Decimal, Decimal)>, DepthError> {
    raw.iter()
        .map(|[price, quantity]| parse_level(side, price, quantity))
        .collect()
}

pub(crate) fn parse_level(
    side: Side,
    price: &str,
    quantity: &str,
) -> Result<(Decimal, Decimal), DepthError> {
    let malformed = || DepthError::MalformedPriceLevel {
        side,
        price: price.to_string(),
        quantity: quantity.to_string(),
    };

    let p = Decimal::from_str(price.trim()).map_err(|_| malformed())?;
    let q = Decimal::from_str(quantity.trim()).map_err(|_| malformed())?;

    if p.is_sign_negative() || q.is_sign_negative() {
        return Err(malformed());
    }

    Ok((p, q))
}
