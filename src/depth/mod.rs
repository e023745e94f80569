//! Order book depth cache
//!
//! - Per-market books maintained from depth delta events
//! - Delete-on-zero level updates, sequence and event time markers
//! - Sorted (plain, cumulative, notional) views and buy/sell volume
//!
//! Prices and quantities are `rust_decimal::Decimal`, parsed once when an
//! event is applied.

pub mod aggregate;
pub mod cache;
pub mod types;

pub use aggregate::{notional, sorted_view, volume, DepthVolume, ValueMode};
pub use cache::{DepthCache, DepthEventSender};
pub use types::{
    parse_levels, DepthBook, DepthError, DepthEvent, DepthSnapshot, PriceLevels, SequenceGap,
    Side,
};
