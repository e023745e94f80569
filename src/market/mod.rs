//! Market data normalization and chart formatting
//!
//! Pure functions over already-decoded payloads: keyed price, book ticker
//! and balance maps, OHLCV arrays, and price/step precision helpers.

pub mod chart;
pub mod normalize;
pub mod util;

pub use chart::{
    precision_of, round_to_step, round_ticks, to_parallel_arrays, to_timestamped_array, Candle,
    CandleSeries, Chart, Ohlcv,
};
pub use normalize::{
    depth_snapshot, normalize_balances, normalize_book_tickers, normalize_prices, BalanceEntry,
    BookQuote,
};
pub use util::{percent, quote_asset};
