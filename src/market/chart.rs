//! Candle chart formatting
//!
//! Converts time-indexed candles into the array shapes charting libraries
//! expect, plus the precision helpers used to display prices and sizes.

use crate::xchange::types::Kline;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// One OHLCV candle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl From<&Kline> for Candle {
    fn from(kline: &Kline) -> Self {
        Self {
            open: kline.open,
            high: kline.high,
            low: kline.low,
            close: kline.close,
            volume: kline.volume,
        }
    }
}

/// Candles keyed by open time (ms), so iteration is chronological
pub type Chart = BTreeMap<i64, Candle>;

/// Parallel OHLCV arrays
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ohlcv {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// One array per field, in chart order
pub fn to_parallel_arrays(chart: &Chart) -> Ohlcv {
    let mut ohlcv = Ohlcv::default();
    for candle in chart.values() {
        ohlcv.open.push(to_f64(candle.open));
        ohlcv.high.push(to_f64(candle.high));
        ohlcv.low.push(to_f64(candle.low));
        ohlcv.close.push(to_f64(candle.close));
        ohlcv.volume.push(to_f64(candle.volume));
    }
    ohlcv
}

/// `[timestamp, open, high, low, close]` rows, with volume appended when
/// `include_volume` is set
pub fn to_timestamped_array(chart: &Chart, include_volume: bool) -> Vec<Vec<f64>> {
    chart
        .iter()
        .map(|(&timestamp, candle)| {
            let mut row = vec![
                timestamp as f64,
                to_f64(candle.open),
                to_f64(candle.high),
                to_f64(candle.low),
                to_f64(candle.close),
            ];
            if include_volume {
                row.push(to_f64(candle.volume));
            }
            row
        })
        .collect()
}

/// Digits after the decimal point in the shortest textual form of `value`;
/// 0 for integers
pub fn precision_of(value: f64) -> u32 {
    if !value.is_finite() || value.fract() == 0.0 {
        return 0;
    }

    // f64 Display is the shortest round-trip form and never uses exponents
    value
        .to_string()
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.len() as u32)
}

/// Truncates `quantity` to the decimals implied by `step`
///
/// The precision is the position of the first `1` in `step` (`"0.00100000"`
/// → 3 decimals, `"1.00000000"` → 0). This limits decimal places only; it is
/// not a round-to-nearest-step. Integers pass through unchanged.
pub fn round_to_step(quantity: f64, step: &str) -> f64 {
    if !quantity.is_finite() || quantity.fract() == 0.0 {
        return quantity;
    }

    let decimals = step.find('1').map_or(0, |i| i.saturating_sub(1));
    let text = quantity.to_string();
    let Some(dot) = text.find('.') else {
        return quantity;
    };

    let end = if decimals == 0 { dot } else { dot + 1 + decimals };
    text[..end.min(text.len())].parse().unwrap_or(quantity)
}

/// Formats `price` with the number of decimals of `tick_size` (max 8)
pub fn round_ticks(price: f64, tick_size: f64) -> String {
    let precision = precision_of(tick_size).min(8) as usize;
    format!("{:.*}", precision, price)
}

/// Candles for one market and interval, built from kline batches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    pub candles: Chart,
    /// Open time of the newest kline ingested
    pub last_open_time: Option<i64>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_klines(klines: &[Kline]) -> Self {
        let mut series = Self::new();
        series.ingest(klines);
        series
    }

    /// Inserts or replaces candles by open time
    pub fn ingest(&mut self, klines: &[Kline]) {
        for kline in klines {
            self.candles.insert(kline.open_time, Candle::from(kline));
            self.last_open_time = Some(
                self.last_open_time
                    .map_or(kline.open_time, |t| t.max(kline.open_time)),
            );
        }
    }

    pub fn ohlcv(&self) -> Ohlcv {
        to_parallel_arrays(&self.candles)
    }

    pub fn timestamped(&self, include_volume: bool) -> Vec<Vec<f64>> {
        to_timestamped_array(&self.candles, include_volume)
    }
}
