//! Xchange API Type Definitions
//!
//! Wire types for Xchange API responses and order parameters. Numeric
//! strings are parsed into `Decimal` while deserializing, so a malformed
//! number fails at the transport boundary instead of later.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Response from the `v1/time` endpoint
///
/// # Example Response
/// ```json
/// {
///   "serverTime": 1699564800000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeResponse {
    /// Server time in milliseconds since Unix epoch
    pub server_time: i64,
}

impl ServerTimeResponse {
    /// Returns true if server_time is positive (after Unix epoch)
    pub fn is_valid(&self) -> bool {
        self.server_time > 0
    }

    pub fn time_ms(&self) -> i64 {
        self.server_time
    }
}

/// Latest price for one market (`v1/ticker/price`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerPrice {
    pub market: String,
    pub price: Decimal,
}

/// `v1/ticker/price` answers with one object when a market is given and a
/// list otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceResponse {
    Many(Vec<TickerPrice>),
    One(TickerPrice),
}

/// Best bid/ask for one market (`v1/ticker/bookTicker`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub market: String,
    pub bid_price: Decimal,
    pub bid_qty: Decimal,
    pub ask_price: Decimal,
    pub ask_qty: Decimal,
}

/// One asset line of the account payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
    #[serde(default)]
    pub pending: Decimal,
}

/// Response from `v1/account`
///
/// Fields other than `balances` are kept as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub balances: Option<Vec<Balance>>,

    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// Raw `v1/depth` response. Levels are `[price, qty]` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthResponse {
    #[serde(default, alias = "lastUpdateId")]
    pub sequence: u64,
    #[serde(default)]
    pub bids: Vec<[String; 2]>,
    #[serde(default)]
    pub asks: Vec<[String; 2]>,
}

/// One candlestick from `v1/klines`
///
/// Arrives as a 12-element array:
/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume,
/// trades, takerBuyBase, takerBuyQuote, ignore]`. Trailing fields may be
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    #[serde(default)]
    pub close_time: i64,
    #[serde(default)]
    pub quote_volume: Decimal,
    #[serde(default)]
    pub trades: u64,
    #[serde(default)]
    pub taker_buy_base_volume: Decimal,
    #[serde(default)]
    pub taker_buy_quote_volume: Decimal,
    #[serde(default)]
    pub ignore: serde_json::Value,
}

/// Open order as listed by `v1/openOrders`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub order_id: u64,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub orig_qty: Decimal,
    #[serde(default)]
    pub executed_qty: Decimal,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl OpenOrder {
    /// Quantity still resting on the book
    pub fn remaining_qty(&self) -> Decimal {
        self.orig_qty - self.executed_qty
    }
}

/// Order endpoints answer with exchange-defined JSON that is passed through
pub type OrderResponse = serde_json::Value;

/// Buy or sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type sent as the `type` parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Limit,
    Market,
    StopLossLimit,
    TakeProfitLimit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
            OrderType::StopLossLimit => "stop_loss_limit",
            OrderType::TakeProfitLimit => "take_profit_limit",
        }
    }

    /// Limit-style orders carry a price, market orders do not
    pub fn requires_price(&self) -> bool {
        self.as_str().contains("limit")
    }
}

/// Optional order settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFlags {
    pub order_type: OrderType,
    /// Extra parameters appended after the standard ones
    pub extra: Vec<(String, String)>,
}

impl OrderFlags {
    pub fn market() -> Self {
        Self {
            order_type: OrderType::Market,
            extra: Vec::new(),
        }
    }

    pub fn with_type(order_type: OrderType) -> Self {
        Self {
            order_type,
            extra: Vec::new(),
        }
    }
}
