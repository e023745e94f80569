//! Response normalization
//!
//! Stateless reshaping of decoded payloads into keyed mappings.

use crate::depth::types::{parse_levels, DepthSnapshot, PriceLevels};
use crate::depth::{DepthError, Side};
use crate::xchange::types::{AccountInfo, BookTicker, DepthResponse, PriceResponse};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Best bid/ask entry of [`normalize_book_tickers`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookQuote {
    #[serde(rename = "bid")]
    pub bid_price: Decimal,
    #[serde(rename = "bids")]
    pub bid_qty: Decimal,
    #[serde(rename = "ask")]
    pub ask_price: Decimal,
    #[serde(rename = "asks")]
    pub ask_qty: Decimal,
}

/// Per-asset balance entry of [`normalize_balances`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceEntry {
    pub available: Decimal,
    pub locked: Decimal,
    pub pending: Decimal,
}

/// market → price, for a single ticker or a list
pub fn normalize_prices(response: PriceResponse) -> BTreeMap<String, Decimal> {
    match response {
        PriceResponse::One(ticker) => BTreeMap::from([(ticker.market, ticker.price)]),
        PriceResponse::Many(tickers) => tickers.into_iter().map(|t| (t.market, t.price)).collect(),
    }
}

/// market → `{bid, bids, ask, asks}`
pub fn normalize_book_tickers(tickers: &[BookTicker]) -> BTreeMap<String, BookQuote> {
    tickers
        .iter()
        .map(|t| {
            (
                t.market.clone(),
                BookQuote {
                    bid_price: t.bid_price,
                    bid_qty: t.bid_qty,
                    ask_price: t.ask_price,
                    ask_qty: t.ask_qty,
                },
            )
        })
        .collect()
}

/// asset → `{available, locked, pending}`
///
/// Assets missing from the account are missing from the map. An account
/// payload without a balances list logs a warning and yields an empty map.
pub fn normalize_balances(account: &AccountInfo) -> BTreeMap<String, BalanceEntry> {
    let Some(balances) = &account.balances else {
        warn!(
            fields = ?account.other.keys().collect::<Vec<_>>(),
            "Account payload has no balances list"
        );
        return BTreeMap::new();
    };

    balances
        .iter()
        .map(|b| {
            (
                b.asset.clone(),
                BalanceEntry {
                    available: b.free,
                    locked: b.locked,
                    pending: b.pending,
                },
            )
        })
        .collect()
}

/// Parses a `v1/depth` payload into decimal level maps
///
/// Zero-quantity levels are dropped so the snapshot obeys the same rule as
/// the depth cache.
pub fn depth_snapshot(response: DepthResponse) -> Result<DepthSnapshot, DepthError> {
    Ok(DepthSnapshot {
        sequence: response.sequence,
        bids: collect_levels(Side::Bid, &response.bids)?,
        asks: collect_levels(Side::Ask, &response.asks)?,
    })
}

fn collect_levels(side: Side, raw: &[[String; 2]]) -> Result<PriceLevels, DepthError> {
    Ok(parse_levels(side, raw)?
        .into_iter()
        .filter(|(_, qty)| !qty.is_zero())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xchange::types::{Balance, TickerPrice};
    use rust_decimal_macros::dec;

    #[test]
    fn test_single_price() {
        let prices = normalize_prices(PriceResponse::One(TickerPrice {
            market: "BTC_CLAM".to_string(),
            price: dec!(0.00045),
        }));
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["BTC_CLAM"], dec!(0.00045));
    }

    #[test]
    fn test_price_list() {
        let response: PriceResponse = serde_json::from_str(
            r#"[{"market":"BTC_CLAM","price":"0.00045"},{"market":"BTC_ETH","price":"0.05"}]"#,
        )
        .unwrap();
        let prices = normalize_prices(response);
        assert_eq!(prices["BTC_ETH"], dec!(0.05));
        assert!(!prices.contains_key("BTC_DOGE"));
    }

    #[test]
    fn test_book_tickers_renamed() {
        let tickers: Vec<BookTicker> = serde_json::from_str(
            r#"[{"market":"BTC_CLAM","bidPrice":"0.0004","bidQty":"12","askPrice":"0.0005","askQty":"3"}]"#,
        )
        .unwrap();
        let quotes = normalize_book_tickers(&tickers);
        let quote = quotes["BTC_CLAM"];
        assert_eq!(quote.bid_price, dec!(0.0004));
        assert_eq!(quote.ask_qty, dec!(3));

        let json = serde_json::to_value(quote).unwrap();
        assert_eq!(json["bid"], "0.0004");
        assert_eq!(json["bids"], "12");
        assert_eq!(json["ask"], "0.0005");
        assert_eq!(json["asks"], "3");
    }

    #[test]
    fn test_balances() {
        let account = AccountInfo {
            balances: Some(vec![
                Balance {
                    asset: "BTC".to_string(),
                    free: dec!(1.5),
                    locked: dec!(0.25),
                    pending: dec!(0),
                },
                Balance {
                    asset: "CLAM".to_string(),
                    free: dec!(0),
                    locked: dec!(0),
                    pending: dec!(10),
                },
            ]),
            ..Default::default()
        };

        let balances = normalize_balances(&account);
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["BTC"].available, dec!(1.5));
        assert_eq!(balances["BTC"].locked, dec!(0.25));
        assert_eq!(balances["CLAM"].pending, dec!(10));
        assert!(!balances.contains_key("ETH"));
    }

    #[test]
    fn test_missing_balances_is_empty() {
        let account: AccountInfo = serde_json::from_str(r#"{"code":-2015}"#).unwrap();
        assert!(normalize_balances(&account).is_empty());
    }

    #[test]
    fn test_depth_snapshot() {
        let response: DepthResponse = serde_json::from_str(
            r#"{"sequence":1027024,"bids":[["4.00000000","431.00000000"],["3.9","0.00000000"]],
                "asks":[["4.00000200","12.00000000"]]}"#,
        )
        .unwrap();
        let snapshot = depth_snapshot(response).unwrap();
        assert_eq!(snapshot.sequence, 1027024);
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.bids[&dec!(4)], dec!(431));
        assert_eq!(snapshot.asks[&dec!(4.000002)], dec!(12));
    }

    #[test]
    fn test_malformed_snapshot_fails_fast() {
        let response = DepthResponse {
            sequence: 1,
            bids: vec![["4.0".to_string(), "NaN".to_string()]],
            asks: vec![],
        };
        assert!(matches!(
            depth_snapshot(response),
            Err(DepthError::MalformedPriceLevel { side: Side::Bid, .. })
        ));
    }
}
