//! Market identifier helpers

/// Quote assets recognized at the end of unseparated market identifiers
const KNOWN_QUOTE_ASSETS: [&str; 4] = ["USDT", "BTC", "ETH", "BNB"];

/// Trailing asset token of a market identifier
///
/// `"BTC_CLAM"` → `"CLAM"`. Identifiers without a separator are matched
/// against the known quote assets (`"ETHBTC"` → `"BTC"`). Returns `None` when
/// neither applies.
pub fn quote_asset(market: &str) -> Option<&str> {
    if let Some((_, asset)) = market.rsplit_once('_') {
        return (!asset.is_empty()).then_some(asset);
    }

    KNOWN_QUOTE_ASSETS
        .iter()
        .find(|quote| market.len() > quote.len() && market.ends_with(*quote))
        .map(|quote| &market[market.len() - quote.len()..])
}

/// `min` as a percentage of `max`, scaled to `width`
pub fn percent(min: f64, max: f64, width: f64) -> f64 {
    if max == 0.0 {
        return 0.0;
    }
    (min * 0.01) / (max * 0.01) * width
}
