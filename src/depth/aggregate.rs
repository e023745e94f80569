//! Sorted views and volume totals over depth books
//!
//! Read-only: nothing here mutates the levels it is given.

use crate::depth::types::{DepthBook, PriceLevels, Side};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept for notional values
const NOTIONAL_DP: u32 = 8;

/// What each entry of a sorted view carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    /// Raw quantity at the level
    #[default]
    Quantity,
    /// Running quantity total from the best price outwards
    Cumulative,
    /// price × quantity, rounded to 8 decimal places
    Notional,
}

/// Buy/sell totals across a whole book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthVolume {
    pub bid_notional: Decimal,
    pub ask_notional: Decimal,
    pub bid_qty: Decimal,
    pub ask_qty: Decimal,
}

/// price × quantity rounded half away from zero to 8 dp
pub fn notional(price: Decimal, quantity: Decimal) -> Decimal {
    price
        .saturating_mul(quantity)
        .round_dp_with_strategy(NOTIONAL_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Orders a side best price first and maps each level to its value
///
/// Bids come out descending, asks ascending. At most `limit` entries are
/// returned (`None` = all).
pub fn sorted_view(
    levels: &PriceLevels,
    side: Side,
    limit: Option<usize>,
    mode: ValueMode,
) -> Vec<(Decimal, Decimal)> {
    let limit = limit.unwrap_or(usize::MAX);
    let ordered: Box<dyn Iterator<Item = (&Decimal, &Decimal)>> = match side {
        Side::Bid => Box::new(levels.iter().rev()),
        Side::Ask => Box::new(levels.iter()),
    };

    let mut running = Decimal::ZERO;
    ordered
        .take(limit)
        .map(|(&price, &quantity)| {
            let value = match mode {
                ValueMode::Quantity => quantity,
                ValueMode::Cumulative => {
                    running = running.saturating_add(quantity);
                    running
                }
                ValueMode::Notional => notional(price, quantity),
            };
            (price, value)
        })
        .collect()
}

/// Sums notional value and quantity on each side independently
///
/// Totals saturate at `Decimal::MAX`.
pub fn volume(book: &DepthBook) -> DepthVolume {
    let (bid_notional, bid_qty) = side_totals(&book.bids);
    let (ask_notional, ask_qty) = side_totals(&book.asks);

    DepthVolume {
        bid_notional,
        ask_notional,
        bid_qty,
        ask_qty,
    }
}

fn side_totals(levels: &PriceLevels) -> (Decimal, Decimal) {
    levels
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(base, qty), (&p, &q)| {
            (base.saturating_add(notional(p, q)), qty.saturating_add(q))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_book() -> DepthBook {
        let mut book = DepthBook::new();
        book.update_bid(dec!(10.0), dec!(2));
        book.update_bid(dec!(9.5), dec!(1));
        book.update_ask(dec!(10.5), dec!(3));
        book.update_ask(dec!(11.0), dec!(1));
        book
    }

    #[test]
    fn test_bid_view_descending() {
        let book = sample_book();
        let view = sorted_view(&book.bids, Side::Bid, None, ValueMode::Quantity);
        assert_eq!(view, vec![(dec!(10.0), dec!(2)), (dec!(9.5), dec!(1))]);
    }

    #[test]
    fn test_ask_view_ascending() {
        let book = sample_book();
        let view = sorted_view(&book.asks, Side::Ask, None, ValueMode::Quantity);
        assert_eq!(view, vec![(dec!(10.5), dec!(3)), (dec!(11.0), dec!(1))]);
    }

    #[test]
    fn test_cumulative_bids() {
        let book = sample_book();
        let view = sorted_view(&book.bids, Side::Bid, None, ValueMode::Cumulative);
        assert_eq!(view, vec![(dec!(10.0), dec!(2)), (dec!(9.5), dec!(3))]);
    }

    #[test]
    fn test_notional_asks() {
        let book = sample_book();
        let view = sorted_view(&book.asks, Side::Ask, None, ValueMode::Notional);
        assert_eq!(view, vec![(dec!(10.5), dec!(31.5)), (dec!(11.0), dec!(11))]);
    }

    #[test]
    fn test_limit_truncates_in_order() {
        let book = sample_book();
        let view = sorted_view(&book.bids, Side::Bid, Some(1), ValueMode::Quantity);
        assert_eq!(view, vec![(dec!(10.0), dec!(2))]);

        assert!(sorted_view(&book.bids, Side::Bid, Some(0), ValueMode::Quantity).is_empty());
        assert_eq!(
            sorted_view(&book.asks, Side::Ask, Some(10), ValueMode::Quantity).len(),
            2
        );
    }

    #[test]
    fn test_volume() {
        let volume = volume(&sample_book());
        assert_eq!(volume.bid_notional, dec!(29.5));
        assert_eq!(volume.ask_notional, dec!(42.5));
        assert_eq!(volume.bid_qty, dec!(3));
        assert_eq!(volume.ask_qty, dec!(4));
    }

    #[test]
    fn test_volume_of_empty_book_is_zero() {
        assert_eq!(volume(&DepthBook::new()), DepthVolume::default());
    }

    #[test]
    fn test_totals_saturate_near_decimal_max() {
        let mut book = DepthBook::new();
        book.update_bid(Decimal::MAX, dec!(2));
        book.update_bid(Decimal::MAX - Decimal::ONE, dec!(2));
        book.update_ask(dec!(1), Decimal::MAX);
        book.update_ask(dec!(2), dec!(1));

        let volume = volume(&book);
        assert_eq!(volume.bid_notional, Decimal::MAX);
        assert_eq!(volume.bid_qty, dec!(4));
        assert_eq!(volume.ask_qty, Decimal::MAX);

        let view = sorted_view(&book.asks, Side::Ask, None, ValueMode::Cumulative);
        assert_eq!(view, vec![(dec!(1), Decimal::MAX), (dec!(2), Decimal::MAX)]);
    }

    #[test]
    fn test_notional_rounds_to_eight_places() {
        assert_eq!(notional(dec!(0.123456789), dec!(1)), dec!(0.12345679));
        assert_eq!(notional(dec!(0.000000005), dec!(1)), dec!(0.00000001));
    }
}
