//! Quote validation and enhancement
//!
//! Turns an exchange-reported `RawQuote` into an `EnhancedQuote` or a
//! `Rejection`. Rejections are routine ("no usable quote this tick") and
//! are only logged at debug level.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::core::types::{current_time_ms, EnhancedQuote};
use crate::feeds::RawQuote;

/// Reason a raw quote was not stored. Checks run in declaration order and
/// the first failure wins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("Empty quote")]
    Empty,

    #[error("Missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid price: bid={bid}, ask={ask}")]
    InvalidPrice { bid: String, ask: String },

    #[error("Crossed book: bid {bid} above ask {ask}")]
    CrossedBook { bid: f64, ask: f64 },

    #[error("Invalid volume: bid_volume={bid_volume}, ask_volume={ask_volume}")]
    InvalidVolume {
        bid_volume: String,
        ask_volume: String,
    },
}

/// Parse a JSON number or numeric string as a positive finite f64
fn positive(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed > 0.0).then_some(parsed)
}

/// Liquidity score: `clamp(20 * (usd / 1000)^0.3, 0, 100)`
///
/// Roughly $1K → 20, $10K → 40, $100K → 80, $1M and above → 100.
#[inline]
pub fn volume_score(liquidity_usd: f64) -> f64 {
    if liquidity_usd.is_nan() || liquidity_usd <= 0.0 {
        return 0.0;
    }
    (20.0 * (liquidity_usd / 1000.0).powf(0.3)).clamp(0.0, 100.0)
}

/// Validate `raw` and derive spread and liquidity score.
///
/// `exchange_id` and `symbol` are only used for diagnostics.
pub fn validate(
    raw: Option<&RawQuote>,
    exchange_id: &str,
    symbol: &str,
) -> Result<EnhancedQuote, Rejection> {
    let result = check(raw);
    if let Err(rejection) = &result {
        debug!(
            exchange = %exchange_id,
            symbol = %symbol,
            reason = %rejection,
            "Quote rejected"
        );
    }
    result
}

fn check(raw: Option<&RawQuote>) -> Result<EnhancedQuote, Rejection> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(Rejection::Empty),
    };

    let present = |v: &Option<Value>| matches!(v, Some(v) if !v.is_null());
    let missing: Vec<&'static str> = [
        ("bid", &raw.bid),
        ("ask", &raw.ask),
        ("bid_volume", &raw.bid_volume),
        ("ask_volume", &raw.ask_volume),
    ]
    .into_iter()
    .filter(|(_, v)| !present(v))
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Err(Rejection::MissingFields(missing));
    }

    // Presence checked above
    let field = |v: &Option<Value>| v.clone().unwrap_or(Value::Null);
    let (bid_raw, ask_raw) = (field(&raw.bid), field(&raw.ask));
    let (bid, ask) = match (positive(&bid_raw), positive(&ask_raw)) {
        (Some(bid), Some(ask)) => (bid, ask),
        _ => {
            return Err(Rejection::InvalidPrice {
                bid: bid_raw.to_string(),
                ask: ask_raw.to_string(),
            })
        }
    };

    if ask < bid {
        return Err(Rejection::CrossedBook { bid, ask });
    }

    let (bv_raw, av_raw) = (field(&raw.bid_volume), field(&raw.ask_volume));
    let (bid_volume, ask_volume) = match (positive(&bv_raw), positive(&av_raw)) {
        (Some(bv), Some(av)) => (bv, av),
        _ => {
            return Err(Rejection::InvalidVolume {
                bid_volume: bv_raw.to_string(),
                ask_volume: av_raw.to_string(),
            })
        }
    };

    let liquidity = (bid * bid_volume).min(ask * ask_volume);

    Ok(EnhancedQuote {
        bid,
        ask,
        bid_volume,
        ask_volume,
        spread_pct: (ask - bid) / bid * 100.0,
        volume_score: volume_score(liquidity),
        observed_at_ms: current_time_ms(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(bid: Value, ask: Value, bv: Value, av: Value) -> RawQuote {
        RawQuote {
            bid: Some(bid),
            ask: Some(ask),
            bid_volume: Some(bv),
            ask_volume: Some(av),
        }
    }

    #[test]
    fn test_valid_quote_is_enhanced() {
        let q = validate(Some(&RawQuote::from_numbers(100.0, 101.0, 20.0, 20.0)), "kraken", "BTC/USDT")
            .unwrap();
        assert_eq!(q.bid, 100.0);
        assert_eq!(q.ask, 101.0);
        assert!((q.spread_pct - 1.0).abs() < 1e-12);
        // liquidity = min(2000, 2020) = 2000
        assert!((q.volume_score - 20.0 * 2f64.powf(0.3)).abs() < 1e-9);
        assert!(q.observed_at_ms > 0);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let q = validate(
            Some(&raw("50000".into(), " 50010.5 ".into(), "0.5".into(), "1".into())),
            "bitfinex",
            "BTC/USDT",
        )
        .unwrap();
        assert_eq!(q.ask, 50010.5);
        assert_eq!(q.bid_volume, 0.5);
    }

    #[test]
    fn test_absent_and_empty_rejected() {
        assert_eq!(validate(None, "x", "BTC/USDT"), Err(Rejection::Empty));
        assert_eq!(
            validate(Some(&RawQuote::default()), "x", "BTC/USDT"),
            Err(Rejection::Empty)
        );
    }

    #[test]
    fn test_missing_fields_listed() {
        let mut quote = RawQuote::from_numbers(1.0, 2.0, 3.0, 4.0);
        quote.ask_volume = None;
        quote.bid = Some(Value::Null);
        assert_eq!(
            validate(Some(&quote), "x", "BTC/USDT"),
            Err(Rejection::MissingFields(vec!["bid", "ask_volume"]))
        );
    }

    #[test]
    fn test_invalid_prices_rejected() {
        for (bid, ask) in [
            (Value::from(0), Value::from(1)),
            (Value::from(-1), Value::from(1)),
            (Value::from("abc"), Value::from(1)),
            (Value::from(1), Value::from("NaN")),
            (Value::from(true), Value::from(1)),
        ] {
            let result = validate(Some(&raw(bid, ask, 1.into(), 1.into())), "x", "BTC/USDT");
            assert!(
                matches!(result, Err(Rejection::InvalidPrice { .. })),
                "Got: {:?}",
                result
            );
        }
    }

    #[test]
    fn test_crossed_book_rejected_not_swapped() {
        let result = validate(Some(&RawQuote::from_numbers(101.0, 100.0, 1.0, 1.0)), "x", "BTC/USDT");
        assert_eq!(result, Err(Rejection::CrossedBook { bid: 101.0, ask: 100.0 }));
    }

    #[test]
    fn test_locked_book_accepted() {
        let q = validate(Some(&RawQuote::from_numbers(100.0, 100.0, 1.0, 1.0)), "x", "BTC/USDT")
            .unwrap();
        assert_eq!(q.spread_pct, 0.0);
    }

    #[test]
    fn test_invalid_volume_rejected() {
        let result = validate(Some(&RawQuote::from_numbers(100.0, 101.0, 0.0, 1.0)), "x", "BTC/USDT");
        assert!(matches!(result, Err(Rejection::InvalidVolume { .. })));
    }

    #[test]
    fn test_rejection_order_price_before_volume() {
        // Invalid price wins over the volume problem
        let result = validate(
            Some(&raw("x".into(), 1.into(), 0.into(), 0.into())),
            "x",
            "BTC/USDT",
        );
        assert!(matches!(result, Err(Rejection::InvalidPrice { .. })));
    }

    #[test]
    fn test_volume_score_reference_points() {
        assert!((volume_score(1_000.0) - 20.0).abs() < 1e-9);
        assert!((volume_score(10_000.0) - 39.9).abs() < 0.1);
        assert!((volume_score(100_000.0) - 79.6).abs() < 0.1);
        assert_eq!(volume_score(1_000_000.0), 100.0);
        assert_eq!(volume_score(0.0), 0.0);
    }

    #[test]
    fn test_rejection_display() {
        let r = Rejection::MissingFields(vec!["bid", "ask"]);
        assert_eq!(r.to_string(), "Missing fields: bid, ask");
    }

    // =========================================================================
    // Property-based tests (proptest)
    // =========================================================================
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn spread_is_exact(
                bid in 0.0001f64..1e7,
                premium in 0.0f64..1e5,
                bv in 0.0001f64..1e6,
                av in 0.0001f64..1e6,
            ) {
                let ask = bid + premium;
                let q = validate(Some(&RawQuote::from_numbers(bid, ask, bv, av)), "x", "S/T").unwrap();
                prop_assert_eq!(q.spread_pct, (ask - bid) / bid * 100.0);
                prop_assert!(q.ask >= q.bid);
            }

            #[test]
            fn score_bounded_and_monotonic(a in 0.0f64..1e9, b in 0.0f64..1e9) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                let (s_lo, s_hi) = (volume_score(lo), volume_score(hi));
                prop_assert!((0.0..=100.0).contains(&s_lo));
                prop_assert!((0.0..=100.0).contains(&s_hi));
                prop_assert!(s_lo <= s_hi, "score({}) = {} > score({}) = {}", lo, s_lo, hi, s_hi);
            }

            #[test]
            fn crossed_book_always_rejected(
                ask in 0.0001f64..1e7,
                discount in 0.0001f64..1e3,
            ) {
                let bid = ask + discount;
                let result = validate(Some(&RawQuote::from_numbers(bid, ask, 1.0, 1.0)), "x", "S/T");
                prop_assert!(
                    matches!(result, Err(Rejection::CrossedBook { .. })),
                    "Crossed book accepted: {:?}",
                    result
                );
            }

            #[test]
            fn any_missing_field_rejected(mask in 1u8..16) {
                let mut quote = RawQuote::from_numbers(1.0, 2.0, 3.0, 4.0);
                if mask & 1 != 0 { quote.bid = None; }
                if mask & 2 != 0 { quote.ask = None; }
                if mask & 4 != 0 { quote.bid_volume = None; }
                if mask & 8 != 0 { quote.ask_volume = None; }
                prop_assert!(validate(Some(&quote), "x", "S/T").is_err());
            }
        }
    }
}
