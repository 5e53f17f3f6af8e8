//! USD -> HIVE quote calculation with hard safety bounds.

use serde::Serialize;

use crate::amount::{HiveAmount, UsdAmount};
use crate::constants::{DEFAULT_MAX_HIVE_MILLI, DEFAULT_MIN_HIVE_MILLI};
use crate::error::SignupError;
use crate::price_cache::PriceSnapshot;

/// Inclusive `[min, max]` range every quote is forced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountBounds {
    min: HiveAmount,
    max: HiveAmount,
}

impl AmountBounds {
    pub fn new(min: HiveAmount, max: HiveAmount) -> Result<Self, SignupError> {
        if min > max {
            return Err(SignupError::Internal(format!(
                "minimum HIVE amount {min} exceeds maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> HiveAmount {
        self.min
    }

    pub fn max(&self) -> HiveAmount {
        self.max
    }
}

impl Default for AmountBounds {
    fn default() -> Self {
        Self {
            min: HiveAmount::from_milli(DEFAULT_MIN_HIVE_MILLI),
            max: HiveAmount::from_milli(DEFAULT_MAX_HIVE_MILLI),
        }
    }
}

/// Which bound a quote was forced onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Min,
    Max,
}

impl Bound {
    pub fn as_str(self) -> &'static str {
        match self {
            Bound::Min => "min",
            Bound::Max => "max",
        }
    }
}

/// Result of [`calculate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub amount: HiveAmount,
    /// Set when the raw conversion fell outside the bounds.
    pub clamped: Option<Bound>,
    /// `false` when no usable rate was available and the minimum was used.
    pub price_known: bool,
}

/// Convert `usd` into HIVE at the snapshot rate, clamped to `bounds` and
/// rounded to milli-HIVE.
///
/// Without a usable rate (the `0` sentinel, or anything non-finite or
/// non-positive) the minimum bound is returned so that signups keep working
/// through a price-feed outage.
pub fn calculate(usd: UsdAmount, snapshot: &PriceSnapshot, bounds: &AmountBounds) -> Quote {
    if !snapshot.is_known() {
        return Quote {
            amount: bounds.min,
            clamped: None,
            price_known: false,
        };
    }

    // Bounds are compared after rounding so only a quote that is out of range
    // at milli-HIVE precision counts as clamped.
    let rounded = (usd.as_f64() / snapshot.usd * 1_000.0).round();
    let min = bounds.min.milli() as f64;
    let max = bounds.max.milli() as f64;

    let (milli, clamped) = if rounded < min {
        (bounds.min.milli(), Some(Bound::Min))
    } else if rounded > max {
        (bounds.max.milli(), Some(Bound::Max))
    } else {
        (rounded as u64, None)
    };

    if let Some(bound) = clamped {
        tracing::warn!(
            usd = %usd,
            rate = snapshot.usd,
            bound = bound.as_str(),
            "HIVE quote clamped to safety bound"
        );
    }

    Quote {
        amount: HiveAmount::from_milli(milli),
        clamped,
        price_known: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(usd: f64) -> PriceSnapshot {
        PriceSnapshot {
            usd,
            last_updated: 1,
        }
    }

    fn bounds(min_milli: u64, max_milli: u64) -> AmountBounds {
        AmountBounds::new(
            HiveAmount::from_milli(min_milli),
            HiveAmount::from_milli(max_milli),
        )
        .unwrap()
    }

    #[test]
    fn converts_at_snapshot_rate() {
        let quote = calculate(UsdAmount::from_cents(300), &snapshot(4.0), &bounds(500, 10_000));
        assert_eq!(quote.amount, HiveAmount::from_milli(750));
        assert_eq!(quote.clamped, None);
        assert!(quote.price_known);
    }

    #[test]
    fn below_minimum_is_clamped_up() {
        // 3.00 / 4.00 = 0.750, under a 1.000 floor.
        let quote = calculate(UsdAmount::from_cents(300), &snapshot(4.0), &bounds(1_000, 10_000));
        assert_eq!(quote.amount, HiveAmount::from_milli(1_000));
        assert_eq!(quote.clamped, Some(Bound::Min));
    }

    #[test]
    fn near_zero_price_is_clamped_to_maximum() {
        let quote = calculate(UsdAmount::from_cents(300), &snapshot(1e-12), &bounds(1_000, 10_000));
        assert_eq!(quote.amount, HiveAmount::from_milli(10_000));
        assert_eq!(quote.clamped, Some(Bound::Max));
    }

    #[test]
    fn unknown_price_falls_back_to_minimum() {
        for usd in [0, 1, 300, 1_000_000] {
            let quote = calculate(UsdAmount::from_cents(usd), &snapshot(0.0), &bounds(1_000, 10_000));
            assert_eq!(quote.amount, HiveAmount::from_milli(1_000));
            assert!(!quote.price_known);
        }
        let quote = calculate(UsdAmount::from_cents(300), &snapshot(f64::NAN), &AmountBounds::default());
        assert_eq!(quote.amount, AmountBounds::default().min());
    }

    #[test]
    fn rounds_to_milli_hive() {
        // 3.00 / 0.45 = 6.6666...
        let quote = calculate(UsdAmount::from_cents(300), &snapshot(0.45), &bounds(1_000, 10_000));
        assert_eq!(quote.amount, HiveAmount::from_milli(6_667));
    }

    #[test]
    fn values_rounding_onto_a_bound_are_not_clamped() {
        let b = bounds(1_000, 10_000);
        // 3.00 / 3.0012 = 0.99960 HIVE, rounds to exactly 1.000.
        let low = calculate(UsdAmount::from_cents(300), &snapshot(3.0012), &b);
        assert_eq!(low.amount, HiveAmount::from_milli(1_000));
        assert_eq!(low.clamped, None);

        // 3.00 / 0.299988 = 10.00040 HIVE, rounds to exactly 10.000.
        let high = calculate(UsdAmount::from_cents(300), &snapshot(0.299988), &b);
        assert_eq!(high.amount, HiveAmount::from_milli(10_000));
        assert_eq!(high.clamped, None);

        // 3.00 / 3.0018 = 0.99940 HIVE, still under the floor after rounding.
        let under = calculate(UsdAmount::from_cents(300), &snapshot(3.0018), &b);
        assert_eq!(under.clamped, Some(Bound::Min));
    }

    #[test]
    fn quotes_always_within_bounds() {
        let b = bounds(1_000, 10_000);
        for cents in [0u64, 1, 99, 300, 2_500, 100_000, u32::MAX as u64] {
            for rate in [1e-9, 0.001, 0.2, 0.31, 1.0, 4.0, 250.0, 1e12] {
                let q = calculate(UsdAmount::from_cents(cents), &snapshot(rate), &b);
                assert!(q.amount >= b.min() && q.amount <= b.max(), "{cents} @ {rate}");
            }
        }
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(AmountBounds::new(HiveAmount::from_milli(2), HiveAmount::from_milli(1)).is_err());
    }
}
