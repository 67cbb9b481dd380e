//! Margin calculator. Turns a resolved (price, cost) pair into display
//! metrics and a health classification.
//!
//! Pure: no storage, no clock. Divisions are guarded so that a zero price
//! or a zero cost yields 0 instead of a non-finite value.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MARGIN_GOOD_PCT: f64 = 20.0;
pub const MARGIN_WARNING_PCT: f64 = 10.0;
pub const COEFFICIENT_GOOD: f64 = 1.30;
pub const COEFFICIENT_WARNING: f64 = 1.20;

/// Ratios are settled to this many decimals before banding, so that a
/// margin of exactly 20% is not classified from 19.999999999999993.
const RATIO_DECIMALS: i32 = 9;

fn settle(value: f64) -> f64 {
    let factor = 10f64.powi(RATIO_DECIMALS);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Good,
    Warning,
    Critical,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Good => "good",
            Health::Warning => "warning",
            Health::Critical => "critical",
        }
    }

    /// Inclusive lower bounds: `>= good` is Good, `>= warning` is Warning.
    fn classify(value: f64, good: f64, warning: f64) -> Self {
        if value >= good {
            Health::Good
        } else if value >= warning {
            Health::Warning
        } else {
            Health::Critical
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product-level policy bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HealthThresholds {
    pub margin_good_pct: f64,
    pub margin_warning_pct: f64,
    pub coefficient_good: f64,
    pub coefficient_warning: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            margin_good_pct: MARGIN_GOOD_PCT,
            margin_warning_pct: MARGIN_WARNING_PCT,
            coefficient_good: COEFFICIENT_GOOD,
            coefficient_warning: COEFFICIENT_WARNING,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Margin {
    pub cost: f64,
    pub amount: f64,
    pub pct: f64,
    pub coefficient: f64,
    pub health: Health,
    pub coefficient_health: Health,
}

/// Metrics for one product. `margin` is `None` when the cost is unknown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    pub price: f64,
    pub margin: Option<Margin>,
}

impl Metrics {
    pub fn health(&self) -> Option<Health> {
        self.margin.map(|m| m.health)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.margin {
            None => write!(f, "price {:.2}", self.price),
            Some(m) => write!(
                f,
                "price {:.2} · cost {:.2} · margin {:.2} ({:.0}%) · coeff {:.2} · {}",
                self.price, m.cost, m.amount, m.pct, m.coefficient, m.health
            ),
        }
    }
}

/// Metrics under the default policy bands.
pub fn metrics(price: f64, cost: Option<f64>) -> Metrics {
    metrics_with(price, cost, &HealthThresholds::default())
}

pub fn metrics_with(price: f64, cost: Option<f64>, thresholds: &HealthThresholds) -> Metrics {
    let margin = cost.map(|cost| {
        let amount = price - cost;
        let pct = if price != 0.0 { settle(amount / price * 100.0) } else { 0.0 };
        let coefficient = if cost != 0.0 { settle(price / cost) } else { 0.0 };
        Margin {
            cost,
            amount,
            pct,
            coefficient,
            health: Health::classify(pct, thresholds.margin_good_pct, thresholds.margin_warning_pct),
            coefficient_health: Health::classify(
                coefficient,
                thresholds.coefficient_good,
                thresholds.coefficient_warning,
            ),
        }
    });
    Metrics { price, margin }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn margin(price: f64, cost: f64) -> Margin {
        metrics(price, Some(cost)).margin.unwrap()
    }

    #[test]
    fn price_only_without_cost() {
        let m = metrics(9.99, None);
        assert_eq!(m.price, 9.99);
        assert!(m.margin.is_none());
        assert_eq!(m.health(), None);
        assert_eq!(m.to_string(), "price 9.99");
    }

    #[test]
    fn reference_pair_is_good() {
        let m = margin(14.0, 8.0);
        assert!((m.amount - 6.0).abs() < 1e-9);
        assert!((m.pct - 42.857).abs() < 0.01);
        assert!((m.coefficient - 1.75).abs() < 1e-9);
        assert_eq!(m.health, Health::Good);
        assert_eq!(m.coefficient_health, Health::Good);
    }

    #[test]
    fn zero_cost_gives_zero_coefficient() {
        let m = margin(10.0, 0.0);
        assert_eq!(m.coefficient, 0.0);
        assert_eq!(m.coefficient_health, Health::Critical);
        assert!(m.pct.is_finite());
    }

    #[test]
    fn zero_price_gives_zero_pct() {
        let m = margin(0.0, 5.0);
        assert_eq!(m.pct, 0.0);
        assert_eq!(m.amount, -5.0);
        assert_eq!(m.health, Health::Critical);
    }

    #[test]
    fn bands_have_inclusive_lower_bounds() {
        // 20% margin exactly
        assert_eq!(margin(10.0, 8.0).health, Health::Good);
        // 10% margin exactly
        assert_eq!(margin(10.0, 9.0).health, Health::Warning);
        assert_eq!(margin(10.0, 9.5).health, Health::Critical);

        assert_eq!(margin(13.0, 10.0).coefficient_health, Health::Good);
        assert_eq!(margin(12.0, 10.0).coefficient_health, Health::Warning);
        assert_eq!(margin(11.9, 10.0).coefficient_health, Health::Critical);
    }

    #[test]
    fn band_edges_survive_float_rounding() {
        // 11.00 - 8.80 is not exact in binary; the margin is still 20%.
        let m = margin(11.0, 8.80);
        assert_eq!(m.pct, 20.0);
        assert_eq!(m.health, Health::Good);

        // 1.43 / 1.10 = 1.3 on paper
        let m = margin(1.43, 1.10);
        assert_eq!(m.coefficient, 1.3);
        assert_eq!(m.coefficient_health, Health::Good);

        let m = margin(11.0, 9.90);
        assert_eq!(m.pct, 10.0);
        assert_eq!(m.health, Health::Warning);
    }

    #[test]
    fn custom_thresholds_apply() {
        let strict = HealthThresholds {
            margin_good_pct: 50.0,
            ..HealthThresholds::default()
        };
        let m = metrics_with(14.0, Some(8.0), &strict).margin.unwrap();
        assert_eq!(m.health, Health::Warning);
    }

    #[test]
    fn summary_line() {
        let line = metrics(14.0, Some(8.0)).to_string();
        assert_eq!(line, "price 14.00 · cost 8.00 · margin 6.00 (43%) · coeff 1.75 · good");
    }
}
