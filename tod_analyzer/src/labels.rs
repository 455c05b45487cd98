//! Categorical labels as ordered threshold tables.
//!
//! Every label is computed by [`classify`]: rows are tried top to bottom and
//! the first bound that admits the value wins, otherwise the fallback label
//! applies. The tables are data, so the exported strings and the thresholds
//! live side by side.

use std::fmt;

use serde::Serialize;

use crate::config::Thresholds;

/// A one-sided test on a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Above(f64),
    Below(f64),
    AtLeast(f64),
}

impl Bound {
    pub fn admits(self, x: f64) -> bool {
        match self {
            Bound::Above(b) => x > b,
            Bound::Below(b) => x < b,
            Bound::AtLeast(b) => x >= b,
        }
    }
}

/// First row whose bound admits `x`, else `fallback`.
pub fn classify<L: Copy>(table: &[(Bound, L)], x: f64, fallback: L) -> L {
    table
        .iter()
        .find(|(bound, _)| bound.admits(x))
        .map(|&(_, label)| label)
        .unwrap_or(fallback)
}

macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }
    };
}

label_enum!(
    /// Three-level grade used by several tables.
    Grade { High => "HIGH", Medium => "MEDIUM", Low => "LOW" }
);

label_enum!(PatternStrength { Strong => "STRONG", Moderate => "MODERATE", Weak => "WEAK" });

label_enum!(TradingSignal {
    InsufficientData => "INSUFFICIENT_DATA",
    StrongBuy => "STRONG_BUY",
    Buy => "BUY",
    WeakBuy => "WEAK_BUY",
    StrongSell => "STRONG_SELL",
    Sell => "SELL",
    WeakSell => "WEAK_SELL",
    Neutral => "NEUTRAL",
});

label_enum!(SectorPattern { Dip => "DIP", Rally => "RALLY", Neutral => "NEUTRAL" });

label_enum!(
    /// Size of a morning dip or afternoon rally.
    MoveStrength { None => "NONE", Weak => "WEAK", Moderate => "MODERATE", Strong => "STRONG" }
);

label_enum!(Quality { Excellent => "EXCELLENT", Good => "GOOD", Fair => "FAIR" });

label_enum!(SectorVerdict { Viable => "VIABLE", Selective => "SELECTIVE", NotViable => "NOT_VIABLE" });

label_enum!(PositionSize { Ten => "10%", Five => "5%", Two => "2%" });

pub type VolatilityRank = Grade;
pub type PatternReliability = Grade;
pub type Viability = Grade;
pub type RiskLevel = Grade;
pub type StrategyConfidence = Grade;

/// From the standard deviation of a window's returns.
pub fn volatility_rank(std: f64) -> VolatilityRank {
    classify(
        &[(Bound::Above(2.0), Grade::High), (Bound::Above(1.0), Grade::Medium)],
        std,
        Grade::Low,
    )
}

/// From the absolute mean return.
pub fn pattern_strength(mean: f64) -> PatternStrength {
    classify(
        &[
            (Bound::Above(0.15), PatternStrength::Strong),
            (Bound::Above(0.08), PatternStrength::Moderate),
        ],
        mean.abs(),
        PatternStrength::Weak,
    )
}

pub fn trading_signal(mean: f64, count: usize, thresholds: &Thresholds) -> TradingSignal {
    if count < thresholds.min_signal_obs {
        return TradingSignal::InsufficientData;
    }
    classify(
        &[
            (Bound::Above(0.2), TradingSignal::StrongBuy),
            (Bound::Above(0.1), TradingSignal::Buy),
            (Bound::Above(0.05), TradingSignal::WeakBuy),
            (Bound::Below(-0.2), TradingSignal::StrongSell),
            (Bound::Below(-0.1), TradingSignal::Sell),
            (Bound::Below(-0.05), TradingSignal::WeakSell),
        ],
        mean,
        TradingSignal::Neutral,
    )
}

/// How many instruments back a sector window, and how tightly they agree.
pub fn pattern_reliability(confirmations: usize, std: f64) -> PatternReliability {
    if confirmations >= 5 && std < 0.3 {
        Grade::High
    } else if confirmations >= 3 {
        Grade::Medium
    } else {
        Grade::Low
    }
}

pub fn sector_pattern(weighted_mean: f64) -> SectorPattern {
    classify(
        &[
            (Bound::Below(-0.05), SectorPattern::Dip),
            (Bound::Above(0.05), SectorPattern::Rally),
        ],
        weighted_mean,
        SectorPattern::Neutral,
    )
}

pub fn morning_dip_strength(avg: f64) -> MoveStrength {
    classify(
        &[
            (Bound::Below(-0.15), MoveStrength::Strong),
            (Bound::Below(-0.08), MoveStrength::Moderate),
            (Bound::Below(0.0), MoveStrength::Weak),
        ],
        avg,
        MoveStrength::None,
    )
}

pub fn afternoon_rally_strength(avg: f64) -> MoveStrength {
    classify(
        &[
            (Bound::Above(0.15), MoveStrength::Strong),
            (Bound::Above(0.08), MoveStrength::Moderate),
            (Bound::Above(0.0), MoveStrength::Weak),
        ],
        avg,
        MoveStrength::None,
    )
}

/// From the morning to afternoon swing.
pub fn viability(swing: f64) -> Viability {
    classify(
        &[(Bound::Above(0.3), Grade::High), (Bound::Above(0.15), Grade::Medium)],
        swing,
        Grade::Low,
    )
}

/// From the size of the worst window's mean.
pub fn risk_level(worst_mean: f64) -> RiskLevel {
    classify(
        &[(Bound::Above(0.5), Grade::High), (Bound::Above(0.2), Grade::Medium)],
        worst_mean.abs(),
        Grade::Low,
    )
}

pub fn position_size(swing: f64) -> PositionSize {
    classify(
        &[
            (Bound::Above(0.5), PositionSize::Ten),
            (Bound::Above(0.25), PositionSize::Five),
        ],
        swing,
        PositionSize::Two,
    )
}

/// From the total observations behind an instrument.
pub fn data_quality(total_obs: usize) -> Quality {
    classify(
        &[
            (Bound::Above(1000.0), Quality::Excellent),
            (Bound::Above(500.0), Quality::Good),
        ],
        total_obs as f64,
        Quality::Fair,
    )
}

/// From the smaller observation count of an opportunity's two windows.
pub fn opportunity_quality(min_obs: usize) -> Quality {
    classify(
        &[
            (Bound::Above(50.0), Quality::Excellent),
            (Bound::Above(20.0), Quality::Good),
        ],
        min_obs as f64,
        Quality::Fair,
    )
}

pub fn strategy_confidence(min_obs: usize) -> StrategyConfidence {
    classify(&[(Bound::Above(20.0), Grade::High)], min_obs as f64, Grade::Medium)
}

/// `viable` of `total` instruments clear the viable-swing bar.
pub fn sector_verdict(viable: usize, total: usize) -> SectorVerdict {
    if total > 0 && viable as f64 >= total as f64 * 0.4 {
        SectorVerdict::Viable
    } else if viable > 0 {
        SectorVerdict::Selective
    } else {
        SectorVerdict::NotViable
    }
}
