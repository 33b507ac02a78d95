use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::MilestoneProgram;

/// Rate bounds and pacing controls for the milestone route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSettings {
    /// Rate earned on spend below the annual milestone.
    pub high_pct: f64,
    /// Rate earned once the milestone is reached.
    pub low_pct: f64,
    /// Fraction the actual ytd may run ahead of the ideal curve before damping.
    pub pacing_tolerance: f64,
    /// Multiplier applied to the rate when spend runs ahead of pace.
    pub pacing_damping: f64,
}

impl Default for MilestoneSettings {
    fn default() -> Self {
        Self {
            high_pct: 5.0,
            low_pct: 2.0,
            pacing_tolerance: 0.2,
            pacing_damping: 0.8,
        }
    }
}

/// Instantaneous card-level percentage of the milestone route for `amount`.
pub fn dynamic_percent(
    amount: f64,
    program: &MilestoneProgram,
    settings: &MilestoneSettings,
    today: NaiveDate,
) -> f64 {
    if amount <= 0.0 {
        return settings.high_pct;
    }

    let base = blended_percent(amount, program.remaining_to_milestone(), settings);

    if program.ytd_spend > ideal_ytd(program, today) * (1.0 + settings.pacing_tolerance) {
        (base * settings.pacing_damping).max(settings.low_pct)
    } else {
        base
    }
}

/// Weighted rate for a transaction that may straddle the milestone.
pub fn blended_percent(amount: f64, remaining: f64, settings: &MilestoneSettings) -> f64 {
    if remaining <= 0.0 {
        return settings.low_pct;
    }
    if amount <= remaining {
        return settings.high_pct;
    }

    let part_high = remaining;
    let part_low = amount - remaining;
    (settings.high_pct * part_high + settings.low_pct * part_low) / amount
}

/// Share of the current programme year elapsed at `today`, clamped to 0..=1.
pub fn elapsed_fraction(program: &MilestoneProgram, today: NaiveDate) -> f64 {
    let total_days = (program.year_end() - program.year_start).num_days().max(1);
    let elapsed_days = (today - program.year_start).num_days().clamp(0, total_days);
    elapsed_days as f64 / total_days as f64
}

/// Back-loaded target curve: `target * fraction^2`.
pub fn ideal_ytd(program: &MilestoneProgram, today: NaiveDate) -> f64 {
    let fraction = elapsed_fraction(program, today);
    program.target_annual_spend * fraction * fraction
}
