use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Stable string key of a configured route.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub String);

impl MethodId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a route derives its card-level percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Rate comes from the milestone program and the year-to-date spend.
    Milestone,
    /// Rate is the configured `card_reward_pct`.
    Fixed,
}

impl MethodKind {
    pub const fn label(self) -> &'static str {
        match self {
            MethodKind::Milestone => "milestone",
            MethodKind::Fixed => "fixed",
        }
    }
}

/// One configured payment route.
///
/// Percentages are plain numbers (3 means 3%). Currency amounts are whole local
/// currency units with no subunit convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardMethod {
    pub id: MethodId,
    pub name: String,
    pub active: bool,
    pub kind: MethodKind,
    #[serde(default)]
    pub card_reward_pct: f64,
    #[serde(default)]
    pub voucher_discount_pct: f64,
    #[serde(default)]
    pub portal_reward_pct: f64,
    #[serde(default)]
    pub float_benefit_pct: f64,
    /// 0 means uncapped.
    #[serde(default)]
    pub monthly_cap: f64,
    #[serde(default)]
    pub utilisation_limit_pct: f64,
    #[serde(default)]
    pub current_utilisation_pct: f64,
}

impl RewardMethod {
    /// Bonuses paid outside the card's reward programme; they survive cap exhaustion.
    pub fn non_card_pct(&self) -> f64 {
        self.voucher_discount_pct + self.portal_reward_pct + self.float_benefit_pct
    }

    pub fn is_capped(&self) -> bool {
        self.monthly_cap > 0.0
    }

    /// Static utilisation signal; a limit of zero is read as 100%.
    pub fn utilisation_warning(&self) -> bool {
        let limit = if self.utilisation_limit_pct > 0.0 {
            self.utilisation_limit_pct
        } else {
            100.0
        };
        self.current_utilisation_pct >= limit
    }
}

/// Calendar month used to detect the monthly cap rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Annual state of the milestone route's programme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneProgram {
    /// Enrolment date; every programme year starts on this month/day.
    pub anchor: NaiveDate,
    /// Start of the current programme year.
    pub year_start: NaiveDate,
    pub target_annual_spend: f64,
    pub ytd_spend: f64,
}

impl MilestoneProgram {
    pub fn new(anchor: NaiveDate, target_annual_spend: f64) -> Self {
        Self {
            anchor,
            year_start: anchor,
            target_annual_spend,
            ytd_spend: 0.0,
        }
    }

    /// Exclusive end of the current programme year.
    pub fn year_end(&self) -> NaiveDate {
        self.year_index_from_anchor()
            .and_then(|years| anniversary(self.anchor, years + 1))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn remaining_to_milestone(&self) -> f64 {
        (self.target_annual_spend - self.ytd_spend).max(0.0)
    }

    /// Whole years between the anchor and the current year start.
    pub(crate) fn year_index_from_anchor(&self) -> Option<u32> {
        let years = self.year_start.year() - self.anchor.year();
        u32::try_from(years).ok()
    }
}

/// The anchor date moved forward by `years`; Feb 29 falls back to Feb 28 in common years.
pub(crate) fn anniversary(anchor: NaiveDate, years: u32) -> Option<NaiveDate> {
    anchor.checked_add_months(Months::new(years.checked_mul(12)?))
}

/// Mutable accrual state persisted as a single blob so one commit is one write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub used_this_cycle: BTreeMap<MethodId, f64>,
    pub milestone: MilestoneProgram,
    #[serde(default)]
    pub last_month: Option<MonthKey>,
}

impl LedgerState {
    pub fn new(milestone: MilestoneProgram) -> Self {
        Self {
            used_this_cycle: BTreeMap::new(),
            milestone,
            last_month: None,
        }
    }

    /// Default programme: enrolled 2025-08-02 with a 150,000 annual target and no
    /// spend recorded yet.
    pub fn standard() -> Self {
        let anchor = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap_or(NaiveDate::MIN);
        Self::new(MilestoneProgram::new(anchor, 150_000.0))
    }

    pub fn used(&self, id: &MethodId) -> f64 {
        self.used_this_cycle.get(id).copied().unwrap_or(0.0)
    }
}

/// One route's projected outcome for a proposed amount. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedCandidate {
    pub method_id: MethodId,
    pub method_name: String,
    pub kind: MethodKind,
    pub amount: f64,
    pub card_pct: f64,
    pub effective_pct: f64,
    pub reward_value: f64,
    /// Portion of `reward_value` that counts against the monthly cap.
    pub cap_charge: f64,
    pub capped: bool,
    pub utilisation_warning: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn year_end_is_one_anniversary_after_the_current_start() {
        let mut program = MilestoneProgram::new(date(2025, 8, 2), 150_000.0);
        assert_eq!(program.year_end(), date(2026, 8, 2));
        program.year_start = date(2026, 8, 2);
        assert_eq!(program.year_end(), date(2027, 8, 2));
    }

    #[test]
    fn leap_day_anchor_keeps_its_day_in_leap_years() {
        let mut program = MilestoneProgram::new(date(2024, 2, 29), 1_000.0);
        assert_eq!(program.year_end(), date(2025, 2, 28));
        program.year_start = date(2027, 2, 28);
        assert_eq!(program.year_end(), date(2028, 2, 29));
    }

    #[test]
    fn zero_limit_means_full_utilisation_allowed() {
        let method = RewardMethod {
            id: MethodId::new("x"),
            name: "x".to_string(),
            active: true,
            kind: MethodKind::Fixed,
            card_reward_pct: 1.0,
            voucher_discount_pct: 0.0,
            portal_reward_pct: 0.0,
            float_benefit_pct: 0.0,
            monthly_cap: 0.0,
            utilisation_limit_pct: 0.0,
            current_utilisation_pct: 99.0,
        };
        assert!(!method.utilisation_warning());
    }

    #[test]
    fn standard_ledger_starts_a_fresh_programme_year() {
        let ledger = LedgerState::standard();
        assert_eq!(ledger.milestone.anchor, date(2025, 8, 2));
        assert_eq!(ledger.milestone.year_start, date(2025, 8, 2));
        assert_eq!(ledger.milestone.target_annual_spend, 150_000.0);
        assert_eq!(ledger.milestone.ytd_spend, 0.0);
        assert!(ledger.used_this_cycle.is_empty());
        assert_eq!(ledger.last_month, None);
    }

    #[test]
    fn month_key_formats_zero_padded() {
        assert_eq!(MonthKey::of(date(2026, 3, 9)).to_string(), "2026-03");
    }
}
