use chrono::NaiveDate;
use tracing::info;

use super::domain::{anniversary, LedgerState, MonthKey};

/// Which counters a reconciliation pass reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodRollover {
    pub month_reset: bool,
    pub program_years_advanced: u32,
}

impl PeriodRollover {
    pub fn changed(&self) -> bool {
        self.month_reset || self.program_years_advanced > 0
    }
}

/// Resets monthly cap usage on a new calendar month and advances the milestone
/// programme past any elapsed programme years. Calling it again with a date in
/// the same month and programme year is a no-op, and so is any earlier date.
pub fn reconcile_periods(ledger: &mut LedgerState, today: NaiveDate) -> PeriodRollover {
    let mut rollover = PeriodRollover::default();

    let current = MonthKey::of(today);
    if ledger.last_month.map_or(true, |last| current > last) {
        ledger.used_this_cycle.clear();
        ledger.last_month = Some(current);
        rollover.month_reset = true;
        info!(month = %current, "monthly cap usage reset");
    }

    let program = &mut ledger.milestone;
    while today >= program.year_end() {
        let Some(next_index) = program
            .year_index_from_anchor()
            .and_then(|years| years.checked_add(1))
        else {
            break;
        };
        let Some(next_start) = anniversary(program.anchor, next_index) else {
            break;
        };
        program.year_start = next_start;
        rollover.program_years_advanced += 1;
    }

    if rollover.program_years_advanced > 0 {
        program.ytd_spend = 0.0;
        info!(
            year_start = %program.year_start,
            years = rollover.program_years_advanced,
            "milestone programme year rolled over"
        );
    }

    rollover
}
