use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    EvaluatedCandidate, LedgerState, MethodId, MethodKind, MonthKey, RewardMethod,
};
use super::engine::RewardEngine;
use super::milestone::{ideal_ytd, MilestoneSettings};
use super::period::{reconcile_periods, PeriodRollover};
use super::ranking::Recommendation;
use super::registry::MethodRegistry;
use super::store::RewardStore;

/// Everything one user's session mutates: the route table, the accrual ledger and
/// the last ranked evaluation that commits refer to.
#[derive(Debug, Clone)]
struct RewardBook {
    registry: MethodRegistry,
    ledger: LedgerState,
    last: Option<PendingEvaluation>,
}

/// Last ranked evaluation and the cap month it was computed against.
#[derive(Debug, Clone)]
struct PendingEvaluation {
    month: MonthKey,
    recommendation: Recommendation,
}

/// Service composing the store, the engine and the period tracker.
///
/// All mutation happens under one lock so a commit is a single read-modify-write.
pub struct RewardService<S> {
    store: Arc<S>,
    engine: RewardEngine,
    book: Mutex<RewardBook>,
}

impl<S> RewardService<S>
where
    S: RewardStore + 'static,
{
    pub fn new(store: Arc<S>, settings: MilestoneSettings) -> Self {
        let book = RewardBook {
            registry: store.load_methods(),
            ledger: store.load_ledger(),
            last: None,
        };

        Self {
            store,
            engine: RewardEngine::new(settings),
            book: Mutex::new(book),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RewardBook> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply monthly and programme-year rollovers for `today`, persisting only on change.
    pub fn reconcile(&self, today: NaiveDate) -> PeriodRollover {
        let mut book = self.lock();
        self.reconcile_locked(&mut book, today)
    }

    fn reconcile_locked(&self, book: &mut RewardBook, today: NaiveDate) -> PeriodRollover {
        let rollover = reconcile_periods(&mut book.ledger, today);
        if rollover.changed() {
            book.last = None;
            self.persist_ledger(&book.ledger);
        }
        rollover
    }

    /// Rank every active route for `amount`. The result becomes the target of `commit`.
    pub fn evaluate(
        &self,
        amount: f64,
        brand: Option<&str>,
        today: NaiveDate,
    ) -> Result<Recommendation, RewardServiceError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RewardServiceError::InvalidAmount(amount));
        }

        let mut book = self.lock();
        self.reconcile_locked(&mut book, today);

        let candidates = self
            .engine
            .evaluate(amount, &book.registry, &book.ledger, today);
        let recommendation = Recommendation::rank(brand, amount, candidates);
        book.last = Some(PendingEvaluation {
            month: MonthKey::of(today),
            recommendation: recommendation.clone(),
        });
        Ok(recommendation)
    }

    /// Record that the candidate at `rank` of the last evaluation was actually used.
    ///
    /// Periods are reconciled for `today` first. An evaluation computed for another
    /// cap month is discarded rather than charged to the current one.
    pub fn commit(
        &self,
        rank: usize,
        today: NaiveDate,
    ) -> Result<CommitReceipt, RewardServiceError> {
        let mut book = self.lock();
        self.reconcile_locked(&mut book, today);

        let current_month = book.ledger.last_month;
        let pending = book
            .last
            .as_ref()
            .ok_or(RewardServiceError::NothingEvaluated)?;
        if Some(pending.month) != current_month {
            book.last = None;
            return Err(RewardServiceError::NothingEvaluated);
        }

        let candidate = pending
            .recommendation
            .candidates
            .get(rank)
            .cloned()
            .ok_or(RewardServiceError::NoSuchCandidate(rank))?;

        let cap = book
            .registry
            .get(&candidate.method_id)
            .map(|method| method.monthly_cap)
            .ok_or_else(|| RewardServiceError::UnknownMethod(candidate.method_id.clone()))?;

        let mut ledger = book.ledger.clone();
        apply_commit(&mut ledger, &candidate, cap);
        self.persist_ledger(&ledger);
        book.ledger = ledger;
        book.last = None;

        let receipt = CommitReceipt {
            method_id: candidate.method_id.clone(),
            reward_value: candidate.reward_value,
            used_this_cycle: book.ledger.used(&candidate.method_id),
            monthly_cap: cap,
            ytd_spend: book.ledger.milestone.ytd_spend,
        };

        info!(
            method = %receipt.method_id,
            reward = receipt.reward_value,
            cap_charge = candidate.cap_charge,
            used = receipt.used_this_cycle,
            "recorded route usage"
        );

        Ok(receipt)
    }

    pub fn methods(&self) -> Vec<RewardMethod> {
        self.lock().registry.methods().to_vec()
    }

    pub fn set_method_active(
        &self,
        id: &MethodId,
        active: bool,
    ) -> Result<RewardMethod, RewardServiceError> {
        let mut book = self.lock();
        if !book.registry.set_active(id, active) {
            return Err(RewardServiceError::UnknownMethod(id.clone()));
        }
        book.last = None;
        self.persist_methods(&book.registry);

        book.registry
            .get(id)
            .cloned()
            .ok_or_else(|| RewardServiceError::UnknownMethod(id.clone()))
    }

    /// Replace the whole route table, e.g. after a CSV import.
    pub fn replace_methods(&self, registry: MethodRegistry) {
        let mut book = self.lock();
        book.registry = registry;
        book.last = None;
        self.persist_methods(&book.registry);
    }

    /// Snapshot of cap usage and milestone progress after reconciling for `today`.
    pub fn status(&self, today: NaiveDate) -> LedgerStatus {
        let mut book = self.lock();
        self.reconcile_locked(&mut book, today);

        let routes = book
            .registry
            .methods()
            .iter()
            .map(|method| {
                let used = book.ledger.used(&method.id);
                RouteUsage {
                    method_id: method.id.clone(),
                    method_name: method.name.clone(),
                    active: method.active,
                    used_this_cycle: used,
                    monthly_cap: method.monthly_cap,
                    headroom: method
                        .is_capped()
                        .then(|| (method.monthly_cap - used).max(0.0)),
                }
            })
            .collect();

        let program = &book.ledger.milestone;
        LedgerStatus {
            month: book.ledger.last_month.map(|key| key.to_string()),
            routes,
            milestone: MilestoneProgress {
                year_start: program.year_start,
                year_end: program.year_end(),
                target_annual_spend: program.target_annual_spend,
                ytd_spend: program.ytd_spend,
                remaining: program.remaining_to_milestone(),
                ideal_ytd: ideal_ytd(program, today),
            },
        }
    }

    fn persist_ledger(&self, ledger: &LedgerState) {
        if let Err(err) = self.store.save_ledger(ledger) {
            warn!(error = %err, "failed to persist ledger; continuing with in-memory state");
        }
    }

    fn persist_methods(&self, registry: &MethodRegistry) {
        if let Err(err) = self.store.save_methods(registry) {
            warn!(error = %err, "failed to persist method table; continuing with in-memory state");
        }
    }
}

/// Cap usage grows by the cap-counted portion and never exceeds a positive cap;
/// the milestone route also accrues the full purchase amount.
pub(crate) fn apply_commit(ledger: &mut LedgerState, candidate: &EvaluatedCandidate, cap: f64) {
    let used = ledger
        .used_this_cycle
        .entry(candidate.method_id.clone())
        .or_insert(0.0);
    *used += candidate.cap_charge;
    if cap > 0.0 {
        *used = used.min(cap);
    }

    if candidate.kind == MethodKind::Milestone {
        ledger.milestone.ytd_spend += candidate.amount;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitReceipt {
    pub method_id: MethodId,
    pub reward_value: f64,
    pub used_this_cycle: f64,
    pub monthly_cap: f64,
    pub ytd_spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteUsage {
    pub method_id: MethodId,
    pub method_name: String,
    pub active: bool,
    pub used_this_cycle: f64,
    pub monthly_cap: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headroom: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneProgress {
    pub year_start: NaiveDate,
    pub year_end: NaiveDate,
    pub target_annual_spend: f64,
    pub ytd_spend: f64,
    pub remaining: f64,
    pub ideal_ytd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStatus {
    pub month: Option<String>,
    pub routes: Vec<RouteUsage>,
    pub milestone: MilestoneProgress,
}

/// Error raised by the reward service.
#[derive(Debug, thiserror::Error)]
pub enum RewardServiceError {
    #[error("Please enter a valid amount (got {0}).")]
    InvalidAmount(f64),
    #[error("no evaluation to record usage against")]
    NothingEvaluated,
    #[error("no candidate at rank {0} in the last evaluation")]
    NoSuchCandidate(usize),
    #[error("unknown reward method '{0}'")]
    UnknownMethod(MethodId),
}
