use chrono::NaiveDate;
use tracing::debug;

use super::domain::{EvaluatedCandidate, LedgerState, MethodKind, RewardMethod};
use super::milestone::{dynamic_percent, MilestoneSettings};
use super::registry::MethodRegistry;

/// Stateless evaluator applying rates, bonuses and monthly caps to each active route.
#[derive(Debug, Clone)]
pub struct RewardEngine {
    settings: MilestoneSettings,
}

impl RewardEngine {
    pub fn new(settings: MilestoneSettings) -> Self {
        Self { settings }
    }

    /// Candidates in registry order. Callers reject non-positive amounts first.
    pub fn evaluate(
        &self,
        amount: f64,
        registry: &MethodRegistry,
        ledger: &LedgerState,
        today: NaiveDate,
    ) -> Vec<EvaluatedCandidate> {
        let candidates: Vec<EvaluatedCandidate> = registry
            .active()
            .filter_map(|method| self.evaluate_method(amount, method, ledger, today))
            .collect();

        debug!(amount, candidates = candidates.len(), "evaluated routes");
        candidates
    }

    fn evaluate_method(
        &self,
        amount: f64,
        method: &RewardMethod,
        ledger: &LedgerState,
        today: NaiveDate,
    ) -> Option<EvaluatedCandidate> {
        let card_pct = match method.kind {
            MethodKind::Milestone => {
                dynamic_percent(amount, &ledger.milestone, &self.settings, today)
            }
            MethodKind::Fixed => method.card_reward_pct,
        };

        let non_card_pct = method.non_card_pct();
        let uncapped_pct = card_pct + non_card_pct;
        if uncapped_pct <= 0.0 {
            return None;
        }

        let card_reward = card_pct / 100.0 * amount;
        let non_card_reward = non_card_pct / 100.0 * amount;
        let outcome = apply_cap(method, ledger.used(&method.id), card_reward, non_card_reward);

        Some(EvaluatedCandidate {
            method_id: method.id.clone(),
            method_name: method.name.clone(),
            kind: method.kind,
            amount,
            card_pct,
            effective_pct: outcome.reward_value / amount * 100.0,
            reward_value: outcome.reward_value,
            cap_charge: outcome.cap_charge,
            capped: outcome.capped,
            utilisation_warning: method.utilisation_warning(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CapOutcome {
    reward_value: f64,
    cap_charge: f64,
    capped: bool,
}

/// The monthly cap limits the card-level reward only; voucher, portal and float
/// bonuses are paid on top whatever the headroom.
fn apply_cap(
    method: &RewardMethod,
    used: f64,
    card_reward: f64,
    non_card_reward: f64,
) -> CapOutcome {
    let (card_paid, capped) = if method.is_capped() {
        let headroom = (method.monthly_cap - used).max(0.0);
        if card_reward > headroom {
            (headroom, true)
        } else {
            (card_reward, false)
        }
    } else {
        (card_reward, false)
    };

    CapOutcome {
        reward_value: (card_paid + non_card_reward).max(0.0),
        cap_charge: card_paid.max(0.0),
        capped,
    }
}
