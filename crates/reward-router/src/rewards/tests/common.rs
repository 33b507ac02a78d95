use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::rewards::domain::{LedgerState, MethodId, MethodKind, MilestoneProgram, RewardMethod};
use crate::rewards::registry::MethodRegistry;
use crate::rewards::service::RewardService;
use crate::rewards::store::{InMemoryRewardStore, RewardStore, StoreError};
use crate::rewards::{MilestoneSettings, RewardEngine};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Late enough in the 2025-08-02 programme year that 94,644 is behind pace.
pub(super) fn today() -> NaiveDate {
    date(2026, 6, 15)
}

pub(super) fn fixed_method(id: &str, card_pct: f64, monthly_cap: f64) -> RewardMethod {
    RewardMethod {
        id: MethodId::new(id),
        name: format!("{id} card"),
        active: true,
        kind: MethodKind::Fixed,
        card_reward_pct: card_pct,
        voucher_discount_pct: 0.0,
        portal_reward_pct: 0.0,
        float_benefit_pct: 0.0,
        monthly_cap,
        utilisation_limit_pct: 30.0,
        current_utilisation_pct: 10.0,
    }
}

pub(super) fn milestone_method(monthly_cap: f64) -> RewardMethod {
    RewardMethod {
        kind: MethodKind::Milestone,
        ..fixed_method("kiwi", 0.0, monthly_cap)
    }
}

pub(super) fn ledger(ytd_spend: f64) -> LedgerState {
    let mut program = MilestoneProgram::new(date(2025, 8, 2), 150_000.0);
    program.ytd_spend = ytd_spend;
    let mut ledger = LedgerState::new(program);
    ledger.last_month = Some(crate::rewards::MonthKey::of(today()));
    ledger
}

pub(super) fn engine() -> RewardEngine {
    RewardEngine::new(MilestoneSettings::default())
}

/// Uncapped milestone route followed by the three card buckets.
pub(super) fn registry() -> MethodRegistry {
    MethodRegistry::new(vec![
        milestone_method(0.0),
        fixed_method("sbi_10x", 2.5, 2_500.0),
        fixed_method("sbi_5x", 1.25, 2_500.0),
        fixed_method("sbi_1x", 0.25, 0.0),
    ])
}

pub(super) fn service_with(
    registry: MethodRegistry,
    ledger: LedgerState,
) -> (Arc<InMemoryRewardStore>, RewardService<InMemoryRewardStore>) {
    let store = Arc::new(InMemoryRewardStore::seeded(registry, ledger));
    let service = RewardService::new(store.clone(), MilestoneSettings::default());
    (store, service)
}

/// Serves a fixed table but refuses every write.
#[derive(Default)]
pub(super) struct ReadOnlyStore {
    pub(super) failed_writes: AtomicUsize,
}

impl ReadOnlyStore {
    pub(super) fn failures(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }
}

impl RewardStore for ReadOnlyStore {
    fn load_methods(&self) -> MethodRegistry {
        registry()
    }

    fn save_methods(&self, _registry: &MethodRegistry) -> Result<(), StoreError> {
        self.failed_writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    fn load_ledger(&self) -> LedgerState {
        ledger(0.0)
    }

    fn save_ledger(&self, _ledger: &LedgerState) -> Result<(), StoreError> {
        self.failed_writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("disk full".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
