//! Route recommendation: rates, monthly caps, milestone pacing and usage commits.

pub mod domain;
mod engine;
pub mod import;
pub mod milestone;
mod period;
pub mod ranking;
pub mod registry;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    EvaluatedCandidate, LedgerState, MethodId, MethodKind, MilestoneProgram, MonthKey,
    RewardMethod,
};
pub use engine::RewardEngine;
pub use import::{MethodImportError, MethodTableCsv};
pub use milestone::{dynamic_percent, MilestoneSettings};
pub use period::{reconcile_periods, PeriodRollover};
pub use ranking::{format_money, CandidateView, Recommendation, TOP_RESULTS};
pub use registry::MethodRegistry;
pub use router::reward_router;
pub use service::{
    CommitReceipt, LedgerStatus, MilestoneProgress, RewardService, RewardServiceError,
    RouteUsage,
};
pub use store::{InMemoryRewardStore, JsonFileStore, RewardStore, StoreError};
