use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::domain::EvaluatedCandidate;

/// Number of candidates surfaced to the user.
pub const TOP_RESULTS: usize = 3;

const RANK_LABELS: [&str; TOP_RESULTS] = ["Best option", "Next best", "Third option"];

/// Ranked evaluation for one proposed purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub brand: String,
    pub amount: f64,
    pub candidates: Vec<EvaluatedCandidate>,
}

impl Recommendation {
    /// Stable sort by reward value, highest first; ties keep registry order.
    pub fn rank(brand: Option<&str>, amount: f64, mut candidates: Vec<EvaluatedCandidate>) -> Self {
        candidates.sort_by(|a, b| {
            b.reward_value
                .partial_cmp(&a.reward_value)
                .unwrap_or(Ordering::Equal)
        });

        let brand = brand
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("This brand")
            .to_string();

        Self {
            brand,
            amount,
            candidates,
        }
    }

    pub fn best(&self) -> Option<&EvaluatedCandidate> {
        self.candidates.first()
    }

    pub fn top(&self) -> &[EvaluatedCandidate] {
        let end = self.candidates.len().min(TOP_RESULTS);
        &self.candidates[..end]
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn views(&self) -> Vec<CandidateView> {
        self.top()
            .iter()
            .zip(RANK_LABELS)
            .enumerate()
            .map(|(rank, (candidate, label))| CandidateView {
                rank,
                label,
                method_id: candidate.method_id.to_string(),
                method_name: candidate.method_name.clone(),
                amount_display: format_money(candidate.amount),
                reward_value: candidate.reward_value,
                reward_display: format_money(candidate.reward_value),
                effective_pct: candidate.effective_pct,
                capped: candidate.capped,
                utilisation_warning: candidate.utilisation_warning,
            })
            .collect()
    }
}

/// Display shape for one of the top candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateView {
    pub rank: usize,
    pub label: &'static str,
    pub method_id: String,
    pub method_name: String,
    pub amount_display: String,
    pub reward_value: f64,
    pub reward_display: String,
    pub effective_pct: f64,
    pub capped: bool,
    pub utilisation_warning: bool,
}

impl CandidateView {
    pub fn notes(&self) -> Vec<&'static str> {
        let mut notes = Vec::new();
        if self.capped {
            notes.push("partially / fully capped");
        }
        if self.utilisation_warning {
            notes.push("utilisation at/above your limit");
        }
        notes
    }
}

/// Whole rupees with the currency sign, e.g. `₹2861`.
pub fn format_money(value: f64) -> String {
    format!("₹{:.0}", value)
}
