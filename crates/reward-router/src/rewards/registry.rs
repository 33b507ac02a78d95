use serde::{Deserialize, Serialize};

use super::domain::{MethodId, MethodKind, RewardMethod};

/// Ordered collection of configured routes. Order is significant: it breaks ranking ties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodRegistry {
    methods: Vec<RewardMethod>,
}

impl MethodRegistry {
    pub fn new(methods: Vec<RewardMethod>) -> Self {
        Self { methods }
    }

    /// Built-in routes used when nothing has been persisted yet.
    pub fn standard() -> Self {
        Self::new(vec![
            RewardMethod {
                id: MethodId::new("kiwi_neon"),
                name: "Kiwi UPI (Neon) – eligible spends".to_string(),
                active: true,
                kind: MethodKind::Milestone,
                card_reward_pct: 0.0,
                voucher_discount_pct: 0.0,
                portal_reward_pct: 0.0,
                float_benefit_pct: 0.0,
                monthly_cap: 1_800.0,
                utilisation_limit_pct: 30.0,
                current_utilisation_pct: 15.0,
            },
            fixed_route(
                "sbi_10x_online",
                "SBI SimplyCLICK – 10X online / SimplyCLICK GyFTR",
                2.5,
                2_500.0,
            ),
            fixed_route(
                "sbi_5x_online",
                "SBI SimplyCLICK – 5X other online (incl. SBI Card GyFTR)",
                1.25,
                2_500.0,
            ),
            fixed_route(
                "sbi_1x_offline",
                "SBI SimplyCLICK – 1X offline / other",
                0.25,
                0.0,
            ),
        ])
    }

    pub fn methods(&self) -> &[RewardMethod] {
        &self.methods
    }

    pub fn active(&self) -> impl Iterator<Item = &RewardMethod> {
        self.methods.iter().filter(|method| method.active)
    }

    pub fn get(&self, id: &MethodId) -> Option<&RewardMethod> {
        self.methods.iter().find(|method| &method.id == id)
    }

    /// Returns `false` when no route carries `id`.
    pub fn set_active(&mut self, id: &MethodId, active: bool) -> bool {
        match self.methods.iter_mut().find(|method| &method.id == id) {
            Some(method) => {
                method.active = active;
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }
}

fn fixed_route(id: &str, name: &str, card_reward_pct: f64, monthly_cap: f64) -> RewardMethod {
    RewardMethod {
        id: MethodId::new(id),
        name: name.to_string(),
        active: true,
        kind: MethodKind::Fixed,
        card_reward_pct,
        voucher_discount_pct: 0.0,
        portal_reward_pct: 0.0,
        float_benefit_pct: 0.0,
        monthly_cap,
        utilisation_limit_pct: 30.0,
        current_utilisation_pct: 10.0,
    }
}
