//! Plan catalog: the fixed price/validity tiers selectable at purchase time.
//!
//! A plan's amount in minor currency units doubles as the free/paid signal:
//! `amount_minor_units == 0` means no payment step. The lifecycle branches on
//! that encoding, not on a separate flag.

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub id: i64,
    pub display_name: &'static str,
    /// Price in the smallest currency unit (paise).
    pub amount_minor_units: i64,
    pub validity_days: i64,
}

const PLANS: [Plan; 4] = [
    Plan {
        id: 0,
        display_name: "Free Trial Plan 0",
        amount_minor_units: 0,
        validity_days: 7,
    },
    Plan {
        id: 1,
        display_name: "Basic Plan 1",
        amount_minor_units: 50_000,
        validity_days: 30,
    },
    Plan {
        id: 2,
        display_name: "Premium Plan 2",
        amount_minor_units: 100_000,
        validity_days: 90,
    },
    Plan {
        id: 3,
        display_name: "Enterprise Plan 3",
        amount_minor_units: 200_000,
        validity_days: 365,
    },
];

#[derive(Clone, Copy, Default)]
pub struct PlanCatalog;

impl PlanCatalog {
    pub fn lookup(&self, plan_id: i64) -> Result<&'static Plan> {
        PLANS
            .iter()
            .find(|p| p.id == plan_id)
            .ok_or(AppError::UnknownPlan(plan_id))
    }
}
