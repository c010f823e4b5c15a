//! Plan catalogue: prices, subscription lengths and copilot allowances.

use crate::errors::AppError;

pub const CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanType {
    Basic,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingPeriod {
    Monthly,
    Yearly,
}

impl PlanType {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "basic" => Ok(PlanType::Basic),
            "premium" => Ok(PlanType::Premium),
            other => Err(AppError::Validation(format!("Invalid plan type '{other}'"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::Basic => "basic",
            PlanType::Premium => "premium",
        }
    }

    /// Number of copilot configurations the plan allows.
    pub fn max_copilots(self) -> i32 {
        match self {
            PlanType::Basic => 3,
            PlanType::Premium => 10,
        }
    }
}

impl BillingPeriod {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "monthly" => Ok(BillingPeriod::Monthly),
            "yearly" => Ok(BillingPeriod::Yearly),
            other => Err(AppError::Validation(format!(
                "Invalid billing period '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "monthly",
            BillingPeriod::Yearly => "yearly",
        }
    }

    pub fn days(self) -> i64 {
        match self {
            BillingPeriod::Monthly => 30,
            BillingPeriod::Yearly => 365,
        }
    }
}

/// Price in whole dollars.
pub fn price(plan: PlanType, period: BillingPeriod) -> i32 {
    match (plan, period) {
        (PlanType::Basic, BillingPeriod::Monthly) => 99,
        (PlanType::Basic, BillingPeriod::Yearly) => 990,
        (PlanType::Premium, BillingPeriod::Monthly) => 199,
        (PlanType::Premium, BillingPeriod::Yearly) => 1990,
    }
}

/// The gateway bills in the smallest currency unit.
pub fn to_cents(amount: i32) -> i64 {
    amount as i64 * 100
}
