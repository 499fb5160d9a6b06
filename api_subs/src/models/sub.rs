use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::error::{AppError, Res};
use db::models::subscription::SubscriptionRow;

/// Subscription tier, totally ordered by entitlement rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
    Pro,
}

impl Plan {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Plan::Free),
            "premium" => Some(Plan::Premium),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
            Plan::Pro => "pro",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(BillingCycle::Monthly),
            "yearly" => Some(BillingCycle::Yearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }

    /// Length of one paid period in calendar months.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Yearly => 12,
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `PastDue` is written by billing integrations outside this core; it is
/// representable here and always evaluates unentitled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
    PastDue,
}

impl SubscriptionStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SubscriptionStatus::Active),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            "expired" => Some(SubscriptionStatus::Expired),
            "past_due" => Some(SubscriptionStatus::PastDue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::PastDue => "past_due",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory subscription model. Invariant: the three scheduled-change
/// fields are set together or cleared together.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub scheduled_plan: Option<Plan>,
    pub scheduled_billing_cycle: Option<BillingCycle>,
    pub scheduled_change_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Store-adapter translation. A row the store hands back with an
    /// unknown plan/status/cycle string is a corrupt record, not a client
    /// error.
    pub fn from_row(row: SubscriptionRow) -> Res<Self> {
        let plan = Plan::parse(&row.plan)
            .ok_or_else(|| AppError::Internal(format!("corrupt subscription plan: {}", row.plan)))?;
        let status = SubscriptionStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!("corrupt subscription status: {}", row.status))
        })?;
        let billing_cycle = BillingCycle::parse(&row.billing_cycle).ok_or_else(|| {
            AppError::Internal(format!("corrupt billing cycle: {}", row.billing_cycle))
        })?;
        let scheduled_plan = match &row.scheduled_plan {
            Some(value) => Some(Plan::parse(value).ok_or_else(|| {
                AppError::Internal(format!("corrupt scheduled plan: {}", value))
            })?),
            None => None,
        };
        let scheduled_billing_cycle = match &row.scheduled_billing_cycle {
            Some(value) => Some(BillingCycle::parse(value).ok_or_else(|| {
                AppError::Internal(format!("corrupt scheduled billing cycle: {}", value))
            })?),
            None => None,
        };

        Ok(Subscription {
            id: row.id,
            user_id: row.user_id,
            plan,
            status,
            billing_cycle,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            scheduled_plan,
            scheduled_billing_cycle,
            scheduled_change_date: row.scheduled_change_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    pub fn to_row(&self) -> SubscriptionRow {
        SubscriptionRow {
            id: self.id,
            user_id: self.user_id,
            plan: self.plan.as_str().to_string(),
            status: self.status.as_str().to_string(),
            billing_cycle: self.billing_cycle.as_str().to_string(),
            current_period_start: self.current_period_start,
            current_period_end: self.current_period_end,
            cancel_at_period_end: self.cancel_at_period_end,
            scheduled_plan: self.scheduled_plan.map(|p| p.as_str().to_string()),
            scheduled_billing_cycle: self.scheduled_billing_cycle.map(|c| c.as_str().to_string()),
            scheduled_change_date: self.scheduled_change_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_are_ordered_by_rank() {
        assert!(Plan::Free < Plan::Premium);
        assert!(Plan::Premium < Plan::Pro);
    }

    #[test]
    fn plan_parse_rejects_unknown_tier() {
        assert_eq!(Plan::parse("premium"), Some(Plan::Premium));
        assert_eq!(Plan::parse("enterprise"), None);
    }

    #[test]
    fn status_strings_roundtrip() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
            SubscriptionStatus::PastDue,
        ] {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), Some(status));
        }
    }
}
