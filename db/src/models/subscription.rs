use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw subscription record as stored. Plan, status and billing cycle are
/// TEXT columns; the typed domain model lives in `api_subs` and owns the
/// conversion in both directions.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub billing_cycle: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub scheduled_plan: Option<String>,
    pub scheduled_billing_cycle: Option<String>,
    pub scheduled_change_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; id and the bookkeeping timestamps are store-assigned.
#[derive(Debug, Clone)]
pub struct NewSubscriptionRow {
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub billing_cycle: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}
