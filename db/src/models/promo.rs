use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub discount_percent: i32,
    pub active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub max_uses: i32,
    pub current_uses: i32,
    pub created_at: DateTime<Utc>,
}
