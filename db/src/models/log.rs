use chrono::{DateTime, Utc};
use sqlx::types::{JsonValue, ipnetwork::IpNetwork};
use uuid::Uuid;

/// One row per handled request. Bodies are never persisted: tutor
/// messages are user content.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status_code: i32,
    pub user_id: Option<Uuid>,
    pub params: Option<JsonValue>,
    pub ip_address: IpNetwork,
    pub user_agent: String,
    pub latency_ms: i64,
}
