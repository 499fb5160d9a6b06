use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::models::log::RequestLog;

pub async fn insert_log<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    log: RequestLog,
) -> Res<()> {
    sqlx::query(
        r#"
        INSERT INTO request_logs
            (timestamp, method, path, status_code, user_id, params, ip_address, user_agent, latency_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(log.timestamp)
    .bind(log.method)
    .bind(log.path)
    .bind(log.status_code)
    .bind(log.user_id)
    .bind(log.params)
    .bind(log.ip_address)
    .bind(log.user_agent)
    .bind(log.latency_ms)
    .execute(executor)
    .await
    .map(|_| ())
    .map_err(AppError::from)
}
