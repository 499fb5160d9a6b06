use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::subscription::{NewSubscriptionRow, SubscriptionRow};

/// Latest record wins: the store retains full history per user, the core
/// only ever reads the most recent record by creation time.
pub async fn latest_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<SubscriptionRow>> {
    sqlx::query_as::<_, SubscriptionRow>(
        "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Same as [`latest_by_user`] but takes the row lock, serializing
/// concurrent read-modify-write transactions on the same user.
pub async fn latest_by_user_for_update<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<SubscriptionRow>> {
    sqlx::query_as::<_, SubscriptionRow>(
        "SELECT * FROM subscriptions WHERE user_id = $1 \
         ORDER BY created_at DESC LIMIT 1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: NewSubscriptionRow,
) -> Res<SubscriptionRow> {
    sqlx::query_as::<_, SubscriptionRow>(
        r#"
        INSERT INTO subscriptions
            (user_id, plan, status, billing_cycle, current_period_start, current_period_end)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.plan)
    .bind(data.status)
    .bind(data.billing_cycle)
    .bind(data.current_period_start)
    .bind(data.current_period_end)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Writes every mutable field back in one statement so a transition is
/// either fully applied or not at all.
pub async fn update<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    row: &SubscriptionRow,
) -> Res<SubscriptionRow> {
    sqlx::query_as::<_, SubscriptionRow>(
        r#"
        UPDATE subscriptions SET
            plan = $2,
            status = $3,
            billing_cycle = $4,
            current_period_start = $5,
            current_period_end = $6,
            cancel_at_period_end = $7,
            scheduled_plan = $8,
            scheduled_billing_cycle = $9,
            scheduled_change_date = $10,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(row.id)
    .bind(&row.plan)
    .bind(&row.status)
    .bind(&row.billing_cycle)
    .bind(row.current_period_start)
    .bind(row.current_period_end)
    .bind(row.cancel_at_period_end)
    .bind(&row.scheduled_plan)
    .bind(&row.scheduled_billing_cycle)
    .bind(row.scheduled_change_date)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}
