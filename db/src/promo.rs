use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::models::promo::PromoCode;

/// Counted redemption. The validity check and the increment are one
/// statement, so two concurrent redeems of the last remaining use cannot
/// both succeed.
pub async fn redeem<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    code: &str,
) -> Res<Option<PromoCode>> {
    sqlx::query_as::<_, PromoCode>(
        r#"
        UPDATE promo_codes
        SET current_uses = current_uses + 1
        WHERE code = $1
          AND active
          AND now() >= valid_from
          AND now() < valid_until
          AND current_uses < max_uses
        RETURNING *
        "#,
    )
    .bind(code)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
