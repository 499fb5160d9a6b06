use std::sync::Arc;

use actix_web::{Responder, post, web};
use sqlx::PgPool;

use common::{error::AppError, http::Success, jwt::JwtClaims};

use crate::dtos::sub::{PromoRedeemRequest, PromoRedeemResponse};

/// Redeems a promo code. Validity (active, within dates, under the usage
/// cap) and the redemption count are settled in a single atomic update,
/// so the last remaining use cannot be redeemed twice.
///
/// # Output
/// - Success: the discount and how many uses remain
/// - Error: 400 for an invalid, expired or exhausted code
#[post("/redeem")]
pub async fn post_redeem(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<PromoRedeemRequest>,
    pool: web::Data<Arc<PgPool>>,
) -> impl Responder {
    let promo = db::promo::redeem(&***pool, &req.code)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("invalid, expired or exhausted promo code".to_string())
        })?;

    log::info!("promo code {} redeemed by user {}", promo.code, claims.user_id);

    Success::ok(PromoRedeemResponse {
        code: promo.code,
        discount_percent: promo.discount_percent,
        remaining_uses: promo.max_uses - promo.current_uses,
    })
}
