use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use sqlx::PgPool;

use common::{clock::Clock, error::AppError, http::Success, jwt::JwtClaims};

use crate::dtos::sub::{ChangePlanRequest, CurrentSubscriptionResponse, SubscriptionResponse};
use crate::models::sub::{BillingCycle, Plan};
use crate::services;

/// Retrieves the authenticated user's current subscription.
///
/// # Input
/// - `claims`: JWT claims identifying the user
///
/// # Output
/// - Success: `{ subscription: {...} | null }`; null means the user is
///   on the implicit free plan
#[get("/current")]
pub async fn get_current(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    clock: web::Data<Arc<dyn Clock>>,
) -> impl Responder {
    let subscription =
        services::lifecycle::current_subscription(&***pool, &***clock, claims.user_id).await?;

    Success::ok(CurrentSubscriptionResponse { subscription })
}

/// Creates, upgrades or schedules a downgrade of the user's subscription.
///
/// A strictly higher plan takes effect immediately and clears any pending
/// scheduled change or cancellation; a strictly lower plan is scheduled
/// for the end of the paid period; requesting the current plan is a 409.
///
/// # Input
/// - `claims`: JWT claims identifying the user
/// - `req`: JSON payload:
///   - `plan`: "premium" | "pro" ("free" only as a scheduled downgrade)
///   - `billing_cycle`: "monthly" | "yearly"
///
/// # Output
/// - Success: the updated (or newly created) subscription
/// - Error: 400 for an unknown plan/cycle, 409 for a same-plan request
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/sub/change-plan', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json',
///     'Authorization': `Bearer ${localStorage.getItem('authToken')}`
///   },
///   body: JSON.stringify({ plan: 'pro', billing_cycle: 'yearly' })
/// });
///
/// if (response.ok) {
///   const data = await response.json();
///   console.log('Now on plan:', data.subscription.plan);
/// }
/// ```
#[post("/change-plan")]
pub async fn post_change_plan(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<ChangePlanRequest>,
    pool: web::Data<Arc<PgPool>>,
    clock: web::Data<Arc<dyn Clock>>,
) -> impl Responder {
    let plan = Plan::parse(&req.plan)
        .ok_or_else(|| AppError::BadRequest(format!("invalid plan identifier: {}", req.plan)))?;
    let cycle = BillingCycle::parse(&req.billing_cycle).ok_or_else(|| {
        AppError::BadRequest(format!("invalid billing cycle: {}", req.billing_cycle))
    })?;

    let subscription =
        services::lifecycle::change_plan(&***pool, &***clock, claims.user_id, plan, cycle).await?;

    Success::ok(SubscriptionResponse { subscription })
}

/// Cancels the user's subscription with a grace period: access continues
/// until the end of the already-paid period.
///
/// # Output
/// - Success: the cancelled subscription (note `cancel_at_period_end`)
/// - Error: 404 without a subscription, 409 if already cancelled
#[post("/cancel")]
pub async fn post_cancel(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    clock: web::Data<Arc<dyn Clock>>,
) -> impl Responder {
    let subscription = services::lifecycle::cancel(&***pool, &***clock, claims.user_id).await?;

    Success::ok(SubscriptionResponse { subscription })
}

/// Drops a pending scheduled downgrade, keeping the current plan.
///
/// # Output
/// - Success: the subscription with the schedule cleared
/// - Error: 404 when nothing is scheduled
#[post("/cancel-scheduled-change")]
pub async fn post_cancel_scheduled_change(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    clock: web::Data<Arc<dyn Clock>>,
) -> impl Responder {
    let subscription =
        services::lifecycle::cancel_scheduled_change(&***pool, &***clock, claims.user_id).await?;

    Success::ok(SubscriptionResponse { subscription })
}
