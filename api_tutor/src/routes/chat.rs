use std::sync::Arc;

use actix_web::{Responder, delete, get, post, web};
use sqlx::PgPool;

use api_subs::models::sub::Plan;
use common::{
    clock::Clock,
    env_config::Config,
    error::AppError,
    http::Success,
    jwt::JwtClaims,
};
use gate::{history::ConversationStore, rate_limit::SlidingWindowLimiter};

use crate::dtos::chat::{AskRequest, AskResponse, HistoryResponse};
use crate::services::{self, provider::TutorClient};

/// Asks the AI tutor a question. The request passes the entitlement and
/// rate-limit gate before the provider is ever contacted.
///
/// # Input
/// - `claims`: JWT claims identifying the user
/// - `req`: JSON payload with a non-empty `message`
///
/// # Output
/// - Success: `{ reply }` with the assistant's answer
/// - Error: 403 without the required plan, 429 over the per-minute quota
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/tutor/ask', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json',
///     'Authorization': `Bearer ${localStorage.getItem('authToken')}`
///   },
///   body: JSON.stringify({ message: 'Explain the chain rule' })
/// });
///
/// if (response.ok) {
///   const data = await response.json();
///   console.log('Tutor:', data.reply);
/// } else if (response.status === 429) {
///   // ask the user to slow down
/// }
/// ```
#[post("/ask")]
pub async fn post_ask(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<AskRequest>,
    pool: web::Data<Arc<PgPool>>,
    clock: web::Data<Arc<dyn Clock>>,
    limiter: web::Data<SlidingWindowLimiter>,
    history: web::Data<ConversationStore>,
    tutor: web::Data<TutorClient>,
    config: web::Data<Arc<Config>>,
) -> impl Responder {
    let message = req.into_inner().message;
    if message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let required_plan = Plan::parse(&config.gate.required_plan).ok_or_else(|| {
        AppError::Internal(format!(
            "invalid TUTOR_REQUIRED_PLAN: {}",
            config.gate.required_plan
        ))
    })?;

    let reply = services::chat::ask(
        &***pool,
        &***clock,
        &**limiter,
        &**history,
        &**tutor,
        required_plan,
        claims.user_id,
        message,
    )
    .await?;

    Success::ok(AskResponse { reply })
}

/// Returns the user's current conversation window, oldest turn first.
#[get("/history")]
pub async fn get_history(
    claims: web::ReqData<JwtClaims>,
    history: web::Data<ConversationStore>,
) -> impl Responder {
    Success::ok(HistoryResponse {
        turns: history.history(claims.user_id),
    })
}

/// Clears the user's conversation window.
#[delete("/history")]
pub async fn delete_history(
    claims: web::ReqData<JwtClaims>,
    history: web::Data<ConversationStore>,
) -> impl Responder {
    history.clear(claims.user_id);
    Success::ok(serde_json::json!({ "cleared": true }))
}
