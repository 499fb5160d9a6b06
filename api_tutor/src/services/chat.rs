use sqlx::PgPool;
use uuid::Uuid;

use api_subs::models::sub::Plan;
use api_subs::services::lifecycle;
use common::{
    clock::Clock,
    error::{AppError, Res},
};
use gate::{
    entitlement,
    history::{ChatRole, ChatTurn, ConversationStore},
    rate_limit::SlidingWindowLimiter,
};

use crate::services::provider::TutorClient;

/// The gated tutor request: subscription snapshot, entitlement, rate
/// limit, then the provider call with the bounded window as context.
///
/// Entitlement is evaluated fresh on every call; period boundaries move
/// with the clock, so a cached answer would be wrong. The provider await
/// is the only slow step and sits outside every lock.
pub async fn ask(
    pool: &PgPool,
    clock: &dyn Clock,
    limiter: &SlidingWindowLimiter,
    history: &ConversationStore,
    tutor: &TutorClient,
    required_plan: Plan,
    user_id: Uuid,
    message: String,
) -> Res<String> {
    let sub = lifecycle::current_subscription(pool, clock, user_id).await?;
    if !entitlement::is_entitled(sub.as_ref(), required_plan, clock.now()) {
        return Err(AppError::Forbidden(format!(
            "an active {} subscription is required for the AI tutor",
            required_plan
        )));
    }

    if !limiter.allow(user_id) {
        return Err(AppError::TooManyRequests(
            "tutor request limit reached, try again in a minute".to_string(),
        ));
    }

    let mut turns = history.history(user_id);
    turns.push(ChatTurn {
        role: ChatRole::User,
        content: message.clone(),
    });

    let reply = tutor.complete(&turns).await?;

    // recorded only after the provider answers, so a failed call does
    // not leave a one-sided exchange in the window
    history.append(user_id, ChatRole::User, message);
    history.append(user_id, ChatRole::Assistant, reply.clone());

    Ok(reply)
}
