use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use common::{
    clock::Clock,
    error::{AppError, Res},
};
use db::models::subscription::NewSubscriptionRow;

use crate::models::sub::{BillingCycle, Plan, Subscription, SubscriptionStatus};
use crate::services::transitions::{self, PlanChange};

/// Gets the user's current subscription, applying any due period
/// rollover first so callers never observe a stale plan.
/// Returns None if the user has never subscribed or their last term has
/// expired (implicitly free).
pub async fn current_subscription(
    pool: &PgPool,
    clock: &dyn Clock,
    user_id: Uuid,
) -> Res<Option<Subscription>> {
    let Some(row) = db::subscription::latest_by_user(pool, user_id).await? else {
        return Ok(None);
    };
    let mut sub = Subscription::from_row(row)?;

    if transitions::rollover_due(&sub, clock.now()) {
        sub = persist_rollover(pool, clock, user_id).await?.unwrap_or(sub);
    }

    if sub.status == SubscriptionStatus::Expired {
        return Ok(None);
    }
    Ok(Some(sub))
}

/// Re-reads the record under the row lock and writes the rolled-over
/// state, so two concurrent readers at a period boundary cannot both
/// apply the transition.
async fn persist_rollover(
    pool: &PgPool,
    clock: &dyn Clock,
    user_id: Uuid,
) -> Res<Option<Subscription>> {
    let mut tx = pool.begin().await?;

    let Some(row) = db::subscription::latest_by_user_for_update(&mut *tx, user_id).await? else {
        return Ok(None);
    };
    let mut sub = Subscription::from_row(row)?;

    if transitions::apply_rollover(&mut sub, clock.now()) {
        log::info!(
            "rolling over subscription {} for user {}: now {} ({})",
            sub.id,
            user_id,
            sub.plan,
            sub.status
        );
        let updated = db::subscription::update(&mut *tx, &sub.to_row()).await?;
        sub = Subscription::from_row(updated)?;
    }
    tx.commit().await?;

    Ok(Some(sub))
}

/// Creates, upgrades or schedules a downgrade depending on where the
/// requested plan sits relative to the one currently held. The whole
/// decision runs inside one row-locked transaction, so a concurrent
/// upgrade and cancel cannot interleave.
pub async fn change_plan(
    pool: &PgPool,
    clock: &dyn Clock,
    user_id: Uuid,
    plan: Plan,
    cycle: BillingCycle,
) -> Res<Subscription> {
    let now = clock.now();
    let mut tx = pool.begin().await?;

    let current = match db::subscription::latest_by_user_for_update(&mut *tx, user_id).await? {
        Some(row) => {
            let mut sub = Subscription::from_row(row)?;
            transitions::apply_rollover(&mut sub, now);
            Some(sub)
        }
        None => None,
    };

    let result = match current {
        Some(mut sub) if sub.status != SubscriptionStatus::Expired => {
            match transitions::classify_change(sub.plan, plan) {
                PlanChange::Upgrade => transitions::apply_upgrade(&mut sub, plan, cycle, now)?,
                PlanChange::Downgrade => transitions::schedule_downgrade(&mut sub, plan, cycle)?,
                PlanChange::SamePlan => {
                    return Err(AppError::InvalidTransition(format!(
                        "already on the {} plan",
                        plan
                    )));
                }
            }
            let row = db::subscription::update(&mut *tx, &sub.to_row()).await?;
            Subscription::from_row(row)?
        }
        // never subscribed, or the last term expired: a free → paid event
        _ => {
            if plan == Plan::Free {
                return Err(AppError::InvalidTransition(
                    "already on the free plan".to_string(),
                ));
            }
            let fresh = transitions::new_subscription(user_id, plan, cycle, now);
            let row = db::subscription::insert(&mut *tx, new_row(&fresh)).await?;
            Subscription::from_row(row)?
        }
    };

    tx.commit().await?;
    log::info!(
        "subscription {} for user {}: plan {} ({}), scheduled {:?}",
        result.id,
        user_id,
        result.plan,
        result.billing_cycle,
        result.scheduled_plan
    );
    Ok(result)
}

/// Grace-period cancellation: status flips to cancelled, access runs
/// until the period end.
pub async fn cancel(pool: &PgPool, clock: &dyn Clock, user_id: Uuid) -> Res<Subscription> {
    with_active_subscription(pool, clock, user_id, "no subscription to cancel", |sub| {
        transitions::cancel(sub)
    })
    .await
}

/// Drops a pending downgrade, leaving the current plan untouched.
pub async fn cancel_scheduled_change(
    pool: &PgPool,
    clock: &dyn Clock,
    user_id: Uuid,
) -> Res<Subscription> {
    with_active_subscription(pool, clock, user_id, "no scheduled change", |sub| {
        transitions::cancel_scheduled_change(sub)
    })
    .await
}

/// Row-locked read-modify-write: read the latest record for update, roll
/// it over, apply the transition, write everything back. An error from
/// the transition aborts the transaction, leaving the previous state
/// intact.
async fn with_active_subscription<F>(
    pool: &PgPool,
    clock: &dyn Clock,
    user_id: Uuid,
    missing: &str,
    transition: F,
) -> Res<Subscription>
where
    F: FnOnce(&mut Subscription) -> Res<()>,
{
    let now: DateTime<Utc> = clock.now();
    let mut tx = pool.begin().await?;

    let Some(row) = db::subscription::latest_by_user_for_update(&mut *tx, user_id).await? else {
        return Err(AppError::NotFound(missing.to_string()));
    };
    let mut sub = Subscription::from_row(row)?;
    let rolled = transitions::apply_rollover(&mut sub, now);
    if sub.status == SubscriptionStatus::Expired {
        return Err(AppError::NotFound(missing.to_string()));
    }

    transition(&mut sub)?;

    let row = db::subscription::update(&mut *tx, &sub.to_row()).await?;
    let sub = Subscription::from_row(row)?;
    tx.commit().await?;

    if rolled {
        log::debug!("rollover applied for user {} during mutation", user_id);
    }
    Ok(sub)
}

fn new_row(sub: &Subscription) -> NewSubscriptionRow {
    NewSubscriptionRow {
        user_id: sub.user_id,
        plan: sub.plan.as_str().to_string(),
        status: sub.status.as_str().to_string(),
        billing_cycle: sub.billing_cycle.as_str().to_string(),
        current_period_start: sub.current_period_start,
        current_period_end: sub.current_period_end,
    }
}
