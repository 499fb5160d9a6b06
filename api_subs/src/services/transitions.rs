use chrono::{DateTime, Months, Utc};
use uuid::Uuid;

use common::error::{AppError, Res};

use crate::models::sub::{BillingCycle, Plan, Subscription, SubscriptionStatus};

/// How a requested plan relates to the plan currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanChange {
    Upgrade,
    Downgrade,
    SamePlan,
}

pub fn classify_change(current: Plan, requested: Plan) -> PlanChange {
    if requested > current {
        PlanChange::Upgrade
    } else if requested < current {
        PlanChange::Downgrade
    } else {
        PlanChange::SamePlan
    }
}

/// End of a paid period opened at `start`: one calendar month or year out.
pub fn period_end(start: DateTime<Utc>, cycle: BillingCycle) -> DateTime<Utc> {
    start
        .checked_add_months(Months::new(cycle.months()))
        .expect("valid period end")
}

/// Fresh record for a free → paid transition. The id and bookkeeping
/// timestamps are placeholders until the store assigns them.
pub fn new_subscription(
    user_id: Uuid,
    plan: Plan,
    cycle: BillingCycle,
    now: DateTime<Utc>,
) -> Subscription {
    Subscription {
        id: Uuid::nil(),
        user_id,
        plan,
        status: SubscriptionStatus::Active,
        billing_cycle: cycle,
        current_period_start: now,
        current_period_end: period_end(now, cycle),
        cancel_at_period_end: false,
        scheduled_plan: None,
        scheduled_billing_cycle: None,
        scheduled_change_date: None,
        created_at: now,
        updated_at: now,
    }
}

fn clear_schedule(sub: &mut Subscription) {
    sub.scheduled_plan = None;
    sub.scheduled_billing_cycle = None;
    sub.scheduled_change_date = None;
}

/// Immediate move to a strictly higher tier. The user's explicit
/// higher-tier intent supersedes any pending downgrade or cancellation,
/// so both are cleared. A new period opens at `now` since the billing
/// cycle itself may change.
pub fn apply_upgrade(
    sub: &mut Subscription,
    plan: Plan,
    cycle: BillingCycle,
    now: DateTime<Utc>,
) -> Res<()> {
    if classify_change(sub.plan, plan) != PlanChange::Upgrade {
        return Err(AppError::InvalidTransition(format!(
            "{} is not an upgrade from {}",
            plan, sub.plan
        )));
    }

    sub.plan = plan;
    sub.billing_cycle = cycle;
    sub.status = SubscriptionStatus::Active;
    sub.current_period_start = now;
    sub.current_period_end = period_end(now, cycle);
    sub.cancel_at_period_end = false;
    clear_schedule(sub);
    Ok(())
}

/// Deferred move to a strictly lower tier. The paid-for plan stays usable
/// through the end of the current period; only the schedule changes.
pub fn schedule_downgrade(sub: &mut Subscription, plan: Plan, cycle: BillingCycle) -> Res<()> {
    if classify_change(sub.plan, plan) != PlanChange::Downgrade {
        return Err(AppError::InvalidTransition(format!(
            "{} is not a downgrade from {}",
            plan, sub.plan
        )));
    }
    if sub.status == SubscriptionStatus::Cancelled {
        // already leaving at the period end; only an upgrade reactivates
        return Err(AppError::InvalidTransition(
            "subscription is already cancelled".to_string(),
        ));
    }

    sub.scheduled_plan = Some(plan);
    sub.scheduled_billing_cycle = Some(cycle);
    sub.scheduled_change_date = Some(sub.current_period_end);
    Ok(())
}

pub fn cancel_scheduled_change(sub: &mut Subscription) -> Res<()> {
    if sub.scheduled_plan.is_none() {
        return Err(AppError::NotFound("no scheduled change".to_string()));
    }

    clear_schedule(sub);
    Ok(())
}

/// Grace-period cancellation: access continues until the period end.
pub fn cancel(sub: &mut Subscription) -> Res<()> {
    if sub.plan == Plan::Free {
        return Err(AppError::InvalidTransition(
            "the free plan has nothing to cancel".to_string(),
        ));
    }
    if sub.status == SubscriptionStatus::Cancelled {
        return Err(AppError::InvalidTransition(
            "subscription is already cancelled".to_string(),
        ));
    }

    sub.status = SubscriptionStatus::Cancelled;
    sub.cancel_at_period_end = true;
    Ok(())
}

/// True when a read at `now` would observe a different subscription than
/// the stored one.
pub fn rollover_due(sub: &Subscription, now: DateTime<Utc>) -> bool {
    if sub.status == SubscriptionStatus::Expired {
        return false;
    }
    if let Some(change_date) = sub.scheduled_change_date {
        return now >= change_date;
    }
    sub.cancel_at_period_end && now >= sub.current_period_end
}

/// Lazy period rollover. A due scheduled change takes effect (fresh
/// period anchored at the change date); failing that, a cancellation
/// whose period has lapsed expires the record. Returns whether anything
/// changed.
pub fn apply_rollover(sub: &mut Subscription, now: DateTime<Utc>) -> bool {
    if !rollover_due(sub, now) {
        return false;
    }

    if let Some(change_date) = sub.scheduled_change_date {
        let plan = sub.scheduled_plan.expect("schedule fields are set together");
        let cycle = sub
            .scheduled_billing_cycle
            .expect("schedule fields are set together");

        sub.plan = plan;
        sub.billing_cycle = cycle;
        sub.status = SubscriptionStatus::Active;
        sub.current_period_start = change_date;
        sub.current_period_end = period_end(change_date, cycle);
        sub.cancel_at_period_end = false;
        clear_schedule(sub);
    } else {
        // lapsed cancellation: the term is over; the record is kept for
        // billing history and the read path reports it as no subscription
        sub.status = SubscriptionStatus::Expired;
        clear_schedule(sub);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn premium_monthly(now: DateTime<Utc>) -> Subscription {
        new_subscription(Uuid::new_v4(), Plan::Premium, BillingCycle::Monthly, now)
    }

    #[test]
    fn create_opens_a_monthly_period() {
        let now = base_time();
        let sub = premium_monthly(now);

        assert_eq!(sub.plan, Plan::Premium);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_start, now);
        assert_eq!(
            sub.current_period_end,
            Utc.with_ymd_and_hms(2025, 2, 15, 12, 0, 0).unwrap()
        );
        assert!(sub.scheduled_plan.is_none());
        assert!(!sub.cancel_at_period_end);
    }

    #[test]
    fn yearly_period_spans_a_year() {
        let now = base_time();
        let end = period_end(now, BillingCycle::Yearly);
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn upgrade_is_immediate_and_clears_pending_state() {
        let now = base_time();
        let mut sub = premium_monthly(now);
        schedule_downgrade(&mut sub, Plan::Free, BillingCycle::Monthly).unwrap();
        sub.cancel_at_period_end = true;

        let later = now + Duration::days(3);
        apply_upgrade(&mut sub, Plan::Pro, BillingCycle::Yearly, later).unwrap();

        assert_eq!(sub.plan, Plan::Pro);
        assert_eq!(sub.billing_cycle, BillingCycle::Yearly);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_start, later);
        assert!(sub.scheduled_plan.is_none());
        assert!(sub.scheduled_change_date.is_none());
        assert!(!sub.cancel_at_period_end);
    }

    #[test]
    fn upgrade_reactivates_a_cancelled_subscription() {
        let now = base_time();
        let mut sub = premium_monthly(now);
        cancel(&mut sub).unwrap();

        apply_upgrade(&mut sub, Plan::Pro, BillingCycle::Monthly, now).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(!sub.cancel_at_period_end);
    }

    #[test]
    fn upgrade_to_equal_or_lower_tier_is_rejected() {
        let now = base_time();
        let mut sub = premium_monthly(now);

        let same = apply_upgrade(&mut sub, Plan::Premium, BillingCycle::Yearly, now);
        assert!(matches!(same, Err(AppError::InvalidTransition(_))));

        let lower = apply_upgrade(&mut sub, Plan::Free, BillingCycle::Monthly, now);
        assert!(matches!(lower, Err(AppError::InvalidTransition(_))));
    }

    #[test]
    fn downgrade_does_not_touch_the_current_plan() {
        let now = base_time();
        let mut sub = new_subscription(Uuid::new_v4(), Plan::Pro, BillingCycle::Yearly, now);
        let plan_before = sub.plan;

        schedule_downgrade(&mut sub, Plan::Premium, BillingCycle::Monthly).unwrap();

        assert_eq!(sub.plan, plan_before);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.scheduled_plan, Some(Plan::Premium));
        assert_eq!(sub.scheduled_billing_cycle, Some(BillingCycle::Monthly));
        assert_eq!(sub.scheduled_change_date, Some(sub.current_period_end));
    }

    #[test]
    fn a_second_downgrade_replaces_the_schedule() {
        let now = base_time();
        let mut sub = new_subscription(Uuid::new_v4(), Plan::Pro, BillingCycle::Yearly, now);

        schedule_downgrade(&mut sub, Plan::Premium, BillingCycle::Monthly).unwrap();
        schedule_downgrade(&mut sub, Plan::Free, BillingCycle::Monthly).unwrap();

        assert_eq!(sub.scheduled_plan, Some(Plan::Free));
    }

    #[test]
    fn cancel_keeps_grace_until_period_end() {
        let now = base_time();
        let mut sub = premium_monthly(now);

        cancel(&mut sub).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.cancel_at_period_end);
        // the paid-for plan is untouched through the grace period
        assert_eq!(sub.plan, Plan::Premium);
    }

    #[test]
    fn cancel_twice_is_rejected() {
        let now = base_time();
        let mut sub = premium_monthly(now);
        cancel(&mut sub).unwrap();

        assert!(matches!(
            cancel(&mut sub),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn cancel_on_free_is_rejected() {
        let now = base_time();
        let mut sub = new_subscription(Uuid::new_v4(), Plan::Free, BillingCycle::Monthly, now);

        assert!(matches!(
            cancel(&mut sub),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn downgrade_after_cancel_is_rejected() {
        let now = base_time();
        let mut sub = new_subscription(Uuid::new_v4(), Plan::Pro, BillingCycle::Monthly, now);
        cancel(&mut sub).unwrap();

        assert!(matches!(
            schedule_downgrade(&mut sub, Plan::Premium, BillingCycle::Monthly),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn cancel_retains_a_pending_schedule() {
        let now = base_time();
        let mut sub = new_subscription(Uuid::new_v4(), Plan::Pro, BillingCycle::Monthly, now);
        schedule_downgrade(&mut sub, Plan::Premium, BillingCycle::Monthly).unwrap();

        cancel(&mut sub).unwrap();

        assert_eq!(sub.scheduled_plan, Some(Plan::Premium));
    }

    #[test]
    fn cancel_scheduled_change_is_reported_not_repeated() {
        let now = base_time();
        let mut sub = new_subscription(Uuid::new_v4(), Plan::Pro, BillingCycle::Yearly, now);
        schedule_downgrade(&mut sub, Plan::Premium, BillingCycle::Monthly).unwrap();

        cancel_scheduled_change(&mut sub).unwrap();
        assert!(sub.scheduled_plan.is_none());
        assert!(sub.scheduled_change_date.is_none());
        assert_eq!(sub.plan, Plan::Pro);

        // second call finds nothing scheduled; a no-op, not a fault
        assert!(matches!(
            cancel_scheduled_change(&mut sub),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn rollover_is_a_noop_before_the_change_date() {
        let now = base_time();
        let mut sub = premium_monthly(now);
        schedule_downgrade(&mut sub, Plan::Free, BillingCycle::Monthly).unwrap();

        assert!(!rollover_due(&sub, now + Duration::days(10)));
        assert!(!apply_rollover(&mut sub, now + Duration::days(10)));
        assert_eq!(sub.plan, Plan::Premium);
    }

    #[test]
    fn rollover_applies_a_due_schedule() {
        let now = base_time();
        let mut sub = new_subscription(Uuid::new_v4(), Plan::Pro, BillingCycle::Monthly, now);
        schedule_downgrade(&mut sub, Plan::Premium, BillingCycle::Monthly).unwrap();
        let change_date = sub.scheduled_change_date.unwrap();

        assert!(apply_rollover(&mut sub, change_date + Duration::hours(1)));

        assert_eq!(sub.plan, Plan::Premium);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_start, change_date);
        assert_eq!(
            sub.current_period_end,
            period_end(change_date, BillingCycle::Monthly)
        );
        assert!(sub.scheduled_plan.is_none());
        assert!(!sub.cancel_at_period_end);
    }

    #[test]
    fn rollover_expires_a_lapsed_cancellation() {
        let now = base_time();
        let mut sub = premium_monthly(now);
        cancel(&mut sub).unwrap();

        // still in grace just before the period end
        assert!(!rollover_due(&sub, sub.current_period_end - Duration::seconds(1)));

        let after_end = sub.current_period_end + Duration::seconds(1);
        assert!(apply_rollover(&mut sub, after_end));
        assert_eq!(sub.status, SubscriptionStatus::Expired);
        assert!(sub.scheduled_plan.is_none());

        // terminal: a later rollover finds nothing to do
        assert!(!apply_rollover(&mut sub, after_end + Duration::days(30)));
    }

    #[test]
    fn plan_change_lifecycle_scenario() {
        let now = base_time();
        let user_id = Uuid::new_v4();

        // free user subscribes to premium monthly
        let mut sub = new_subscription(user_id, Plan::Premium, BillingCycle::Monthly, now);
        assert_eq!(sub.plan, Plan::Premium);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_end, period_end(now, BillingCycle::Monthly));

        // immediate upgrade to pro yearly
        apply_upgrade(&mut sub, Plan::Pro, BillingCycle::Yearly, now).unwrap();
        assert_eq!(sub.plan, Plan::Pro);
        assert_eq!(sub.billing_cycle, BillingCycle::Yearly);
        assert!(sub.scheduled_plan.is_none());

        // scheduled downgrade back to premium monthly
        schedule_downgrade(&mut sub, Plan::Premium, BillingCycle::Monthly).unwrap();
        assert_eq!(sub.plan, Plan::Pro);
        assert_eq!(sub.scheduled_plan, Some(Plan::Premium));
        assert_eq!(sub.scheduled_change_date, Some(sub.current_period_end));

        // user changes their mind
        cancel_scheduled_change(&mut sub).unwrap();
        assert!(sub.scheduled_plan.is_none());
        assert_eq!(sub.plan, Plan::Pro);
    }
}
