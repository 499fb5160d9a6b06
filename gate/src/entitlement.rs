use chrono::{DateTime, Utc};

use api_subs::models::sub::{Plan, Subscription, SubscriptionStatus};

/// Decides whether a subscription snapshot grants a feature gated at
/// `required` right now. Pure; re-evaluated on every gated request and
/// never cached, since the answer flips at period boundaries.
///
/// Entitlement is an exact-tier match: a pro subscriber is not entitled
/// to a premium-gated feature. Deliberate, and kept as-is.
pub fn is_entitled(sub: Option<&Subscription>, required: Plan, now: DateTime<Utc>) -> bool {
    let Some(sub) = sub else {
        // no record means the implicit free plan, unconstrained by period
        return required == Plan::Free;
    };

    if sub.plan != required {
        return false;
    }

    match sub.status {
        SubscriptionStatus::Active => true,
        // grace period: cancelled but the paid period has not lapsed
        SubscriptionStatus::Cancelled => now < sub.current_period_end,
        SubscriptionStatus::Expired | SubscriptionStatus::PastDue => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_subs::models::sub::BillingCycle;
    use api_subs::services::transitions::{cancel, new_subscription};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn premium(now: DateTime<Utc>) -> Subscription {
        new_subscription(Uuid::new_v4(), Plan::Premium, BillingCycle::Monthly, now)
    }

    #[test]
    fn no_subscription_grants_only_free() {
        let now = base_time();
        assert!(is_entitled(None, Plan::Free, now));
        assert!(!is_entitled(None, Plan::Premium, now));
        assert!(!is_entitled(None, Plan::Pro, now));
    }

    #[test]
    fn active_subscription_grants_its_own_tier() {
        let now = base_time();
        let sub = premium(now);
        assert!(is_entitled(Some(&sub), Plan::Premium, now));
    }

    #[test]
    fn entitlement_is_an_exact_tier_match() {
        let now = base_time();
        let sub = new_subscription(Uuid::new_v4(), Plan::Pro, BillingCycle::Yearly, now);

        // a pro subscriber is not entitled to premium-gated features
        assert!(!is_entitled(Some(&sub), Plan::Premium, now));
        assert!(!is_entitled(Some(&sub), Plan::Free, now));
        assert!(is_entitled(Some(&sub), Plan::Pro, now));
    }

    #[test]
    fn cancelled_subscription_keeps_access_through_the_grace_period() {
        let now = base_time();
        let mut sub = premium(now);
        cancel(&mut sub).unwrap();

        assert!(is_entitled(
            Some(&sub),
            Plan::Premium,
            sub.current_period_end - Duration::seconds(1)
        ));
        assert!(!is_entitled(Some(&sub), Plan::Premium, sub.current_period_end));
        assert!(!is_entitled(
            Some(&sub),
            Plan::Premium,
            sub.current_period_end + Duration::days(1)
        ));
    }

    #[test]
    fn expired_and_past_due_are_unentitled() {
        let now = base_time();
        let mut sub = premium(now);

        sub.status = SubscriptionStatus::Expired;
        assert!(!is_entitled(Some(&sub), Plan::Premium, now));

        sub.status = SubscriptionStatus::PastDue;
        assert!(!is_entitled(Some(&sub), Plan::Premium, now));
    }
}
