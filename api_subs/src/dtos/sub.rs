use serde::{Deserialize, Serialize};

use crate::models::sub::Subscription;

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan: String,
    pub billing_cycle: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Subscription,
}

#[derive(Debug, Serialize)]
pub struct CurrentSubscriptionResponse {
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Deserialize)]
pub struct PromoRedeemRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct PromoRedeemResponse {
    pub code: String,
    pub discount_percent: i32,
    pub remaining_uses: i32,
}
