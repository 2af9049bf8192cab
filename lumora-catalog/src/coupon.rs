use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lumora_core::error::GatewayResult;
use lumora_core::gateway::{CouponApplyOutcome, CouponApplyRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// A discount code with its eligibility rules, as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub min_order_value: i64,
    pub expiry_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    pub is_active: bool,
}

impl Coupon {
    /// Client-side usability filter, used only to gray out or hide coupons
    /// in a selection list. The server re-validates on application; this
    /// check never substitutes for that.
    pub fn is_usable(&self, subtotal: i64, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(expiry) = self.expiry_date {
            if expiry <= now {
                return false;
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.used_count >= limit {
                return false;
            }
        }
        subtotal >= self.min_order_value
    }

    /// Discount this coupon would take off the given subtotal. Presentation
    /// math only; the applied discount always comes from the server.
    pub fn discount_amount(&self, subtotal: i64) -> i64 {
        let raw = match self.discount_type {
            DiscountType::Percentage => (subtotal as f64 * self.discount_value / 100.0) as i64,
            DiscountType::Fixed => self.discount_value as i64,
        };
        raw.clamp(0, subtotal)
    }
}

/// Filter a coupon list down to the ones selectable against a subtotal.
pub fn usable_coupons(coupons: &[Coupon], subtotal: i64, now: DateTime<Utc>) -> Vec<&Coupon> {
    coupons
        .iter()
        .filter(|c| c.is_usable(subtotal, now))
        .collect()
}

/// Coupon operations against the backend. Application is authoritative
/// server-side; listing feeds the presentation filter above.
#[async_trait]
pub trait CouponGateway: Send + Sync {
    async fn apply_coupon(&self, request: &CouponApplyRequest) -> GatewayResult<CouponApplyOutcome>;

    async fn list_coupons(&self) -> GatewayResult<Vec<Coupon>>;
}
