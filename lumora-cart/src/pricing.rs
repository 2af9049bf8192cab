use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lumora_catalog::CouponGateway;
use lumora_core::error::GatewayError;
use lumora_core::gateway::CouponApplyRequest;

use crate::models::Cart;

/// Derived monetary totals for a cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: i64,
    pub discount: i64,
}

impl PricingResult {
    pub fn from_subtotal(subtotal: i64) -> Self {
        Self {
            subtotal,
            discount: 0,
        }
    }

    /// Total owed. The discount never inverts the total negative.
    pub fn total(&self) -> i64 {
        (self.subtotal - self.discount).max(0)
    }
}

/// Sum of effective price x quantity over purchasable lines only. Lines
/// that are out of stock or missing option data contribute nothing.
pub fn compute_subtotal(cart: &Cart) -> i64 {
    cart.purchasable_items().map(|item| item.line_total()).sum()
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("coupon code is empty")]
    EmptyCode,

    /// The backend rejected the coupon (not found, inactive, expired,
    /// exhausted, or minimum order value unmet). The message is the
    /// server's own wording.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Applies coupons through the backend and keeps cart/pricing state
/// consistent across failed attempts.
pub struct PricingEngine {
    coupons: Arc<dyn CouponGateway>,
}

impl PricingEngine {
    pub fn new(coupons: Arc<dyn CouponGateway>) -> Self {
        Self { coupons }
    }

    /// Apply a coupon code to the cart, adopting the server-reported
    /// discount on success.
    ///
    /// The backend owns coupon validation; this side only trims the code
    /// and rejects an empty one. On success the echoed cart is merged with
    /// the cached one (echoes may omit option details) and the subtotal is
    /// recomputed over the merged lines. On ANY failure the pre-attempt
    /// cart is restored and the discount resets to 0, so the UI is never
    /// left partially discounted but unconfirmed.
    pub async fn apply_coupon(
        &self,
        user_id: &str,
        cart: &mut Cart,
        pricing: &mut PricingResult,
        code: &str,
    ) -> Result<(), PricingError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(PricingError::EmptyCode);
        }

        let snapshot_cart = cart.clone();
        let snapshot_subtotal = pricing.subtotal;

        let request = CouponApplyRequest {
            user_id: user_id.to_string(),
            coupon_code: code.to_string(),
        };

        let outcome = match self.coupons.apply_coupon(&request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(coupon = code, error = %err, "coupon apply failed, rolling back");
                *cart = snapshot_cart;
                *pricing = PricingResult {
                    subtotal: snapshot_subtotal,
                    discount: 0,
                };
                return Err(err.into());
            }
        };

        if !outcome.success {
            let message = outcome
                .message
                .unwrap_or_else(|| "coupon could not be applied".to_string());
            warn!(coupon = code, %message, "coupon rejected, rolling back");
            *cart = snapshot_cart;
            *pricing = PricingResult {
                subtotal: snapshot_subtotal,
                discount: 0,
            };
            return Err(PricingError::Rejected(message));
        }

        if let Some(echo) = &outcome.cart {
            *cart = cart.merge_echo(echo);
        }
        *pricing = PricingResult {
            subtotal: compute_subtotal(cart),
            discount: outcome.discount.max(0),
        };
        info!(
            coupon = code,
            discount = pricing.discount,
            total = pricing.total(),
            "coupon applied"
        );
        Ok(())
    }
}
