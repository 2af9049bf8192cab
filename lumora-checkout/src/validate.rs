use serde::{Deserialize, Serialize};

use lumora_cart::Cart;
use lumora_core::gateway::PaymentMethod;
use lumora_core::phone;

/// Shipping destination. All four fields are required non-empty after trim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address_line: String,
    pub ward: String,
    pub district: String,
    pub province: String,
}

impl ShippingAddress {
    pub fn is_complete(&self) -> bool {
        !self.address_line.trim().is_empty()
            && !self.ward.trim().is_empty()
            && !self.district.trim().is_empty()
            && !self.province.trim().is_empty()
    }
}

/// Everything the user typed on the checkout page. Serializable so a draft
/// can be stashed in the session store across a reload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub phone: String,
    pub address: ShippingAddress,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub coupon_code: Option<String>,
}

/// Validation failures, one per check. Messages are user-facing and
/// deterministic; the first failing check wins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("phone number must be 10 digits starting with 03, 05, 07, 08 or 09")]
    InvalidPhone,

    #[error("shipping address is incomplete")]
    IncompleteAddress,

    #[error("a payment method must be selected")]
    MissingPaymentMethod,

    #[error("cart has no items available for checkout")]
    EmptyCart,

    #[error("cart line for product {product_id} is not purchasable")]
    InvalidLine { product_id: String },
}

/// Run the checkout checks synchronously, in a fixed order, stopping at the
/// first failure: phone, address, payment method, non-empty cart, per-line
/// integrity. The ordering is part of the contract — it keeps error
/// messages reproducible.
pub fn validate(form: &CheckoutForm, cart: &Cart) -> Result<(), ValidationError> {
    if !phone::is_valid_mobile(&form.phone) {
        return Err(ValidationError::InvalidPhone);
    }

    if !form.address.is_complete() {
        return Err(ValidationError::IncompleteAddress);
    }

    if form.payment_method.is_none() {
        return Err(ValidationError::MissingPaymentMethod);
    }

    if cart.purchasable_items().next().is_none() {
        return Err(ValidationError::EmptyCart);
    }

    for item in &cart.items {
        let line_ok = !item.product_id.trim().is_empty()
            && item
                .option
                .as_ref()
                .is_none_or(|option| !option.id.trim().is_empty())
            && item.quantity > 0;
        if !line_ok {
            return Err(ValidationError::InvalidLine {
                product_id: item.product_id.clone(),
            });
        }
    }

    Ok(())
}
