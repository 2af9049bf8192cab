//! Boundary adapters for the backend's loose response shapes.
//!
//! The backend is duck-typed: coupon lists arrive bare or wrapped, payment
//! fields sit under `data` or at the top level, cart echoes omit option
//! details, and amounts show up as numbers or numeric strings. Everything
//! ambiguous is resolved here so the pricing and checkout logic only ever
//! sees typed values.

use serde_json::Value;
use tracing::warn;

use lumora_catalog::Coupon;
use lumora_core::error::{GatewayError, GatewayResult};
use lumora_core::gateway::{
    BankPaymentSlip, CartEcho, CouponApplyOutcome, LineItemEcho, OptionEcho, OrderReceipt,
    PaymentPollStatus, PaymentStatusOutcome,
};

/// Accept an integer, a float with no meaningful fraction, or a numeric
/// string. Anything else reads as absent.
pub(crate) fn coerce_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn string_field(value: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

fn parse_option(value: &Value) -> Option<OptionEcho> {
    if !value.is_object() {
        return None;
    }
    let id = string_field(value, &["_id", "id"])?;
    Some(OptionEcho {
        id,
        price: value.get("price").and_then(coerce_amount),
        discount_price: value
            .get("discount_price")
            .or_else(|| value.get("discountPrice"))
            .and_then(coerce_amount),
        stock: value.get("stock").and_then(coerce_amount),
    })
}

fn parse_line_item(value: &Value) -> Option<LineItemEcho> {
    let product = value.get("product")?;
    let (product_id, product_name) = match product {
        Value::String(id) => (id.clone(), None),
        Value::Object(_) => (
            string_field(product, &["_id", "id"])?,
            string_field(product, &["name"]),
        ),
        _ => return None,
    };

    let quantity = value
        .get("quantity")
        .and_then(coerce_amount)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1);

    Some(LineItemEcho {
        product_id,
        product_name,
        option: value.get("option").and_then(parse_option),
        quantity,
    })
}

/// Parse a cart echo, tolerating a `{"cart": {...}}` wrapper. Lines without
/// a usable product id are dropped with a warning rather than failing the
/// whole cart.
pub fn parse_cart(value: &Value) -> GatewayResult<CartEcho> {
    let body = value.get("cart").unwrap_or(value);
    let items = match body.get("items") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => {
            return Ok(CartEcho {
                id: string_field(body, &["_id", "id"]),
                items: vec![],
            })
        }
        Some(_) => {
            return Err(GatewayError::Contract(
                "cart items is not an array".to_string(),
            ))
        }
    };

    let parsed = items
        .iter()
        .filter_map(|item| {
            let line = parse_line_item(item);
            if line.is_none() {
                warn!("dropping cart line without a product id");
            }
            line
        })
        .collect();

    Ok(CartEcho {
        id: string_field(body, &["_id", "id"]),
        items: parsed,
    })
}

/// Parse a coupon list, accepting either a bare array or `{"coupons": [...]}`.
/// Malformed entries are skipped; this feeds a display filter, not money math.
pub fn parse_coupon_list(value: &Value) -> GatewayResult<Vec<Coupon>> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(_) => match value.get("coupons") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(GatewayError::Contract(
                    "coupon list missing from response".to_string(),
                ))
            }
        },
        _ => {
            return Err(GatewayError::Contract(
                "coupon list is neither an array nor an object".to_string(),
            ))
        }
    };

    Ok(entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(coupon) => Some(coupon),
            Err(err) => {
                warn!(error = %err, "skipping unparsable coupon entry");
                None
            }
        })
        .collect())
}

pub fn parse_apply_outcome(value: &Value) -> GatewayResult<CouponApplyOutcome> {
    let cart = match value.get("cart") {
        Some(Value::Null) | None => None,
        Some(cart) => Some(parse_cart(cart)?),
    };

    Ok(CouponApplyOutcome {
        success: value.get("success").and_then(Value::as_bool).unwrap_or(false),
        discount: value.get("discount").and_then(coerce_amount).unwrap_or(0),
        cart,
        message: string_field(value, &["message"]),
    })
}

/// Parse an order-creation response. A missing order id on a success
/// response violates the contract and aborts the flow.
pub fn parse_order_receipt(value: &Value) -> GatewayResult<OrderReceipt> {
    let order = value.get("order").unwrap_or(value);
    let id = string_field(order, &["id", "_id"]).ok_or_else(|| {
        GatewayError::Contract("order id missing from creation response".to_string())
    })?;

    Ok(OrderReceipt {
        id,
        shipping_status: string_field(order, &["shippingStatus", "shipping_status"])
            .unwrap_or_else(|| "pending".to_string()),
        payment_status: string_field(order, &["paymentStatus", "payment_status"]),
    })
}

/// Parse a payment-creation response; fields may sit under `data` or at the
/// top level. Both the code and the amount are required.
pub fn parse_payment_slip(value: &Value) -> GatewayResult<BankPaymentSlip> {
    let body = value.get("data").filter(|d| d.is_object()).unwrap_or(value);
    let payment_code = string_field(body, &["paymentCode", "payment_code"]).ok_or_else(|| {
        GatewayError::Contract("payment code missing from creation response".to_string())
    })?;
    let amount = body
        .get("amount")
        .and_then(coerce_amount)
        .ok_or_else(|| {
            GatewayError::Contract("payment amount missing from creation response".to_string())
        })?;

    Ok(BankPaymentSlip {
        payment_code,
        amount,
    })
}

pub fn parse_payment_status(value: &Value) -> GatewayResult<PaymentStatusOutcome> {
    let body = value.get("data").filter(|d| d.is_object()).unwrap_or(value);
    let status = match string_field(body, &["status"]).as_deref() {
        Some("success") => PaymentPollStatus::Success,
        Some("expired") => PaymentPollStatus::Expired,
        Some("pending") => PaymentPollStatus::Pending,
        Some("failed") => PaymentPollStatus::Failed,
        Some(other) => {
            return Err(GatewayError::Contract(format!(
                "unrecognized payment status: {other}"
            )))
        }
        None => {
            return Err(GatewayError::Contract(
                "payment status missing from response".to_string(),
            ))
        }
    };

    Ok(PaymentStatusOutcome {
        status,
        payment_status: string_field(body, &["paymentStatus", "payment_status"]),
        order_id: string_field(body, &["orderId", "order_id"]),
        transaction_id: string_field(body, &["transactionId", "transaction_id"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_amount_shapes() {
        assert_eq!(coerce_amount(&json!(150000)), Some(150_000));
        assert_eq!(coerce_amount(&json!(150000.0)), Some(150_000));
        assert_eq!(coerce_amount(&json!("150000")), Some(150_000));
        assert_eq!(coerce_amount(&json!(" 150000.5 ")), Some(150_000));
        assert_eq!(coerce_amount(&json!(null)), None);
        assert_eq!(coerce_amount(&json!("abc")), None);
    }

    #[test]
    fn test_parse_cart_with_wrapper_and_string_amounts() {
        let value = json!({
            "cart": {
                "_id": "cart-1",
                "items": [{
                    "product": {"_id": "p1", "name": "Rose Serum"},
                    "option": {"_id": "opt-30ml", "price": "200000", "discount_price": 150000, "stock": 5},
                    "quantity": 2
                }]
            }
        });

        let cart = parse_cart(&value).unwrap();
        assert_eq!(cart.id.as_deref(), Some("cart-1"));
        let option = cart.items[0].option.as_ref().unwrap();
        assert_eq!(option.price, Some(200_000));
        assert_eq!(option.discount_price, Some(150_000));
    }

    #[test]
    fn test_parse_cart_tolerates_missing_option() {
        let value = json!({
            "items": [{
                "product": {"_id": "p1"},
                "option": null,
                "quantity": 1
            }]
        });

        let cart = parse_cart(&value).unwrap();
        assert!(cart.items[0].option.is_none());
    }

    #[test]
    fn test_parse_cart_drops_lines_without_product_id() {
        let value = json!({
            "items": [
                {"product": {}, "quantity": 1},
                {"product": {"_id": "p2"}, "quantity": 1}
            ]
        });

        let cart = parse_cart(&value).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, "p2");
    }

    #[test]
    fn test_parse_coupon_list_accepts_both_shapes() {
        let coupon = json!({
            "code": "SALE50",
            "discountType": "fixed",
            "discountValue": 50000.0,
            "minOrderValue": 100000,
            "expiryDate": null,
            "usageLimit": null,
            "usedCount": 0,
            "isActive": true
        });

        let bare = parse_coupon_list(&json!([coupon])).unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].code, "SALE50");

        let wrapped = parse_coupon_list(&json!({ "coupons": [coupon] })).unwrap();
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn test_parse_coupon_list_skips_malformed_entries() {
        let value = json!([
            {"code": "BROKEN"},
            {
                "code": "OK10",
                "discountType": "percentage",
                "discountValue": 10.0,
                "minOrderValue": 0,
                "expiryDate": null,
                "usageLimit": null,
                "usedCount": 0,
                "isActive": true
            }
        ]);

        let coupons = parse_coupon_list(&value).unwrap();
        assert_eq!(coupons.len(), 1);
        assert_eq!(coupons[0].code, "OK10");
    }

    #[test]
    fn test_parse_order_receipt_requires_id() {
        let ok = json!({"order": {"id": "order-1"}});
        let receipt = parse_order_receipt(&ok).unwrap();
        assert_eq!(receipt.id, "order-1");
        assert_eq!(receipt.shipping_status, "pending");

        let missing = json!({"order": {"shippingStatus": "pending"}});
        assert!(matches!(
            parse_order_receipt(&missing),
            Err(GatewayError::Contract(_))
        ));
    }

    #[test]
    fn test_parse_payment_slip_data_or_top_level() {
        let nested = json!({"data": {"paymentCode": "pay-1", "amount": 250000}});
        let slip = parse_payment_slip(&nested).unwrap();
        assert_eq!(slip.payment_code, "pay-1");
        assert_eq!(slip.amount, 250_000);

        let flat = json!({"paymentCode": "pay-2", "amount": "99000"});
        assert_eq!(parse_payment_slip(&flat).unwrap().payment_code, "pay-2");

        let incomplete = json!({"data": {"paymentCode": "pay-3"}});
        assert!(matches!(
            parse_payment_slip(&incomplete),
            Err(GatewayError::Contract(_))
        ));
    }

    #[test]
    fn test_parse_payment_status_variants() {
        let value = json!({"data": {"status": "success", "orderId": "order-1", "transactionId": "txn-9"}});
        let outcome = parse_payment_status(&value).unwrap();
        assert_eq!(outcome.status, PaymentPollStatus::Success);
        assert_eq!(outcome.order_id.as_deref(), Some("order-1"));

        let odd = json!({"data": {"status": "??"}});
        assert!(matches!(
            parse_payment_status(&odd),
            Err(GatewayError::Contract(_))
        ));
    }

    #[test]
    fn test_parse_apply_outcome_defaults() {
        let failure = json!({"success": false, "message": "coupon expired"});
        let outcome = parse_apply_outcome(&failure).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.discount, 0);
        assert_eq!(outcome.message.as_deref(), Some("coupon expired"));

        let success = json!({"success": true, "discount": "50000", "cart": {"items": []}});
        let outcome = parse_apply_outcome(&success).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.discount, 50_000);
        assert!(outcome.cart.is_some());
    }
}
