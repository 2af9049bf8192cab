use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;

/// Option data as echoed by the backend. Every detail field is optional
/// because cart echoes routinely omit price/stock for options the server
/// considers already known to the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionEcho {
    pub id: String,
    pub price: Option<i64>,
    pub discount_price: Option<i64>,
    pub stock: Option<i64>,
}

/// One cart line as echoed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemEcho {
    pub product_id: String,
    pub product_name: Option<String>,
    pub option: Option<OptionEcho>,
    pub quantity: u32,
}

/// Full cart state as echoed by the backend after a fetch or mutation.
///
/// This is a boundary type: callers merge it with their cached cart rather
/// than adopting it verbatim, so previously known option data survives an
/// incomplete echo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartEcho {
    pub id: Option<String>,
    pub items: Vec<LineItemEcho>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityUpdate {
    pub user_id: String,
    pub product_id: String,
    pub option_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRemoval {
    pub cart_id: String,
    pub product_id: String,
    pub option_id: String,
}

/// Cart read/mutation operations. Every mutation echoes the full updated
/// cart; local state must only be committed from a confirmed echo.
#[async_trait]
pub trait CartGateway: Send + Sync {
    async fn fetch_cart(&self, user_id: &str) -> GatewayResult<CartEcho>;

    async fn update_quantity(&self, update: &QuantityUpdate) -> GatewayResult<CartEcho>;

    async fn remove_item(&self, removal: &ItemRemoval) -> GatewayResult<CartEcho>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponApplyRequest {
    pub user_id: String,
    pub coupon_code: String,
}

/// The backend's verdict on a coupon application. The server is the sole
/// authority on coupon business rules; the client never recomputes them.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponApplyOutcome {
    pub success: bool,
    pub discount: i64,
    pub cart: Option<CartEcho>,
    pub message: Option<String>,
}

/// Payment method selected at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery. The order finalizes without an online payment step.
    Cod,
    /// Bank transfer. A second call obtains a payment code, then the client
    /// polls for the transfer to land.
    Bank,
}

/// Order submission as posted to the order-creation endpoint. Field names
/// follow the backend's wire vocabulary (`sdt` is the phone field).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    pub user_id: String,
    pub address_line: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    #[serde(rename = "sdt")]
    pub phone: String,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// Server-owned order record, read back from a successful submission.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderReceipt {
    pub id: String,
    pub shipping_status: String,
    pub payment_status: Option<String>,
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit_order(&self, submission: &OrderSubmission) -> GatewayResult<OrderReceipt>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount: i64,
}

/// Short-lived slip returned by payment creation for a bank transfer.
#[derive(Debug, Clone, Deserialize)]
pub struct BankPaymentSlip {
    pub payment_code: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    pub payment_code: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPollStatus {
    Pending,
    Success,
    Expired,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusOutcome {
    pub status: PaymentPollStatus,
    pub payment_status: Option<String>,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment record for a bank-transfer order. Only ever called
    /// after the order-creation response has been parsed successfully.
    async fn create_payment(&self, request: &PaymentRequest) -> GatewayResult<BankPaymentSlip>;

    async fn payment_status(
        &self,
        request: &PaymentStatusRequest,
    ) -> GatewayResult<PaymentStatusOutcome>;
}
