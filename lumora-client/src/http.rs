use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use lumora_catalog::{Coupon, CouponGateway};
use lumora_core::error::{GatewayError, GatewayResult};
use lumora_core::gateway::{
    BankPaymentSlip, CartEcho, CartGateway, CouponApplyOutcome, CouponApplyRequest, ItemRemoval,
    OrderGateway, OrderReceipt, OrderSubmission, PaymentGateway, PaymentRequest,
    PaymentStatusOutcome, PaymentStatusRequest, QuantityUpdate,
};
use lumora_core::session::{keys, SessionStore};

use crate::config::ClientConfig;
use crate::normalize;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build http client: {0}")]
    Init(reqwest::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

/// REST client for the storefront backend, implementing all four gateway
/// traits over one configured `reqwest::Client`.
///
/// The auth token is read from the session store per request, so a login or
/// logout takes effect immediately. All responses pass through the
/// `normalize` adapters before anything typed leaves this crate.
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.api.timeout())
            .build()
            .map_err(ClientError::Init)?;

        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.get(keys::AUTH_TOKEN) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn map_transport(err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }

    /// Turn a response into a JSON body, mapping failures onto the error
    /// taxonomy. Expired credentials are cleared so the caller can redirect
    /// to login instead of silently retrying.
    async fn read_json(&self, response: Response) -> GatewayResult<Value> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.session.remove(keys::AUTH_TOKEN);
            return Err(GatewayError::Auth("session expired".to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return Err(GatewayError::Rejected(message));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| GatewayError::Contract(format!("unparsable response body: {err}")))
    }

    async fn get(&self, path: &str) -> GatewayResult<Value> {
        debug!(%path, "GET");
        let response = self
            .authorized(self.http.get(self.url(path)))
            .send()
            .await
            .map_err(Self::map_transport)?;
        self.read_json(response).await
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &impl serde::Serialize,
    ) -> GatewayResult<Value> {
        debug!(%method, %path, "request");
        let response = self
            .authorized(self.http.request(method, self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(Self::map_transport)?;
        self.read_json(response).await
    }
}

#[async_trait]
impl CartGateway for ApiClient {
    async fn fetch_cart(&self, user_id: &str) -> GatewayResult<CartEcho> {
        let value = self.get(&format!("/api/carts?userId={user_id}")).await?;
        normalize::parse_cart(&value)
    }

    async fn update_quantity(&self, update: &QuantityUpdate) -> GatewayResult<CartEcho> {
        let value = self
            .send_json(reqwest::Method::PUT, "/api/carts", update)
            .await?;
        normalize::parse_cart(&value)
    }

    async fn remove_item(&self, removal: &ItemRemoval) -> GatewayResult<CartEcho> {
        let path = format!(
            "/api/carts/{}/{}/{}",
            removal.cart_id, removal.product_id, removal.option_id
        );
        let response = self
            .authorized(self.http.delete(self.url(&path)))
            .send()
            .await
            .map_err(Self::map_transport)?;
        let value = self.read_json(response).await?;
        normalize::parse_cart(&value)
    }
}

#[async_trait]
impl CouponGateway for ApiClient {
    async fn apply_coupon(&self, request: &CouponApplyRequest) -> GatewayResult<CouponApplyOutcome> {
        let value = self
            .send_json(reqwest::Method::POST, "/api/coupons/apply", request)
            .await?;
        normalize::parse_apply_outcome(&value)
    }

    async fn list_coupons(&self) -> GatewayResult<Vec<Coupon>> {
        let value = self.get("/api/coupons").await?;
        normalize::parse_coupon_list(&value)
    }
}

#[async_trait]
impl OrderGateway for ApiClient {
    async fn submit_order(&self, submission: &OrderSubmission) -> GatewayResult<OrderReceipt> {
        let value = self
            .send_json(reqwest::Method::POST, "/api/orders", submission)
            .await?;
        normalize::parse_order_receipt(&value)
    }
}

#[async_trait]
impl PaymentGateway for ApiClient {
    async fn create_payment(&self, request: &PaymentRequest) -> GatewayResult<BankPaymentSlip> {
        let value = self
            .send_json(reqwest::Method::POST, "/api/payments", request)
            .await?;
        normalize::parse_payment_slip(&value)
    }

    async fn payment_status(
        &self,
        request: &PaymentStatusRequest,
    ) -> GatewayResult<PaymentStatusOutcome> {
        let value = self
            .send_json(reqwest::Method::POST, "/api/payments/status", request)
            .await?;
        normalize::parse_payment_status(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumora_core::session::MemorySessionStore;

    fn client() -> ApiClient {
        let config = ClientConfig::load().unwrap();
        ApiClient::new(&config, Arc::new(MemorySessionStore::new())).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let mut config = ClientConfig::load().unwrap();
        config.api.base_url = "http://localhost:5000/".to_string();
        let client = ApiClient::new(&config, Arc::new(MemorySessionStore::new())).unwrap();
        assert_eq!(client.url("/api/carts"), "http://localhost:5000/api/carts");
    }

    #[test]
    fn test_url_join() {
        assert_eq!(
            client().url("/api/coupons"),
            "http://localhost:5000/api/coupons"
        );
    }
}
