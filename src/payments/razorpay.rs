use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

use super::PaymentGateway;

type HmacSha256 = Hmac<Sha256>;

const RAZORPAY_ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Amount in the smallest currency unit.
    amount: i64,
    currency: &'a str,
    /// Our account id, echoed back on the order for reconciliation.
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    id: String,
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(key_id: &str, key_secret: &str) -> Self {
        Self {
            client: Client::new(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, amount_minor_units: i64, account_id: &str) -> Result<String> {
        let request = CreateOrderRequest {
            amount: amount_minor_units,
            currency: "INR",
            receipt: account_id,
        };

        let response = self
            .client
            .post(RAZORPAY_ORDERS_URL)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("order creation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "order creation returned {}: {}",
                status, body
            )));
        }

        let order: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("failed to parse order response: {}", e)))?;

        tracing::info!(order_ref = %order.id, account_id, "payment order created");
        Ok(order.id)
    }

    /// HMAC-SHA256 over "{order_ref}|{payment_ref}" keyed with the API
    /// secret, hex-encoded - the scheme the gateway signs callbacks with.
    /// Compared in constant time.
    fn verify_callback(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool {
        if signature.is_empty() {
            return false;
        }
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(order_ref.as_bytes());
        mac.update(b"|");
        mac.update(payment_ref.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}
