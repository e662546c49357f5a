mod razorpay;

pub use razorpay::*;

use async_trait::async_trait;

use crate::error::Result;

/// Opaque order-creation / callback-verification provider.
///
/// Constructed once at startup and handed to the lifecycle; tests substitute
/// an in-memory implementation.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment order for the amount; returns the gateway's order
    /// reference.
    async fn create_order(&self, amount_minor_units: i64, account_id: &str) -> Result<String>;

    /// Check the authenticity of a payment callback against the gateway's
    /// shared secret.
    fn verify_callback(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool;
}
