//! Test utilities and fixtures for paykey integration tests

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tower::ServiceExt;

pub use paykey::db::{AppState, DbPool, init_db, queries};
pub use paykey::email::NotificationChannel;
pub use paykey::error::{AppError, Result};
pub use paykey::keygen::KeyGenerator;
pub use paykey::lifecycle::{CredentialDelivery, LicenseLifecycle};
pub use paykey::models::*;
pub use paykey::payments::PaymentGateway;
pub use paykey::plans::PlanCatalog;

/// Create a pooled in-memory database with the schema initialized.
/// All connections in the pool see the same database.
pub fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }
    pool
}

/// Payment gateway stub: records created orders and accepts one fixed
/// signature.
pub struct MockGateway {
    orders: Mutex<Vec<(i64, String)>>,
    fail_orders: AtomicBool,
}

impl MockGateway {
    pub const VALID_SIGNATURE: &'static str = "valid-signature";

    pub fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            fail_orders: AtomicBool::new(false),
        }
    }

    /// Make subsequent create_order calls fail, simulating a gateway outage.
    pub fn set_fail_orders(&self, fail: bool) {
        self.fail_orders.store(fail, Ordering::SeqCst);
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(&self, amount_minor_units: i64, account_id: &str) -> Result<String> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(AppError::Gateway("order creation refused".into()));
        }
        let mut orders = self.orders.lock().unwrap();
        orders.push((amount_minor_units, account_id.to_string()));
        Ok(format!("order_test_{}", orders.len()))
    }

    fn verify_callback(&self, _order_ref: &str, _payment_ref: &str, signature: &str) -> bool {
        signature == Self::VALID_SIGNATURE
    }
}

/// Notification sink capturing every delivery.
pub struct MockNotifier {
    deliveries: Mutex<Vec<(String, String, String)>>,
    fail: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    /// Body of the last message delivered to the address, if any.
    pub fn last_body_for(&self, email: &str) -> Option<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _, _)| to == email)
            .map(|(_, _, body)| body.clone())
    }
}

#[async_trait]
impl NotificationChannel for MockNotifier {
    async fn deliver(&self, email: &str, subject: &str, body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Internal("delivery refused".into()));
        }
        self.deliveries.lock().unwrap().push((
            email.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

/// Everything a test needs: the pool, both mocks, and a wired lifecycle.
pub struct TestEnv {
    pub pool: DbPool,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<MockNotifier>,
    pub lifecycle: Arc<LicenseLifecycle>,
}

pub fn test_env() -> TestEnv {
    let pool = test_pool();
    let gateway = Arc::new(MockGateway::new());
    let notifier = Arc::new(MockNotifier::new());
    let lifecycle = Arc::new(LicenseLifecycle::new(
        pool.clone(),
        KeyGenerator::default(),
        PlanCatalog::default(),
        gateway.clone(),
        notifier.clone(),
    ));
    TestEnv {
        pool,
        gateway,
        notifier,
        lifecycle,
    }
}

/// Create a Router with all public endpoints wired to the env's mocks.
pub fn test_app(env: &TestEnv) -> Router {
    let state = AppState {
        lifecycle: env.lifecycle.clone(),
        gateway: env.gateway.clone(),
    };
    paykey::handlers::router().with_state(state)
}

pub fn purchase_request(email: &str, plan_id: i64) -> PurchaseRequest {
    PurchaseRequest {
        full_name: "Test User".to_string(),
        email: email.to_string(),
        mobile_number: "9876543210".to_string(),
        plan_id,
    }
}

/// POST a JSON body and return (status, parsed JSON body).
pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> (axum::http::StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response should be valid JSON")
    };
    (status, json)
}

/// Extract the 12-digit license key from a delivered message body.
pub fn key_from_body(body: &str) -> String {
    body.lines()
        .find_map(|line| line.strip_prefix("LICENSE KEY: "))
        .expect("delivery should contain a license key line")
        .trim()
        .to_string()
}

/// Pull the stored record for an email straight from the database.
pub fn record_for(pool: &DbPool, email: &str) -> LicenseRecord {
    let conn = pool.get().unwrap();
    queries::get_license_by_email(&conn, email)
        .unwrap()
        .expect("record should exist")
}
