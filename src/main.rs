use std::sync::Arc;

use anyhow::Context;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use paykey::config::Config;
use paykey::db::{self, AppState};
use paykey::email::{NotificationChannel, ResendNotifier};
use paykey::handlers;
use paykey::keygen::KeyGenerator;
use paykey::lifecycle::LicenseLifecycle;
use paykey::payments::{PaymentGateway, RazorpayClient};
use paykey::plans::PlanCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("paykey=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let pool = db::create_pool(&config.database_path).context("failed to create database pool")?;
    {
        let conn = pool.get()?;
        db::init_db(&conn).context("failed to initialize database schema")?;
    }

    if config.razorpay_key_id.is_empty() {
        tracing::warn!("RAZORPAY_KEY_ID is not set; paid-plan order creation will fail");
    }
    if config.resend_api_key.is_none() {
        tracing::warn!("RESEND_API_KEY is not set; license keys will not be delivered");
    }

    let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayClient::new(
        &config.razorpay_key_id,
        &config.razorpay_key_secret,
    ));
    let notifier: Arc<dyn NotificationChannel> = Arc::new(ResendNotifier::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
    ));
    let lifecycle = Arc::new(LicenseLifecycle::new(
        pool.clone(),
        KeyGenerator::default(),
        PlanCatalog::default(),
        gateway.clone(),
        notifier,
    ));

    let state = AppState { lifecycle, gateway };

    let app = handlers::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;
    tracing::info!(addr = %config.addr(), "paykey listening");
    axum::serve(listener, app).await?;

    Ok(())
}
