//! Recovery Service Development Server
//!
//! HTTP server exposing the recovery endpoints for local development and
//! deployment behind the administrative console. Email gateway
//! credentials are optional at startup; issuance requests fail with a
//! configuration error until they are provided.

use std::sync::Arc;

use dotenv::dotenv;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use recovery_service::{
    api::{AppState, RouterBuilder},
    config::AppConfig,
    service::{OtpIssuanceService, OtpVerificationService, RecoveryMailer, SmtpMailer},
    store::{InMemoryOtpStore, OtpStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    env_logger::init();

    log::info!(
        "Starting Recovery Service v{}",
        recovery_service::VERSION
    );

    // Load configuration from environment
    let config = AppConfig::from_env()?;
    config.validate()?;

    log::info!("Configuration loaded and validated");
    log::info!(
        "OTP policy: {} minute TTL, {} attempts, {}s resend interval",
        config.otp.ttl_minutes,
        config.otp.max_attempts,
        config.otp.resend_interval_seconds
    );

    // The store is the single authoritative source of truth for codes
    let store: Arc<dyn OtpStore> = Arc::new(InMemoryOtpStore::new());

    let mailer: Option<Arc<dyn RecoveryMailer>> = match &config.email {
        Some(email_config) => {
            let mailer = SmtpMailer::new(email_config.clone())
                .map_err(|e| anyhow::anyhow!("Email gateway setup failed: {}", e))?;
            log::info!("Email gateway configured for {}", email_config.smtp_host);
            Some(Arc::new(mailer))
        }
        None => {
            log::warn!("Email gateway not configured; issuance requests will fail");
            None
        }
    };

    let app_state = AppState {
        issuance: Arc::new(OtpIssuanceService::new(
            store.clone(),
            mailer,
            config.otp,
        )),
        verification: Arc::new(OtpVerificationService::new(store.clone(), config.otp)),
    };

    // Reaper: expiry is enforced lazily at verify time, this only bounds
    // memory held by abandoned flows
    let reaper_store = store.clone();
    let reaper_ttl = config.otp.ttl();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            let purged = reaper_store.purge_expired(reaper_ttl).await;
            if purged > 0 {
                log::debug!("Reaper purged {} expired recovery records", purged);
            }
        }
    });

    let app = RouterBuilder::with_all_routes()
        .build()
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    // Echo the requesting origin; pre-flight OPTIONS is
                    // answered with no content by the layer itself
                    CorsLayer::new()
                        .allow_origin(AllowOrigin::mirror_request())
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .into_inner(),
        );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server on {}", bind_addr);
    log::info!("Endpoints:");
    log::info!("  GET  /health           - Health check");
    log::info!("  POST /recovery/issue   - Issue a recovery code");
    log::info!("  POST /recovery/verify  - Verify a submitted code");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Server listening and ready for requests");
    axum::serve(listener, app).await?;

    Ok(())
}
