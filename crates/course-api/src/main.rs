//! # CourseCart RS
//!
//! Crypto-native course marketplace backend.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export NOWPAYMENTS_API_KEY=np_...
//! export NOWPAYMENTS_IPN_SECRET=...
//! export JWT_SECRET=...
//! export DOMAIN_URL=https://coursecart.dev
//!
//! # Run the server
//! coursecart
//! ```

use course_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Courses loaded: {}", state.catalog.courses.len());
    info!(
        "Google OAuth: {}",
        if state.google.is_some() { "enabled" } else { "disabled" }
    );

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("🎓 CourseCart starting on http://{}", addr);

    if !is_prod {
        info!("📚 Courses: GET http://{}/api/courses", addr);
        info!("💳 Checkout: POST http://{}/api/create-checkout", addr);
        info!("🔔 Webhook: POST http://{}/api/payments/webhook", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
