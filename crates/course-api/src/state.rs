//! # Application State
//!
//! Shared state for the Axum application: stores, checkout orchestrator,
//! webhook reconciler, token signer, and configuration. Everything is
//! wired once at process start and cloned into each handler.

use crate::auth::{GoogleAuthClient, GoogleAuthConfig};
use crate::token::TokenSigner;
use async_trait::async_trait;
use course_core::{
    AccessHandler, CheckoutService, CourseCatalog, Enrollment, MarketResult, MemoryOrderStore,
    MemoryUserStore, Order, OrderStore, Reconciler, RedirectUrls, UserStore,
};
use course_nowpay::{NowPaymentsConfig, NowPaymentsGateway};
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; redirect targets and the IPN callback hang off it
    pub domain_url: String,
    /// Secret for session and OAuth-state tokens
    pub jwt_secret: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Google OAuth credentials, when configured
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using development default");
            "coursecart-dev-secret".to_string()
        });

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            domain_url: std::env::var("DOMAIN_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            jwt_secret,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            google_client_id: std::env::var("GOOGLE_CLIENT_ID").ok(),
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Grants course access when the reconciler confirms a payment.
///
/// An order without an attributed user or course is logged and left for
/// manual fulfillment; failing the webhook would only trigger pointless
/// redelivery.
pub struct EnrollmentAccessHandler {
    users: Arc<dyn UserStore>,
}

impl EnrollmentAccessHandler {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl AccessHandler for EnrollmentAccessHandler {
    async fn grant_access(&self, order: &Order) -> MarketResult<()> {
        match (order.user_id, order.course_id.as_deref()) {
            (Some(user_id), Some(course_id)) => {
                self.users
                    .enroll(user_id, Enrollment::new(course_id, order.order_id.clone()))
                    .await?;
                info!(
                    order_id = %order.order_id,
                    %user_id,
                    course_id,
                    "payment confirmed, enrollment recorded"
                );
            }
            _ => {
                info!(
                    order_id = %order.order_id,
                    "payment confirmed for unattributed order, manual fulfillment"
                );
            }
        }
        Ok(())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Order persistence
    pub orders: Arc<dyn OrderStore>,
    /// User persistence
    pub users: Arc<dyn UserStore>,
    /// Course catalog
    pub catalog: CourseCatalog,
    /// Checkout orchestrator
    pub checkout: Arc<CheckoutService>,
    /// Webhook reconciler
    pub reconciler: Arc<Reconciler>,
    /// IPN signing secret shared with the gateway
    pub ipn_secret: String,
    /// Session/OAuth-state token signer
    pub tokens: TokenSigner,
    /// Google OAuth client, when configured
    pub google: Option<Arc<GoogleAuthClient>>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState wired to NOWPayments
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let nowpay = NowPaymentsConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize NOWPayments: {}", e))?;
        let ipn_secret = nowpay.ipn_secret.clone();
        let gateway = Arc::new(NowPaymentsGateway::new(nowpay));

        let catalog = load_course_catalog()?;

        Ok(Self::assemble(config, gateway, ipn_secret, catalog))
    }

    /// Wire the state from parts; tests inject their own gateway and
    /// secrets here.
    pub fn assemble(
        config: AppConfig,
        gateway: course_core::BoxedInvoiceGateway,
        ipn_secret: String,
        catalog: CourseCatalog,
    ) -> Self {
        let orders: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());

        let urls = RedirectUrls::new(&config.domain_url);
        let checkout = Arc::new(CheckoutService::new(Arc::clone(&orders), gateway, urls));

        let handler = Arc::new(EnrollmentAccessHandler::new(Arc::clone(&users)));
        let reconciler = Arc::new(Reconciler::new(Arc::clone(&orders), handler));

        let tokens = TokenSigner::new(&config.jwt_secret);

        let google = match (&config.google_client_id, &config.google_client_secret) {
            (Some(id), Some(secret)) => Some(Arc::new(GoogleAuthClient::new(
                GoogleAuthConfig::new(id, secret, &config.domain_url),
            ))),
            _ => {
                info!("Google OAuth not configured, /auth/google disabled");
                None
            }
        };

        Self {
            orders,
            users,
            catalog,
            checkout,
            reconciler,
            ipn_secret,
            tokens,
            google,
            config,
        }
    }
}

/// Load course catalog from config file
fn load_course_catalog() -> anyhow::Result<CourseCatalog> {
    let config_paths = [
        "config/courses.toml",
        "../config/courses.toml",
        "../../config/courses.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = CourseCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} courses from {}", catalog.courses.len(), path);
            return Ok(catalog);
        }
    }

    warn!("No course catalog found, using empty catalog");
    Ok(CourseCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("DOMAIN_URL");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.domain_url, "http://localhost:3000");
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            domain_url: "http://localhost:3000".to_string(),
            jwt_secret: "test".to_string(),
            environment: "test".to_string(),
            google_client_id: None,
            google_client_secret: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }
}
