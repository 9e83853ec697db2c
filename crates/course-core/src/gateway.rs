//! # Invoice Gateway Trait
//!
//! Seam between the checkout orchestrator and the external payment
//! gateway. The gateway is an opaque collaborator: it either returns a
//! hosted invoice or fails, and the orchestrator surfaces that failure to
//! the caller. No retry/backoff lives behind this trait.

use crate::error::MarketResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for creating a hosted invoice
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRequest {
    /// Invoice price
    pub amount: Decimal,

    /// Invoice currency code (e.g., "usd")
    pub currency: String,

    /// Caller-supplied order ID (idempotency key)
    pub order_id: String,

    /// Description shown on the hosted invoice page
    pub description: String,

    /// Where the gateway redirects the customer after payment
    pub success_url: String,

    /// Where the gateway redirects on cancel
    pub cancel_url: String,

    /// Server-reachable URL the gateway pushes status events to
    pub callback_url: String,
}

/// A hosted invoice created by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Gateway-side invoice ID
    pub id: String,

    /// Hosted checkout page to redirect the customer to
    pub invoice_url: String,
}

/// Trait for payment gateway implementations
#[async_trait]
pub trait InvoiceGateway: Send + Sync {
    /// Create a hosted invoice for an order.
    ///
    /// Network errors and non-2xx responses surface as
    /// `MarketError::GatewayUnavailable`; the caller may retry with the
    /// same order ID.
    async fn create_invoice(&self, request: &InvoiceRequest) -> MarketResult<Invoice>;

    /// Gateway name (for logging)
    fn gateway_name(&self) -> &'static str;
}

/// Type alias for a shared gateway handle (dynamic dispatch)
pub type BoxedInvoiceGateway = Arc<dyn InvoiceGateway>;

/// Redirect URL construction for checkout.
///
/// Caller-supplied success paths are sanitized (leading slash stripped)
/// and joined to the configured base domain, so a request can never
/// redirect off-site.
#[derive(Debug, Clone)]
pub struct RedirectUrls {
    /// Base domain of the application (e.g., "https://coursecart.dev")
    pub domain: String,
    /// Default success page when the request names none
    pub default_success_path: String,
}

impl RedirectUrls {
    pub fn new(domain: impl Into<String>) -> Self {
        let mut domain: String = domain.into();
        while domain.ends_with('/') {
            domain.pop();
        }
        Self {
            domain,
            default_success_path: "course-unlocked".to_string(),
        }
    }

    /// Absolute success URL for a checkout request
    pub fn success_url(&self, requested_path: Option<&str>) -> String {
        let path = requested_path
            .map(|p| p.trim_start_matches('/'))
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_success_path);
        format!("{}/{}", self.domain, path)
    }

    /// Cancel URL (the storefront itself)
    pub fn cancel_url(&self) -> String {
        self.domain.clone()
    }

    /// Server-reachable webhook callback URL
    pub fn callback_url(&self) -> String {
        format!("{}/api/payments/webhook", self.domain)
    }
}

impl Default for RedirectUrls {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}
