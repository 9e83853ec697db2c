//! # Checkout Orchestrator
//!
//! Validates a purchase request, records a pending order, asks the
//! gateway for a hosted invoice, and returns the redirect target.
//!
//! The caller-supplied order ID is the idempotency key: retrying the same
//! checkout returns the previously recorded invoice URL instead of
//! creating a duplicate invoice. A gateway failure leaves the order
//! `Pending` so the caller can retry.

use crate::error::{MarketError, MarketResult};
use crate::gateway::{BoxedInvoiceGateway, InvoiceRequest, RedirectUrls};
use crate::order::Order;
use crate::store::OrderStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A validated-on-entry purchase request
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Price; must be positive
    pub price_amount: Decimal,
    /// Caller-supplied order ID; must be non-empty
    pub order_id: String,
    /// Invoice description; must be non-empty
    pub order_description: String,
    /// Optional success redirect path, sanitized against the base domain
    pub success_url: Option<String>,
    /// Purchasing user, when authenticated
    pub user_id: Option<Uuid>,
    /// Catalog course the order unlocks, when known
    pub course_id: Option<String>,
}

/// Outcome of a successful checkout
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    /// Hosted invoice page to redirect the customer to
    pub hosted_url: String,
    /// Echoed order ID
    pub order_id: String,
}

/// The checkout orchestrator service
pub struct CheckoutService {
    orders: Arc<dyn OrderStore>,
    gateway: BoxedInvoiceGateway,
    urls: RedirectUrls,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        gateway: BoxedInvoiceGateway,
        urls: RedirectUrls,
    ) -> Self {
        Self {
            orders,
            gateway,
            urls,
            currency: "usd".to_string(),
        }
    }

    /// Builder: override the invoice currency (default "usd")
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    fn validate(request: &CheckoutRequest) -> MarketResult<()> {
        if request.price_amount <= Decimal::ZERO {
            return Err(MarketError::InvalidRequest(
                "price_amount must be positive".to_string(),
            ));
        }
        if request.order_id.trim().is_empty() {
            return Err(MarketError::InvalidRequest(
                "order_id must not be empty".to_string(),
            ));
        }
        if request.order_description.trim().is_empty() {
            return Err(MarketError::InvalidRequest(
                "order_description must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Create (or idempotently replay) a checkout for the given request.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_checkout(&self, request: CheckoutRequest) -> MarketResult<CheckoutReceipt> {
        Self::validate(&request)?;

        // Replay detection before touching the gateway: a known order with
        // a recorded invoice answers with the same hosted URL, whether it
        // is still pending or already settled.
        if let Some(existing) = self.orders.get(&request.order_id).await? {
            if let Some(url) = existing.invoice_url.clone() {
                info!(
                    order_id = %existing.order_id,
                    status = %existing.status,
                    "checkout retry, returning recorded invoice"
                );
                return Ok(CheckoutReceipt {
                    hosted_url: url,
                    order_id: existing.order_id,
                });
            }
            if existing.status.is_terminal() {
                // Terminal with no invoice on record: nothing sane to
                // replay, and a fresh invoice would double-charge.
                warn!(order_id = %existing.order_id, status = %existing.status,
                    "checkout retry against settled order without invoice");
                return Err(MarketError::InvalidRequest(format!(
                    "order {} is already {}",
                    existing.order_id, existing.status
                )));
            }
        }

        let mut order = Order::new(
            request.order_id.clone(),
            request.price_amount,
            self.currency.clone(),
            request.order_description.clone(),
        );
        if let Some(user_id) = request.user_id {
            order = order.with_user(user_id);
        }
        if let Some(course_id) = request.course_id.clone() {
            order = order.with_course(course_id);
        }
        let order = self.orders.upsert_pending(order).await?;

        let invoice_request = InvoiceRequest {
            amount: order.amount,
            currency: order.currency.clone(),
            order_id: order.order_id.clone(),
            description: order.description.clone(),
            success_url: self.urls.success_url(request.success_url.as_deref()),
            cancel_url: self.urls.cancel_url(),
            callback_url: self.urls.callback_url(),
        };

        // On gateway failure the order stays Pending; it is NOT marked
        // failed because the payment itself never started.
        let invoice = self.gateway.create_invoice(&invoice_request).await?;

        self.orders
            .set_invoice(&order.order_id, &invoice.id, &invoice.invoice_url)
            .await?;

        info!(
            order_id = %order.order_id,
            invoice_id = %invoice.id,
            gateway = self.gateway.gateway_name(),
            "created hosted invoice"
        );

        Ok(CheckoutReceipt {
            hosted_url: invoice.invoice_url,
            order_id: order.order_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketError;
    use crate::gateway::{Invoice, InvoiceGateway};
    use crate::order::OrderStatus;
    use crate::store::MemoryOrderStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Gateway double: counts calls, optionally fails
    struct FakeGateway {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeGateway {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl InvoiceGateway for FakeGateway {
        async fn create_invoice(&self, request: &InvoiceRequest) -> MarketResult<Invoice> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MarketError::GatewayUnavailable("connection refused".into()));
            }
            Ok(Invoice {
                id: format!("inv-{}", n),
                invoice_url: format!("https://pay.example/{}/{}", request.order_id, n),
            })
        }

        fn gateway_name(&self) -> &'static str {
            "fake"
        }
    }

    fn request(order_id: &str) -> CheckoutRequest {
        CheckoutRequest {
            price_amount: dec!(90.00),
            order_id: order_id.to_string(),
            order_description: "Crypto course".to_string(),
            success_url: None,
            user_id: None,
            course_id: None,
        }
    }

    fn service(
        store: Arc<MemoryOrderStore>,
        gateway: Arc<FakeGateway>,
    ) -> CheckoutService {
        CheckoutService::new(
            store,
            gateway,
            RedirectUrls::new("https://coursecart.dev"),
        )
    }

    #[tokio::test]
    async fn test_checkout_persists_pending_order() {
        let store = Arc::new(MemoryOrderStore::new());
        let receipt = service(Arc::clone(&store), Arc::new(FakeGateway::ok()))
            .create_checkout(request("STARTER_PARK"))
            .await
            .unwrap();

        assert!(!receipt.hosted_url.is_empty());
        let order = store.get("STARTER_PARK").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.invoice_url.as_deref(), Some(receipt.hosted_url.as_str()));
    }

    #[tokio::test]
    async fn test_checkout_is_idempotent() {
        let store = Arc::new(MemoryOrderStore::new());
        let gateway = Arc::new(FakeGateway::ok());
        let svc = service(Arc::clone(&store), Arc::clone(&gateway));

        let first = svc.create_checkout(request("ORD-1")).await.unwrap();
        let second = svc.create_checkout(request("ORD-1")).await.unwrap();

        assert_eq!(first.hosted_url, second.hosted_url);
        // Only one invoice was ever requested from the gateway
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_checkout_replays_after_settlement() {
        let store = Arc::new(MemoryOrderStore::new());
        let svc = service(Arc::clone(&store), Arc::new(FakeGateway::ok()));

        let first = svc.create_checkout(request("ORD-1")).await.unwrap();
        store
            .transition("ORD-1", OrderStatus::Finished)
            .await
            .unwrap();

        let replay = svc.create_checkout(request("ORD-1")).await.unwrap();
        assert_eq!(first.hosted_url, replay.hosted_url);
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_input() {
        let svc = service(
            Arc::new(MemoryOrderStore::new()),
            Arc::new(FakeGateway::ok()),
        );

        let mut bad_amount = request("ORD-1");
        bad_amount.price_amount = dec!(0);
        assert!(matches!(
            svc.create_checkout(bad_amount).await.unwrap_err(),
            MarketError::InvalidRequest(_)
        ));

        let mut bad_id = request("");
        bad_id.order_id = "  ".to_string();
        assert!(matches!(
            svc.create_checkout(bad_id).await.unwrap_err(),
            MarketError::InvalidRequest(_)
        ));

        let mut bad_desc = request("ORD-2");
        bad_desc.order_description = String::new();
        assert!(matches!(
            svc.create_checkout(bad_desc).await.unwrap_err(),
            MarketError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_order_pending() {
        let store = Arc::new(MemoryOrderStore::new());
        let svc = service(Arc::clone(&store), Arc::new(FakeGateway::failing()));

        let err = svc.create_checkout(request("ORD-1")).await.unwrap_err();
        assert!(matches!(err, MarketError::GatewayUnavailable(_)));

        let order = store.get("ORD-1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.invoice_url.is_none());
    }

    #[tokio::test]
    async fn test_retry_after_gateway_failure_succeeds() {
        let store = Arc::new(MemoryOrderStore::new());

        let err = service(Arc::clone(&store), Arc::new(FakeGateway::failing()))
            .create_checkout(request("ORD-1"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let receipt = service(Arc::clone(&store), Arc::new(FakeGateway::ok()))
            .create_checkout(request("ORD-1"))
            .await
            .unwrap();
        assert!(!receipt.hosted_url.is_empty());
    }
}
