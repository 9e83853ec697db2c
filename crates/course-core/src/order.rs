//! # Order Types
//!
//! Orders and gateway payment events for the checkout flow.
//!
//! An [`Order`] is created when checkout is initiated and is keyed by a
//! caller-supplied `order_id`, which doubles as the idempotency key for
//! checkout retries and duplicate webhook deliveries. Orders are never
//! deleted; they form the audit trail of every purchase attempt.

use crate::error::{MarketError, MarketResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment lifecycle status of an order.
///
/// The status moves only forward: `Pending → Finished | Failed`.
/// A terminal status is immutable; duplicate webhook deliveries for a
/// terminal order are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Invoice issued, awaiting a terminal gateway event
    Pending,
    /// Payment confirmed by the gateway
    Finished,
    /// Payment failed or expired at the gateway
    Failed,
    /// Payment refunded after completion (set out-of-band, kept for audit)
    Refunded,
}

impl OrderStatus {
    /// Terminal statuses can never be overwritten
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Finished => "finished",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A purchase attempt, keyed by the caller-supplied order ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Caller-supplied unique order ID (idempotency key)
    pub order_id: String,

    /// Price recorded at checkout time
    pub amount: Decimal,

    /// Currency code recorded at checkout time (e.g., "usd")
    pub currency: String,

    /// Human-readable description shown on the hosted invoice
    pub description: String,

    /// Payment lifecycle status, mutated only by the reconciler
    pub status: OrderStatus,

    /// Gateway invoice ID, set once the invoice is created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,

    /// Hosted invoice URL returned to the caller for redirect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_url: Option<String>,

    /// Course being purchased, when the order ID maps to a catalog entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,

    /// Purchasing user, when the checkout was authenticated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new pending order
    pub fn new(
        order_id: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            amount,
            currency: currency.into(),
            description: description.into(),
            status: OrderStatus::Pending,
            invoice_id: None,
            invoice_url: None,
            course_id: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    /// Builder: attribute the purchase to a user
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Builder: link the order to a catalog course
    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    /// Check whether an incoming amount/currency pair matches what was
    /// recorded at checkout time. Currency comparison is case-insensitive.
    pub fn amount_matches(&self, amount: Decimal, currency: &str) -> bool {
        self.amount == amount && self.currency.eq_ignore_ascii_case(currency)
    }
}

/// A payment-status notification pushed by the gateway (IPN event).
///
/// Delivery is at-least-once; the reconciler must treat every event as
/// potentially duplicated or out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Order this event refers to
    pub order_id: String,

    /// Gateway status string ("waiting", "finished", "failed", ...)
    pub payment_status: String,

    /// Invoice price as reported by the gateway
    pub price_amount: Decimal,

    /// Invoice currency as reported by the gateway
    pub price_currency: String,

    /// Gateway-side payment ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<i64>,

    /// Crypto currency the customer actually paid with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_currency: Option<String>,

    /// Amount actually received, in `pay_currency`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actually_paid: Option<Decimal>,
}

impl PaymentEvent {
    /// Parse an event from the raw webhook body.
    ///
    /// Must be called only after signature verification, on the exact
    /// bytes that were verified.
    pub fn from_slice(payload: &[u8]) -> MarketResult<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| MarketError::MalformedWebhook(format!("undecodable payload: {}", e)))
    }

    /// Map the gateway status string onto a recognized terminal order
    /// status. Intermediate and unknown statuses return `None` and are
    /// acknowledged without any state change (forward-compatible with
    /// gateway statuses not yet modeled).
    pub fn terminal_status(&self) -> Option<OrderStatus> {
        match self.payment_status.as_str() {
            "finished" => Some(OrderStatus::Finished),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_terminality() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Finished.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = Order::new("STARTER_PARK", dec!(90.00), "usd", "Crypto course");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.invoice_url.is_none());
    }

    #[test]
    fn test_amount_matching() {
        let order = Order::new("ORD-1", dec!(90.00), "usd", "Crypto course");
        assert!(order.amount_matches(dec!(90.00), "usd"));
        assert!(order.amount_matches(dec!(90.00), "USD"));
        assert!(!order.amount_matches(dec!(9.00), "usd"));
        assert!(!order.amount_matches(dec!(90.00), "eur"));
    }

    #[test]
    fn test_parse_payment_event() {
        let body = br#"{
            "payment_id": 123456789,
            "order_id": "STARTER_PARK",
            "payment_status": "finished",
            "price_amount": 90.00,
            "price_currency": "usd",
            "pay_currency": "btc",
            "actually_paid": 0.0015
        }"#;

        let event = PaymentEvent::from_slice(body).unwrap();
        assert_eq!(event.order_id, "STARTER_PARK");
        assert_eq!(event.terminal_status(), Some(OrderStatus::Finished));
        assert_eq!(event.price_amount, dec!(90.00));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = PaymentEvent::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, MarketError::MalformedWebhook(_)));
    }

    #[test]
    fn test_intermediate_statuses_not_terminal() {
        for status in ["waiting", "confirming", "sending", "partially_paid", "refunded"] {
            let event = PaymentEvent {
                order_id: "ORD-1".into(),
                payment_status: status.into(),
                price_amount: Decimal::ONE,
                price_currency: "usd".into(),
                payment_id: None,
                pay_currency: None,
                actually_paid: None,
            };
            assert_eq!(event.terminal_status(), None, "status {}", status);
        }
    }
}
