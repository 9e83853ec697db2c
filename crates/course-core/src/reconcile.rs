//! # Webhook Reconciler
//!
//! Applies asynchronous gateway payment events to order state.
//!
//! Delivery is at-least-once, so every step is idempotent: duplicate
//! events for a terminal order are acknowledged as no-ops, conflicting
//! events never downgrade a terminal order, and the compare-and-set
//! transition in the store is the single-writer gate that makes the
//! "grant access" side effect fire exactly once.

use crate::error::MarketResult;
use crate::order::{Order, OrderStatus, PaymentEvent};
use crate::store::{OrderStore, TransitionOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Downstream side effects of reconciliation.
///
/// Implementations receive each callback at most once per order; the
/// reconciler only invokes them after winning the status transition.
#[async_trait]
#[allow(unused_variables)]
pub trait AccessHandler: Send + Sync {
    /// Payment confirmed; grant the customer access to what they bought
    async fn grant_access(&self, order: &Order) -> MarketResult<()> {
        info!(order_id = %order.order_id, amount = %order.amount,
            "payment confirmed, access granted");
        Ok(())
    }

    /// Payment reached a failed terminal state
    async fn payment_failed(&self, order: &Order) -> MarketResult<()> {
        info!(order_id = %order.order_id, "payment failed");
        Ok(())
    }

    /// Event disagreed with the checkout record; needs a human
    async fn flag_for_review(&self, order: &Order, event: &PaymentEvent) -> MarketResult<()> {
        warn!(
            order_id = %order.order_id,
            expected_amount = %order.amount,
            received_amount = %event.price_amount,
            "amount mismatch flagged for manual review"
        );
        Ok(())
    }
}

/// Default handler that just logs every outcome
pub struct LoggingAccessHandler;

impl AccessHandler for LoggingAccessHandler {}

/// What the reconciler decided about an event.
///
/// Every variant except `Transitioned` leaves order state untouched. All
/// of them are acknowledged to the gateway with HTTP 200; only payloads
/// that fail verification or decoding earn a 400, and that happens before
/// the reconciler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Order moved to the given terminal status; side effect fired
    Transitioned(OrderStatus),
    /// Redelivery of an already-applied terminal event
    Duplicate,
    /// Event conflicts with the recorded terminal status; not applied
    Conflict,
    /// No order with this ID was ever issued; acknowledged and dropped
    UnknownOrder,
    /// Amount/currency disagreed with the checkout record; flagged
    AmountMismatch,
    /// Intermediate or unrecognized gateway status; nothing to do
    Ignored,
}

/// The webhook reconciliation service
pub struct Reconciler {
    orders: Arc<dyn OrderStore>,
    handler: Arc<dyn AccessHandler>,
}

impl Reconciler {
    pub fn new(orders: Arc<dyn OrderStore>, handler: Arc<dyn AccessHandler>) -> Self {
        Self { orders, handler }
    }

    /// Reconcile one gateway event against order state.
    #[instrument(skip(self, event), fields(order_id = %event.order_id, status = %event.payment_status))]
    pub async fn process(&self, event: &PaymentEvent) -> MarketResult<ReconcileOutcome> {
        let Some(order) = self.orders.get(&event.order_id).await? else {
            // The gateway must not retry forever on an event for an order
            // this system never issued: acknowledge and drop.
            warn!(order_id = %event.order_id, "event for unknown order, acknowledged and dropped");
            return Ok(ReconcileOutcome::UnknownOrder);
        };

        if order.status.is_terminal() {
            return Ok(self.reconcile_terminal(&order, event));
        }

        let Some(next) = event.terminal_status() else {
            debug!(order_id = %order.order_id, gateway_status = %event.payment_status,
                "intermediate status, no state change");
            return Ok(ReconcileOutcome::Ignored);
        };

        if !order.amount_matches(event.price_amount, &event.price_currency) {
            self.handler.flag_for_review(&order, event).await?;
            return Ok(ReconcileOutcome::AmountMismatch);
        }

        // CAS: only the event that finds the order still pending wins the
        // transition; concurrent redeliveries observe AlreadyTerminal.
        match self.orders.transition(&order.order_id, next).await? {
            TransitionOutcome::Applied(updated) => {
                match next {
                    OrderStatus::Finished => self.handler.grant_access(&updated).await?,
                    OrderStatus::Failed => self.handler.payment_failed(&updated).await?,
                    _ => {}
                }
                info!(order_id = %updated.order_id, status = %next, "order reconciled");
                Ok(ReconcileOutcome::Transitioned(next))
            }
            TransitionOutcome::AlreadyTerminal(current) => {
                Ok(self.reconcile_terminal(&current, event))
            }
            TransitionOutcome::NotFound => {
                warn!(order_id = %event.order_id, "order disappeared during reconciliation");
                Ok(ReconcileOutcome::UnknownOrder)
            }
        }
    }

    /// Duplicate/out-of-order handling for an order already settled.
    /// Never downgrades a terminal order.
    fn reconcile_terminal(&self, order: &Order, event: &PaymentEvent) -> ReconcileOutcome {
        match event.terminal_status() {
            Some(status) if status == order.status => {
                debug!(order_id = %order.order_id, status = %order.status,
                    "duplicate terminal event, no-op");
                ReconcileOutcome::Duplicate
            }
            _ => {
                warn!(
                    order_id = %order.order_id,
                    recorded = %order.status,
                    incoming = %event.payment_status,
                    "conflicting event for terminal order, state unchanged"
                );
                ReconcileOutcome::Conflict
            }
        }
    }
}
