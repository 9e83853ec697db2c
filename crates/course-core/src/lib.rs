//! # course-core
//!
//! Core types, stores and services for the coursecart marketplace.
//!
//! This crate provides:
//! - `Order`, `OrderStatus`, and `PaymentEvent` for the payment lifecycle
//! - `CheckoutService` (orchestrator) and `Reconciler` (webhook reconciliation)
//! - `InvoiceGateway` trait for payment gateway implementations
//! - `OrderStore`/`UserStore` data-access traits with in-memory implementations
//! - `Course` and `CourseCatalog` for the course listing
//! - `MarketError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use course_core::{CheckoutRequest, CheckoutService, Reconciler, RedirectUrls};
//!
//! let checkout = CheckoutService::new(orders.clone(), gateway, RedirectUrls::new(domain));
//! let receipt = checkout.create_checkout(request).await?;
//! // Redirect the customer to receipt.hosted_url.
//!
//! // Later, on the IPN callback (after signature verification):
//! let reconciler = Reconciler::new(orders, handler);
//! reconciler.process(&event).await?;
//! ```

pub mod checkout;
pub mod course;
pub mod error;
pub mod gateway;
pub mod order;
pub mod reconcile;
pub mod store;
pub mod user;

// Re-exports for convenience
pub use checkout::{CheckoutReceipt, CheckoutRequest, CheckoutService};
pub use course::{Course, CourseCatalog};
pub use error::{MarketError, MarketResult};
pub use gateway::{BoxedInvoiceGateway, Invoice, InvoiceGateway, InvoiceRequest, RedirectUrls};
pub use order::{Order, OrderStatus, PaymentEvent};
pub use reconcile::{AccessHandler, LoggingAccessHandler, ReconcileOutcome, Reconciler};
pub use store::{
    MemoryOrderStore, MemoryUserStore, OrderStore, TransitionOutcome, UserStore,
};
pub use user::{Enrollment, User};
