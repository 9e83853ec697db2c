//! # course-nowpay
//!
//! NOWPayments gateway integration for coursecart-rs.
//!
//! This crate provides:
//! - `NowPaymentsGateway` implementing `course_core::InvoiceGateway`
//! - IPN signature verification (`ipn` module)
//! - `NowPaymentsConfig` loaded from environment variables

pub mod config;
pub mod invoice;
pub mod ipn;

pub use config::NowPaymentsConfig;
pub use invoice::NowPaymentsGateway;
pub use ipn::{compute_signature, verify_and_parse, verify_signature, SIGNATURE_HEADER};
