//! # course-api
//!
//! HTTP API layer for coursecart-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for checkout, courses, and accounts
//! - NOWPayments IPN webhook handler
//! - Google OAuth login flow
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/health` | Health check |
//! | GET | `/api/courses` | List active courses |
//! | GET | `/api/courses/:id` | Get course |
//! | POST | `/api/create-checkout` | Create hosted invoice |
//! | POST | `/api/payments/webhook` | NOWPayments IPN |
//! | POST | `/api/register` | Password registration |
//! | POST | `/api/login` | Password login |
//! | GET | `/auth/google` | Start Google OAuth |
//! | GET | `/auth/google/callback` | Finish Google OAuth |
//! | GET | `/api/affiliate/:code` | Referral signup stats |

pub mod affiliate;
pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod token;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
