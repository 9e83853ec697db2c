//! # Request Handlers
//!
//! Axum handlers for checkout, webhook reconciliation, the course
//! catalog, and health.
//!
//! The webhook handler is the one place where HTTP status does not track
//! the error taxonomy: only an unverifiable or undecodable payload earns
//! a 400. Unknown orders, duplicates, conflicts and amount mismatches are
//! acknowledged with 200 so the gateway stops redelivering.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use course_core::{CheckoutRequest, MarketError};
use course_nowpay::{verify_and_parse, SIGNATURE_HEADER};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout request (wire names follow the gateway convention)
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Price in the storefront currency
    pub price_amount: Decimal,
    /// Caller-supplied order ID (idempotency key)
    pub order_id: String,
    /// Description shown on the hosted invoice
    pub order_description: String,
    /// Optional success redirect path (sanitized server-side)
    #[serde(default)]
    pub success_url: Option<String>,
    /// Catalog course this order unlocks (optional)
    #[serde(default)]
    pub course_id: Option<String>,
}

/// Create checkout response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    /// Hosted invoice URL (redirect the customer here)
    pub hosted_url: String,
    /// Echoed order ID
    pub order_id: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

pub(crate) fn market_error_to_response(err: MarketError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Create a hosted invoice for a purchase
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    // Course lookup is advisory: an order may reference a catalog entry,
    // but ad-hoc order IDs from the storefront are accepted as-is.
    let course_id = request
        .course_id
        .as_deref()
        .and_then(|id| state.catalog.get(id))
        .map(|c| c.id.clone());

    let receipt = state
        .checkout
        .create_checkout(CheckoutRequest {
            price_amount: request.price_amount,
            order_id: request.order_id,
            order_description: request.order_description,
            success_url: request.success_url,
            user_id: None,
            course_id,
        })
        .await
        .map_err(|e| {
            error!("Failed to create checkout: {}", e);
            market_error_to_response(e)
        })?;

    Ok(Json(CreateCheckoutResponse {
        hosted_url: receipt.hosted_url,
        order_id: receipt.order_id,
    }))
}

/// Handle a NOWPayments IPN event.
///
/// The body is taken as raw bytes because the signature check must run
/// over the exact payload received, before any JSON parsing.
#[instrument(skip(state, headers, body))]
pub async fn payments_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), (StatusCode, Json<ErrorResponse>)> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let event =
        verify_and_parse(&state.ipn_secret, &body, signature).map_err(|e| {
            warn!("Webhook rejected: {}", e);
            market_error_to_response(e)
        })?;

    info!(
        order_id = %event.order_id,
        status = %event.payment_status,
        "received payment event"
    );

    match state.reconciler.process(&event).await {
        Ok(outcome) => {
            info!(order_id = %event.order_id, ?outcome, "webhook reconciled");
            Ok((StatusCode::OK, "Webhook processed"))
        }
        Err(e) => {
            // Store-level failure: let the gateway redeliver; the
            // reconciler is idempotent under redelivery.
            error!(order_id = %event.order_id, "webhook reconciliation error: {}", e);
            Err(market_error_to_response(MarketError::Internal(
                "reconciliation failed".to_string(),
            )))
        }
    }
}

/// List active courses
pub async fn list_courses(State(state): State<AppState>) -> impl IntoResponse {
    let courses: Vec<_> = state.catalog.active_courses().collect();
    Json(serde_json::json!({
        "courses": courses,
        "count": courses.len(),
    }))
}

/// Get a single course
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let course = state.catalog.get(&course_id).ok_or_else(|| {
        market_error_to_response(MarketError::CourseNotFound {
            course_id: course_id.clone(),
        })
    })?;

    Ok(Json(course.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
    }

    #[test]
    fn test_market_error_conversion() {
        let err = MarketError::InvalidRequest("bad data".to_string());
        let (status, _json) = market_error_to_response(err);
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let err = MarketError::GatewayUnavailable("timeout".to_string());
        let (status, _json) = market_error_to_response(err);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
