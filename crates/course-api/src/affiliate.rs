//! # Affiliate Sub-Service
//!
//! Referral codes are free-form strings recorded at registration; the
//! stats endpoint counts signups attributed to a code.

use crate::handlers::{market_error_to_response, ErrorResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

/// Referral stats for one affiliate code
#[derive(Debug, Serialize)]
pub struct AffiliateStats {
    pub referral_code: String,
    /// Registrations that carried this code
    pub signups: u64,
}

/// Get signup stats for a referral code
pub async fn affiliate_stats(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<AffiliateStats>, (StatusCode, Json<ErrorResponse>)> {
    let signups = state
        .users
        .count_referrals(&code)
        .await
        .map_err(market_error_to_response)?;

    Ok(Json(AffiliateStats {
        referral_code: code,
        signups,
    }))
}
