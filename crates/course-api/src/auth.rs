//! # Authentication
//!
//! Password registration/login and the Google OAuth two-step flow.
//!
//! OAuth is modeled as an explicit protocol: the login redirect carries a
//! signed, time-bounded `state` token, and the callback verifies that
//! token before exchanging the authorization code. No server-side session
//! store is involved.

use crate::handlers::{market_error_to_response, ErrorResponse};
use crate::state::AppState;
use crate::token::TokenPurpose;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use course_core::{MarketError, MarketResult, User};
use rand::rngs::OsRng;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Password hashing
// =============================================================================

/// Hash a password with Argon2id (PHC string output)
pub fn hash_password(password: &str) -> MarketResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MarketError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC hash
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Register / Login
// =============================================================================

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Affiliate referral code, recorded on the account
    #[serde(default)]
    pub referral: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// Login request; `login_id` accepts username or email
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login_id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub email: String,
}

fn validate_registration(request: &RegisterRequest) -> MarketResult<()> {
    if request.username.trim().is_empty() {
        return Err(MarketError::InvalidRequest(
            "username must not be empty".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(MarketError::InvalidRequest("invalid email".to_string()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(MarketError::InvalidRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Register a new password-based account
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, Json<ErrorResponse>)> {
    validate_registration(&request).map_err(market_error_to_response)?;

    let hash = hash_password(&request.password).map_err(market_error_to_response)?;

    let mut user = User::new_local(request.username.trim(), request.email.trim(), hash);
    if let Some(code) = request.referral.as_deref().filter(|c| !c.is_empty()) {
        user = user.with_referral(code);
    }

    let user = state
        .users
        .insert(user)
        .await
        .map_err(market_error_to_response)?;

    info!(username = %user.username, "registered new user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful.".to_string(),
        }),
    ))
}

/// Log in and receive a session token
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .users
        .find_by_login(&request.login_id)
        .await
        .map_err(market_error_to_response)?;

    // Same error for missing user, OAuth-only accounts and wrong
    // passwords; no account enumeration through the login endpoint.
    let user = match user {
        Some(u) => u,
        None => return Err(market_error_to_response(MarketError::InvalidCredentials)),
    };
    let verified = user
        .password_hash
        .as_deref()
        .map(|hash| verify_password(hash, &request.password))
        .unwrap_or(false);
    if !verified {
        return Err(market_error_to_response(MarketError::InvalidCredentials));
    }

    let token = state.tokens.issue_session(user.id);
    info!(username = %user.username, "login successful");

    Ok(Json(LoginResponse {
        token,
        user: UserSummary {
            username: user.username,
            email: user.email,
        },
    }))
}

// =============================================================================
// Google OAuth
// =============================================================================

/// Google OAuth endpoints and credentials.
///
/// Endpoint URLs are fields so tests can point the client at a mock
/// server.
#[derive(Debug, Clone)]
pub struct GoogleAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Our callback URL registered with Google
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl GoogleAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        domain: &str,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: format!("{}/auth/google/callback", domain),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
        }
    }
}

/// Profile fields fetched after code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account ID
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// Outbound client for the Google OAuth endpoints
pub struct GoogleAuthClient {
    config: GoogleAuthConfig,
    client: reqwest::Client,
}

impl GoogleAuthClient {
    pub fn new(config: GoogleAuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Build the Google authorization redirect URL
    pub fn authorize_url(&self, state: &str) -> MarketResult<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
            ],
        )
        .map_err(|e| MarketError::Internal(format!("bad auth URL: {}", e)))?;
        Ok(url.into())
    }

    /// Exchange an authorization code for the user's profile
    pub async fn exchange_code(&self, code: &str) -> MarketResult<GoogleProfile> {
        let token: TokenExchangeResponse = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| MarketError::GatewayUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| MarketError::GatewayUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| MarketError::GatewayUnavailable(e.to_string()))?;

        self.client
            .get(&self.config.userinfo_url)
            .bearer_auth(token.access_token)
            .send()
            .await
            .map_err(|e| MarketError::GatewayUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| MarketError::GatewayUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| MarketError::GatewayUnavailable(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackParams {
    pub code: String,
    pub state: String,
}

/// Step one: redirect to Google with a signed state token
pub async fn google_login(
    State(state): State<AppState>,
) -> Result<Redirect, (StatusCode, Json<ErrorResponse>)> {
    let Some(google) = state.google.as_ref() else {
        return Err(market_error_to_response(MarketError::Configuration(
            "Google OAuth not configured".to_string(),
        )));
    };

    let oauth_state = state.tokens.issue_state();
    let url = google
        .authorize_url(&oauth_state)
        .map_err(market_error_to_response)?;
    Ok(Redirect::temporary(&url))
}

/// Step two: verify state, exchange the code, issue a session
#[instrument(skip(state, params))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<GoogleCallbackParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let Some(google) = state.google.as_ref() else {
        return Err(market_error_to_response(MarketError::Configuration(
            "Google OAuth not configured".to_string(),
        )));
    };

    // State verification first: an expired or forged state means this
    // callback was not issued by us, so the code is never exchanged.
    if let Err(e) = state.tokens.verify(&params.state, TokenPurpose::OauthState) {
        warn!("OAuth callback with invalid state: {}", e);
        return Err(market_error_to_response(e));
    }

    let profile = google.exchange_code(&params.code).await.map_err(|e| {
        error!("OAuth code exchange failed: {}", e);
        market_error_to_response(e)
    })?;

    let username = profile.name.unwrap_or_else(|| profile.email.clone());
    let user = state
        .users
        .upsert_google(&profile.sub, &username, &profile.email)
        .await
        .map_err(market_error_to_response)?;

    let token = state.tokens.issue_session(user.id);
    info!(username = %user.username, "Google login successful");

    // Hand the session token to the SPA via the redirect fragment
    Ok(Redirect::temporary(&format!(
        "{}/#token={}",
        state.config.domain_url, token
    )))
}
