//! # User Types
//!
//! User records for the marketplace. The payment flow consumes users
//! read-only to attribute a purchase; enrollment is the "grant access"
//! side effect triggered by the reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A course enrollment, recorded when a payment finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    /// Course granted
    pub course_id: String,

    /// Order that paid for the enrollment
    pub order_id: String,

    /// When access was granted
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(course_id: impl Into<String>, order_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            order_id: order_id.into(),
            enrolled_at: Utc::now(),
        }
    }
}

/// A registered user (password or Google OAuth)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Internal user ID
    pub id: Uuid,

    /// Unique display name
    pub username: String,

    /// Unique email (lowercased on creation)
    pub email: String,

    /// Argon2 PHC hash; absent for OAuth-only accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Google account ID for OAuth users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,

    /// Referral code supplied at registration, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,

    /// Courses this user has paid access to
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last successful login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Create a password-based user
    pub fn new_local(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into().to_lowercase(),
            password_hash: Some(password_hash.into()),
            google_id: None,
            referred_by: None,
            enrollments: Vec::new(),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    /// Create a Google OAuth user (no local password)
    pub fn new_google(
        google_id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into().to_lowercase(),
            password_hash: None,
            google_id: Some(google_id.into()),
            referred_by: None,
            enrollments: Vec::new(),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    /// Builder: record the referral code used at signup
    pub fn with_referral(mut self, code: impl Into<String>) -> Self {
        self.referred_by = Some(code.into());
        self
    }

    /// Check whether the user already has access to a course
    pub fn is_enrolled(&self, course_id: &str) -> bool {
        self.enrollments.iter().any(|e| e.course_id == course_id)
    }
}
