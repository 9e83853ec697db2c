//! # Data Access Traits
//!
//! Dependency-injected store handles, constructed once at process start
//! and passed into each component explicitly. No module-level connection
//! singletons.
//!
//! [`OrderStore::transition`] is the single-writer gate of the whole
//! payment flow: a status write succeeds only if the record is still
//! `Pending`, so concurrent duplicate webhooks and checkout retries stay
//! safe without a global lock.

use crate::error::{MarketError, MarketResult};
use crate::order::{Order, OrderStatus};
use crate::user::{Enrollment, User};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Result of a compare-and-set status transition
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// Order was pending and is now in the requested terminal status.
    /// Carries the updated record; downstream side effects fire exactly
    /// once, on this arm only.
    Applied(Order),
    /// Order was already terminal; carries the untouched record
    AlreadyTerminal(Order),
    /// No order with this ID exists
    NotFound,
}

/// Persistence handle for orders.
///
/// Orders are never deleted (audit trail).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetch an order by ID
    async fn get(&self, order_id: &str) -> MarketResult<Option<Order>>;

    /// Create the order if absent, otherwise return the stored record
    /// untouched. Checkout retries with the same order ID land here.
    async fn upsert_pending(&self, order: Order) -> MarketResult<Order>;

    /// Record the gateway invoice on an order after creation
    async fn set_invoice(
        &self,
        order_id: &str,
        invoice_id: &str,
        invoice_url: &str,
    ) -> MarketResult<()>;

    /// Compare-and-set status transition: applies `next` only if the
    /// order is still `Pending`. `next` must be terminal.
    async fn transition(
        &self,
        order_id: &str,
        next: OrderStatus,
    ) -> MarketResult<TransitionOutcome>;
}

/// Persistence handle for users
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> MarketResult<Option<User>>;

    /// Look up by username or email (login accepts either)
    async fn find_by_login(&self, login: &str) -> MarketResult<Option<User>>;

    async fn find_by_google_id(&self, google_id: &str) -> MarketResult<Option<User>>;

    /// Insert a new user; fails with `DuplicateUser` on a username or
    /// email clash.
    async fn insert(&self, user: User) -> MarketResult<User>;

    /// Find-or-create for the OAuth callback, keyed by Google ID
    async fn upsert_google(
        &self,
        google_id: &str,
        username: &str,
        email: &str,
    ) -> MarketResult<User>;

    /// Record a paid enrollment on a user
    async fn enroll(&self, user_id: Uuid, enrollment: Enrollment) -> MarketResult<()>;

    /// Count signups that used a given referral code
    async fn count_referrals(&self, code: &str) -> MarketResult<u64>;
}

/// In-memory order store backed by an async `RwLock`.
///
/// The write lock makes `transition` atomic: readers of the map never
/// observe a half-applied status change.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get(&self, order_id: &str) -> MarketResult<Option<Order>> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn upsert_pending(&self, order: Order) -> MarketResult<Order> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .entry(order.order_id.clone())
            .or_insert(order)
            .clone();
        Ok(stored)
    }

    async fn set_invoice(
        &self,
        order_id: &str,
        invoice_id: &str,
        invoice_url: &str,
    ) -> MarketResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id).ok_or_else(|| MarketError::UnknownOrder {
            order_id: order_id.to_string(),
        })?;
        order.invoice_id = Some(invoice_id.to_string());
        order.invoice_url = Some(invoice_url.to_string());
        Ok(())
    }

    async fn transition(
        &self,
        order_id: &str,
        next: OrderStatus,
    ) -> MarketResult<TransitionOutcome> {
        if !next.is_terminal() {
            return Err(MarketError::Internal(format!(
                "transition target must be terminal, got {}",
                next
            )));
        }

        let mut orders = self.orders.write().await;
        match orders.get_mut(order_id) {
            None => Ok(TransitionOutcome::NotFound),
            Some(order) if order.status.is_terminal() => {
                Ok(TransitionOutcome::AlreadyTerminal(order.clone()))
            }
            Some(order) => {
                order.status = next;
                Ok(TransitionOutcome::Applied(order.clone()))
            }
        }
    }
}

/// In-memory user store backed by an async `RwLock`
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> MarketResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> MarketResult<Option<User>> {
        let login_lower = login.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == login || u.email == login_lower)
            .cloned())
    }

    async fn find_by_google_id(&self, google_id: &str) -> MarketResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn insert(&self, user: User) -> MarketResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(MarketError::DuplicateUser(user.username));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn upsert_google(
        &self,
        google_id: &str,
        username: &str,
        email: &str,
    ) -> MarketResult<User> {
        let mut users = self.users.write().await;
        if let Some(existing) = users
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
        {
            return Ok(existing.clone());
        }
        let user = User::new_google(google_id, username, email);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn enroll(&self, user_id: Uuid, enrollment: Enrollment) -> MarketResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or_else(|| {
            MarketError::Internal(format!("enrollment for unknown user {}", user_id))
        })?;
        // Duplicate grants are harmless but keep the record clean
        if !user.is_enrolled(&enrollment.course_id) {
            user.enrollments.push(enrollment);
        }
        Ok(())
    }

    async fn count_referrals(&self, code: &str) -> MarketResult<u64> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.referred_by.as_deref() == Some(code))
            .count() as u64)
    }
}
