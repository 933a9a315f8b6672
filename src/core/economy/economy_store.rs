// Economy storage port.
//
// Everything the bot's command handlers need to read or change a user's
// economy state goes through the `EconomyStore` trait. Implementations live in
// the infra layer (SQLite for production, in-memory for tests).

use super::economy_models::PlayerBalance;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("economy store was already initialized")]
    AlreadyInitialized,

    #[error("economy store has not been initialized")]
    NotInitialized,

    #[error("storage failure: {0}")]
    StorageFailure(#[from] sqlx::Error),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for balances, timestamps and bans.
///
/// A missing row is never an error: reads fall back to 0, `false` or the Unix
/// epoch, and updates against a missing row do nothing. Call
/// `record_interaction` once per (user, server) before mutating it.
#[async_trait]
pub trait EconomyStore: Send + Sync {
    /// Whether the user has an account. With `server_id == None` any server
    /// counts.
    async fn exists(&self, user_id: &str, server_id: Option<&str>) -> Result<bool, EconomyError>;

    /// Create a default account for the user in this server if there isn't one.
    async fn record_interaction(&self, user_id: &str, server_id: &str)
        -> Result<(), EconomyError>;

    async fn is_banned(&self, user_id: &str) -> Result<bool, EconomyError>;

    async fn ban(&self, user_id: &str) -> Result<(), EconomyError>;

    async fn unban(&self, user_id: &str) -> Result<(), EconomyError>;

    async fn balance(&self, user_id: &str, server_id: &str) -> Result<i64, EconomyError>;

    /// Add `delta` (possibly negative) to the balance. No floor is enforced.
    async fn adjust_balance(
        &self,
        user_id: &str,
        server_id: &str,
        delta: i64,
    ) -> Result<(), EconomyError>;

    /// Move `amount` from one user to another within a server, all or nothing.
    ///
    /// Neither the source's funds nor the existence of either account is
    /// checked; a missing account simply isn't debited or credited.
    async fn transfer_balance(
        &self,
        source_id: &str,
        target_id: &str,
        server_id: &str,
        amount: i64,
    ) -> Result<(), EconomyError>;

    /// Sum of every balance in the server.
    async fn total_balance(&self, server_id: &str) -> Result<i64, EconomyError>;

    async fn last_signon(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<DateTime<Utc>, EconomyError>;

    /// Stamp the signon time with the current time.
    async fn touch_signon(&self, user_id: &str, server_id: &str) -> Result<(), EconomyError>;

    async fn last_imprisonment(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<DateTime<Utc>, EconomyError>;

    /// Stamp the prison time with the current time.
    async fn touch_imprisonment(&self, user_id: &str, server_id: &str)
        -> Result<(), EconomyError>;

    /// Every account in the server as (id, balance). Order is unspecified.
    async fn list_players(&self, server_id: &str) -> Result<Vec<PlayerBalance>, EconomyError>;
}
