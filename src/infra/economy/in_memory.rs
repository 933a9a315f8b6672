// In-memory implementation of EconomyStore.
//
// Behaves like the SQLite store (same defaults, same no-ops on missing
// accounts) but nothing survives the process. Handy for tests of code that
// sits on top of the store.

use crate::core::economy::{
    timestamp_or_epoch, AccountKey, EconomyError, EconomyStore, PlayerBalance,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Data we store for each user in each server.
#[derive(Clone, Debug, Default)]
struct StoredAccount {
    balance: i64,
    last_signon: i64,
    last_stretch: i64,
}

/// In-memory implementation of EconomyStore.
///
/// Accounts sit behind a single async RwLock so a transfer's debit and credit
/// are applied under one write guard. Bans are independent of accounts and
/// live in a DashSet.
#[derive(Default)]
pub struct InMemoryEconomyStore {
    accounts: RwLock<HashMap<AccountKey, StoredAccount>>,
    bans: DashSet<String>,
}

impl InMemoryEconomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_account<T>(
        &self,
        user_id: &str,
        server_id: &str,
        field: impl FnOnce(&StoredAccount) -> T,
    ) -> Option<T> {
        let accounts = self.accounts.read().await;
        accounts.get(&AccountKey::new(user_id, server_id)).map(field)
    }

    async fn update_account(
        &self,
        user_id: &str,
        server_id: &str,
        update: impl FnOnce(&mut StoredAccount),
    ) {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&AccountKey::new(user_id, server_id)) {
            update(account);
        }
    }
}

#[async_trait]
impl EconomyStore for InMemoryEconomyStore {
    async fn exists(&self, user_id: &str, server_id: Option<&str>) -> Result<bool, EconomyError> {
        let accounts = self.accounts.read().await;
        Ok(match server_id {
            Some(server_id) => accounts.contains_key(&AccountKey::new(user_id, server_id)),
            None => accounts.keys().any(|key| key.user_id == user_id),
        })
    }

    async fn record_interaction(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<(), EconomyError> {
        let mut accounts = self.accounts.write().await;
        accounts
            .entry(AccountKey::new(user_id, server_id))
            .or_default();
        Ok(())
    }

    async fn is_banned(&self, user_id: &str) -> Result<bool, EconomyError> {
        Ok(self.bans.contains(user_id))
    }

    async fn ban(&self, user_id: &str) -> Result<(), EconomyError> {
        self.bans.insert(user_id.to_string());
        Ok(())
    }

    async fn unban(&self, user_id: &str) -> Result<(), EconomyError> {
        self.bans.remove(user_id);
        Ok(())
    }

    async fn balance(&self, user_id: &str, server_id: &str) -> Result<i64, EconomyError> {
        Ok(self
            .read_account(user_id, server_id, |a| a.balance)
            .await
            .unwrap_or(0))
    }

    async fn adjust_balance(
        &self,
        user_id: &str,
        server_id: &str,
        delta: i64,
    ) -> Result<(), EconomyError> {
        // Saturate at the i64 bounds, same as the SQLite store
        self.update_account(user_id, server_id, |a| a.balance = a.balance.saturating_add(delta))
            .await;
        Ok(())
    }

    async fn transfer_balance(
        &self,
        source_id: &str,
        target_id: &str,
        server_id: &str,
        amount: i64,
    ) -> Result<(), EconomyError> {
        let mut accounts = self.accounts.write().await;
        if let Some(source) = accounts.get_mut(&AccountKey::new(source_id, server_id)) {
            source.balance = source.balance.saturating_add(amount.saturating_neg());
        }
        if let Some(target) = accounts.get_mut(&AccountKey::new(target_id, server_id)) {
            target.balance = target.balance.saturating_add(amount);
        }
        Ok(())
    }

    async fn total_balance(&self, server_id: &str) -> Result<i64, EconomyError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .filter(|(key, _)| key.server_id == server_id)
            .fold(0i64, |total, (_, account)| total.saturating_add(account.balance)))
    }

    async fn last_signon(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<DateTime<Utc>, EconomyError> {
        let seconds = self.read_account(user_id, server_id, |a| a.last_signon).await;
        Ok(timestamp_or_epoch(seconds))
    }

    async fn touch_signon(&self, user_id: &str, server_id: &str) -> Result<(), EconomyError> {
        let now = Utc::now().timestamp();
        self.update_account(user_id, server_id, |a| a.last_signon = now).await;
        Ok(())
    }

    async fn last_imprisonment(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<DateTime<Utc>, EconomyError> {
        let seconds = self.read_account(user_id, server_id, |a| a.last_stretch).await;
        Ok(timestamp_or_epoch(seconds))
    }

    async fn touch_imprisonment(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<(), EconomyError> {
        let now = Utc::now().timestamp();
        self.update_account(user_id, server_id, |a| a.last_stretch = now).await;
        Ok(())
    }

    async fn list_players(&self, server_id: &str) -> Result<Vec<PlayerBalance>, EconomyError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .filter(|(key, _)| key.server_id == server_id)
            .map(|(key, account)| PlayerBalance {
                user_id: key.user_id.clone(),
                balance: account.balance,
            })
            .collect())
    }
}
