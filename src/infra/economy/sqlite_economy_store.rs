// SQLite implementation of the EconomyStore trait
//
// Tables:
// - users: one row per (user, server) with balance and signon/prison times
// - bans: global ban list keyed by user id

use crate::config::EconomyConfig;
use crate::core::economy::{timestamp_or_epoch, EconomyError, EconomyStore, PlayerBalance};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, trace};

// Existing bot databases were created with exactly these statements.
const CREATE_USERS_TABLE: &str = concat!(
    "CREATE TABLE IF NOT EXISTS users (",
    "id TEXT NOT NULL, ",
    "server TEXT NOT NULL, ",
    "balance INTEGER NOT NULL DEFAULT 0, ",
    "lastSignon INTEGER NOT NULL DEFAULT 0, ",
    "lastStretch INTEGER NOT NULL, ",
    "PRIMARY KEY (id, server) ",
    ")",
);

const CREATE_BANS_TABLE: &str = concat!(
    "CREATE TABLE IF NOT EXISTS bans (",
    "id TEXT PRIMARY KEY UNIQUE NOT NULL, ",
    "banned INTEGER NOT NULL DEFAULT 1",
    ")",
);

// Balances saturate at the i64 bounds. A plain `balance + ?` that overflows
// would make SQLite store a REAL, which no longer decodes as an integer.
const ADJUST_BALANCE: &str = r#"
    UPDATE users
    SET balance = CASE
        WHEN ?1 > 0 AND balance > ?2 - ?1 THEN ?2
        WHEN ?1 < 0 AND balance < ?3 - ?1 THEN ?3
        ELSE balance + ?1
    END
    WHERE id = ?4 AND server = ?5
"#;

/// The two per-account timestamp columns.
#[derive(Debug, Clone, Copy)]
enum Stamp {
    Signon,
    Prison,
}

impl Stamp {
    fn select_sql(self) -> &'static str {
        match self {
            Stamp::Signon => "SELECT lastSignon FROM users WHERE id = ? AND server = ?",
            Stamp::Prison => "SELECT lastStretch FROM users WHERE id = ? AND server = ?",
        }
    }

    fn touch_sql(self) -> &'static str {
        match self {
            Stamp::Signon => {
                r#"
                UPDATE users
                SET lastSignon = CAST(STRFTIME('%s', 'now') AS INTEGER)
                WHERE id = ? AND server = ?
                "#
            }
            Stamp::Prison => {
                r#"
                UPDATE users
                SET lastStretch = CAST(STRFTIME('%s', 'now') AS INTEGER)
                WHERE id = ? AND server = ?
                "#
            }
        }
    }
}

/// Economy store backed by a SQLite file.
///
/// The store starts closed. `init` opens the pool and creates the schema; it
/// can only succeed once per instance.
#[derive(Default)]
pub struct SqliteEconomyStore {
    pool: OnceLock<SqlitePool>,
}

impl SqliteEconomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the database at `database_path` and create missing tables.
    pub async fn init(&self, database_path: &str) -> Result<(), EconomyError> {
        let config = EconomyConfig {
            database_path: database_path.to_string(),
            ..EconomyConfig::default()
        };
        self.init_from_config(&config).await
    }

    /// Same as `init`, using the configured path and pool size.
    pub async fn init_from_config(&self, config: &EconomyConfig) -> Result<(), EconomyError> {
        self.open(&config.database_path, config.max_connections).await
    }

    /// Close the pool. Later calls fail with a storage error.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            debug!("economy database closed");
        }
    }

    async fn open(&self, database_path: &str, max_connections: u32) -> Result<(), EconomyError> {
        if self.pool.get().is_some() {
            return Err(EconomyError::AlreadyInitialized);
        }

        // Keep runtime databases in their own folder without asking callers
        // to create it first.
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        debug!(path = database_path, "economy database opened");

        // The tables are independent, so create them side by side.
        tokio::try_join!(
            sqlx::query(CREATE_USERS_TABLE).execute(&pool),
            sqlx::query(CREATE_BANS_TABLE).execute(&pool),
        )?;
        trace!("economy tables created");

        // Another caller may have finished `init` while we were connecting.
        if let Err(pool) = self.pool.set(pool) {
            pool.close().await;
            return Err(EconomyError::AlreadyInitialized);
        }

        info!(path = database_path, "economy store ready");
        Ok(())
    }

    fn pool(&self) -> Result<&SqlitePool, EconomyError> {
        self.pool.get().ok_or(EconomyError::NotInitialized)
    }

    /// Add `delta` to one account's balance, clamped to the i64 range.
    /// Returns the number of rows touched (0 for a missing account).
    async fn apply_delta(
        conn: &mut SqliteConnection,
        user_id: &str,
        server_id: &str,
        delta: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(ADJUST_BALANCE)
            .bind(delta)
            .bind(i64::MAX)
            .bind(i64::MIN)
            .bind(user_id)
            .bind(server_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn read_stamp(
        &self,
        stamp: Stamp,
        user_id: &str,
        server_id: &str,
    ) -> Result<DateTime<Utc>, EconomyError> {
        let row = sqlx::query(stamp.select_sql())
            .bind(user_id)
            .bind(server_id)
            .fetch_optional(self.pool()?)
            .await?;

        let seconds = match row {
            Some(row) => row.try_get::<Option<i64>, _>(0)?,
            None => None,
        };
        Ok(timestamp_or_epoch(seconds))
    }

    async fn write_stamp(
        &self,
        stamp: Stamp,
        user_id: &str,
        server_id: &str,
    ) -> Result<(), EconomyError> {
        sqlx::query(stamp.touch_sql())
            .bind(user_id)
            .bind(server_id)
            .execute(self.pool()?)
            .await?;

        trace!(user_id, server_id, ?stamp, "timestamp updated");
        Ok(())
    }
}

#[async_trait]
impl EconomyStore for SqliteEconomyStore {
    async fn exists(&self, user_id: &str, server_id: Option<&str>) -> Result<bool, EconomyError> {
        let pool = self.pool()?;
        let row = match server_id {
            None => {
                sqlx::query("SELECT 1 FROM users WHERE id = ?")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?
            }
            Some(server_id) => {
                sqlx::query("SELECT 1 FROM users WHERE id = ? AND server = ?")
                    .bind(user_id)
                    .bind(server_id)
                    .fetch_optional(pool)
                    .await?
            }
        };
        Ok(row.is_some())
    }

    async fn record_interaction(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<(), EconomyError> {
        // lastStretch has no column default, so it must be supplied here or
        // OR IGNORE would silently drop the row.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (id, server, lastStretch)
            VALUES (?, ?, 0)
            "#,
        )
        .bind(user_id)
        .bind(server_id)
        .execute(self.pool()?)
        .await?;

        trace!(user_id, server_id, "account recorded");
        Ok(())
    }

    async fn is_banned(&self, user_id: &str) -> Result<bool, EconomyError> {
        let row = sqlx::query("SELECT banned FROM bans WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.pool()?)
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<i64>, _>("banned")? == Some(1)),
            None => Ok(false),
        }
    }

    async fn ban(&self, user_id: &str) -> Result<(), EconomyError> {
        sqlx::query("INSERT OR REPLACE INTO bans (id) VALUES (?)")
            .bind(user_id)
            .execute(self.pool()?)
            .await?;

        debug!(user_id, "user banned");
        Ok(())
    }

    async fn unban(&self, user_id: &str) -> Result<(), EconomyError> {
        sqlx::query("DELETE FROM bans WHERE id = ?")
            .bind(user_id)
            .execute(self.pool()?)
            .await?;

        debug!(user_id, "user unbanned");
        Ok(())
    }

    async fn balance(&self, user_id: &str, server_id: &str) -> Result<i64, EconomyError> {
        let row = sqlx::query("SELECT balance FROM users WHERE id = ? AND server = ?")
            .bind(user_id)
            .bind(server_id)
            .fetch_optional(self.pool()?)
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<i64>, _>("balance")?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    async fn adjust_balance(
        &self,
        user_id: &str,
        server_id: &str,
        delta: i64,
    ) -> Result<(), EconomyError> {
        let mut conn = self.pool()?.acquire().await?;
        Self::apply_delta(&mut conn, user_id, server_id, delta).await?;

        trace!(user_id, server_id, delta, "balance adjusted");
        Ok(())
    }

    async fn transfer_balance(
        &self,
        source_id: &str,
        target_id: &str,
        server_id: &str,
        amount: i64,
    ) -> Result<(), EconomyError> {
        // Dropping `tx` on an early return rolls both updates back.
        let mut tx = self.pool()?.begin().await?;

        let debited =
            Self::apply_delta(&mut *tx, source_id, server_id, amount.saturating_neg()).await?;
        let credited = Self::apply_delta(&mut *tx, target_id, server_id, amount).await?;

        tx.commit().await?;

        // An unknown account on either side means coins were created or lost.
        if debited == 0 || credited == 0 {
            debug!(
                source_id,
                target_id,
                server_id,
                amount,
                debited,
                credited,
                "transfer touched a missing account"
            );
        }
        trace!(source_id, target_id, server_id, amount, "balance transferred");
        Ok(())
    }

    async fn total_balance(&self, server_id: &str) -> Result<i64, EconomyError> {
        // SQL SUM() errors out on overflow, so add up with saturation here.
        let balances: Vec<Option<i64>> =
            sqlx::query_scalar("SELECT balance FROM users WHERE server = ?")
                .bind(server_id)
                .fetch_all(self.pool()?)
                .await?;

        Ok(balances
            .into_iter()
            .flatten()
            .fold(0i64, |total, balance| total.saturating_add(balance)))
    }

    async fn last_signon(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<DateTime<Utc>, EconomyError> {
        self.read_stamp(Stamp::Signon, user_id, server_id).await
    }

    async fn touch_signon(&self, user_id: &str, server_id: &str) -> Result<(), EconomyError> {
        self.write_stamp(Stamp::Signon, user_id, server_id).await
    }

    async fn last_imprisonment(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<DateTime<Utc>, EconomyError> {
        self.read_stamp(Stamp::Prison, user_id, server_id).await
    }

    async fn touch_imprisonment(
        &self,
        user_id: &str,
        server_id: &str,
    ) -> Result<(), EconomyError> {
        self.write_stamp(Stamp::Prison, user_id, server_id).await
    }

    async fn list_players(&self, server_id: &str) -> Result<Vec<PlayerBalance>, EconomyError> {
        let rows = sqlx::query("SELECT id, balance FROM users WHERE server = ?")
            .bind(server_id)
            .fetch_all(self.pool()?)
            .await?;

        let players = rows
            .iter()
            .map(|row| -> Result<PlayerBalance, sqlx::Error> {
                Ok(PlayerBalance {
                    user_id: row.try_get("id")?,
                    balance: row.try_get("balance")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(players)
    }
}

// ============================================================================
// TESTS
// ============================================================================
