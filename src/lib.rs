// Persistent economy state for the bot: per-server balances, signon and prison
// timestamps, and a global ban list.
//
// **Architecture Overview:**
// - `core/` = Domain types and the storage trait (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite, in-memory)
// - `config` = Environment-driven settings (database location, pool size)
//
// Callers hand us plain string ids. Nothing in here knows about the chat
// framework's user or guild types.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub mod config;

pub use crate::config::EconomyConfig;
pub use crate::core::economy::{EconomyError, EconomyStore, PlayerBalance};
pub use crate::infra::economy::{InMemoryEconomyStore, SqliteEconomyStore};
