// Settings for the economy store, read from the environment.
//
// A `.env` file in the working directory is loaded first if it exists, so the
// same variables can live there during development.

use anyhow::Context;

pub const DATABASE_ENV: &str = "ECONOMY_DATABASE";
pub const MAX_CONNECTIONS_ENV: &str = "ECONOMY_MAX_CONNECTIONS";

const DEFAULT_DATABASE_PATH: &str = "data/economy.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomyConfig {
    /// Path of the SQLite database file.
    pub database_path: String,

    /// Upper bound on pooled SQLite connections.
    pub max_connections: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl EconomyConfig {
    /// Load `.env` (if present) and build the config from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup. Unset or blank
    /// variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path = read(DATABASE_ENV).unwrap_or(defaults.database_path);

        let max_connections = match read(MAX_CONNECTIONS_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| {
                    format!("{MAX_CONNECTIONS_ENV} must be a positive integer, got {raw:?}")
                })?,
            None => defaults.max_connections,
        };

        Ok(Self {
            database_path,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EconomyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EconomyConfig::default());
        assert_eq!(config.database_path, "data/economy.db");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_reads_overrides() {
        let config = EconomyConfig::from_lookup(lookup(&[
            (DATABASE_ENV, "/tmp/bank.db"),
            (MAX_CONNECTIONS_ENV, " 2 "),
        ]))
        .unwrap();
        assert_eq!(config.database_path, "/tmp/bank.db");
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn test_blank_path_uses_default() {
        let config = EconomyConfig::from_lookup(lookup(&[(DATABASE_ENV, "  ")])).unwrap();
        assert_eq!(config.database_path, "data/economy.db");
    }

    #[test]
    fn test_rejects_bad_pool_size() {
        assert!(EconomyConfig::from_lookup(lookup(&[(MAX_CONNECTIONS_ENV, "lots")])).is_err());
        assert!(EconomyConfig::from_lookup(lookup(&[(MAX_CONNECTIONS_ENV, "0")])).is_err());
    }
}
