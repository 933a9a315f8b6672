// Economy domain models.
//
// These are pure domain types with no chat-framework dependencies. Users and
// servers are identified by the opaque string ids the caller hands us.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A composite key for a user's account.
/// Balances are tracked separately in every server a user interacts in.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct AccountKey {
    pub user_id: String,
    pub server_id: String,
}

impl AccountKey {
    pub fn new(user_id: &str, server_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            server_id: server_id.to_string(),
        }
    }
}

/// One row of a server's player listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBalance {
    pub user_id: String,
    pub balance: i64,
}

/// Convert stored Unix seconds into a timestamp.
///
/// Missing values and zero both map to the epoch, so "never happened" and
/// "happened at 1970-01-01" are indistinguishable to callers.
pub fn timestamp_or_epoch(seconds: Option<i64>) -> DateTime<Utc> {
    seconds
        .filter(|secs| *secs != 0)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_timestamp_is_epoch() {
        assert_eq!(timestamp_or_epoch(None), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(timestamp_or_epoch(Some(0)), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_stored_seconds_convert() {
        let ts = timestamp_or_epoch(Some(1_700_000_000));
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_player_balance_serializes_with_field_names() {
        let player = PlayerBalance {
            user_id: "42".to_string(),
            balance: -15,
        };
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["user_id"], "42");
        assert_eq!(json["balance"], -15);
    }
}
