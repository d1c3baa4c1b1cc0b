//! Wallet registry.
//!
//! Maps a chat user id to their registered Solana wallet address and the
//! time they first joined. Persisted as `wallets.json`, a single JSON object
//! keyed by user id.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{store::JsonStore, Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub wallet: String,
    /// Set at first successful registration and kept across later
    /// `/setwallet` changes.
    pub joined: DateTime<Utc>,
}

/// Syntactic sanity filter for a Solana address: 32 to 44 characters, all
/// alphanumeric. No base58 charset check, no checksum. This weak rule is an
/// observable contract of the bot and is preserved as-is.
pub fn is_valid_address(s: &str) -> bool {
    (32..=44).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric())
}

pub struct WalletRegistry {
    store: JsonStore<BTreeMap<String, WalletRecord>>,
}

impl WalletRegistry {
    pub async fn open(path: PathBuf) -> Result<Self> {
        Ok(Self {
            store: JsonStore::open(path).await?,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            store: JsonStore::in_memory(),
        }
    }

    pub async fn get(&self, user_id: &str) -> Option<WalletRecord> {
        self.store.read(|doc| doc.get(user_id).cloned()).await
    }

    /// Validate and store a wallet address for a user. A re-registration
    /// overwrites the address but keeps the original join time.
    pub async fn register(
        &self,
        user_id: &str,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<WalletRecord> {
        if !is_valid_address(address) {
            return Err(Error::InvalidAddress);
        }

        let record = self
            .store
            .update(|doc| {
                let joined = doc.get(user_id).map(|r| r.joined).unwrap_or(now);
                let record = WalletRecord {
                    wallet: address.to_owned(),
                    joined,
                };
                doc.insert(user_id.to_owned(), record.clone());
                record
            })
            .await?;

        info!("registered wallet for user {user_id}");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_length_bounds_are_inclusive() {
        assert!(is_valid_address(&"A".repeat(32)));
        assert!(is_valid_address(&"A".repeat(44)));
        assert!(!is_valid_address(&"A".repeat(31)));
        assert!(!is_valid_address(&"A".repeat(45)));
    }

    #[test]
    fn address_must_be_alphanumeric() {
        assert!(!is_valid_address(&"abc-def".repeat(8)[..32]));
        assert!(!is_valid_address(&format!("{} {}", "A".repeat(15), "B".repeat(16))));
        assert!(is_valid_address("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"));
    }

    #[test]
    fn empty_and_whitespace_rejected() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address(&" ".repeat(40)));
    }

    #[tokio::test]
    async fn register_creates_exactly_one_record() {
        let registry = WalletRegistry::in_memory();
        let now = Utc::now();
        let address = "A".repeat(40);

        registry.register("12345", &address, now).await.unwrap();

        let record = registry.get("12345").await.unwrap();
        assert_eq!(record.wallet, address);
        assert_eq!(record.joined, now);
        assert!(registry.get("67890").await.is_none());
    }

    #[tokio::test]
    async fn invalid_address_leaves_registry_unchanged() {
        let registry = WalletRegistry::in_memory();
        let now = Utc::now();

        let err = registry.register("12345", "too-short", now).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAddress));
        assert!(registry.get("12345").await.is_none());

        let good = "B".repeat(36);
        registry.register("12345", &good, now).await.unwrap();
        let err = registry
            .register("12345", &"C".repeat(60), now)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress));
        assert_eq!(registry.get("12345").await.unwrap().wallet, good);
    }

    #[tokio::test]
    async fn reregistration_keeps_original_join_time() {
        let registry = WalletRegistry::in_memory();
        let first = Utc::now();
        let later = first + chrono::Duration::hours(2);

        registry.register("u1", &"A".repeat(33), first).await.unwrap();
        let record = registry.register("u1", &"B".repeat(33), later).await.unwrap();

        assert_eq!(record.wallet, "B".repeat(33));
        assert_eq!(record.joined, first);
    }
}
