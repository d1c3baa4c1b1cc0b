//! Farm ledger.
//!
//! Cumulative farming statistics per user, persisted as `mined.json`. Unlike
//! the wallet registry there is no uniqueness relationship to enforce: an
//! entry with no matching wallet record is representable and treated as
//! valid data.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{claims::Claim, store::JsonStore, Result};

/// Sentinel for "never farmed", kept as the literal string the dashboard
/// shows and the file has always contained.
pub const NO_CLAIM_YET: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmStats {
    /// Snapshot of the address the claims were farmed against.
    pub wallet: String,
    pub claims: u64,
    pub tokens: Vec<String>,
    /// ISO-8601 timestamp of the most recent farm, or [`NO_CLAIM_YET`].
    pub last_claim: String,
    pub usd_total: f64,
}

impl FarmStats {
    pub fn zero(wallet: &str) -> Self {
        Self {
            wallet: wallet.to_owned(),
            claims: 0,
            tokens: Vec::new(),
            last_claim: NO_CLAIM_YET.to_owned(),
            usd_total: 0.0,
        }
    }
}

/// How a new claim batch folds into existing stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Append tokens and add to the counters. Repeated farming grows the
    /// dashboard without bound.
    #[default]
    Accumulate,
    /// Each farm replaces the token list and USD value wholesale; `claims`
    /// still counts every batch ever farmed.
    Replace,
}

pub struct FarmLedger {
    store: JsonStore<BTreeMap<String, FarmStats>>,
    policy: MergePolicy,
}

impl FarmLedger {
    pub async fn open(path: PathBuf, policy: MergePolicy) -> Result<Self> {
        Ok(Self {
            store: JsonStore::open(path).await?,
            policy,
        })
    }

    pub fn in_memory(policy: MergePolicy) -> Self {
        Self {
            store: JsonStore::in_memory(),
            policy,
        }
    }

    pub async fn get(&self, user_id: &str) -> Option<FarmStats> {
        self.store.read(|doc| doc.get(user_id).cloned()).await
    }

    /// Fold a claim batch into the user's stats and persist the ledger.
    /// Callers are expected to have checked registration already; the ledger
    /// itself accepts any user id.
    pub async fn record_farm(
        &self,
        user_id: &str,
        wallet: &str,
        batch: &[Claim],
        now: DateTime<Utc>,
    ) -> Result<FarmStats> {
        let policy = self.policy;
        self.store
            .update(|doc| {
                let stats = doc
                    .entry(user_id.to_owned())
                    .or_insert_with(|| FarmStats::zero(wallet));

                let descriptions = batch.iter().map(|c| c.description.clone());
                let batch_usd: f64 = batch.iter().map(|c| c.usd_estimate).sum();

                stats.wallet = wallet.to_owned();
                stats.claims += batch.len() as u64;
                stats.last_claim = now.to_rfc3339();
                match policy {
                    MergePolicy::Accumulate => {
                        stats.tokens.extend(descriptions);
                        stats.usd_total += batch_usd;
                    }
                    MergePolicy::Replace => {
                        stats.tokens = descriptions.collect();
                        stats.usd_total = batch_usd;
                    }
                }

                stats.clone()
            })
            .await
    }
}
