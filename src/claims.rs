//! Token-claim sources.
//!
//! A claim source decides what a `/farm` call yields for a given wallet.
//! The demo source hands out the same two simulated airdrops every time;
//! the lookup source asks an external token-balance endpoint which tokens
//! actually landed in the wallet and keeps the airdrop-looking ones.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::Result;

/// One detected or simulated token receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Human-readable description, shown verbatim on the dashboard.
    pub description: String,
    /// Rough USD value of the claim, zero when the source has no price.
    pub usd_estimate: f64,
}

#[async_trait]
pub trait ClaimSource: Send + Sync {
    async fn claims_for(&self, wallet: &str) -> Result<Vec<Claim>>;
}

/// Fixed demo batch: two simulated airdrops worth $2.70 combined.
pub struct DemoSource;

#[async_trait]
impl ClaimSource for DemoSource {
    async fn claims_for(&self, _wallet: &str) -> Result<Vec<Claim>> {
        Ok(vec![
            Claim {
                description: "0.0005 SOL (~$0.9)".to_owned(),
                usd_estimate: 0.9,
            },
            Claim {
                description: "0.3 HULK (~$1.8)".to_owned(),
                usd_estimate: 1.8,
            },
        ])
    }
}

/// At most this many lookup matches are reported per farm.
const MAX_LOOKUP_CLAIMS: usize = 5;

#[derive(Debug, Deserialize)]
struct TokenBalances {
    #[serde(default)]
    tokens: Vec<TokenEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    symbol: String,
    /// Human-readable amount as the endpoint formats it.
    amount: String,
    #[serde(default)]
    airdrop: bool,
    #[serde(default)]
    mint_authority: Option<String>,
    #[serde(default)]
    usd_value: Option<f64>,
}

impl TokenEntry {
    /// An entry counts as an airdrop when the endpoint flags it as one or
    /// when it names a minting authority we can attribute it to.
    fn looks_like_airdrop(&self) -> bool {
        self.airdrop || self.mint_authority.as_deref().is_some_and(|a| !a.is_empty())
    }
}

fn filter_airdrops(balances: TokenBalances) -> Vec<Claim> {
    balances
        .tokens
        .into_iter()
        .filter(TokenEntry::looks_like_airdrop)
        .take(MAX_LOOKUP_CLAIMS)
        .map(|entry| Claim {
            description: format!("{} - {} {}", entry.symbol, entry.amount, entry.symbol),
            usd_estimate: entry.usd_value.unwrap_or(0.0),
        })
        .collect()
}

/// Live claim source backed by a token-balance listing endpoint.
///
/// Any non-success response or transport failure degrades to an empty batch:
/// the user sees "nothing found", not an error. No retry, no caching.
pub struct LookupSource {
    http: reqwest::Client,
    endpoint: Url,
}

impl LookupSource {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    fn balances_url(&self, wallet: &str) -> Result<Url> {
        self.endpoint
            .join(wallet)
            .map_err(|_| crate::Error::BadConfig("lookup endpoint url cannot take a wallet path"))
    }
}

#[async_trait]
impl ClaimSource for LookupSource {
    async fn claims_for(&self, wallet: &str) -> Result<Vec<Claim>> {
        let url = self.balances_url(wallet)?;

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!("token balance lookup failed: {error}");
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            warn!("token balance lookup returned {}", response.status());
            return Ok(Vec::new());
        }

        match response.json::<TokenBalances>().await {
            Ok(balances) => Ok(filter_airdrops(balances)),
            Err(error) => {
                warn!("token balance response was not parseable: {error}");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_source_always_yields_the_same_two_claims() {
        let batch = DemoSource.claims_for("ignored").await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].description, "0.0005 SOL (~$0.9)");
        assert_eq!(batch[1].description, "0.3 HULK (~$1.8)");

        let total: f64 = batch.iter().map(|c| c.usd_estimate).sum();
        assert!((total - 2.7).abs() < f64::EPSILON);
    }

    fn balances_from(json: serde_json::Value) -> TokenBalances {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn filter_keeps_flagged_and_authority_minted_entries() {
        let balances = balances_from(serde_json::json!({
            "tokens": [
                { "symbol": "BONK", "amount": "12000", "airdrop": true },
                { "symbol": "USDC", "amount": "5.20" },
                { "symbol": "WEN", "amount": "300",
                  "mint_authority": "WenMint111111111111111111111111" },
                { "symbol": "JUP", "amount": "1.5", "mint_authority": "" },
            ]
        }));

        let claims = filter_airdrops(balances);
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].description, "BONK - 12000 BONK");
        assert_eq!(claims[1].description, "WEN - 300 WEN");
    }

    #[test]
    fn filter_caps_matches_at_five() {
        let tokens: Vec<_> = (0..8)
            .map(|i| {
                serde_json::json!({
                    "symbol": format!("T{i}"),
                    "amount": "1",
                    "airdrop": true,
                })
            })
            .collect();
        let balances = balances_from(serde_json::json!({ "tokens": tokens }));

        assert_eq!(filter_airdrops(balances).len(), 5);
    }

    #[test]
    fn usd_value_defaults_to_zero() {
        let balances = balances_from(serde_json::json!({
            "tokens": [
                { "symbol": "BONK", "amount": "12000", "airdrop": true },
                { "symbol": "WEN", "amount": "3", "airdrop": true, "usd_value": 1.25 },
            ]
        }));

        let claims = filter_airdrops(balances);
        assert_eq!(claims[0].usd_estimate, 0.0);
        assert_eq!(claims[1].usd_estimate, 1.25);
    }

    #[test]
    fn empty_body_is_an_empty_batch() {
        let balances = balances_from(serde_json::json!({}));
        assert!(filter_airdrops(balances).is_empty());
    }
}
