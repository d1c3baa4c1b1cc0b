//! Runtime configuration.
//!
//! Read from an optional `farmbot.toml` merged with `FARMBOT_`-prefixed
//! environment variables; the environment wins so the bot token never needs
//! to live in a file.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use url::Url;

use crate::{ledger::MergePolicy, Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Telegram bot token, the one secret this process holds.
    pub bot_token: String,

    /// Directory holding `wallets.json` and `mined.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub claim_source: ClaimSourceKind,

    /// Token-balance listing endpoint, required when `claim_source` is
    /// `lookup`. The wallet address is appended as a path segment.
    #[serde(default)]
    pub lookup_endpoint: Option<Url>,

    #[serde(default)]
    pub merge_policy: MergePolicy,

    #[serde(default = "default_telegram_api")]
    pub telegram_api: Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimSourceKind {
    #[default]
    Demo,
    Lookup,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_telegram_api() -> Url {
    Url::parse("https://api.telegram.org").expect("static url parses")
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        } else {
            figment = figment.merge(Toml::file("farmbot.toml"));
        }

        let config: Config = figment
            .merge(Env::prefixed("FARMBOT_"))
            .extract()
            .map_err(|error| {
                tracing::error!("configuration is invalid: {error}");
                Error::BadConfig("could not read configuration")
            })?;

        if config.claim_source == ClaimSourceKind::Lookup && config.lookup_endpoint.is_none() {
            return Err(Error::BadConfig(
                "claim_source = \"lookup\" requires lookup_endpoint",
            ));
        }

        Ok(config)
    }

    pub fn wallets_path(&self) -> PathBuf {
        self.data_dir.join("wallets.json")
    }

    pub fn mined_path(&self) -> PathBuf {
        self.data_dir.join("mined.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_only_config_with_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FARMBOT_BOT_TOKEN", "123:abc");
            let config = Config::load(None).expect("config loads");
            assert_eq!(config.bot_token, "123:abc");
            assert_eq!(config.claim_source, ClaimSourceKind::Demo);
            assert_eq!(config.merge_policy, MergePolicy::Accumulate);
            assert_eq!(config.wallets_path(), PathBuf::from("./wallets.json"));
            assert_eq!(config.mined_path(), PathBuf::from("./mined.json"));
            Ok(())
        });
    }

    #[test]
    fn lookup_source_requires_endpoint() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FARMBOT_BOT_TOKEN", "123:abc");
            jail.set_env("FARMBOT_CLAIM_SOURCE", "lookup");
            assert!(Config::load(None).is_err());

            jail.set_env("FARMBOT_LOOKUP_ENDPOINT", "https://balances.example/tokens/");
            let config = Config::load(None).expect("config loads");
            assert_eq!(config.claim_source, ClaimSourceKind::Lookup);
            assert!(config.lookup_endpoint.is_some());
            Ok(())
        });
    }

    #[test]
    fn toml_file_sets_policy() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "farmbot.toml",
                r#"
                    bot_token = "123:abc"
                    merge_policy = "replace"
                    data_dir = "/var/lib/farmbot"
                "#,
            )?;
            let config = Config::load(None).expect("config loads");
            assert_eq!(config.merge_policy, MergePolicy::Replace);
            assert_eq!(config.data_dir, PathBuf::from("/var/lib/farmbot"));
            Ok(())
        });
    }
}
