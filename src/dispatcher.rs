//! Command dispatch and the per-user session machine.
//!
//! Every inbound event maps to one handler, and every handler is a complete
//! read-modify-write cycle against the registry and ledger followed by a
//! single text reply. The only session state is whether the bot expects the
//! user's next message to be a wallet address; it lives in memory and is
//! lost on restart, which matches how the bot has always behaved.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    claims::ClaimSource,
    ledger::{FarmLedger, FarmStats},
    registry::WalletRegistry,
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    SetWallet,
    Farm,
    Report,
}

impl Command {
    /// Map a `/command` word (with any `@botname` suffix already stripped)
    /// to a known command.
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "/start" => Some(Command::Start),
            "/setwallet" => Some(Command::SetWallet),
            "/farm" => Some(Command::Farm),
            "/report" => Some(Command::Report),
            _ => None,
        }
    }
}

/// An event handed over by the messaging transport.
#[derive(Debug, Clone)]
pub enum Inbound {
    Command(Command),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Session {
    #[default]
    Idle,
    /// The next free-text message is taken as a wallet address.
    AwaitingWallet,
}

pub struct Dispatcher {
    registry: WalletRegistry,
    ledger: FarmLedger,
    claims: Box<dyn ClaimSource>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl Dispatcher {
    pub fn new(registry: WalletRegistry, ledger: FarmLedger, claims: Box<dyn ClaimSource>) -> Self {
        Self {
            registry,
            ledger,
            claims,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one inbound event and produce the reply text. User mistakes
    /// (unknown address, farming before registering) come back as `Ok` with
    /// the corresponding reply; an `Err` means storage or transport trouble
    /// and is the caller's to log.
    pub async fn handle(&self, user_id: &str, event: Inbound) -> Result<Option<String>> {
        match event {
            Inbound::Command(Command::Start) => self.start(user_id).await.map(Some),
            Inbound::Command(Command::SetWallet) => Ok(Some(self.setwallet(user_id).await)),
            Inbound::Command(Command::Farm) => self.farm(user_id).await.map(Some),
            Inbound::Command(Command::Report) => self.report(user_id).await.map(Some),
            Inbound::Text(text) => self.free_text(user_id, &text).await,
        }
    }

    async fn start(&self, user_id: &str) -> Result<String> {
        if let Some(record) = self.registry.get(user_id).await {
            return Ok(format!(
                "✅ Already setup. Wallet: {}\nUse /farm.",
                record.wallet
            ));
        }

        self.set_session(user_id, Session::AwaitingWallet).await;
        Ok("👋 Welcome! Send me your Solana wallet address to continue.".to_owned())
    }

    async fn setwallet(&self, user_id: &str) -> String {
        self.set_session(user_id, Session::AwaitingWallet).await;
        "Send your new Solana wallet.".to_owned()
    }

    /// Free-text is only meaningful while the session awaits a wallet
    /// address; anything else is ignored, mirroring a bot that simply has no
    /// handler for chatter. An invalid address keeps the session awaiting so
    /// the user can try again without re-issuing /setwallet.
    async fn free_text(&self, user_id: &str, text: &str) -> Result<Option<String>> {
        if self.session(user_id).await != Session::AwaitingWallet {
            return Ok(None);
        }

        match self.registry.register(user_id, text.trim(), Utc::now()).await {
            Ok(_) => {
                self.set_session(user_id, Session::Idle).await;
                Ok(Some("✅ Wallet saved! Use /farm.".to_owned()))
            }
            Err(Error::InvalidAddress) => {
                Ok(Some("❌ Invalid Solana address. Try again.".to_owned()))
            }
            Err(other) => Err(other),
        }
    }

    async fn farm(&self, user_id: &str) -> Result<String> {
        let Some(record) = self.registry.get(user_id).await else {
            return Ok("❌ Set wallet first with /start.".to_owned());
        };

        let batch = self.claims.claims_for(&record.wallet).await?;
        if batch.is_empty() {
            // Nothing qualifying landed in the wallet. Normal outcome, and
            // the ledger is left untouched.
            warn!("no qualifying airdrops for user {user_id}");
            return Ok("😕 No airdrops found for your wallet right now.".to_owned());
        }

        let stats = self
            .ledger
            .record_farm(user_id, &record.wallet, &batch, Utc::now())
            .await?;
        info!(
            "user {user_id} farmed {} tokens, {} claims total",
            batch.len(),
            stats.claims
        );

        Ok(format!(
            "✅ You farmed {} tokens!\nUse /report to view them.",
            batch.len()
        ))
    }

    async fn report(&self, user_id: &str) -> Result<String> {
        let Some(record) = self.registry.get(user_id).await else {
            return Ok("❌ Set wallet first using /start.".to_owned());
        };

        let stats = self
            .ledger
            .get(user_id)
            .await
            .unwrap_or_else(|| FarmStats::zero(&record.wallet));

        Ok(render_dashboard(&record.wallet, &stats))
    }

    async fn session(&self, user_id: &str) -> Session {
        let sessions = self.sessions.lock().await;
        sessions.get(user_id).copied().unwrap_or_default()
    }

    async fn set_session(&self, user_id: &str, session: Session) {
        let mut sessions = self.sessions.lock().await;
        if session == Session::Idle {
            sessions.remove(user_id);
        } else {
            sessions.insert(user_id.to_owned(), session);
        }
    }
}

fn render_dashboard(wallet: &str, stats: &FarmStats) -> String {
    let token_list = if stats.tokens.is_empty() {
        "- None".to_owned()
    } else {
        stats
            .tokens
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "📊 Dashboard\n👛 Wallet: {}\n🪙 Claims: {}\n🧾 Last: {}\n💰 Total: ${}\n🔹 Tokens:\n{}\n",
        wallet, stats.claims, stats.last_claim, stats.usd_total, token_list
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::NO_CLAIM_YET;

    #[test]
    fn command_words_parse() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/setwallet"), Some(Command::SetWallet));
        assert_eq!(Command::parse("/farm"), Some(Command::Farm));
        assert_eq!(Command::parse("/report"), Some(Command::Report));
        assert_eq!(Command::parse("/balance"), None);
        assert_eq!(Command::parse("start"), None);
    }

    #[test]
    fn dashboard_renders_zero_stats() {
        let rendered = render_dashboard("wallet123", &FarmStats::zero("wallet123"));
        assert!(rendered.contains("👛 Wallet: wallet123"));
        assert!(rendered.contains("🪙 Claims: 0"));
        assert!(rendered.contains(&format!("🧾 Last: {NO_CLAIM_YET}")));
        assert!(rendered.contains("💰 Total: $0"));
        assert!(rendered.contains("- None"));
    }
}
