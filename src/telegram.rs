//! Minimal Telegram Bot API transport.
//!
//! The bot only ever needs two methods, `getUpdates` (long poll) and
//! `sendMessage`, so this talks to the HTTP API directly instead of pulling
//! in an SDK. Each update is translated into a dispatcher event keyed by the
//! sender's user id; the dispatcher's reply goes back to the same chat.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    dispatcher::{Command, Dispatcher, Inbound},
    Error, Result,
};

/// Long-poll wait passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

const GENERIC_FAILURE_REPLY: &str = "⚠️ Something went wrong. Please try again.";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

pub struct Telegram {
    http: reqwest::Client,
    api: Url,
    token: String,
}

impl Telegram {
    pub fn new(api: Url, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api,
            token,
        }
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        self.api
            .join(&format!("bot{}/{}", self.token, method))
            .map_err(|_| Error::BadConfig("telegram api url cannot take a method path"))
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method)?)
            .json(&body)
            .send()
            .await
            .map_err(Error::Telegram)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::TelegramApi("bot token was rejected".to_owned()));
        }

        let parsed: ApiResponse<T> = response.json().await.map_err(Error::Telegram)?;
        if !parsed.ok {
            return Err(Error::TelegramApi(
                parsed
                    .description
                    .unwrap_or_else(|| format!("{method} failed with no description")),
            ));
        }
        parsed
            .result
            .ok_or_else(|| Error::TelegramApi(format!("{method} returned no result")))
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.call::<serde_json::Value>(
            "sendMessage",
            json!({ "chat_id": chat_id, "text": text }),
        )
        .await
        .map(|_| ())
    }

    /// Poll for updates forever, dispatching each message and replying in
    /// the chat it came from. Dispatch failures are logged and answered with
    /// a generic reply; transport failures back off briefly and the loop
    /// keeps going so one bad poll never takes the bot down.
    pub async fn run(&self, dispatcher: &Dispatcher) -> Result<()> {
        info!("bot running, long-polling for updates");
        let mut offset = 0;

        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                // A rejected token is misconfiguration, not a transient fault.
                Err(error @ Error::TelegramApi(_)) if token_rejected(&error) => return Err(error),
                Err(error) => {
                    warn!("getUpdates failed: {error}");
                    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.handle_update(dispatcher, update).await;
            }
        }
    }

    async fn handle_update(&self, dispatcher: &Dispatcher, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };
        // Channel posts have no sender; fall back to the chat id, which for
        // private chats is the user id anyway.
        let user_id = message
            .from
            .map(|u| u.id)
            .unwrap_or(message.chat.id)
            .to_string();

        let event = parse_event(&text);
        debug!("dispatching {event:?} for user {user_id}");

        let reply = match dispatcher.handle(&user_id, event).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(error) => {
                error!("handler failed for user {user_id}: {error}");
                GENERIC_FAILURE_REPLY.to_owned()
            }
        };

        if let Err(error) = self.send_message(message.chat.id, &reply).await {
            error!("could not send reply to chat {}: {error}", message.chat.id);
        }
    }
}

fn token_rejected(error: &Error) -> bool {
    matches!(error, Error::TelegramApi(description) if description.contains("token was rejected"))
}

/// Turn raw message text into a dispatcher event. Commands may carry an
/// `@botname` suffix in group chats; unknown slash-commands fall through as
/// free text, which the dispatcher ignores outside wallet entry.
fn parse_event(text: &str) -> Inbound {
    let trimmed = text.trim();
    if trimmed.starts_with('/') {
        let word = trimmed.split_whitespace().next().unwrap_or(trimmed);
        let word = word.split('@').next().unwrap_or(word);
        if let Some(command) = Command::parse(word) {
            return Inbound::Command(command);
        }
    }
    Inbound::Text(trimmed.to_owned())
}
