use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("wallet address failed validation")]
    InvalidAddress,

    #[error("could not read or write a data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed persisted document: {0}")]
    BadJson(#[from] serde_json::Error),

    #[error("bad config: {0}")]
    BadConfig(&'static str),

    #[error("telegram api request failed: {0}")]
    Telegram(#[source] reqwest::Error),

    #[error("telegram api returned an error: {0}")]
    TelegramApi(String),
}
