//! Farmbot library.
//!
//! A Telegram bot that registers a Solana wallet per user and "farms" token
//! airdrops against it. State is two small JSON documents on disk; commands
//! are dispatched through a tiny per-user session machine. The claim source
//! is pluggable: a fixed demo batch or a live token-balance lookup.

pub mod claims;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod store;
pub mod telegram;

pub use config::Config;
pub use error::{Error, Result};
