//! Guarded JSON document storage.
//!
//! Both persisted documents (the wallet registry and the farm ledger) are
//! small JSON objects rewritten in full on every mutation. Each document is
//! wrapped in a [`JsonStore`], which holds the deserialized state behind a
//! `tokio::sync::Mutex` so a read-modify-write cycle from one handler can
//! never clobber another's. A store opened without a path keeps its state in
//! memory only, which is what the tests use.

use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::Result;

pub struct JsonStore<T> {
    path: Option<PathBuf>,
    state: Mutex<T>,
}

impl<T> JsonStore<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    /// Open a file-backed store. A missing file is initialized to the empty
    /// document on disk right away, matching what the bot has always written
    /// at startup.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let state = if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&raw)?
        } else {
            let empty = T::default();
            let raw = serde_json::to_string_pretty(&empty)?;
            tokio::fs::write(&path, raw).await?;
            debug!("initialized empty document at {}", path.display());
            empty
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// In-memory store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(T::default()),
        }
    }

    /// Read access to the current document.
    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Mutate the document and persist it in full. The lock is held across
    /// the mutation and the write, so concurrent updates serialize instead
    /// of losing each other's changes.
    pub async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut state = self.state.lock().await;
        let out = f(&mut state);
        if let Some(path) = &self.path {
            let raw = serde_json::to_string_pretty(&*state)?;
            tokio::fs::write(path, raw).await?;
        }
        Ok(out)
    }
}
