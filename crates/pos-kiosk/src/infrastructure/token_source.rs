//! Token sources: the RFID reader and manual entry.
//!
//! Both implement [`TokenSource`]; [`TokenSources`](crate::application::gate::TokenSources)
//! picks the reader when it is available and falls back to manual entry when
//! it is not, or when it fails.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::application::ports::{TokenSource, TokenSourceError};

/// Asks the operator for a line of text.
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Shows `label` and reads one line.  `Ok(None)` at end of input.
    async fn prompt(&self, label: &str) -> io::Result<Option<String>>;

    /// Like [`Prompt::prompt`], for input that must not be echoed.
    async fn prompt_secret(&self, label: &str) -> io::Result<Option<String>> {
        self.prompt(label).await
    }
}

// ── Hardware reader ───────────────────────────────────────────────────────────

/// An RFID reader that shows up as a character device emitting one card id
/// per line (serial readers, or keyboard-wedge readers bound to a tty).
///
/// Card ids are trimmed and upper-cased so hex ids compare equal to what
/// the server stores.
#[derive(Debug, Clone)]
pub struct DeviceTokenReader {
    path: PathBuf,
    read_timeout: Duration,
}

impl DeviceTokenReader {
    pub fn new(path: impl Into<PathBuf>, read_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            read_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenSource for DeviceTokenReader {
    fn name(&self) -> &'static str {
        "rfid reader"
    }

    fn is_available(&self) -> bool {
        self.path.exists()
    }

    async fn read_token(&mut self) -> Result<Option<String>, TokenSourceError> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            TokenSourceError::HardwareUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();

        match tokio::time::timeout(self.read_timeout, reader.read_line(&mut line)).await {
            Err(_) => {
                debug!("no card presented within {:?}", self.read_timeout);
                Ok(None)
            }
            Ok(Err(e)) => Err(TokenSourceError::HardwareUnavailable(format!(
                "{}: {e}",
                self.path.display()
            ))),
            Ok(Ok(0)) => Err(TokenSourceError::HardwareUnavailable(format!(
                "{}: end of stream",
                self.path.display()
            ))),
            Ok(Ok(_)) => Ok(normalize_card_id(&line)),
        }
    }
}

fn normalize_card_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    (!id.is_empty()).then(|| id.to_uppercase())
}

// ── Manual entry ──────────────────────────────────────────────────────────────

/// Manual token entry through a [`Prompt`].  Always available.
pub struct ManualTokenEntry<P> {
    prompt: P,
}

impl<P: Prompt> ManualTokenEntry<P> {
    pub fn new(prompt: P) -> Self {
        Self { prompt }
    }
}

#[async_trait]
impl<P: Prompt> TokenSource for ManualTokenEntry<P> {
    fn name(&self) -> &'static str {
        "manual entry"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn read_token(&mut self) -> Result<Option<String>, TokenSourceError> {
        let line = self
            .prompt
            .prompt("RFID: ")
            .await
            .map_err(TokenSourceError::Input)?;
        Ok(line
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
