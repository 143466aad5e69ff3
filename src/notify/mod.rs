//! Operator notification channel.
//!
//! Delivery is best-effort by contract: a lost notification is logged and
//! never fails the run that produced it.

use crate::config::TelegramConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::warn;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects messages above 4096 characters; longer reports are
/// split into ordered chunks.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Fire-and-forget text channel to the operator.
#[async_trait]
pub trait Notify: Send + Sync {
    /// Deliver a message, chunking if needed. Failures are logged by the
    /// implementation and never propagate.
    async fn send_text(&self, message: &str);
}

/// Telegram Bot API notifier.
pub struct TelegramNotifier {
    http: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Point the notifier at a different API base (test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn post_chunk(&self, text: &str) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        match self.http.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = %response.status(), "Telegram rejected notification");
            }
            Err(e) => {
                warn!(error = %e, "Failed to deliver Telegram notification");
            }
        }
    }
}

#[async_trait]
impl Notify for TelegramNotifier {
    async fn send_text(&self, message: &str) {
        for chunk in chunk_message(message, MAX_MESSAGE_CHARS) {
            self.post_chunk(&chunk).await;
        }
    }
}

/// Split a message into ordered chunks of at most `max_chars` characters,
/// never breaking inside a character.
pub fn chunk_message(message: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in message.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
