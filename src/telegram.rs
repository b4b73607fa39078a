//! Delivery of the report through the Telegram Bot API.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::TelegramConfig;
use crate::error::NotifyError;

/// Longest text Telegram accepts in one `sendMessage` call.
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends `text` to the configured chat, as several messages when it is
/// longer than [`MAX_MESSAGE_CHARS`]. Stops at the first rejected message.
pub async fn send_report(
    client: &Client,
    config: &TelegramConfig,
    text: &str,
) -> Result<usize, NotifyError> {
    let chunks = split_message(text, MAX_MESSAGE_CHARS);
    for (i, chunk) in chunks.iter().enumerate() {
        debug!(part = i + 1, of = chunks.len(), chars = chunk.chars().count(), "sending message");
        send_message(client, config, chunk).await?;
    }
    info!(messages = chunks.len(), chat = %config.chat_id, "report delivered");
    Ok(chunks.len())
}

/// One `sendMessage` call
pub async fn send_message(
    client: &Client,
    config: &TelegramConfig,
    text: &str,
) -> Result<(), NotifyError> {
    let url = format!(
        "{}/bot{}/sendMessage",
        config.api_base.trim_end_matches('/'),
        config.api_token
    );
    let payload = [
        ("chat_id", config.chat_id.as_str()),
        ("text", text),
        ("parse_mode", "Markdown"),
        ("disable_web_page_preview", "true"),
    ];

    let response = client.post(&url).form(&payload).send().await?;
    let status = response.status();
    let body: Option<ApiResponse> = response.json().await.ok();

    match body {
        Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
        other => Err(NotifyError::Rejected {
            status: status.as_u16(),
            description: other
                .and_then(|b| b.description)
                .unwrap_or_else(|| "no description".to_string()),
        }),
    }
}

/// Splits on line boundaries so that no piece exceeds `limit` characters.
/// A single line longer than `limit` is cut wherever the limit falls.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                let piece: String = piece.iter().collect();
                if piece.chars().count() == limit {
                    chunks.push(piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
