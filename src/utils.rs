//! Text helpers for Telegram output and a retry wrapper for Telegram API calls.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

const CODE_FENCE: &str = "```";

/// Splits a long message into parts that fit within Telegram's message limit.
///
/// Code blocks (triple backticks) cut by a boundary are closed at the end of
/// one part and reopened with the same fence line at the start of the next,
/// so every part has balanced fences. A single line longer than `max_length`
/// is cut on grapheme boundaries. Blank parts are dropped.
///
/// # Examples
///
/// ```
/// use chatgpt_tg_bot::utils::split_long_message;
/// let long_msg = "A very long message...\n".repeat(300);
/// let parts = split_long_message(&long_msg, 4000);
/// assert!(parts.len() > 1);
/// ```
#[must_use]
pub fn split_long_message(message: &str, max_length: usize) -> Vec<String> {
    if message.trim().is_empty() {
        return Vec::new();
    }

    if message.len() <= max_length {
        return vec![message.to_string()];
    }

    let mut splitter = Splitter::new(max_length);
    for line in message.lines() {
        splitter.push_line(line);
    }
    splitter.finish()
}

struct Splitter {
    max_length: usize,
    parts: Vec<String>,
    current: String,
    /// Fence line that opened the code block being written
    open_fence: Option<String>,
    /// Whether the open block has any line after its fence in `current`
    block_has_body: bool,
}

impl Splitter {
    const fn new(max_length: usize) -> Self {
        Self {
            max_length,
            parts: Vec::new(),
            current: String::new(),
            open_fence: None,
            block_has_body: false,
        }
    }

    fn push_line(&mut self, line: &str) {
        if line.len() > self.max_length {
            self.push_long_line(line);
            return;
        }

        let is_fence = line.starts_with(CODE_FENCE);
        if self.current.len() + line.len() + 1 > self.max_length {
            if is_fence && self.open_fence.is_some() {
                // Closing fence ends its own part
                self.current.push_str(line);
                self.finish_part();
                self.open_fence = None;
                return;
            }
            self.flush();
        }

        self.current.push_str(line);
        self.current.push('\n');

        if is_fence {
            if self.open_fence.take().is_none() {
                self.open_fence = Some(line.to_string());
                self.block_has_body = false;
            }
        } else if self.open_fence.is_some() {
            self.block_has_body = true;
        }
    }

    fn push_long_line(&mut self, line: &str) {
        self.flush();
        for grapheme in line.graphemes(true) {
            if self.current.len() + grapheme.len() > self.max_length {
                self.flush();
            }
            self.current.push_str(grapheme);
            if self.open_fence.is_some() {
                self.block_has_body = true;
            }
        }
        self.current.push('\n');
    }

    /// Ends the current part, carrying an open code block over to the next one.
    fn flush(&mut self) {
        let Some(fence) = self.open_fence.clone() else {
            self.finish_part();
            return;
        };

        if self.block_has_body {
            if !self.current.ends_with('\n') {
                self.current.push('\n');
            }
            self.current.push_str(CODE_FENCE);
        } else {
            // The opening fence is the last line: move it to the next part
            let keep = self.current.len().saturating_sub(fence.len() + 1);
            self.current.truncate(keep);
        }
        self.finish_part();

        self.current.push_str(&fence);
        self.current.push('\n');
        self.block_has_body = false;
    }

    fn finish_part(&mut self) {
        let part = self.current.trim_end();
        if !part.trim().is_empty() {
            self.parts.push(part.to_string());
        }
        self.current.clear();
    }

    fn finish(mut self) -> Vec<String> {
        if let Some(fence) = self.open_fence.take() {
            if self.block_has_body {
                if !self.current.ends_with('\n') {
                    self.current.push('\n');
                }
                self.current.push_str(CODE_FENCE);
            } else {
                let keep = self.current.len().saturating_sub(fence.len() + 1);
                self.current.truncate(keep);
            }
        }
        self.finish_part();
        self.parts
    }
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// # Examples
///
/// ```
/// use chatgpt_tg_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Intended for file operations (`get_file` + `download_file`) that fail on
/// transient network errors. Backoff starts at 500ms, is capped at 4s and
/// jittered; the operation runs at most four times.
///
/// # Errors
///
/// Returns the last error if every attempt fails.
///
/// # Examples
///
/// ```no_run
/// use chatgpt_tg_bot::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn download_file() -> Result<Vec<u8>> {
///     Ok(vec![])
/// }
///
/// # async fn example() -> Result<()> {
/// let buffer = retry_telegram_operation(|| async { download_file().await }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} retries: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}
