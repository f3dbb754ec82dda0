//! Log output setup.
//!
//! All log lines pass through [`RedactingWriter`], which masks Telegram bot
//! tokens and API keys before they reach stderr.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    token_in_url: Regex,
    token_bare: Regex,
    token_prefixed: Regex,
    bearer: Regex,
    openai_key: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_in_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token_bare: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_prefixed: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            bearer: Regex::new(r"(Bearer\s+)[A-Za-z0-9._-]+")?,
            openai_key: Regex::new(r"sk-[A-Za-z0-9_-]{16,}")?,
        })
    }

    /// Returns `input` with every known secret shape masked
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let mut output = self
            .token_in_url
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_prefixed
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self.bearer.replace_all(&output, "$1[MASKED]").to_string();
        output = self
            .openai_key
            .replace_all(&output, "[OPENAI_KEY]")
            .to_string();
        output
    }
}

/// Writer that redacts secrets before forwarding to the inner writer
pub struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length; the redacted text may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Installs the global `tracing` subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
        patterns,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_telegram_token_in_url() -> Result<(), regex::Error> {
        let patterns = RedactionPatterns::new()?;
        let line = "GET https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw/getUpdates";
        let redacted = patterns.redact(line);
        assert!(!redacted.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));
        Ok(())
    }

    #[test]
    fn test_redacts_openai_key_and_bearer() -> Result<(), regex::Error> {
        let patterns = RedactionPatterns::new()?;
        let redacted =
            patterns.redact("key=sk-proj-abcdefghijklmnopqrstuv Authorization: Bearer abc.def-123");
        assert!(!redacted.contains("abcdefghijklmnopqrstuv"));
        assert!(!redacted.contains("abc.def-123"));
        assert!(redacted.contains("Bearer [MASKED]"));
        Ok(())
    }

    #[test]
    fn test_writer_passes_plain_text_through() -> Result<(), Box<dyn std::error::Error>> {
        let patterns = Arc::new(RedactionPatterns::new()?);
        let mut sink = Vec::new();
        {
            let mut writer = RedactingWriter::new(&mut sink, patterns);
            let written = writer.write(b"nothing secret here")?;
            assert_eq!(written, 19);
        }
        assert_eq!(String::from_utf8(sink)?, "nothing secret here");
        Ok(())
    }
}
