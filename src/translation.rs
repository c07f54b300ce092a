//! Translation boundary.
//!
//! Non-analysis-language text is translated before sentiment estimation.
//! The engine ships only a passthrough; hosts wire a real service behind
//! [`Translator`].

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Short provider name recorded on translated mood entries.
    fn name(&self) -> &str;

    /// Detect the language of `text`. `Ok(None)` means "unknown".
    async fn detect_language(&self, text: &str) -> Result<Option<String>>;

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String>;
}

/// Detects nothing and returns text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn detect_language(&self, _text: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn translate(&self, text: &str, _from: &str, _to: &str) -> Result<String> {
        Ok(text.to_owned())
    }
}
