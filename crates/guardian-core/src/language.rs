//! Language resolution.

/// Default language tag used when the caller gives no hint.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Resolves the language of a request.
///
/// A caller-declared hint always wins. Without one the detector falls back to
/// its configured default tag.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    default_tag: String,
}

impl LanguageDetector {
    /// Creates a detector that falls back to [`DEFAULT_LANGUAGE`].
    pub fn new() -> Self {
        Self::with_default(DEFAULT_LANGUAGE)
    }

    /// Creates a detector with a custom fallback tag.
    pub fn with_default(tag: impl Into<String>) -> Self {
        Self {
            default_tag: tag.into(),
        }
    }

    /// Returns the fallback tag.
    pub fn default_tag(&self) -> &str {
        &self.default_tag
    }

    /// Returns the language tag for `text`.
    ///
    /// A non-blank `hint` is returned unchanged.
    pub fn detect(&self, _text: &str, hint: &str) -> String {
        if hint.trim().is_empty() {
            self.default_tag.clone()
        } else {
            hint.to_string()
        }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}
