use serde::{Deserialize, Serialize};
use tracing::debug;

/// Appended to content that was cut at `max_words`.
pub const TRUNCATION_MARKER: &str = "…";

/// Why a piece of text was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Below the character gate before trimming.
    TooShort,
    /// Below the word gate after trimming.
    TooFewWords,
    /// Title and summary mention none of the topic keywords.
    OffTopic,
}

/// Length, quality and topic heuristics applied to extracted article text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFilter {
    pub min_chars: usize,
    pub min_words: usize,
    pub max_words: usize,
    pub min_words_after_trim: usize,
    /// Matched case-insensitively; empty disables the topic gate.
    pub topic_keywords: Vec<String>,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self {
            min_chars: 600,
            min_words: 150,
            max_words: 400,
            min_words_after_trim: 130,
            topic_keywords: Vec::new(),
        }
    }
}

impl ContentFilter {
    /// Run both gates and the trim. Returns the text to store.
    pub fn filter(&self, raw_text: &str) -> Result<String, Rejection> {
        let text = raw_text.trim();

        let chars = text.chars().count();
        if chars < self.min_chars {
            debug!(chars, min = self.min_chars, "Rejected: text below character gate");
            return Err(Rejection::TooShort);
        }

        let trimmed = self.trim(text);

        let words = word_count(&trimmed);
        if words < self.min_words_after_trim {
            debug!(words, min = self.min_words_after_trim, "Rejected: too few words after trim");
            return Err(Rejection::TooFewWords);
        }

        Ok(trimmed)
    }

    /// Cut `text` to at most `max_words` words.
    ///
    /// Text of `min_words` words or fewer is returned unchanged, as is text
    /// already inside the window.
    pub fn trim(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();

        if words.len() <= self.min_words || words.len() <= self.max_words {
            return text.to_string();
        }

        let mut out = words[..self.max_words].join(" ");
        out.push_str(TRUNCATION_MARKER);
        out
    }

    /// Topic gate over the feed metadata, checked before any page is fetched.
    pub fn check_topic(&self, title: &str, summary: Option<&str>) -> Result<(), Rejection> {
        if self.topic_keywords.is_empty() {
            return Ok(());
        }

        let haystack = format!("{} {}", title, summary.unwrap_or("")).to_lowercase();
        if self
            .topic_keywords
            .iter()
            .any(|keyword| haystack.contains(&keyword.to_lowercase()))
        {
            Ok(())
        } else {
            Err(Rejection::OffTopic)
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
