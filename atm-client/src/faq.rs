use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::consts::DEFAULT_FAQS;
use crate::error::Rejection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Question currently picked in the UI and the answer it resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaqSelection {
    pub question: String,
    pub answer: String,
}

/// Ordered FAQ list. Entries are only ever removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqStore {
    entries: Vec<FaqEntry>,
}

impl Default for FaqStore {
    fn default() -> Self {
        Self::new(
            DEFAULT_FAQS
                .iter()
                .map(|(question, answer)| FaqEntry::new(*question, *answer))
                .collect(),
        )
    }
}

impl FaqStore {
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    /// Load `[{"question": .., "answer": ..}, ..]` from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read FAQ file {}", path.display()))?;
        let entries: Vec<FaqEntry> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse FAQ file {}", path.display()))?;
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, question: &str) -> bool {
        self.entries.iter().any(|faq| faq.question == question)
    }

    /// Answer for an exact question match, or `""`.
    pub fn select(&self, question: &str) -> &str {
        self.entries
            .iter()
            .find(|faq| faq.question == question)
            .map(|faq| faq.answer.as_str())
            .unwrap_or("")
    }

    /// Remove the entry at a 1-based position.
    pub fn remove_at(&mut self, position: usize) -> Result<FaqEntry, Rejection> {
        if position == 0 || position > self.entries.len() {
            return Err(Rejection::InvalidIndex {
                input: position.to_string(),
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(position - 1))
    }

    /// Parse a position typed by the user. Anything but a whole number is an
    /// invalid index; range is checked by `remove_at`.
    pub fn parse_position(&self, input: &str) -> Result<usize, Rejection> {
        input
            .trim()
            .parse::<usize>()
            .map_err(|_| Rejection::InvalidIndex {
                input: input.to_string(),
                len: self.entries.len(),
            })
    }
}
