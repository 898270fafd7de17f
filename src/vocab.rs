//! Vocabulary filter - replaces unknown tokens with a marker

use crate::store::VectorStore;

/// Marker substituted for tokens without an embedding
pub const OOV_MARKER: &str = "UNK";

/// Anything that can answer "is this word known?"
pub trait Vocabulary {
    fn contains(&self, word: &str) -> bool;
}

impl Vocabulary for VectorStore {
    fn contains(&self, word: &str) -> bool {
        VectorStore::contains(self, word)
    }
}

/// Token pre-processor keeping known tokens and masking the rest
pub struct VocabFilter<'a, V: Vocabulary + ?Sized> {
    vocab: &'a V,
    marker: String,
}

impl<'a, V: Vocabulary + ?Sized> VocabFilter<'a, V> {
    pub fn new(vocab: &'a V) -> Self {
        Self {
            vocab,
            marker: OOV_MARKER.to_string(),
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// The token itself if known, the marker otherwise
    pub fn filter<'s>(&'s self, token: &'s str) -> &'s str {
        if self.vocab.contains(token) {
            token
        } else {
            &self.marker
        }
    }

    /// Filter every whitespace-separated token of `line`
    pub fn filter_line(&self, line: &str) -> String {
        line.split_whitespace()
            .map(|token| self.filter(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
