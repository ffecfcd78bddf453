//! Source documents - immutable input text for one extraction call.

use sha2::{Digest, Sha256};

/// A block of natural-language source text.
///
/// Owned by the caller for the duration of one extraction call; the core
/// never mutates or persists it. The lowercase copy and content hash are
/// computed once at construction so grounding checks stay allocation-free.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    text: String,
    lowered: String,
    content_hash: String,
}

impl SourceDocument {
    /// Wrap raw text (an email body, a pasted request, etc.).
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lowered = text.to_lowercase();
        let content_hash = format!("{:x}", Sha256::digest(text.as_bytes()));
        Self {
            text,
            lowered,
            content_hash,
        }
    }

    /// The original text, verbatim.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lowercased text, for case-insensitive containment checks.
    pub fn lowered(&self) -> &str {
        &self.lowered
    }

    /// SHA-256 of the text; keys per-document caches (e.g. segment
    /// embeddings) without retaining the document itself.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Non-empty trimmed lines, the segmentation unit for
    /// embedding-similarity grounding.
    pub fn segments(&self) -> Vec<&str> {
        self.text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// True when the document has no extractable content.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&str> for SourceDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SourceDocument {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowered_matches_text() {
        let doc = SourceDocument::new("Pickup in Dallas, TX");
        assert_eq!(doc.lowered(), "pickup in dallas, tx");
        assert_eq!(doc.text(), "Pickup in Dallas, TX");
    }

    #[test]
    fn test_segments_skip_blank_lines() {
        let doc = SourceDocument::new("Route: Celaya\n\n   \n3 pallets per day\n");
        assert_eq!(doc.segments(), vec!["Route: Celaya", "3 pallets per day"]);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = SourceDocument::new("same text");
        let b = SourceDocument::new("same text");
        let c = SourceDocument::new("different text");
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
