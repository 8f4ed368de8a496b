//! Per-document training records

use serde::{Serialize, Deserialize};
use crate::tree::Span;
use crate::{RankerError, Result};

/// An elementary discourse unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edu {
    /// Tokens of the EDU
    pub tokens: Vec<String>,
    /// POS tag of each token
    pub postags: Vec<String>,
    /// Index of the head token inside the EDU
    pub head: usize,
}

impl Edu {
    /// Head token and its POS tag, if the head index is in range
    pub fn head_word(&self) -> Option<(&str, &str)> {
        let token = self.tokens.get(self.head)?;
        let postag = self.postags.get(self.head).map(String::as_str).unwrap_or("");
        Some((token.as_str(), postag))
    }
}

/// Granularity at which a group of subtrees is being combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Inside one sentence
    Sentence,
    /// Across sentences inside one paragraph
    Paragraph,
    /// Across the whole document
    Document,
}

/// Which boundary tiers constrain tree construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryFlags {
    /// Build sentences before combining across them
    pub use_sbnds: bool,
    /// Build paragraphs before combining across them
    pub use_pbnds: bool,
}

impl BoundaryFlags {
    /// Create flags
    pub fn new(use_sbnds: bool, use_pbnds: bool) -> Self {
        BoundaryFlags { use_sbnds, use_pbnds }
    }

    /// Respect both sentence and paragraph boundaries
    pub fn all() -> Self {
        Self::new(true, true)
    }

    /// Ignore every boundary
    pub fn none() -> Self {
        Self::new(false, false)
    }
}

impl Default for BoundaryFlags {
    fn default() -> Self {
        Self::new(true, false)
    }
}

/// One training or evaluation instance: a document's EDUs together with its
/// sentence and paragraph boundaries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Optional identifier, used only in diagnostics
    #[serde(default)]
    pub id: Option<String>,
    /// EDUs in textual order; EDU ids are their positions
    pub edus: Vec<Edu>,
    /// Sentence ranges partitioning the EDUs
    #[serde(default)]
    pub sbnds: Vec<Span>,
    /// Paragraph ranges partitioning the EDUs
    #[serde(default)]
    pub pbnds: Vec<Span>,
}

impl Document {
    /// Build and validate a document; empty boundary lists become one range
    /// over the whole document
    pub fn new(edus: Vec<Edu>, sbnds: Vec<Span>, pbnds: Vec<Span>) -> Result<Self> {
        let mut doc = Document { id: None, edus, sbnds, pbnds };
        doc.normalize()?;
        Ok(doc)
    }

    /// Number of EDUs
    pub fn len(&self) -> usize {
        self.edus.len()
    }

    /// Whether the document has no EDUs
    pub fn is_empty(&self) -> bool {
        self.edus.is_empty()
    }

    /// Span covering the whole document
    pub fn full_span(&self) -> Span {
        Span::new(0, self.len().saturating_sub(1))
    }

    /// Boundary tiers to respect, finest first
    pub fn tiers(&self, flags: BoundaryFlags) -> Vec<(Level, &[Span])> {
        let mut tiers = Vec::with_capacity(2);
        if flags.use_sbnds {
            tiers.push((Level::Sentence, self.sbnds.as_slice()));
        }
        if flags.use_pbnds {
            tiers.push((Level::Paragraph, self.pbnds.as_slice()));
        }
        tiers
    }

    /// Fill empty boundary lists and check the structural invariants
    pub fn normalize(&mut self) -> Result<()> {
        if self.is_empty() {
            return Err(self.invalid("document has no EDUs".to_string()));
        }
        if self.sbnds.is_empty() {
            self.sbnds.push(self.full_span());
        }
        if self.pbnds.is_empty() {
            self.pbnds.push(self.full_span());
        }
        self.validate()
    }

    /// Check that both boundary lists partition the EDUs and that every
    /// paragraph is a union of whole sentences
    pub fn validate(&self) -> Result<()> {
        for (name, ranges) in [("sbnds", &self.sbnds), ("pbnds", &self.pbnds)] {
            self.check_partition(name, ranges)?;
        }
        for edu in &self.edus {
            if edu.tokens.len() != edu.postags.len() {
                return Err(self.invalid(format!(
                    "EDU has {} tokens but {} POS tags", edu.tokens.len(), edu.postags.len()
                )));
            }
        }
        if let Some(paragraph) = self.pbnds.iter().find(|p| p.crosses(&self.sbnds)) {
            return Err(self.invalid(format!(
                "paragraph {:?} splits a sentence", paragraph
            )));
        }
        Ok(())
    }

    fn check_partition(&self, name: &str, ranges: &[Span]) -> Result<()> {
        let mut expected_start = 0;
        for range in ranges {
            if range.start != expected_start || range.end < range.start {
                return Err(self.invalid(format!(
                    "{} range {:?} does not continue at EDU {}", name, range, expected_start
                )));
            }
            expected_start = range.end + 1;
        }
        if expected_start != self.len() {
            return Err(self.invalid(format!(
                "{} cover {} of {} EDUs", name, expected_start, self.len()
            )));
        }
        Ok(())
    }

    fn invalid(&self, message: String) -> RankerError {
        match &self.id {
            Some(id) => RankerError::InvalidDocument(format!("{}: {}", id, message)),
            None => RankerError::InvalidDocument(message),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::document;

    #[test]
    fn test_empty_boundaries_cover_document() {
        let doc = document(3, &[], &[]);
        assert_eq!(doc.sbnds, vec![Span::new(0, 2)]);
        assert_eq!(doc.pbnds, vec![Span::new(0, 2)]);
    }

    #[test]
    fn test_tiers_follow_flags() {
        let doc = document(4, &[(0, 1), (2, 3)], &[(0, 3)]);
        assert_eq!(doc.tiers(BoundaryFlags::all()).len(), 2);
        assert_eq!(doc.tiers(BoundaryFlags::default())[0].0, Level::Sentence);
        assert!(doc.tiers(BoundaryFlags::none()).is_empty());
        assert_eq!(doc.tiers(BoundaryFlags::new(false, true))[0].0, Level::Paragraph);
    }

    #[test]
    fn test_rejects_gaps_and_overlaps() {
        let edus = document(4, &[], &[]).edus;
        let gap = Document::new(edus.clone(), vec![Span::new(0, 0), Span::new(2, 3)], vec![]);
        assert!(gap.is_err());
        let short = Document::new(edus.clone(), vec![Span::new(0, 2)], vec![]);
        assert!(short.is_err());
        let split = Document::new(
            edus,
            vec![Span::new(0, 1), Span::new(2, 3)],
            vec![Span::new(0, 0), Span::new(1, 3)],
        );
        assert!(split.is_err());
    }

    #[test]
    fn test_rejects_empty_document() {
        assert!(Document::new(Vec::new(), vec![], vec![]).is_err());
    }

    #[test]
    fn test_head_word() {
        let doc = document(1, &[], &[]);
        assert_eq!(doc.edus[0].head_word(), Some(("w0", "NN")));
    }
}
