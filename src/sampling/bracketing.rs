//! Tiered bottom-up construction of binary trees

use crate::data::{BoundaryFlags, Document, Level};
use crate::tree::{BinaryTree, NodeId};
use crate::Result;

/// Combines a contiguous run of subtrees into a single subtree
pub trait MergeStrategy {
    /// Merge `units` (adjacent roots of `tree`, left to right) into one node
    /// and return its id. A single unit is returned unchanged.
    fn merge_units(&mut self, tree: &mut BinaryTree, units: &[NodeId], level: Level) -> Result<NodeId>;
}

/// Build a complete binary tree over `doc`
///
/// For each active tier (sentences, then paragraphs) the units inside every
/// range are merged into one subtree; the remaining units are then merged
/// across the whole document.
pub fn build_tiered<S: MergeStrategy + ?Sized>(
    doc: &Document,
    flags: BoundaryFlags,
    strategy: &mut S,
) -> Result<BinaryTree> {
    let mut tree = BinaryTree::with_leaves(doc.len());
    let mut units: Vec<NodeId> = (0..doc.len()).collect();

    for (level, ranges) in doc.tiers(flags) {
        let mut next = Vec::with_capacity(ranges.len());
        let mut cursor = 0;
        for range in ranges {
            let begin = cursor;
            while cursor < units.len() && tree.span(units[cursor]).end <= range.end {
                cursor += 1;
            }
            if cursor > begin {
                next.push(strategy.merge_units(&mut tree, &units[begin..cursor], level)?);
            }
        }
        next.extend_from_slice(&units[cursor..]);
        units = next;
    }

    // Zero EDUs: nothing to bracket
    if units.is_empty() {
        return Ok(tree);
    }
    strategy.merge_units(&mut tree, &units, Level::Document)?;
    debug_assert!(tree.is_complete());
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::document;
    use crate::tree::{Order, Span};

    /// Right-branching merges that remember which levels they were asked for
    struct Recording(Vec<(Level, usize)>);

    impl MergeStrategy for Recording {
        fn merge_units(&mut self, tree: &mut BinaryTree, units: &[NodeId], level: Level) -> Result<NodeId> {
            self.0.push((level, units.len()));
            let (&last, rest) = units.split_last().expect("at least one unit");
            let mut acc = last;
            for &unit in rest.iter().rev() {
                acc = tree.merge(unit, acc)?;
            }
            Ok(acc)
        }
    }

    #[test]
    fn test_sentences_built_first() {
        let doc = document(5, &[(0, 1), (2, 4)], &[(0, 4)]);
        let mut strategy = Recording(Vec::new());
        let tree = build_tiered(&doc, BoundaryFlags::default(), &mut strategy).unwrap();

        assert!(tree.is_complete());
        assert_eq!(
            strategy.0,
            vec![(Level::Sentence, 2), (Level::Sentence, 3), (Level::Document, 2)]
        );
        let spans = tree.internal_spans(Order::PreOrder);
        assert!(spans.contains(&Span::new(0, 1)));
        assert!(spans.contains(&Span::new(2, 4)));
    }

    #[test]
    fn test_paragraph_tier_groups_sentences() {
        let doc = document(4, &[(0, 0), (1, 1), (2, 3)], &[(0, 1), (2, 3)]);
        let mut strategy = Recording(Vec::new());
        let tree = build_tiered(&doc, BoundaryFlags::all(), &mut strategy).unwrap();

        assert!(tree.is_complete());
        assert!(strategy.0.contains(&(Level::Paragraph, 2)));
        assert_eq!(strategy.0.last(), Some(&(Level::Document, 2)));
        assert!(tree.internal_spans(Order::PreOrder).contains(&Span::new(0, 1)));
    }

    #[test]
    fn test_empty_document_is_trivial() {
        let doc = Document { id: None, edus: Vec::new(), sbnds: Vec::new(), pbnds: Vec::new() };
        let mut strategy = Recording(Vec::new());
        let tree = build_tiered(&doc, BoundaryFlags::all(), &mut strategy).unwrap();
        assert_eq!(tree.n_edus(), 0);
        assert!(strategy.0.is_empty());
        assert_eq!(tree.to_sexp(), "");
    }

    #[test]
    fn test_single_edu() {
        let doc = document(1, &[], &[]);
        let tree = build_tiered(&doc, BoundaryFlags::all(), &mut Recording(Vec::new())).unwrap();
        assert!(tree.is_complete());
        assert!(tree.internal_spans(Order::PreOrder).is_empty());
    }
}
