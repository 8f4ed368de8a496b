//! Binary bracketings over EDU sequences

use std::fmt;
use serde::Serialize;
use super::Span;

/// Index of a node inside a [`BinaryTree`] arena
pub type NodeId = usize;

/// Traversal order used when collecting spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Parent before children
    PreOrder,
    /// Children before parent
    PostOrder,
}

/// A binary bracketing stored as an append-only arena
///
/// - Nodes `0..n_edus` are the leaves, node `i` covers EDU `i`
/// - Every merge appends a new internal node over two adjacent root nodes
/// - Existing nodes are never modified, so a node id stays valid for the
///   lifetime of the tree
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct BinaryTree {
    /// Number of leaves
    n_edus: usize,
    /// Span covered by each node
    spans: Vec<Span>,
    /// Children of each node, `None` for leaves
    children: Vec<Option<(NodeId, NodeId)>>,
    /// Whether each node already has a parent
    attached: Vec<bool>,
}

impl BinaryTree {
    /// Create a forest of `n_edus` unattached leaves
    pub fn with_leaves(n_edus: usize) -> Self {
        BinaryTree {
            n_edus,
            spans: (0..n_edus).map(Span::leaf).collect(),
            children: vec![None; n_edus],
            attached: vec![false; n_edus],
        }
    }

    /// Join two adjacent root nodes under a new parent and return its id
    pub fn merge(&mut self, left: NodeId, right: NodeId) -> crate::Result<NodeId> {
        for &node in &[left, right] {
            if node >= self.spans.len() {
                return Err(crate::RankerError::InvalidTree(
                    format!("Node index {} out of bounds", node)
                ));
            }
            if self.attached[node] {
                return Err(crate::RankerError::InvalidTree(
                    format!("Node {} already has a parent", node)
                ));
            }
        }

        let (left_span, right_span) = (self.spans[left], self.spans[right]);
        if !left_span.is_adjacent_to(&right_span) {
            return Err(crate::RankerError::InvalidTree(
                format!("Spans {:?} and {:?} are not adjacent", left_span, right_span)
            ));
        }

        self.attached[left] = true;
        self.attached[right] = true;
        self.spans.push(left_span.join(&right_span));
        self.children.push(Some((left, right)));
        self.attached.push(false);
        Ok(self.spans.len() - 1)
    }

    /// Number of EDUs (leaves)
    pub fn n_edus(&self) -> usize {
        self.n_edus
    }

    /// Number of nodes in the arena
    pub fn size(&self) -> usize {
        self.spans.len()
    }

    /// Span covered by a node
    pub fn span(&self, node: NodeId) -> Span {
        self.spans[node]
    }

    /// Children of a node (None for leaves)
    pub fn children(&self, node: NodeId) -> Option<(NodeId, NodeId)> {
        self.children[node]
    }

    /// Nodes without a parent, ordered left to right
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = (0..self.size())
            .filter(|&node| !self.attached[node])
            .collect();
        roots.sort_by_key(|&node| self.spans[node].start);
        roots
    }

    /// The root node, if the arena holds a single tree
    pub fn root(&self) -> Option<NodeId> {
        match self.roots().as_slice() {
            [root] => Some(*root),
            _ => None,
        }
    }

    /// Whether the arena is one binary tree covering every EDU
    pub fn is_complete(&self) -> bool {
        if self.n_edus == 0 {
            return false;
        }
        match self.root() {
            Some(root) => self.spans[root] == Span::new(0, self.n_edus - 1),
            None => false,
        }
    }

    /// Spans of internal nodes (terminals excluded) in the given order
    pub fn internal_spans(&self, order: Order) -> Vec<Span> {
        self.spans(order, false)
    }

    /// Spans of all nodes reachable from the roots
    pub fn spans(&self, order: Order, include_terminals: bool) -> Vec<Span> {
        let mut result = Vec::with_capacity(self.size());
        for root in self.roots() {
            self.collect_spans(root, order, include_terminals, &mut result);
        }
        result
    }

    fn collect_spans(&self, node: NodeId, order: Order, include_terminals: bool, out: &mut Vec<Span>) {
        match self.children[node] {
            None => {
                if include_terminals {
                    out.push(self.spans[node]);
                }
            }
            Some((left, right)) => {
                if order == Order::PreOrder {
                    out.push(self.spans[node]);
                }
                self.collect_spans(left, order, include_terminals, out);
                self.collect_spans(right, order, include_terminals, out);
                if order == Order::PostOrder {
                    out.push(self.spans[node]);
                }
            }
        }
    }

    /// Render as a nested-parenthesis expression over EDU indices,
    /// e.g. `( ( 0 1 ) 2 )`
    pub fn to_sexp(&self) -> String {
        let parts: Vec<String> = self.roots()
            .into_iter()
            .map(|root| self.sexp_recursive(root))
            .collect();
        parts.join(" ")
    }

    fn sexp_recursive(&self, node: NodeId) -> String {
        match self.children[node] {
            None => self.spans[node].start.to_string(),
            Some((left, right)) => format!(
                "( {} {} )",
                self.sexp_recursive(left),
                self.sexp_recursive(right)
            ),
        }
    }

    fn fmt_recursive(&self, f: &mut fmt::Formatter<'_>, node: NodeId, indent: usize) -> fmt::Result {
        for _ in 0..indent {
            write!(f, "  ")?;
        }
        writeln!(f, "● {:?}", self.spans[node])?;

        if let Some((left, right)) = self.children[node] {
            self.fmt_recursive(f, left, indent + 1)?;
            self.fmt_recursive(f, right, indent + 1)?;
        }
        Ok(())
    }
}

impl fmt::Debug for BinaryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BinaryTree(n_edus={})", self.n_edus)?;
        for root in self.roots() {
            self.fmt_recursive(f, root, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn left_branching(n: usize) -> BinaryTree {
        let mut tree = BinaryTree::with_leaves(n);
        let mut acc = 0;
        for leaf in 1..n {
            acc = tree.merge(acc, leaf).unwrap();
        }
        tree
    }

    #[test]
    fn test_single_leaf_is_complete() {
        let tree = BinaryTree::with_leaves(1);
        assert!(tree.is_complete());
        assert_eq!(tree.root(), Some(0));
        assert!(tree.internal_spans(Order::PreOrder).is_empty());
        assert_eq!(tree.to_sexp(), "0");
    }

    #[test]
    fn test_empty_tree_is_not_complete() {
        assert!(!BinaryTree::with_leaves(0).is_complete());
    }

    #[test]
    fn test_serializes_arena() {
        let json = serde_json::to_value(left_branching(2)).unwrap();
        assert_eq!(json["n_edus"], 2);
        assert_eq!(json["spans"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["attached"], serde_json::json!([true, true, false]));
    }

    #[test]
    fn test_merge_orders() {
        let tree = left_branching(3);
        assert!(tree.is_complete());
        assert_eq!(
            tree.internal_spans(Order::PreOrder),
            vec![Span::new(0, 2), Span::new(0, 1)]
        );
        assert_eq!(
            tree.internal_spans(Order::PostOrder),
            vec![Span::new(0, 1), Span::new(0, 2)]
        );
        assert_eq!(tree.spans(Order::PreOrder, true).len(), 5);
        assert_eq!(tree.to_sexp(), "( ( 0 1 ) 2 )");
    }

    #[test]
    fn test_merge_rejects_non_adjacent() {
        let mut tree = BinaryTree::with_leaves(3);
        assert!(tree.merge(0, 2).is_err());
        assert!(tree.merge(1, 0).is_err());
    }

    #[test]
    fn test_merge_rejects_reattachment() {
        let mut tree = BinaryTree::with_leaves(3);
        tree.merge(0, 1).unwrap();
        assert!(tree.merge(1, 2).is_err());
        assert!(tree.merge(7, 2).is_err());
    }

    #[test]
    fn test_partial_forest_roots() {
        let mut tree = BinaryTree::with_leaves(4);
        let right = tree.merge(2, 3).unwrap();
        assert_eq!(tree.roots(), vec![0, 1, right]);
        assert!(tree.root().is_none());
        assert!(!tree.is_complete());
        assert_eq!(tree.to_sexp(), "0 1 ( 2 3 )");
    }
}
