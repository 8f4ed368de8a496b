//! Parsing binary bracketings written as s-expressions

use super::{BinaryTree, NodeId};
use crate::{RankerError, Result};

/// Split an s-expression into parenthesis and atom tokens
pub fn tokenize_sexp(text: &str) -> Vec<String> {
    text.replace('(', " ( ")
        .replace(')', " ) ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Parse `( ( 0 1 ) 2 )` style text into a complete binary tree
///
/// Leaves must be the EDU indices `0..n` in left-to-right order and every
/// bracket must hold exactly two constituents.
pub fn parse_sexp(text: &str) -> Result<BinaryTree> {
    let tokens = tokenize_sexp(text);
    let n_edus = tokens.iter().filter(|t| *t != "(" && *t != ")").count();
    if n_edus == 0 {
        return Err(RankerError::Sexp(format!("No leaves in {:?}", text)));
    }

    let mut parser = SexpParser {
        tokens: &tokens,
        pos: 0,
        next_leaf: 0,
        tree: BinaryTree::with_leaves(n_edus),
    };
    parser.parse_node()?;
    if parser.pos != tokens.len() {
        return Err(RankerError::Sexp(format!(
            "Trailing tokens after position {} in {:?}", parser.pos, text
        )));
    }
    Ok(parser.tree)
}

struct SexpParser<'a> {
    tokens: &'a [String],
    pos: usize,
    next_leaf: usize,
    tree: BinaryTree,
}

impl<'a> SexpParser<'a> {
    fn next_token(&mut self) -> Result<&'a str> {
        let tokens = self.tokens;
        let token = tokens
            .get(self.pos)
            .ok_or_else(|| RankerError::Sexp("Unexpected end of input".to_string()))?;
        self.pos += 1;
        Ok(token.as_str())
    }

    fn parse_node(&mut self) -> Result<NodeId> {
        match self.next_token()? {
            "(" => {
                let left = self.parse_node()?;
                let right = self.parse_node()?;
                match self.next_token()? {
                    ")" => self.tree.merge(left, right),
                    other => Err(RankerError::Sexp(format!(
                        "Expected ')' after two constituents, found {:?}", other
                    ))),
                }
            }
            ")" => Err(RankerError::Sexp("Unbalanced ')'".to_string())),
            atom => {
                let index: usize = atom.parse().map_err(|_| {
                    RankerError::Sexp(format!("Leaf {:?} is not an EDU index", atom))
                })?;
                if index != self.next_leaf {
                    return Err(RankerError::Sexp(format!(
                        "Expected leaf {}, found {}", self.next_leaf, index
                    )));
                }
                self.next_leaf += 1;
                Ok(index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Order, Span};

    #[test]
    fn test_parse_roundtrip() {
        let text = "( ( 0 1 ) ( 2 3 ) )";
        let tree = parse_sexp(text).unwrap();
        assert!(tree.is_complete());
        assert_eq!(tree.to_sexp(), text);
        assert_eq!(
            tree.internal_spans(Order::PostOrder),
            vec![Span::new(0, 1), Span::new(2, 3), Span::new(0, 3)]
        );
    }

    #[test]
    fn test_parse_compact_spacing() {
        let tree = parse_sexp("(0 (1 2))").unwrap();
        assert_eq!(tree.to_sexp(), "( 0 ( 1 2 ) )");
    }

    #[test]
    fn test_parse_single_leaf() {
        let tree = parse_sexp("0").unwrap();
        assert!(tree.is_complete());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_sexp("").is_err());
        assert!(parse_sexp("( 0 1 2 )").is_err());
        assert!(parse_sexp("( 1 0 )").is_err());
        assert!(parse_sexp("( 0 1").is_err());
        assert!(parse_sexp("( 0 1 ) )").is_err());
        assert!(parse_sexp("( 0 x )").is_err());
    }
}
