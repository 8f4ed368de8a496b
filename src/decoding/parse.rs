//! Decode a dataset into a prediction file

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;
use super::IncrementalDecoder;
use crate::data::{BoundaryFlags, Document};
use crate::nn::SpanScorer;
use crate::tree::BinaryTree;
use crate::Result;

/// Decode every document in inference mode, respecting sentence and
/// paragraph boundaries, and write one s-expression per line to `path_pred`
pub fn parse_documents<S: SpanScorer + ?Sized, P: AsRef<Path>>(
    decoder: &IncrementalDecoder,
    scorer: &S,
    docs: &[Document],
    path_pred: P,
) -> Result<Vec<BinaryTree>> {
    let mut writer = BufWriter::new(File::create(path_pred.as_ref())?);
    let mut trees = Vec::with_capacity(docs.len());

    for doc in docs {
        let encoded = scorer.encode(doc)?;
        let tree = decoder.decode(scorer, doc, &encoded, BoundaryFlags::all(), None)?;
        writeln!(writer, "{}", tree.to_sexp())?;
        trees.push(tree);
    }
    writer.flush()?;

    debug!("Wrote {} predicted trees to {}", trees.len(), path_pred.as_ref().display());
    Ok(trees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::document;
    use crate::nn::{LinearSpanModel, ScorerConfig};
    use crate::tree::parse_sexp;

    #[test]
    fn test_one_line_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pred.txt");
        let model = LinearSpanModel::new(ScorerConfig { dim: 8, seed: Some(1) }).unwrap();
        let docs = vec![
            document(3, &[], &[]),
            document(5, &[(0, 1), (2, 4)], &[]),
            document(1, &[], &[]),
        ];

        let trees = parse_documents(&IncrementalDecoder::new(), &model, &docs, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for ((line, tree), doc) in lines.iter().zip(&trees).zip(&docs) {
            let parsed = parse_sexp(line).unwrap();
            assert_eq!(parsed.n_edus(), doc.len());
            assert_eq!(parsed.to_sexp(), tree.to_sexp());
        }
        assert_eq!(lines[2], "0");
    }
}
