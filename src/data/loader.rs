//! JSON-lines datasets and bracketing files

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;
use super::Document;
use crate::tree::{parse_sexp, BinaryTree};
use crate::{RankerError, Result};

/// Load one [`Document`] per non-empty line of a JSON-lines file
///
/// Documents without an id are named after their line number.
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut doc: Document = serde_json::from_str(&line)?;
        if doc.id.is_none() {
            doc.id = Some(format!("{}:{}", path.display(), lineno + 1));
        }
        doc.normalize()?;
        documents.push(doc);
    }

    debug!("Loaded {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

/// Load one bracketing per non-empty line, as written by
/// [`crate::decoding::parse_documents`]
pub fn load_gold_trees<P: AsRef<Path>>(path: P) -> Result<Vec<BinaryTree>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut trees = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let tree = parse_sexp(&line).map_err(|e| {
            RankerError::Sexp(format!("{}:{}: {}", path.display(), lineno + 1, e))
        })?;
        trees.push(tree);
    }

    Ok(trees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_documents_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"edus": [{{"tokens": ["a"], "postags": ["DT"], "head": 0}}, {{"tokens": ["b"], "postags": ["NN"], "head": 0}}]}}"#
        ).unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"id": "d2", "edus": [{{"tokens": ["c"], "postags": ["NN"], "head": 0}}], "sbnds": [{{"start": 0, "end": 0}}]}}"#
        ).unwrap();
        drop(file);

        let docs = load_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].len(), 2);
        assert_eq!(docs[0].sbnds.len(), 1);
        assert!(docs[0].id.as_deref().unwrap().ends_with(":1"));
        assert_eq!(docs[1].id.as_deref(), Some("d2"));
    }

    #[test]
    fn test_load_gold_trees_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gold.txt");
        std::fs::write(&path, "( 0 1 )\n( 0 1 2 )\n").unwrap();
        let err = load_gold_trees(&path).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }
}
