//! Span-multiset distance between bracketings

use std::collections::HashMap;
use super::Span;

/// Size of the multiset intersection of two span collections
///
/// Duplicates count up to the smaller multiplicity present in both.
pub fn multiset_intersection_size(spans1: &[Span], spans2: &[Span]) -> usize {
    let mut counts: HashMap<Span, usize> = HashMap::with_capacity(spans2.len());
    for span in spans2 {
        *counts.entry(*span).or_insert(0) += 1;
    }

    spans1.iter()
        .filter(|span| match counts.get_mut(span) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        })
        .count()
}

/// Margin between two bracketings of the same EDU sequence:
/// `coef * (|spans1| - |spans1 ∩ spans2|)`
///
/// Only the excess of `spans1` is counted, so the result is not symmetric in
/// general. Panics if the collections differ in size.
pub fn compute_tree_distance(spans1: &[Span], spans2: &[Span], coef: f32) -> f32 {
    assert_eq!(
        spans1.len(),
        spans2.len(),
        "Trees must have the same number of spans ({} vs {})",
        spans1.len(),
        spans2.len()
    );

    let dist = spans1.len() - multiset_intersection_size(spans1, spans2);
    coef * dist as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pairs: &[(usize, usize)]) -> Vec<Span> {
        pairs.iter().map(|&p| Span::from(p)).collect()
    }

    #[test]
    fn test_one_shared_span() {
        let a = spans(&[(0, 1), (0, 2)]);
        let b = spans(&[(1, 2), (0, 2)]);
        assert_eq!(multiset_intersection_size(&a, &b), 1);
        assert_eq!(compute_tree_distance(&a, &b, 2.0), 2.0);
    }

    #[test]
    fn test_order_does_not_matter() {
        let a = spans(&[(0, 1), (2, 3), (0, 3)]);
        let b = spans(&[(0, 3), (0, 1), (2, 3)]);
        assert_eq!(compute_tree_distance(&a, &b, 1.0), 0.0);
    }

    #[test]
    fn test_duplicates_count_up_to_min_multiplicity() {
        let a = spans(&[(0, 1), (0, 1), (2, 3)]);
        let b = spans(&[(0, 1), (4, 5), (6, 7)]);
        assert_eq!(multiset_intersection_size(&a, &b), 1);
        assert_eq!(compute_tree_distance(&a, &b, 1.0), 2.0);
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(compute_tree_distance(&[], &[], 3.0), 0.0);
    }

    #[test]
    #[should_panic(expected = "same number of spans")]
    fn test_size_mismatch_panics() {
        compute_tree_distance(&spans(&[(0, 1)]), &[], 1.0);
    }
}
