//! Margin-ranking objective for one instance

/// Hinge loss, ranking outcome and score gradients of one instance
#[derive(Clone, Debug, PartialEq)]
pub struct RankingObjective {
    /// `Σ_j max(0, s_j + m_j - s_0)`
    pub loss: f32,
    /// Whether the positive (index 0) is the first maximum of the scores
    pub correct: bool,
    /// `∂loss / ∂s_k` for every tree score, positive first
    pub upstream: Vec<f32>,
}

/// Evaluate the hinge objective for `scores = [s_pos, s_neg_1, ...]` and
/// one margin per negative
pub fn margin_ranking(scores: &[f32], margins: &[f32]) -> RankingObjective {
    assert_eq!(
        scores.len(),
        margins.len() + 1,
        "Expected one score per negative plus the positive ({} scores, {} margins)",
        scores.len(),
        margins.len()
    );

    let positive = scores[0];
    let mut upstream = vec![0.0; scores.len()];
    let loss = scores[1..]
        .iter()
        .zip(margins)
        .enumerate()
        .fold(0.0, |acc, (j, (&negative, &margin))| {
            let violation = negative + margin - positive;
            if violation > 0.0 {
                upstream[0] -= 1.0;
                upstream[j + 1] += 1.0;
                acc + violation
            } else {
                acc
            }
        });

    RankingObjective {
        loss,
        correct: ranked_first(scores) == Some(0),
        upstream,
    }
}

/// Index of the first maximum
pub fn ranked_first(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &score)| match best {
            Some((_, top)) if score <= top => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}
