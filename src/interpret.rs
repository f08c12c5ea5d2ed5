//! Turns a probability row into a ranked, described result set.
//!
//! Ordering rule: the argmax label is always first, even when a secondary
//! label ties it. Secondary labels follow in descending confidence, ties kept
//! in label order.

use crate::emotion::{
    EmotionLabel, EmotionResult, ProbabilityVector, ResultSet, CONFIDENCE_THRESHOLD,
};

/// Argmax over the row. Ties resolve to the lowest index.
pub fn interpret_top(vector: &ProbabilityVector) -> (EmotionLabel, f32) {
    vector
        .iter()
        .fold(None, |best: Option<(EmotionLabel, f32)>, (label, p)| match best {
            Some((_, top)) if p <= top => best,
            _ => Some((label, p)),
        })
        .unwrap_or((EmotionLabel::ALL[0], vector.as_slice()[0]))
}

/// The top label, then every other label scoring strictly above the threshold.
pub fn build_result_set(vector: &ProbabilityVector) -> ResultSet {
    let (top_label, top_confidence) = interpret_top(vector);

    let mut secondary: Vec<EmotionResult> = vector
        .iter()
        .filter(|&(label, p)| label != top_label && p > CONFIDENCE_THRESHOLD)
        .map(|(label, p)| EmotionResult::new(label, p))
        .collect();
    sort_descending(&mut secondary);

    let mut results = Vec::with_capacity(secondary.len() + 1);
    results.push(EmotionResult::new(top_label, top_confidence));
    results.extend(secondary);
    results
}

/// Stable descending sort on confidence.
pub(crate) fn sort_descending(results: &mut [EmotionResult]) {
    results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}
