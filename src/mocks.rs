use crate::emotion::{ProbabilityVector, EMOTION_COUNT};
use crate::errors::{EmotionError, Result};
use crate::preprocess::INPUT_SIZE;
use crate::traits::EmotionModel;
use ndarray::prelude::*;

/// Test model that returns a fixed probability row for every well-shaped input.
#[derive(Debug, Clone)]
pub struct MockEmotionModel {
    pub probabilities: [f32; EMOTION_COUNT],
}

impl MockEmotionModel {
    pub const fn new(probabilities: [f32; EMOTION_COUNT]) -> Self {
        Self { probabilities }
    }

    /// Mostly happy with some anger.
    pub const fn happy() -> Self {
        Self::new([0.1, 0.05, 0.02, 0.7, 0.05, 0.03, 0.05])
    }
}

impl EmotionModel for MockEmotionModel {
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<ProbabilityVector> {
        let size = INPUT_SIZE as usize;
        if tensor.dim() != (1, size, size, 1) {
            return Err(EmotionError::inference(
                "mock forward pass",
                format!("unexpected input shape {:?}", tensor.shape()),
            ));
        }
        ProbabilityVector::new(self.probabilities)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Test model whose forward pass always fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingEmotionModel;

impl EmotionModel for FailingEmotionModel {
    fn predict(&self, _tensor: ArrayView4<f32>) -> Result<ProbabilityVector> {
        Err(EmotionError::inference(
            "mock forward pass",
            "simulated runtime failure",
        ))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
