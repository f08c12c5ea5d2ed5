use crate::emotion::ProbabilityVector;
use crate::errors::Result;
use ndarray::prelude::*;

/// Abstraction over the emotion classifier.
///
/// Implementations must tolerate concurrent `predict` calls from many
/// requests; the handle is shared read-only for the life of the process.
pub trait EmotionModel: Send + Sync {
    /// Forward pass over a `(1, 48, 48, 1)` tensor, returning the first batch row.
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<ProbabilityVector>;

    /// Short identifier for logs and health output.
    fn name(&self) -> &str;
}
