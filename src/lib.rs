pub mod config;
pub mod emotion;
pub mod errors;
pub mod fallback;
pub mod interpret;
pub mod model;
pub mod preprocess;
pub mod runtime;
pub mod server;
pub mod traits;
pub mod validation;

pub mod mocks;

use tracing::{debug, warn};

pub use config::Config;
pub use emotion::{
    Analysis, EmotionLabel, EmotionResult, ProbabilityVector, ResultSet, ResultSource,
};
pub use errors::{EmotionError, Result, ValidationError};
pub use fallback::FallbackGenerator;
pub use interpret::{build_result_set, interpret_top};
pub use model::Model;
pub use runtime::ModelRuntime;
pub use traits::*;
pub use validation::Validator;

/// The inference pipeline: preprocess, predict, interpret, with fallback
/// output whenever the model cannot answer.
pub struct EmotionAnalyzer<M: EmotionModel> {
    runtime: ModelRuntime<M>,
    fallback: FallbackGenerator,
}

impl<M: EmotionModel> EmotionAnalyzer<M> {
    pub const fn new(runtime: ModelRuntime<M>, fallback: FallbackGenerator) -> Self {
        Self { runtime, fallback }
    }

    pub const fn runtime(&self) -> &ModelRuntime<M> {
        &self.runtime
    }

    /// Analyze raw image bytes.
    ///
    /// Only a decode failure is returned as an error. Model absence and
    /// inference failures yield fallback output tagged [`ResultSource::Fallback`].
    pub fn analyze(&self, bytes: &[u8]) -> Result<Analysis> {
        let tensor = preprocess::preprocess_bytes(bytes)?;

        match self.runtime.predict(tensor.view()) {
            Ok(vector) => {
                let results = build_result_set(&vector);
                let top = results[0];
                debug!(top = %top.emotion, confidence = top.confidence, "model prediction");
                Ok(Analysis {
                    source: ResultSource::Model,
                    results,
                })
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "emotion analysis failed; using fallback results");
                Ok(self.fallback_analysis())
            }
            Err(e) => Err(e),
        }
    }

    /// Degraded-mode output without touching the model.
    pub fn fallback_analysis(&self) -> Analysis {
        Analysis {
            source: ResultSource::Fallback,
            results: self.fallback.generate(),
        }
    }
}

impl EmotionAnalyzer<Model> {
    /// Analyzer backed by the ONNX model at `config.model_path`, loaded lazily.
    pub fn with_onnx_model(config: &Config) -> Self {
        let model_path = config.model_path.clone();
        let num_threads = config.num_threads;
        let device_id = config.device_id;
        let runtime = ModelRuntime::new(move || Model::new(&model_path, num_threads, device_id))
            .with_retry_backoff(config.model_retry_backoff());
        Self::new(runtime, config.fallback_generator())
    }
}
