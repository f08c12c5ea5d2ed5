use std::path::{Path, PathBuf};

use crate::{
    emotion::ProbabilityVector,
    errors::{EmotionError, Result},
    preprocess::INPUT_SIZE,
    traits::EmotionModel,
};
use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// ONNX Runtime classifier taking NHWC `(1, 48, 48, 1)` and emitting `(1, 7)`.
pub struct Model {
    path: PathBuf,
    session: Mutex<Session>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new(model_path: &Path, num_threads: usize, device_id: i32) -> Result<Self> {
        if !model_path.is_file() {
            return Err(EmotionError::ModelLoad {
                path: model_path.to_path_buf(),
                operation: "weights lookup".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "model file does not exist",
                )),
            });
        }

        let mut session = SessionBuilder::new()
            .map_err(|e| load_err(model_path, "session builder init", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| load_err(model_path, "execution provider setup", e))?
            .with_intra_threads(num_threads.max(1))
            .map_err(|e| load_err(model_path, "intra-op thread setup", e))?
            .with_memory_pattern(true)
            .map_err(|e| load_err(model_path, "memory pattern setup", e))?
            .commit_from_file(model_path)
            .map_err(|e| load_err(model_path, "weights loading", e))?;

        check_input_shape(&session, model_path)?;

        // warm up and catch graphs that load but cannot run
        let data = Array4::<f32>::zeros((1, INPUT_SIZE as usize, INPUT_SIZE as usize, 1));
        let row = run(&mut session, data.view()).map_err(|e| EmotionError::ModelLoad {
            path: model_path.to_path_buf(),
            operation: "warm-up inference".to_string(),
            source: Box::new(e),
        })?;
        debug!(?row, "warm-up output");

        info!(path = %model_path.display(), "emotion model loaded");
        Ok(Self {
            path: model_path.to_path_buf(),
            session: Mutex::new(session),
        })
    }
}

impl EmotionModel for Model {
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<ProbabilityVector> {
        let mut binding = self.session.lock();
        run(&mut binding, tensor)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

fn run(session: &mut Session, tensor: ArrayView4<f32>) -> Result<ProbabilityVector> {
    let input = tensor.as_standard_layout();
    let outputs = session.run(ort::inputs![TensorRef::from_array_view(&input)?])?;
    let scores = outputs[0]
        .try_extract_array::<f32>()?
        .into_dimensionality::<Ix2>()?;
    if scores.nrows() == 0 {
        return Err(EmotionError::inference("output extraction", "empty batch"));
    }
    let row: Vec<f32> = scores.row(0).iter().copied().collect();
    ProbabilityVector::from_slice(&row)
}

/// Static dims must be `[batch, 48, 48, 1]`; dynamic (negative) dims are accepted.
fn check_input_shape(session: &Session, model_path: &Path) -> Result<()> {
    let Some(input) = session.inputs.first() else {
        return Err(shape_err(model_path, "graph declares no inputs".to_string()));
    };
    let Some(dims) = input.input_type.tensor_shape() else {
        return Err(shape_err(model_path, "input is not a tensor".to_string()));
    };

    let expected = [-1, i64::from(INPUT_SIZE), i64::from(INPUT_SIZE), 1];
    let matches = dims.len() == expected.len()
        && dims
            .iter()
            .zip(expected)
            .skip(1)
            .all(|(&got, want)| got < 0 || got == want);
    if !matches {
        return Err(shape_err(
            model_path,
            format!("expected NHWC input {expected:?}, got {:?}", &dims[..]),
        ));
    }
    Ok(())
}

fn load_err(model_path: &Path, operation: &str, e: impl std::fmt::Display) -> EmotionError {
    EmotionError::ModelLoad {
        path: model_path.to_path_buf(),
        operation: operation.to_string(),
        source: e.to_string().into(),
    }
}

fn shape_err(model_path: &Path, message: String) -> EmotionError {
    EmotionError::ModelLoad {
        path: model_path.to_path_buf(),
        operation: "input shape check".to_string(),
        source: message.into(),
    }
}
