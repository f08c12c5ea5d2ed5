use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the emotion classification service.
///
/// # Recoverability
///
/// `ModelLoad`, `ModelUnavailable` and `Inference` never reach an HTTP caller:
/// the analyzer absorbs them and substitutes fallback output. `Validation` is
/// terminal for a request and carries a message meant for the end user.
/// `Decode` only surfaces when the validator was bypassed.
#[derive(Error, Debug)]
pub enum EmotionError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode error: {operation} failed")]
    Decode {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model load error: {operation} failed for {path:?}")]
    ModelLoad {
        path: PathBuf,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model is not loaded")]
    ModelUnavailable,

    #[error("Inference error: {operation} failed")]
    Inference {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Reasons an upload is rejected before it reaches the model.
///
/// The `Display` text is returned verbatim to the uploader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a valid image file (JPEG, PNG, or WebP)")]
    UnsupportedType { content_type: String },

    #[error("Image size must be less than {}", format_limit(.max))]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid image file")]
    Malformed,
}

pub type Result<T> = std::result::Result<T, EmotionError>;

fn format_limit(bytes: &u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    match *bytes {
        b if b >= MIB && b % MIB == 0 => format!("{}MB", b / MIB),
        b if b >= KIB && b % KIB == 0 => format!("{}KB", b / KIB),
        b => format!("{b} bytes"),
    }
}

impl EmotionError {
    pub(crate) fn inference(operation: impl Into<String>, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Inference {
            operation: operation.into(),
            source: message.into(),
        }
    }

    /// Whether the analyzer should answer this failure with fallback output.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ModelLoad { .. } | Self::ModelUnavailable | Self::Inference { .. }
        )
    }
}

/// Convert ONNX Runtime errors to inference errors.
///
/// Load-time ORT failures are mapped to `ModelLoad` explicitly at the call site.
impl From<ort::Error> for EmotionError {
    fn from(err: ort::Error) -> Self {
        Self::Inference {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors only occur while reading model output.
impl From<ndarray::ShapeError> for EmotionError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Inference {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}
