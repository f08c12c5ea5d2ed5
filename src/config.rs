use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::errors::{EmotionError, Result};
use crate::fallback::FallbackGenerator;
use crate::validation::{Validator, MAX_UPLOAD_BYTES};

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// ONNX weights of the emotion classifier
    #[arg(short, long, env = "EMOTION_MODEL_PATH", default_value = "emotion_detector.onnx")]
    pub model_path: PathBuf,

    #[arg(long, env = "EMOTION_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "EMOTION_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Where accepted uploads are kept for display
    #[arg(short, long, env = "EMOTION_UPLOAD_DIR", default_value = "static/uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, default_value_t = MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(short, long, default_value_t = default_threads())]
    pub num_threads: usize,

    /// Seconds to serve fallback output before retrying a failed model load
    #[arg(long, env = "EMOTION_MODEL_RETRY_SECS", default_value_t = 30)]
    pub model_retry_secs: u64,

    #[arg(long, default_value_t = 1000)]
    pub fallback_delay_min_ms: u64,

    #[arg(long, default_value_t = 2000)]
    pub fallback_delay_max_ms: u64,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.fallback_delay_min_ms > self.fallback_delay_max_ms {
            return Err(EmotionError::Configuration {
                message: format!(
                    "fallback delay min ({} ms) exceeds max ({} ms)",
                    self.fallback_delay_min_ms, self.fallback_delay_max_ms
                ),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(EmotionError::Configuration {
                message: "max upload size must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| EmotionError::Configuration {
                message: format!("invalid bind address {}:{}: {e}", self.host, self.port),
            })
    }

    pub fn fallback_generator(&self) -> FallbackGenerator {
        FallbackGenerator::new(
            Duration::from_millis(self.fallback_delay_min_ms),
            Duration::from_millis(self.fallback_delay_max_ms),
        )
    }

    pub const fn model_retry_backoff(&self) -> Duration {
        Duration::from_secs(self.model_retry_secs)
    }

    pub const fn validator(&self) -> Validator {
        Validator::new(self.max_upload_bytes)
    }
}

fn default_threads() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}
