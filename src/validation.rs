use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};

use image::{ImageFormat, ImageReader};
use tracing::debug;

use crate::errors::ValidationError;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Declared MIME types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

const ALLOWED_FORMATS: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Checks declared type, size and structure of an upload before inference.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    max_bytes: u64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

impl Validator {
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Validate an in-memory upload. The buffer is only borrowed.
    pub fn validate(&self, content_type: &str, data: &[u8]) -> Result<ImageFormat, ValidationError> {
        self.validate_reader(content_type, &mut Cursor::new(data))
    }

    /// Validate a seekable upload stream.
    ///
    /// Whatever the outcome, the stream is positioned at offset 0 on return.
    /// Oversized streams are rejected from their length alone, without reading.
    pub fn validate_reader<R: Read + Seek>(
        &self,
        content_type: &str,
        reader: &mut R,
    ) -> Result<ImageFormat, ValidationError> {
        let result = self.check(content_type, reader);
        if reader.rewind().is_err() {
            return Err(ValidationError::Malformed);
        }
        if let Err(e) = &result {
            debug!(content_type, error = ?e, "upload rejected");
        }
        result
    }

    fn check<R: Read + Seek>(
        &self,
        content_type: &str,
        reader: &mut R,
    ) -> Result<ImageFormat, ValidationError> {
        if !is_allowed_content_type(content_type) {
            return Err(ValidationError::UnsupportedType {
                content_type: content_type.to_string(),
            });
        }

        let size = reader
            .seek(SeekFrom::End(0))
            .map_err(|_| ValidationError::Malformed)?;
        if size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        reader.rewind().map_err(|_| ValidationError::Malformed)?;

        verify_structure(reader)
    }
}

/// Declared types are compared case-insensitively with parameters stripped.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Sniff the container and fully decode it.
fn verify_structure<R: Read + Seek>(reader: &mut R) -> Result<ImageFormat, ValidationError> {
    let image_reader = ImageReader::new(BufReader::new(reader))
        .with_guessed_format()
        .map_err(|_| ValidationError::Malformed)?;

    let format = image_reader
        .format()
        .filter(|f| ALLOWED_FORMATS.contains(f))
        .ok_or(ValidationError::Malformed)?;

    image_reader
        .decode()
        .map_err(|_| ValidationError::Malformed)?;
    Ok(format)
}
