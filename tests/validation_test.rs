use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::{Cursor, Read, Seek, SeekFrom};

use emotion_lens::{ValidationError, Validator};

/// Counts reads so tests can prove a rejection never touched the content.
struct CountingReader<R> {
    inner: R,
    bytes_read: usize,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n;
        Ok(n)
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

fn noisy_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(17);
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        Rgb([rng.gen(), rng.gen(), rng.gen()])
    }));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}

#[test]
fn test_oversized_upload_rejected_without_decoding() {
    let mut reader = CountingReader {
        inner: Cursor::new(vec![0u8; 15 * 1024 * 1024]),
        bytes_read: 0,
    };

    let err = Validator::default()
        .validate_reader("image/jpeg", &mut reader)
        .unwrap_err();

    assert!(matches!(err, ValidationError::TooLarge { .. }));
    assert_eq!(err.to_string(), "Image size must be less than 10MB");
    assert_eq!(reader.bytes_read, 0);
    assert_eq!(reader.inner.position(), 0);
}

#[test]
fn test_pdf_declared_as_png_is_rejected() {
    let mut pdf = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_vec();
    pdf.resize(500 * 1024, b' ');
    pdf.extend_from_slice(b"\n%%EOF\n");

    let err = Validator::default()
        .validate("image/png", &pdf)
        .unwrap_err();

    assert_eq!(err, ValidationError::Malformed);
    assert_eq!(err.to_string(), "Invalid image file");
}

#[test]
fn test_jpeg_accepted_and_stream_rewound() {
    let bytes = noisy_jpeg(400, 400);
    let mut cursor = Cursor::new(bytes);

    let format = Validator::default()
        .validate_reader("image/jpeg", &mut cursor)
        .unwrap();

    assert_eq!(format, ImageFormat::Jpeg);
    assert_eq!(cursor.position(), 0);

    // the stream is still usable from the start
    let mut again = Vec::new();
    cursor.read_to_end(&mut again).unwrap();
    assert_eq!(again, *cursor.get_ref());
}

#[test]
fn test_unsupported_type_message() {
    let err = Validator::default()
        .validate("image/gif", &noisy_jpeg(8, 8))
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Please upload a valid image file (JPEG, PNG, or WebP)"
    );
}

#[test]
fn test_exactly_at_limit_is_not_too_large() {
    let bytes = noisy_jpeg(16, 16);
    let validator = Validator::new(bytes.len() as u64);
    assert!(validator.validate("image/jpeg", &bytes).is_ok());
}
