use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use crate::image_pipeline::common::error::{CorrectionError, Result};
use crate::image_pipeline::conversions::RawCorrectionPipeline;
use crate::image_pipeline::flat_field::CorrectionSettings;
use crate::image_pipeline::raw::RawImageReader;
use crate::image_pipeline::raw::types::{Layout, PixelBuffer, SensorGeometry};
use crate::image_pipeline::tiff::{OutputConfig, TiffWriter};

const HEADER: &[u8] = b"IMG-";

/// Serves the reference for inputs starting with `REF`, the image otherwise.
struct MockReader {
    should_fail: bool,
    image: PixelBuffer,
    reference: PixelBuffer,
}

impl RawImageReader for MockReader {
    fn read_raw(&self, data: &[u8]) -> Result<PixelBuffer> {
        if self.should_fail {
            return Err(CorrectionError::DecodeError("Mock decode error".to_string()));
        }
        if data.starts_with(b"REF") {
            Ok(self.reference.clone())
        } else {
            Ok(self.image.clone())
        }
    }
}

struct MockWriter {
    should_fail: bool,
    written_data: Arc<Mutex<Vec<PixelBuffer>>>,
}

impl TiffWriter for MockWriter {
    fn write_tiff(&self, image: &PixelBuffer, _output: &mut dyn Write, _config: &OutputConfig) -> Result<()> {
        if self.should_fail {
            return Err(CorrectionError::EncodeError("Mock encode error".to_string()));
        }
        self.written_data.lock().unwrap().push(image.clone());
        Ok(())
    }
}

fn geometry() -> SensorGeometry {
    SensorGeometry::new(Layout::Bayer, 4, 4).with_white_levels(vec![4095])
}

fn image() -> PixelBuffer {
    PixelBuffer::new(vec![300; 16], geometry()).unwrap()
}

/// Red falls to half on the right half of the frame, green stays flat.
fn reference() -> PixelBuffer {
    let data = (0..16)
        .map(|i| {
            let (y, x) = (i / 4, i % 4);
            if y % 2 == 0 && x % 2 == 0 && x >= 2 { 500 } else { 1000 }
        })
        .collect();
    PixelBuffer::new(data, geometry()).unwrap()
}

/// Image after correction: red on the right half doubled.
fn expected() -> Vec<u16> {
    (0..16)
        .map(|i| {
            let (y, x) = (i / 4, i % 4);
            if y % 2 == 0 && x % 2 == 0 && x >= 2 { 600 } else { 300 }
        })
        .collect()
}

fn settings() -> CorrectionSettings {
    CorrectionSettings::builder()
        .gaussian_filter_sigma(0.0)
        .use_multithreading(false)
        .build()
}

fn pipeline(
    reader_fails: bool,
    writer_fails: bool,
) -> (RawCorrectionPipeline<MockReader, MockWriter>, Arc<Mutex<Vec<PixelBuffer>>>) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let reader = MockReader { should_fail: reader_fails, image: image(), reference: reference() };
    let writer = MockWriter { should_fail: writer_fails, written_data: written.clone() };
    let pipeline =
        RawCorrectionPipeline::with_custom(reader, writer, settings(), OutputConfig::default()).unwrap();
    (pipeline, written)
}

#[test]
fn test_successful_correction() {
    let (pipeline, written) = pipeline(false, false);
    let mut output = Cursor::new(Vec::new());
    let result = pipeline.correct(b"IMG data", b"REF data", &mut output);

    assert!(result.is_ok());
    let written = written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].data, expected());
}

#[test]
fn test_reader_failure() {
    let (pipeline, written) = pipeline(true, false);
    let mut output = Cursor::new(Vec::new());
    let result = pipeline.correct(b"IMG", b"REF", &mut output);

    assert!(matches!(result, Err(CorrectionError::DecodeError(_))));
    assert!(written.lock().unwrap().is_empty());
}

#[test]
fn test_writer_failure() {
    let (pipeline, _) = pipeline(false, true);
    let mut output = Cursor::new(Vec::new());
    let result = pipeline.correct(b"IMG", b"REF", &mut output);
    assert!(matches!(result, Err(CorrectionError::EncodeError(_))));
}

#[test]
fn test_invalid_settings_rejected() {
    let reader = MockReader { should_fail: false, image: image(), reference: reference() };
    let writer = MockWriter { should_fail: false, written_data: Arc::new(Mutex::new(Vec::new())) };
    let settings = CorrectionSettings::builder().luminance_correction_intensity(2.0).build();
    let result = RawCorrectionPipeline::with_custom(reader, writer, settings, OutputConfig::default());
    assert!(matches!(result, Err(CorrectionError::InvalidSettings(_))));
}

#[test]
fn test_shading_writes_reference_map() {
    let (pipeline, written) = pipeline(false, false);
    let mut output = Cursor::new(Vec::new());
    pipeline.shading(b"REF", &mut output).unwrap();

    let written = written.lock().unwrap();
    assert_eq!(written[0].data[2], u16::MAX / 2);
    assert_eq!(written[0].data[1], u16::MAX);
}

#[test]
fn test_mask_writes_masked_image() {
    let (pipeline, written) = pipeline(false, false);
    let mut output = Cursor::new(Vec::new());
    pipeline.mask(b"IMG", 4, true, &mut output).unwrap();

    // 300 = 0x012c, low nibble 0xc moved to the top
    assert!(written.lock().unwrap()[0].data.iter().all(|&v| v == 0xc000));
}

#[test]
fn test_missing_input_file() {
    let (pipeline, _) = pipeline(false, false);
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline.correct_file(
        dir.path().join("missing.dng"),
        dir.path().join("reference.dng"),
        dir.path().join("out.tiff"),
    );
    assert!(matches!(result, Err(CorrectionError::InputReadError(_))));
}

fn write_raw_file(path: &std::path::Path, header: &[u8], samples: &[u16]) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(header).unwrap();
    for s in samples {
        file.write_all(&s.to_le_bytes()).unwrap();
    }
    file.write_all(b"TRAILER").unwrap();
}

#[test]
fn test_correct_file_writes_output() {
    let (pipeline, written) = pipeline(false, false);
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("image.dng");
    let reference_path = dir.path().join("reference.dng");
    write_raw_file(&image_path, HEADER, &image().data);
    write_raw_file(&reference_path, b"REF-", &reference().data);

    pipeline
        .correct_file(&image_path, &reference_path, dir.path().join("out.tiff"))
        .unwrap();
    assert!(dir.path().join("out.tiff").exists());
    assert_eq!(written.lock().unwrap()[0].data, expected());
}

#[test]
fn test_in_place_correction_rewrites_only_the_strip() {
    let (pipeline, _) = pipeline(false, false);
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("image.dng");
    let reference_path = dir.path().join("reference.dng");
    write_raw_file(&image_path, HEADER, &image().data);
    write_raw_file(&reference_path, b"REF-", &reference().data);

    pipeline
        .correct_in_place(&image_path, &reference_path, HEADER.len() as u64)
        .unwrap();

    let bytes = std::fs::read(&image_path).unwrap();
    assert_eq!(&bytes[..HEADER.len()], HEADER);
    assert!(bytes.ends_with(b"TRAILER"));
    let samples: Vec<u16> = bytes[HEADER.len()..HEADER.len() + 32]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(samples, expected());
}

#[test]
fn test_in_place_correction_rejects_wrong_offset() {
    let (pipeline, _) = pipeline(false, false);
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("image.dng");
    let reference_path = dir.path().join("reference.dng");
    write_raw_file(&image_path, HEADER, &image().data);
    write_raw_file(&reference_path, b"REF-", &reference().data);
    let before = std::fs::read(&image_path).unwrap();

    let result = pipeline.correct_in_place(&image_path, &reference_path, 1);
    assert!(matches!(result, Err(CorrectionError::InputReadError(_))));
    assert_eq!(std::fs::read(&image_path).unwrap(), before);
}
