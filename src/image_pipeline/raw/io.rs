//! Direct access to the uncompressed sample strip of a raw file.
//!
//! Uncompressed DNGs store their 16-bit samples contiguously at a known byte
//! offset. Correcting such a file in place means reading that strip, running
//! the correction and writing a buffer of the same length back at the same
//! offset, leaving every other byte of the container untouched.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, instrument};

use crate::image_pipeline::common::error::{CorrectionError, Result};

/// Reads `len` little-endian u16 samples starting at byte `offset`.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_image_data<P: AsRef<Path>>(path: P, offset: u64, len: usize) -> Result<Vec<u16>> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| {
        CorrectionError::InputReadError(format!("{}: {}", path.display(), e))
    })?;
    file.seek(SeekFrom::Start(offset))?;

    let mut bytes = vec![0u8; len * 2];
    file.read_exact(&mut bytes).map_err(|e| {
        CorrectionError::InputReadError(format!(
            "{}: expected {} samples at offset {}: {}",
            path.display(),
            len,
            offset,
            e
        ))
    })?;

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    debug!("Read {} samples", len);
    Ok(samples)
}

/// Overwrites the samples at byte `offset` of an existing file.
#[instrument(skip(path, data), fields(path = %path.as_ref().display(), samples = data.len()))]
pub fn write_image_data<P: AsRef<Path>>(path: P, offset: u64, data: &[u16]) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new().write(true).open(path).map_err(|e| {
        CorrectionError::OutputWriteError(format!("{}: {}", path.display(), e))
    })?;
    file.seek(SeekFrom::Start(offset))?;

    let bytes: Vec<u8> = data.iter().flat_map(|&v| v.to_le_bytes()).collect();
    file.write_all(&bytes).map_err(|e| {
        CorrectionError::OutputWriteError(format!("{}: {}", path.display(), e))
    })?;
    file.flush()?;
    debug!("Wrote {} samples", data.len());
    Ok(())
}
