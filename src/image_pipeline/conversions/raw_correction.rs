use std::io::Write;
use std::path::Path;

use tracing::{info, instrument, warn};

use crate::image_pipeline::{
    common::error::{CorrectionError, Result},
    flat_field::{CorrectionSettings, FlatFieldCorrector},
    raw::{RawImageReader, RawLoaderReader, io, types::PixelBuffer},
    tiff::{OutputConfig, StandardTiffWriter, TiffWriter},
};

/// Decodes raw exposures, corrects them against a flat-field reference and
/// writes the result either as a TIFF or back into the raw file itself.
pub struct RawCorrectionPipeline<R: RawImageReader, W: TiffWriter> {
    reader: R,
    writer: W,
    corrector: FlatFieldCorrector,
    config: OutputConfig,
}

impl RawCorrectionPipeline<RawLoaderReader, StandardTiffWriter> {
    pub fn new(settings: CorrectionSettings, config: OutputConfig) -> Result<Self> {
        Self::with_custom(RawLoaderReader, StandardTiffWriter, settings, config)
    }
}

impl<R: RawImageReader, W: TiffWriter> RawCorrectionPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, settings: CorrectionSettings, config: OutputConfig) -> Result<Self> {
        Ok(Self {
            reader,
            writer,
            corrector: FlatFieldCorrector::new(settings)?,
            config,
        })
    }

    fn decode(&self, data: &[u8], label: &str) -> Result<PixelBuffer> {
        let _span = tracing::info_span!("decode_raw", input = label, input_size = data.len()).entered();
        self.reader.read_raw(data)
    }

    fn encode(&self, image: &PixelBuffer, output: &mut dyn Write) -> Result<()> {
        let _span = tracing::info_span!("encode_tiff").entered();
        self.writer.write_tiff(image, output, &self.config)
    }

    /// Corrects the decoded `image_data` with `reference_data` and returns
    /// the corrected buffer.
    #[instrument(skip_all, fields(image_size = image_data.len(), reference_size = reference_data.len()))]
    pub fn correct_buffers(&self, image_data: &[u8], reference_data: &[u8]) -> Result<PixelBuffer> {
        let image = self.decode(image_data, "image")?;
        let reference = self.decode(reference_data, "reference")?;
        self.corrector.process(&image, &reference)
    }

    /// Corrects an exposure and writes it as a TIFF.
    pub fn correct(&self, image_data: &[u8], reference_data: &[u8], output: &mut dyn Write) -> Result<()> {
        info!("Starting flat-field correction");
        let corrected = self.correct_buffers(image_data, reference_data)?;
        self.encode(&corrected, output)?;
        info!(
            width = corrected.geometry.width,
            height = corrected.geometry.height,
            "Correction complete"
        );
        Ok(())
    }

    /// Writes the image with only `bits` bits of every sample kept.
    #[instrument(skip(self, image_data, output))]
    pub fn mask(&self, image_data: &[u8], bits: i32, leave_lsb: bool, output: &mut dyn Write) -> Result<()> {
        let image = self.decode(image_data, "image")?;
        let masked = self.corrector.mask_bits(&image, bits, leave_lsb)?;
        self.encode(&masked, output)
    }

    /// Writes the shading map estimated from a reference exposure.
    #[instrument(skip_all)]
    pub fn shading(&self, reference_data: &[u8], output: &mut dyn Write) -> Result<()> {
        let reference = self.decode(reference_data, "reference")?;
        let preview = self.corrector.shading_preview(&reference)?;
        self.encode(&preview, output)
    }

    #[instrument(skip(self, image_path, reference_path, output_path))]
    pub fn correct_file<P: AsRef<Path>, Q: AsRef<Path>, O: AsRef<Path>>(
        &self,
        image_path: P,
        reference_path: Q,
        output_path: O,
    ) -> Result<()> {
        let output_path = output_path.as_ref();
        info!(
            image = %image_path.as_ref().display(),
            reference = %reference_path.as_ref().display(),
            output = %output_path.display(),
            "Correcting file"
        );

        let image_data = read_input(image_path.as_ref())?;
        let reference_data = read_input(reference_path.as_ref())?;
        let mut output_file = create_output(output_path)?;
        self.correct(&image_data, &reference_data, &mut output_file)
    }

    /// Corrects an uncompressed raw file in place by rewriting its sample
    /// strip at `strip_offset`. Every other byte of the file is kept.
    ///
    /// The strip is read back first and compared with the decoded samples so
    /// a wrong offset fails instead of corrupting the file.
    #[instrument(skip(self, image_path, reference_path))]
    pub fn correct_in_place<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        image_path: P,
        reference_path: Q,
        strip_offset: u64,
    ) -> Result<()> {
        let image_path = image_path.as_ref();
        let image_data = read_input(image_path)?;
        let reference_data = read_input(reference_path.as_ref())?;

        let image = self.decode(&image_data, "image")?;
        let reference = self.decode(&reference_data, "reference")?;

        let stored = io::read_image_data(image_path, strip_offset, image.data.len())?;
        if stored != image.data {
            warn!(strip_offset, "Stored strip does not match decoded samples");
            return Err(CorrectionError::InputReadError(format!(
                "{}: samples at offset {} do not match the decoded image",
                image_path.display(),
                strip_offset
            )));
        }

        let corrected = self.corrector.process(&image, &reference)?;
        io::write_image_data(image_path, strip_offset, &corrected.data)?;
        info!(path = %image_path.display(), "Corrected in place");
        Ok(())
    }

    pub fn mask_file<P: AsRef<Path>, O: AsRef<Path>>(
        &self,
        image_path: P,
        output_path: O,
        bits: i32,
        leave_lsb: bool,
    ) -> Result<()> {
        let image_data = read_input(image_path.as_ref())?;
        let mut output_file = create_output(output_path.as_ref())?;
        self.mask(&image_data, bits, leave_lsb, &mut output_file)
    }

    pub fn shading_file<P: AsRef<Path>, O: AsRef<Path>>(&self, reference_path: P, output_path: O) -> Result<()> {
        let reference_data = read_input(reference_path.as_ref())?;
        let mut output_file = create_output(output_path.as_ref())?;
        self.shading(&reference_data, &mut output_file)
    }

    pub fn settings(&self) -> &CorrectionSettings {
        self.corrector.settings()
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: OutputConfig) {
        self.config = config;
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    let _span = tracing::info_span!("read_input_file").entered();
    std::fs::read(path).map_err(|e| CorrectionError::InputReadError(format!("{}: {}", path.display(), e)))
}

fn create_output(path: &Path) -> Result<std::fs::File> {
    let _span = tracing::info_span!("create_output_file").entered();
    std::fs::File::create(path)
        .map_err(|e| CorrectionError::OutputWriteError(format!("{}: {}", path.display(), e)))
}
