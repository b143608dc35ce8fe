use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use flatfield_rs::image_pipeline::{
    CorrectionSettings, CorrectionSettingsBuilder, NormalizationPolicy, OutputConfig,
    RawCorrectionPipeline, TiffCompression,
};
use flatfield_rs::logger;

use tracing::info;

#[derive(Parser)]
#[command(name = "flatfield")]
#[command(version, about = "Flat-field vignetting and color shading correction for raw images", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct a raw exposure with a flat-field reference
    Correct {
        /// Raw image to correct
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Reference exposure of an evenly lit scene
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Output TIFF file
        #[arg(short, long, value_name = "FILE", required_unless_present = "strip_offset")]
        out: Option<PathBuf>,

        /// Rewrite the sample strip at this byte offset of IMAGE instead of writing a TIFF
        #[arg(long, value_name = "BYTES", conflicts_with = "out")]
        strip_offset: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Keep only some bits of every sample, to inspect noise and quantization
    Mask {
        /// Raw image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Output TIFF file
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// Number of bits to keep
        #[arg(long, value_name = "N", default_value = "8")]
        bits: i32,

        /// Keep the least significant bits, shifted to the top
        #[arg(long)]
        leave_lsb: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write the shading map estimated from a reference exposure
    Shading {
        /// Reference exposure of an evenly lit scene
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Output TIFF file
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// JSON settings file; flags below override its values
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Luminance correction intensity (0.0 - 1.0)
    #[arg(long, global = true, value_name = "FLOAT")]
    luminance: Option<f32>,

    /// Color correction intensity (0.0 - 1.0)
    #[arg(long, global = true, value_name = "FLOAT")]
    color: Option<f32>,

    /// Gaussian blur sigma applied to the reference, in plane pixels
    #[arg(long, global = true, value_name = "FLOAT")]
    sigma: Option<f32>,

    /// Scale all channels into range instead of clipping
    #[arg(long, global = true)]
    scale: bool,

    /// Fit into the full 16-bit range instead of the white level
    #[arg(long, global = true)]
    no_white_limit: bool,

    /// Normalize by the brightest window of N plane pixels instead of the maximum
    #[arg(long, global = true, value_name = "N", conflicts_with = "center_window")]
    brightest_window: Option<usize>,

    /// Normalize by the mean of the central window of N plane pixels
    #[arg(long, global = true, value_name = "N")]
    center_window: Option<usize>,

    /// Process channels on the calling thread only
    #[arg(long, global = true)]
    single_threaded: bool,

    /// Number of worker threads
    #[arg(short = 'j', long, global = true, value_name = "N")]
    threads: Option<usize>,
}

#[derive(Args)]
struct OutputArgs {
    /// TIFF compression: none, lzw, deflate-fast, deflate, deflate-best
    #[arg(long, value_name = "METHOD", default_value = "none")]
    compression: String,

    /// Use the horizontal differencing predictor
    #[arg(long)]
    predictor: bool,

    /// Write the active area only
    #[arg(long)]
    crop: bool,
}

impl SettingsArgs {
    fn resolve(&self) -> anyhow::Result<CorrectionSettings> {
        let base = match &self.settings {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading settings {}", path.display()))?;
                CorrectionSettings::from_json(&json)
                    .with_context(|| format!("parsing settings {}", path.display()))?
            }
            None => CorrectionSettings::default(),
        };

        let mut builder = CorrectionSettingsBuilder::from_settings(base);
        if let Some(luminance) = self.luminance {
            builder = builder.luminance_correction_intensity(luminance);
        }
        if let Some(color) = self.color {
            builder = builder.color_correction_intensity(color);
        }
        if let Some(sigma) = self.sigma {
            builder = builder.gaussian_filter_sigma(sigma);
        }
        if self.scale {
            builder = builder.scale_instead_of_clipping(true);
        }
        if self.no_white_limit {
            builder = builder.limit_to_white_levels(false);
        }
        if let Some(window) = self.brightest_window {
            builder = builder.normalization(NormalizationPolicy::BrightestWindow { window });
        }
        if let Some(window) = self.center_window {
            builder = builder.normalization(NormalizationPolicy::CenterWindow { window });
        }
        if self.single_threaded {
            builder = builder.use_multithreading(false);
        }
        if self.threads.is_some() {
            builder = builder.worker_threads(self.threads);
        }

        let settings = builder.build();
        settings.validate()?;
        Ok(settings)
    }
}

impl OutputArgs {
    fn resolve(&self) -> anyhow::Result<OutputConfig> {
        let compression: TiffCompression = self.compression.parse()?;
        Ok(OutputConfig::builder()
            .compression(compression)
            .predictor(self.predictor.then_some(2))
            .crop_to_active_area(self.crop)
            .build())
    }
}

fn main() -> anyhow::Result<()> {
    logger::init();

    let cli = Cli::parse();
    let settings = cli.settings.resolve()?;
    info!(?settings, "Starting flatfield");

    match cli.command {
        Commands::Correct {
            image,
            reference,
            out,
            strip_offset,
            output,
        } => {
            let pipeline = RawCorrectionPipeline::new(settings, output.resolve()?)?;
            match (strip_offset, out) {
                (Some(offset), _) => pipeline
                    .correct_in_place(&image, &reference, offset)
                    .with_context(|| format!("correcting {} in place", image.display()))?,
                (None, Some(out)) => pipeline
                    .correct_file(&image, &reference, &out)
                    .with_context(|| format!("correcting {}", image.display()))?,
                (None, None) => bail!("either --out or --strip-offset is required"),
            }
        }
        Commands::Mask {
            image,
            out,
            bits,
            leave_lsb,
            output,
        } => {
            let pipeline = RawCorrectionPipeline::new(settings, output.resolve()?)?;
            pipeline
                .mask_file(&image, &out, bits, leave_lsb)
                .with_context(|| format!("masking {}", image.display()))?;
        }
        Commands::Shading {
            reference,
            out,
            output,
        } => {
            let pipeline = RawCorrectionPipeline::new(settings, output.resolve()?)?;
            pipeline
                .shading_file(&reference, &out)
                .with_context(|| format!("estimating shading from {}", reference.display()))?;
        }
    }

    info!("Done");
    Ok(())
}
