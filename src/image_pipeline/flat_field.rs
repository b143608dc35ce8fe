//! Flat-field correction engine
//!
//! Removes vignetting and color shading from raw exposures by dividing their
//! color planes by a blurred, normalized reference exposure of an evenly lit
//! scene taken with the same lens, focal length and aperture.

pub mod channels;
pub mod codec;
pub mod corrector;
pub mod executor;
pub mod range_ops;
pub mod settings;
pub mod vignetting;
mod pipeline;


pub use channels::{ChannelSet, ShadingMap};
pub use executor::{ChannelExecutor, Executor, PoolExecutor, SequentialExecutor};
pub use pipeline::FlatFieldCorrector;
pub use settings::{CorrectionSettings, CorrectionSettingsBuilder, NormalizationPolicy};
