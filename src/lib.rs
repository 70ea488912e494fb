//! Chanconv applies per-channel image operations to RGB images and animates every
//! change as a frame-interpolated transition.
//!
//! - Convolve selected channels with a stack of kernels
//! - Reorder channels, or flatten several into their RMS
//! - Track which channels are known to hold identical data
#![forbid(unsafe_code)]

mod foundation;

pub mod anim_ease;
pub mod buffer;
pub mod channel_ops;
pub mod config;
pub mod convolve;
pub mod editor;
pub mod identity;
pub mod io;
pub mod kernel;
pub mod recipe;
pub mod sink;
pub mod transition;

pub use crate::foundation::core::{Channel, ChannelOrder, ChannelSet, Direction};
pub use crate::foundation::error::{ChanError, ChanResult};

pub use crate::anim_ease::{CURVE_SAMPLE_POINTS, Ease, EasingCurve, validate_curve};
pub use crate::buffer::{ImageState, PixelBuffer};
pub use crate::channel_ops::{FlattenOutcome, flatten, move_channel, move_channels};
pub use crate::config::{EngineConfig, TransitionConfig};
pub use crate::convolve::{ConvolutionEngine, ConvolveBatch, ConvolveParams, StrideMode};
pub use crate::editor::{EditOutcome, Editor};
pub use crate::identity::{ChannelIdentityTracker, IdentityGraph};
pub use crate::io::{load_image, modified_file_name, save_image};
pub use crate::kernel::{Kernel, KernelCell, KernelLimits, KernelStack, PRESET_NAMES, preset};
pub use crate::recipe::{KernelSpec, Recipe, RecipeReport, RecipeStep};
pub use crate::sink::{FrameSink, InMemorySink, LatestFrameSink, PngSequenceSink};
pub use crate::transition::{
    RenderLock, Transition, TransitionMode, TransitionRenderer, TransitionReport,
};
