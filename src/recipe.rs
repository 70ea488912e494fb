//! Batch scripts of editor operations, stored as JSON.
//!
//! ```json
//! { "steps": [
//!     { "op": "convolve", "channels": ["red"], "kernels": ["sobel-x", [[1, 2, 1], [2, 4, 2], [1, 2, 1]]] },
//!     { "op": "flatten", "channels": ["red", "green"] },
//!     { "op": "move", "channels": ["blue"], "direction": "up" }
//! ] }
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;

use crate::{
    convolve::ConvolveParams,
    editor::{EditOutcome, Editor},
    foundation::core::{ChannelSet, Direction},
    foundation::error::{ChanError, ChanResult},
    kernel::{self, Kernel, KernelCell},
    sink::FrameSink,
};

/// A preset name or explicit rows. `null` cells stay unset and block the step.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum KernelSpec {
    Preset(String),
    Cells(Vec<Vec<KernelCell>>),
}

impl KernelSpec {
    pub fn build(&self) -> ChanResult<Kernel> {
        match self {
            Self::Preset(name) => kernel::preset(name),
            Self::Cells(rows) => Kernel::from_cells(rows.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RecipeStep {
    Convolve {
        channels: ChannelSet,
        kernels: Vec<KernelSpec>,
        /// Falls back to the engine defaults when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        padding: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stride: Option<usize>,
        #[serde(default)]
        normalize: bool,
    },
    Flatten {
        channels: ChannelSet,
    },
    Move {
        channels: ChannelSet,
        direction: Direction,
    },
}

impl RecipeStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Convolve { .. } => "convolve",
            Self::Flatten { .. } => "flatten",
            Self::Move { .. } => "move",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recipe {
    pub steps: Vec<RecipeStep>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecipeReport {
    pub applied: usize,
    pub skipped: usize,
    pub frames: u64,
}

impl Recipe {
    pub fn from_json_str(s: &str) -> ChanResult<Self> {
        Ok(serde_json::from_str(s).context("parse recipe JSON")?)
    }

    pub fn from_json_path(path: &Path) -> ChanResult<Self> {
        let f = File::open(path).with_context(|| format!("open recipe '{}'", path.display()))?;
        Ok(serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse recipe '{}'", path.display()))?)
    }

    /// Run every step against `editor`, stopping at the first failure.
    ///
    /// Each convolve step replaces the editor's staged kernels with its own.
    pub fn apply(&self, editor: &mut Editor, sink: &mut dyn FrameSink) -> ChanResult<RecipeReport> {
        let mut report = RecipeReport::default();
        for (i, step) in self.steps.iter().enumerate() {
            let outcome = run_step(editor, step, sink).map_err(|err| match err {
                ChanError::Other(e) => {
                    ChanError::Other(e.context(format!("recipe step {i} ({})", step.name())))
                }
                other => other,
            })?;
            match outcome {
                EditOutcome::Changed(r) => {
                    report.applied += 1;
                    report.frames += r.frames;
                }
                EditOutcome::NoOp => {
                    tracing::info!(step = i, op = step.name(), "step left the image unchanged");
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }
}

fn run_step(
    editor: &mut Editor,
    step: &RecipeStep,
    sink: &mut dyn FrameSink,
) -> ChanResult<EditOutcome> {
    match step {
        RecipeStep::Convolve {
            channels,
            kernels,
            padding,
            stride,
            normalize,
        } => {
            editor.clear_kernels();
            for spec in kernels {
                editor.stage_kernel(spec.build()?)?;
            }
            let defaults = editor.config().defaults;
            let params = ConvolveParams {
                padding: padding.unwrap_or(defaults.padding),
                stride: stride.unwrap_or(defaults.stride),
            };
            editor.convolve(channels, params, *normalize, sink)
        }
        RecipeStep::Flatten { channels } => editor.flatten(channels, sink),
        RecipeStep::Move {
            channels,
            direction,
        } => editor.move_channels(channels, *direction, sink),
    }
}
