//! Host-facing session: owns the current image, the staged kernels and the renderer,
//! and animates every change into a [`FrameSink`].

use std::path::{Path, PathBuf};

use crate::{
    buffer::{ImageState, PixelBuffer},
    channel_ops::{self, FlattenOutcome},
    config::{EngineConfig, TransitionConfig},
    convolve::{ConvolutionEngine, ConvolveParams},
    foundation::core::{Channel, ChannelSet, Direction},
    foundation::error::{ChanError, ChanResult},
    identity::ChannelIdentityTracker,
    io,
    kernel::{self, Kernel, KernelStack},
    sink::FrameSink,
    transition::{RenderLock, TransitionRenderer, TransitionReport},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// The image changed; frames were pushed.
    Changed(TransitionReport),
    /// Nothing to do; no frames were pushed.
    NoOp,
}

impl EditOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

#[derive(Debug)]
pub struct Editor {
    config: EngineConfig,
    engine: ConvolutionEngine,
    renderer: TransitionRenderer,
    kernels: KernelStack,
    tracker: ChannelIdentityTracker,
    state: Option<ImageState>,
    source: Option<PathBuf>,
}

impl Editor {
    pub fn new(config: EngineConfig) -> ChanResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: ConvolutionEngine::new(config.kernel_limits, config.stride_mode),
            renderer: TransitionRenderer::new(config.transition.mode),
            kernels: KernelStack::new(config.kernel_limits),
            tracker: ChannelIdentityTracker::new(),
            state: None,
            source: None,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&ImageState> {
        self.state.as_ref()
    }

    pub fn kernels(&self) -> &KernelStack {
        &self.kernels
    }

    fn current(&self) -> ChanResult<&ImageState> {
        self.state
            .as_ref()
            .ok_or_else(|| ChanError::parameter("no image loaded"))
    }

    fn install(&mut self, state: ImageState) -> ChanResult<()> {
        self.tracker.set(state.identity.clone())?;
        self.state = Some(state);
        Ok(())
    }

    /// Load an image file, resetting channel order and identity, and show it.
    pub fn load_path(&mut self, path: &Path, sink: &mut dyn FrameSink) -> ChanResult<()> {
        let state = io::load_image(path)?;
        self.source = Some(path.to_path_buf());
        self.show_fresh(state, sink)
    }

    /// Adopt an already decoded buffer, resetting channel order and identity.
    pub fn load_buffer(&mut self, buffer: PixelBuffer, sink: &mut dyn FrameSink) -> ChanResult<()> {
        self.source = None;
        self.show_fresh(ImageState::new(buffer), sink)
    }

    fn show_fresh(&mut self, state: ImageState, sink: &mut dyn FrameSink) -> ChanResult<()> {
        let lock = self.renderer.lock()?;
        tracing::info!(
            width = state.buffer.width(),
            height = state.buffer.height(),
            "image loaded"
        );
        self.tracker.reset();
        lock.cut(&state.buffer, sink)?;
        self.state = Some(state);
        Ok(())
    }

    /// Forget every identity relation, e.g. after the host swapped pixel data.
    pub fn reset_identity(&mut self) {
        self.tracker.reset();
        if let Some(state) = &mut self.state {
            state.identity = self.tracker.graph().clone();
        }
    }

    pub fn save_to(&self, path: &Path) -> ChanResult<()> {
        io::save_image(&self.current()?.buffer, path)
    }

    /// Save into `dir` as `<source stem>-modified.<ext>`; returns the written path.
    pub fn save_to_dir(&self, dir: &Path) -> ChanResult<PathBuf> {
        let name = match &self.source {
            Some(src) => io::modified_file_name(src)?,
            None => PathBuf::from("image-modified.png"),
        };
        let path = dir.join(name);
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn identical(&self, channel: Channel) -> ChannelSet {
        self.tracker.query(channel)
    }

    /// Channels to highlight as sharing data with another channel.
    pub fn linked_channels(&self) -> Vec<Channel> {
        self.tracker.graph().linked_channels()
    }

    pub fn stage_kernel(&mut self, kernel: Kernel) -> ChanResult<usize> {
        self.kernels.stage(kernel)
    }

    pub fn stage_preset(&mut self, name: &str) -> ChanResult<usize> {
        self.kernels.stage(kernel::preset(name)?)
    }

    /// Stage an empty kernel of the requested size.
    pub fn stage_empty(&mut self, rows: usize, cols: usize) -> ChanResult<usize> {
        self.kernels.stage(Kernel::unset(rows, cols)?)
    }

    pub fn remove_kernel(&mut self, index: usize) -> ChanResult<Kernel> {
        self.kernels.remove(index)
    }

    pub fn clear_kernels(&mut self) {
        self.kernels.clear();
    }

    pub fn normalize_kernel(&mut self, index: usize) -> ChanResult<()> {
        self.kernels.normalize(index)
    }

    pub fn set_kernel_cell(
        &mut self,
        index: usize,
        row: usize,
        col: usize,
        text: &str,
    ) -> ChanResult<()> {
        self.kernels.get_mut(index)?.set_cell_str(row, col, text)
    }

    /// Apply every staged kernel to `channels`, animating each step.
    ///
    /// If a step's animation fails curve validation, that step's result is kept
    /// (it was already cut to) and the remaining kernels are skipped.
    pub fn convolve(
        &mut self,
        channels: &ChannelSet,
        params: ConvolveParams,
        normalize: bool,
        sink: &mut dyn FrameSink,
    ) -> ChanResult<EditOutcome> {
        let batch = self.engine.convolve_batch(
            self.current()?,
            channels,
            &self.kernels,
            params,
            normalize,
        )?;
        let lock = self.renderer.lock()?;

        let mut report = TransitionReport::default();
        let mut prev = &batch.canvas;
        for step in &batch.steps {
            match animate(&lock, &self.config.transition, &prev.buffer, &step.buffer, sink) {
                Ok(r) => {
                    report.frames += r.frames;
                    report.hard_cut |= r.hard_cut;
                }
                Err(err) if err.is_curve_error() => {
                    drop(lock);
                    self.install(step.clone())?;
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
            prev = step;
        }
        drop(lock);

        self.install(batch.into_result())?;
        Ok(EditOutcome::Changed(report))
    }

    /// Convolve with the configured default padding and stride.
    pub fn convolve_with_defaults(
        &mut self,
        channels: &ChannelSet,
        normalize: bool,
        sink: &mut dyn FrameSink,
    ) -> ChanResult<EditOutcome> {
        let params = self.config.defaults;
        self.convolve(channels, params, normalize, sink)
    }

    /// Convolve with padding and stride given as raw entry text.
    pub fn convolve_entries(
        &mut self,
        channels: &ChannelSet,
        padding: &str,
        stride: &str,
        normalize: bool,
        sink: &mut dyn FrameSink,
    ) -> ChanResult<EditOutcome> {
        let params = ConvolveParams::parse(padding, stride, &self.kernels)?;
        self.convolve(channels, params, normalize, sink)
    }

    pub fn flatten(
        &mut self,
        channels: &ChannelSet,
        sink: &mut dyn FrameSink,
    ) -> ChanResult<EditOutcome> {
        let next = match channel_ops::flatten(self.current()?, channels)? {
            FlattenOutcome::Applied(next) => next,
            FlattenOutcome::NoOp => return Ok(EditOutcome::NoOp),
        };
        self.commit(next, sink)
    }

    pub fn move_channels(
        &mut self,
        channels: &ChannelSet,
        direction: Direction,
        sink: &mut dyn FrameSink,
    ) -> ChanResult<EditOutcome> {
        // Claimed before computing so a move cannot start under a running transition.
        let lock = self.renderer.lock()?;
        let current = self.current()?;
        let next = channel_ops::move_channels(current, channels, direction)?;
        if next.order == current.order {
            return Ok(EditOutcome::NoOp);
        }
        let outcome = animate(&lock, &self.config.transition, &current.buffer, &next.buffer, sink);
        drop(lock);
        self.settle(next, outcome)
    }

    fn commit(&mut self, next: ImageState, sink: &mut dyn FrameSink) -> ChanResult<EditOutcome> {
        let lock = self.renderer.lock()?;
        let outcome = animate(
            &lock,
            &self.config.transition,
            &self.current()?.buffer,
            &next.buffer,
            sink,
        );
        drop(lock);
        self.settle(next, outcome)
    }

    /// Install `next` whenever the sink saw it, including the curve hard-cut path.
    fn settle(
        &mut self,
        next: ImageState,
        outcome: ChanResult<TransitionReport>,
    ) -> ChanResult<EditOutcome> {
        match outcome {
            Ok(report) => {
                self.install(next)?;
                Ok(EditOutcome::Changed(report))
            }
            Err(err) if err.is_curve_error() => {
                self.install(next)?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

fn animate(
    lock: &RenderLock<'_>,
    cfg: &TransitionConfig,
    from: &PixelBuffer,
    to: &PixelBuffer,
    sink: &mut dyn FrameSink,
) -> ChanResult<TransitionReport> {
    if !cfg.enabled {
        return lock.cut(to, sink);
    }
    lock.run(from, to, cfg.duration(), &cfg.ease, sink)
}
