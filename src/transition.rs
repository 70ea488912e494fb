//! Eased interpolation between two buffers over wall-clock time.

use std::{
    cell::Cell,
    time::{Duration, Instant},
};

use crate::{
    anim_ease::{EasingCurve, validate_curve},
    buffer::PixelBuffer,
    foundation::error::{ChanError, ChanResult},
    sink::FrameSink,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// `from + (to - from) * ratio` for every sample.
    #[default]
    Proportional,
    /// Every sample moves at the pace of the largest difference, so samples with
    /// small differences settle early.
    ConstantRate,
}

/// One animated change from `from` to `to`. Frames are produced on demand so a
/// host can pace them to its own refresh rate.
pub struct Transition<'a> {
    from: &'a PixelBuffer,
    to: &'a PixelBuffer,
    delta: [Vec<i16>; 3],
    max_abs: i16,
    curve: &'a dyn EasingCurve,
    duration: Duration,
    mode: TransitionMode,
}

impl<'a> Transition<'a> {
    /// Validate the curve and shapes, then precompute per-sample differences.
    pub fn new(
        from: &'a PixelBuffer,
        to: &'a PixelBuffer,
        duration: Duration,
        curve: &'a dyn EasingCurve,
        mode: TransitionMode,
    ) -> ChanResult<Self> {
        validate_curve(curve)?;
        if !from.same_shape(to) {
            return Err(ChanError::parameter(format!(
                "cannot interpolate {}x{} into {}x{}",
                from.width(),
                from.height(),
                to.width(),
                to.height()
            )));
        }
        Ok(Self::build(from, to, duration, curve, mode))
    }

    fn build(
        from: &'a PixelBuffer,
        to: &'a PixelBuffer,
        duration: Duration,
        curve: &'a dyn EasingCurve,
        mode: TransitionMode,
    ) -> Self {
        let mut delta: [Vec<i16>; 3] = Default::default();
        let mut max_abs = 0i16;
        for (p, d) in delta.iter_mut().enumerate() {
            *d = from
                .plane(p)
                .iter()
                .zip(to.plane(p))
                .map(|(&a, &b)| i16::from(b) - i16::from(a))
                .collect();
            max_abs = d.iter().map(|v| v.abs()).fold(max_abs, i16::max);
        }
        Self {
            from,
            to,
            delta,
            max_abs,
            curve,
            duration,
            mode,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    /// Interpolation ratio after `elapsed`, clamped to `[0, 1]`.
    pub fn ratio_at(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let r = self.curve.sample(t);
        // Only the sample points were validated; anything else non-numeric jumps to the end.
        if r.is_finite() { r.clamp(0.0, 1.0) } else { 1.0 }
    }

    pub fn frame_at(&self, elapsed: Duration) -> PixelBuffer {
        self.frame_at_ratio(self.ratio_at(elapsed))
    }

    pub fn frame_at_ratio(&self, ratio: f64) -> PixelBuffer {
        let ratio = ratio.clamp(0.0, 1.0);
        let step = f64::from(self.max_abs) * ratio;
        let planes: [Vec<u8>; 3] = std::array::from_fn(|p| {
            self.from
                .plane(p)
                .iter()
                .zip(&self.delta[p])
                .map(|(&a, &d)| {
                    let d = f64::from(d);
                    let inc = match self.mode {
                        TransitionMode::Proportional => d * ratio,
                        TransitionMode::ConstantRate => d.signum() * d.abs().min(step),
                    };
                    (f64::from(a) + inc).round().clamp(0.0, 255.0) as u8
                })
                .collect()
        });
        // Shapes were checked at construction.
        PixelBuffer::new(self.from.width(), self.from.height(), planes)
            .unwrap_or_else(|_| self.to.clone())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionReport {
    /// Frames pushed, including the final exact frame.
    pub frames: u64,
    /// `true` when the target was shown without interpolation.
    pub hard_cut: bool,
}

/// Runs transitions and refuses to start one while another is in flight.
#[derive(Debug, Default)]
pub struct TransitionRenderer {
    mode: TransitionMode,
    busy: Cell<bool>,
}

impl TransitionRenderer {
    pub fn new(mode: TransitionMode) -> Self {
        Self {
            mode,
            busy: Cell::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Claim the renderer. The claim is released when the lock drops, on every path.
    pub fn lock(&self) -> ChanResult<RenderLock<'_>> {
        if self.busy.replace(true) {
            return Err(ChanError::Busy);
        }
        Ok(RenderLock { renderer: self })
    }

    /// Lock, then animate `from` into `to`. Blocks until the final frame is pushed.
    pub fn run(
        &self,
        from: &PixelBuffer,
        to: &PixelBuffer,
        duration: Duration,
        curve: &dyn EasingCurve,
        sink: &mut dyn FrameSink,
    ) -> ChanResult<TransitionReport> {
        self.lock()?.run(from, to, duration, curve, sink)
    }
}

#[derive(Debug)]
pub struct RenderLock<'r> {
    renderer: &'r TransitionRenderer,
}

impl Drop for RenderLock<'_> {
    fn drop(&mut self) {
        self.renderer.busy.set(false);
    }
}

impl RenderLock<'_> {
    /// Show `to` immediately.
    pub fn cut(&self, to: &PixelBuffer, sink: &mut dyn FrameSink) -> ChanResult<TransitionReport> {
        sink.push_frame(to)?;
        Ok(TransitionReport {
            frames: 1,
            hard_cut: true,
        })
    }

    /// Render-as-fast-as-possible loop from `from` to `to`.
    ///
    /// If the curve fails validation, `to` is pushed as a hard cut before the error
    /// is returned. Buffers of different shape also hard-cut.
    #[tracing::instrument(skip_all, fields(duration_ms = duration.as_millis() as u64))]
    pub fn run(
        &self,
        from: &PixelBuffer,
        to: &PixelBuffer,
        duration: Duration,
        curve: &dyn EasingCurve,
        sink: &mut dyn FrameSink,
    ) -> ChanResult<TransitionReport> {
        if let Err(err) = validate_curve(curve) {
            tracing::warn!(%err, "easing curve rejected, cutting to target");
            if let Err(push_err) = sink.push_frame(to) {
                tracing::warn!(%push_err, "hard cut frame was not delivered");
            }
            return Err(err);
        }
        if !from.same_shape(to) {
            tracing::debug!(
                from = ?(from.width(), from.height()),
                to = ?(to.width(), to.height()),
                "shape changed, cutting to target"
            );
            return self.cut(to, sink);
        }

        let transition = Transition::build(from, to, duration, curve, self.renderer.mode);
        let start = Instant::now();
        let mut frames = 0u64;
        loop {
            let elapsed = start.elapsed();
            if transition.is_finished(elapsed) {
                break;
            }
            sink.push_frame(&transition.frame_at(elapsed))?;
            frames += 1;
        }
        sink.push_frame(to)?;
        frames += 1;
        tracing::debug!(frames, "transition settled");

        Ok(TransitionReport {
            frames,
            hard_cut: false,
        })
    }
}
