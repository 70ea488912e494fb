use crate::{
    buffer::{ImageState, PixelBuffer},
    foundation::core::ChannelSet,
    foundation::error::{ChanError, ChanResult},
    kernel::{Kernel, KernelLimits, KernelStack},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConvolveParams {
    pub padding: usize,
    pub stride: usize,
}

impl Default for ConvolveParams {
    fn default() -> Self {
        Self {
            padding: 0,
            stride: 1,
        }
    }
}

impl ConvolveParams {
    /// Parse the raw padding / stride entries.
    ///
    /// Text that is not an integer is `InvalidParameter`. A negative padding or a
    /// stride below one is reported against the bounds of `stack`; the upper bounds
    /// are checked by [`KernelStack::check`] when the batch runs.
    pub fn parse(padding: &str, stride: &str, stack: &KernelStack) -> ChanResult<Self> {
        fn field(name: &str, text: &str) -> ChanResult<i64> {
            let text = text.trim();
            if text.is_empty() {
                return Err(ChanError::parameter(format!("{name} is missing")));
            }
            text.parse()
                .map_err(|_| ChanError::parameter(format!("{name} must be an integer")))
        }

        let raw_padding = field("padding", padding)?;
        let raw_stride = field("stride", stride)?;
        let padding = usize::try_from(raw_padding).map_err(|_| ChanError::InvalidPadding {
            padding: raw_padding,
            max: stack.max_padding(),
        })?;
        let stride = usize::try_from(raw_stride)
            .ok()
            .filter(|&s| s > 0)
            .ok_or(ChanError::InvalidStride {
                stride: raw_stride,
                max: stack.max_stride(),
            })?;
        Ok(Self { padding, stride })
    }
}

/// How a stride larger than one shapes the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrideMode {
    /// Same shape as the input; each computed sample fills its `stride x stride` cell.
    #[default]
    Hold,
    /// Every plane is subsampled on the stride grid, shrinking the image.
    Decimate,
}

/// Result of convolving a stack of kernels.
#[derive(Clone, Debug)]
pub struct ConvolveBatch {
    /// Working canvas after padding, before any kernel ran.
    pub canvas: ImageState,
    /// State after each kernel, in stack order. Never empty.
    pub steps: Vec<ImageState>,
}

impl ConvolveBatch {
    pub fn result(&self) -> &ImageState {
        self.steps.last().unwrap_or(&self.canvas)
    }

    pub fn into_result(mut self) -> ImageState {
        self.steps.pop().unwrap_or(self.canvas)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConvolutionEngine {
    limits: KernelLimits,
    stride_mode: StrideMode,
}

impl ConvolutionEngine {
    pub fn new(limits: KernelLimits, stride_mode: StrideMode) -> Self {
        Self {
            limits,
            stride_mode,
        }
    }

    /// Convolve the selected channels with a single kernel.
    pub fn convolve(
        &self,
        state: &ImageState,
        channels: &ChannelSet,
        kernel: &Kernel,
        params: ConvolveParams,
    ) -> ChanResult<ImageState> {
        let stack = KernelStack::single(kernel.clone(), self.limits)?;
        Ok(self
            .convolve_batch(state, channels, &stack, params, false)?
            .into_result())
    }

    /// Convolve the selected channels with every staged kernel in turn.
    ///
    /// All validation happens before the first sample is written. Padding is applied
    /// once and the padded canvas is shared by every kernel of the batch.
    #[tracing::instrument(skip(self, state, stack), fields(kernels = stack.len()))]
    pub fn convolve_batch(
        &self,
        state: &ImageState,
        channels: &ChannelSet,
        stack: &KernelStack,
        params: ConvolveParams,
        normalize: bool,
    ) -> ChanResult<ConvolveBatch> {
        if channels.is_empty() {
            return Err(ChanError::selection(
                "select at least one channel to convolve",
            ));
        }
        stack.check(params.padding, params.stride)?;

        let mut prepared = Vec::with_capacity(stack.len());
        for kernel in stack.iter() {
            let kernel = if normalize {
                kernel.normalized()?
            } else {
                kernel.clone()
            };
            prepared.push(PreparedKernel::new(&kernel)?);
        }

        let padding = u32::try_from(params.padding)
            .map_err(|_| ChanError::parameter("padding does not fit the image"))?;
        let canvas = state.with_buffer(state.buffer.padded(padding));

        let mut steps: Vec<ImageState> = Vec::with_capacity(prepared.len());
        for kernel in &prepared {
            let current = steps.last().unwrap_or(&canvas);
            let next = self.apply(current, channels, kernel, params.stride)?;
            steps.push(next);
        }

        if let Some(last) = steps.last() {
            tracing::debug!(
                linked = ?last.identity.linked_channels(),
                "identity after convolve"
            );
        }
        Ok(ConvolveBatch { canvas, steps })
    }

    fn apply(
        &self,
        state: &ImageState,
        channels: &ChannelSet,
        kernel: &PreparedKernel,
        stride: usize,
    ) -> ChanResult<ImageState> {
        let src = &state.buffer;
        let (w, h) = (src.width() as usize, src.height() as usize);
        let decimate = self.stride_mode == StrideMode::Decimate && stride > 1;

        let mut planes: [Vec<u8>; 3] = Default::default();
        for (i, plane) in planes.iter_mut().enumerate() {
            let selected = state.order.at(i).is_some_and(|c| channels.contains(c));
            *plane = if selected {
                convolve_plane(src.plane(i), w, h, kernel, stride, self.stride_mode)
            } else if decimate {
                decimate_plane(src.plane(i), w, h, stride)
            } else {
                src.plane(i).to_vec()
            };
        }

        let (out_w, out_h) = if decimate {
            (w.div_ceil(stride), h.div_ceil(stride))
        } else {
            (w, h)
        };
        let buffer = PixelBuffer::new(out_w as u32, out_h as u32, planes)?;
        Ok(ImageState {
            buffer,
            order: state.order,
            identity: state.identity.after_convolve(channels),
        })
    }
}

#[derive(Clone, Debug)]
struct PreparedKernel {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

impl PreparedKernel {
    fn new(kernel: &Kernel) -> ChanResult<Self> {
        Ok(Self {
            rows: kernel.rows(),
            cols: kernel.cols(),
            weights: kernel.weights()?,
        })
    }

    /// Convolution at `(x, y)`: flipped kernel centred on `dim / 2`, edges replicated.
    fn sample(&self, src: &[u8], w: usize, h: usize, x: usize, y: usize) -> u8 {
        let (cy, cx) = ((self.rows / 2) as isize, (self.cols / 2) as isize);
        let (max_y, max_x) = (h as isize - 1, w as isize - 1);
        let mut acc = 0.0f64;
        for ky in 0..self.rows {
            let sy = (y as isize + cy - ky as isize).clamp(0, max_y) as usize;
            let row = &src[sy * w..(sy + 1) * w];
            for kx in 0..self.cols {
                let sx = (x as isize + cx - kx as isize).clamp(0, max_x) as usize;
                acc += self.weights[ky * self.cols + kx] * f64::from(row[sx]);
            }
        }
        to_u8(acc)
    }
}

fn to_u8(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

fn convolve_plane(
    src: &[u8],
    w: usize,
    h: usize,
    kernel: &PreparedKernel,
    stride: usize,
    mode: StrideMode,
) -> Vec<u8> {
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let stride = stride.max(1);
    match mode {
        StrideMode::Hold => {
            let mut out = vec![0u8; w * h];
            for y0 in (0..h).step_by(stride) {
                for x0 in (0..w).step_by(stride) {
                    let v = kernel.sample(src, w, h, x0, y0);
                    for y in y0..(y0 + stride).min(h) {
                        out[y * w + x0..y * w + (x0 + stride).min(w)].fill(v);
                    }
                }
            }
            out
        }
        StrideMode::Decimate => {
            let mut out = Vec::with_capacity(w.div_ceil(stride) * h.div_ceil(stride));
            for y in (0..h).step_by(stride) {
                for x in (0..w).step_by(stride) {
                    out.push(kernel.sample(src, w, h, x, y));
                }
            }
            out
        }
    }
}

fn decimate_plane(src: &[u8], w: usize, h: usize, stride: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(w.div_ceil(stride) * h.div_ceil(stride));
    for y in (0..h).step_by(stride) {
        for x in (0..w).step_by(stride) {
            out.push(src[y * w + x]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Channel;
    use crate::identity::IdentityGraph;
    use crate::kernel::preset;

    fn engine() -> ConvolutionEngine {
        ConvolutionEngine::default()
    }

    fn only(channels: &[Channel]) -> ChannelSet {
        channels.iter().copied().collect()
    }

    fn state_from_planes(w: u32, h: u32, planes: [Vec<u8>; 3]) -> ImageState {
        ImageState::new(PixelBuffer::new(w, h, planes).unwrap())
    }

    #[test]
    fn normalized_mean_blur_keeps_flat_plane() {
        let state = ImageState::new(PixelBuffer::filled(4, 4, [10, 10, 10]));
        let kernel = preset("mean-blur").unwrap().normalized().unwrap();
        let out = engine()
            .convolve(
                &state,
                &only(&[Channel::Red]),
                &kernel,
                ConvolveParams::default(),
            )
            .unwrap();
        assert!(out.buffer.plane(0).iter().all(|&v| v == 10));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let state = ImageState::new(PixelBuffer::filled(2, 2, [1, 2, 3]));
        let err = engine()
            .convolve(
                &state,
                &ChannelSet::new(),
                &preset("mean-blur").unwrap(),
                ConvolveParams::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ChanError::InvalidSelection(_)));
    }

    #[test]
    fn only_selected_planes_change() {
        let ramp: Vec<u8> = (0..9).map(|v| v * 20).collect();
        let state = state_from_planes(3, 3, [ramp.clone(), ramp.clone(), ramp.clone()]);
        let out = engine()
            .convolve(
                &state,
                &only(&[Channel::Green]),
                &preset("sobel-x").unwrap(),
                ConvolveParams::default(),
            )
            .unwrap();
        assert_eq!(out.buffer.plane(0), ramp.as_slice());
        assert_eq!(out.buffer.plane(2), ramp.as_slice());
        assert_ne!(out.buffer.plane(1), ramp.as_slice());
    }

    #[test]
    fn kernel_is_flipped_like_a_true_convolution() {
        // Weight on the left column pulls each sample from its right neighbour.
        let kernel =
            Kernel::from_rows(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]]).unwrap();
        let row = vec![10u8, 20, 30, 40];
        let state = state_from_planes(4, 1, [row.clone(), row.clone(), row]);
        let out = engine()
            .convolve(
                &state,
                &only(&[Channel::Red]),
                &kernel,
                ConvolveParams::default(),
            )
            .unwrap();
        assert_eq!(out.buffer.plane(0), &[20, 30, 40, 40]);
    }

    #[test]
    fn edges_are_replicated_not_zeroed() {
        let state = ImageState::new(PixelBuffer::filled(3, 3, [200, 0, 0]));
        let out = engine()
            .convolve(
                &state,
                &only(&[Channel::Red]),
                &preset("gaussian-blur").unwrap().normalized().unwrap(),
                ConvolveParams::default(),
            )
            .unwrap();
        assert_eq!(out.buffer.plane(0), &[200; 9]);
    }

    #[test]
    fn results_saturate_to_byte_range() {
        let state = state_from_planes(3, 1, [vec![0, 255, 0], vec![0; 3], vec![0; 3]]);
        let out = engine()
            .convolve(
                &state,
                &only(&[Channel::Red]),
                &preset("sobel-x").unwrap(),
                ConvolveParams::default(),
            )
            .unwrap();
        assert_eq!(out.buffer.plane(0), &[0, 0, 255]);
    }

    #[test]
    fn padding_grows_every_plane_once_per_batch() {
        let state = ImageState::new(PixelBuffer::filled(2, 2, [50, 60, 70]));
        let mut stack = KernelStack::new(KernelLimits::default());
        stack.stage(preset("mean-blur").unwrap()).unwrap();
        stack.stage(preset("gaussian-blur").unwrap()).unwrap();
        let batch = engine()
            .convolve_batch(
                &state,
                &only(&[Channel::Blue]),
                &stack,
                ConvolveParams {
                    padding: 1,
                    stride: 1,
                },
                true,
            )
            .unwrap();
        assert_eq!(batch.steps.len(), 2);
        assert_eq!(batch.canvas.buffer.width(), 4);
        for step in &batch.steps {
            assert_eq!((step.buffer.width(), step.buffer.height()), (4, 4));
        }
        // Untouched planes keep their zero border.
        let out = &batch.result().buffer;
        assert_eq!(out.sample(0, 0, 0), 0);
        assert_eq!(out.sample(1, 1, 0), 50);
    }

    #[test]
    fn out_of_range_padding_and_stride_fail_before_work() {
        let state = ImageState::new(PixelBuffer::filled(2, 2, [1, 1, 1]));
        let kernel = preset("mean-blur").unwrap();
        let sel = only(&[Channel::Red]);
        assert!(matches!(
            engine().convolve(
                &state,
                &sel,
                &kernel,
                ConvolveParams {
                    padding: 2,
                    stride: 1
                }
            ),
            Err(ChanError::InvalidPadding { padding: 2, max: 1 })
        ));
        assert!(matches!(
            engine().convolve(
                &state,
                &sel,
                &kernel,
                ConvolveParams {
                    padding: 0,
                    stride: 3
                }
            ),
            Err(ChanError::InvalidStride { stride: 3, max: 2 })
        ));
    }

    #[test]
    fn hold_stride_keeps_shape_and_fills_cells() {
        let plane: Vec<u8> = (0..16).map(|v| v * 10).collect();
        let state = state_from_planes(4, 4, [plane.clone(), plane.clone(), plane]);
        let out = engine()
            .convolve(
                &state,
                &only(&[Channel::Red]),
                &preset("mean-blur").unwrap().normalized().unwrap(),
                ConvolveParams {
                    padding: 0,
                    stride: 2,
                },
            )
            .unwrap();
        let p = out.buffer.plane(0);
        assert_eq!(p.len(), 16);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[0], p[4]);
        assert_eq!(p[0], p[5]);
        assert_eq!(p[2], p[7]);
    }

    #[test]
    fn decimate_stride_shrinks_all_planes() {
        let engine = ConvolutionEngine::new(KernelLimits::default(), StrideMode::Decimate);
        let state = ImageState::new(PixelBuffer::filled(5, 3, [9, 8, 7]));
        let out = engine
            .convolve(
                &state,
                &only(&[Channel::Red]),
                &preset("mean-blur").unwrap().normalized().unwrap(),
                ConvolveParams {
                    padding: 0,
                    stride: 2,
                },
            )
            .unwrap();
        assert_eq!((out.buffer.width(), out.buffer.height()), (3, 2));
        assert_eq!(out.buffer.plane(0), &[9; 6]);
        assert_eq!(out.buffer.plane(2), &[7; 6]);
    }

    #[test]
    fn convolve_updates_identity() {
        let mut state = ImageState::new(PixelBuffer::filled(3, 3, [5, 5, 5]));
        state.identity = IdentityGraph::from_pairs(&[
            (Channel::Red, Channel::Green),
            (Channel::Green, Channel::Blue),
            (Channel::Red, Channel::Blue),
        ]);
        let out = engine()
            .convolve(
                &state,
                &only(&[Channel::Red, Channel::Green]),
                &preset("sobel-y").unwrap(),
                ConvolveParams::default(),
            )
            .unwrap();
        assert!(out.identity.is_identical(Channel::Red, Channel::Green));
        assert!(!out.identity.is_identical(Channel::Red, Channel::Blue));
        assert!(out.identity.is_symmetric());
    }

    #[test]
    fn parse_params_from_entries() {
        let stack = KernelStack::single(preset("mean-blur").unwrap(), KernelLimits::default())
            .unwrap();
        assert_eq!(
            ConvolveParams::parse("1", " 2 ", &stack).unwrap(),
            ConvolveParams {
                padding: 1,
                stride: 2
            }
        );
        assert!(matches!(
            ConvolveParams::parse("", "1", &stack),
            Err(ChanError::InvalidParameter(_))
        ));
        assert!(matches!(
            ConvolveParams::parse("1", "x", &stack),
            Err(ChanError::InvalidParameter(_))
        ));
        assert!(matches!(
            ConvolveParams::parse("1.5", "1", &stack),
            Err(ChanError::InvalidParameter(_))
        ));
    }

    #[test]
    fn negative_entries_are_range_errors() {
        let stack = KernelStack::single(preset("mean-blur").unwrap(), KernelLimits::default())
            .unwrap();
        assert!(matches!(
            ConvolveParams::parse("-1", "1", &stack),
            Err(ChanError::InvalidPadding { padding: -1, max: 1 })
        ));
        assert!(matches!(
            ConvolveParams::parse("0", "-2", &stack),
            Err(ChanError::InvalidStride { stride: -2, max: 2 })
        ));
        assert!(matches!(
            ConvolveParams::parse("0", "0", &stack),
            Err(ChanError::InvalidStride { stride: 0, max: 2 })
        ));
    }
}
