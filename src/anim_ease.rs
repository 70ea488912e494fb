use crate::foundation::error::{ChanError, ChanResult};

/// Number of evenly spaced points in `[0, 1)` sampled before a transition starts.
pub const CURVE_SAMPLE_POINTS: usize = 100;

/// Maps normalized time to an interpolation ratio.
///
/// Curves need not be monotonic and may overshoot 1; the renderer clamps each
/// frame's ratio. They must be numeric and non-negative on `[0, 1)`.
pub trait EasingCurve {
    fn sample(&self, t: f64) -> f64;
}

impl<F> EasingCurve for F
where
    F: Fn(f64) -> f64,
{
    fn sample(&self, t: f64) -> f64 {
        self(t)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    Smoothstep,
    /// `t^exponent`.
    Power(f64),
}

impl Default for Ease {
    fn default() -> Self {
        Self::Power(1.2)
    }
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::Smoothstep => t * t * (3.0 - 2.0 * t),
            Self::Power(exponent) => t.powf(exponent),
        }
    }
}

impl EasingCurve for Ease {
    fn sample(&self, t: f64) -> f64 {
        self.apply(t)
    }
}

/// Sample `curve` at [`CURVE_SAMPLE_POINTS`] points of `[0, 1)`.
pub fn validate_curve(curve: &dyn EasingCurve) -> ChanResult<()> {
    for i in 0..CURVE_SAMPLE_POINTS {
        let t = i as f64 / CURVE_SAMPLE_POINTS as f64;
        let value = curve.sample(t);
        if !value.is_finite() {
            return Err(ChanError::DiscontinuousCurve { at: t });
        }
        if value < 0.0 {
            return Err(ChanError::NegativeRange { at: t, value });
        }
    }
    Ok(())
}
