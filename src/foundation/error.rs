pub type ChanResult<T> = Result<T, ChanError>;

#[derive(thiserror::Error, Debug)]
pub enum ChanError {
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("invalid padding: {padding} (allowed 0..={max})")]
    InvalidPadding { padding: i64, max: usize },

    #[error("invalid stride: {stride} (allowed 1..={max})")]
    InvalidStride { stride: i64, max: usize },

    #[error("missing kernel cell at row {row}, col {col}")]
    MissingKernelCell { row: usize, col: usize },

    #[error("kernel limit exceeded: {0}")]
    KernelLimitExceeded(String),

    #[error("discontinuous curve: non-numeric sample at t={at}")]
    DiscontinuousCurve { at: f64 },

    #[error("negative range: curve sample {value} at t={at}")]
    NegativeRange { at: f64, value: f64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("busy: a transition is already in flight")]
    Busy,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChanError {
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }

    pub fn kernel_limit(msg: impl Into<String>) -> Self {
        Self::KernelLimitExceeded(msg.into())
    }

    pub fn parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Errors raised by easing-curve validation before a transition starts.
    pub fn is_curve_error(&self) -> bool {
        matches!(
            self,
            Self::DiscontinuousCurve { .. } | Self::NegativeRange { .. }
        )
    }
}
