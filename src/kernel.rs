use crate::foundation::error::{ChanError, ChanResult};

/// A kernel cell: `None` until the user fills it in.
pub type KernelCell = Option<f64>;

/// Rectangular, row-major weight matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    rows: usize,
    cols: usize,
    cells: Vec<KernelCell>,
}

impl Kernel {
    /// A `rows x cols` kernel with every cell unset.
    pub fn unset(rows: usize, cols: usize) -> ChanResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(ChanError::kernel_limit(format!(
                "kernel dimensions must be non-zero, got {rows}x{cols}"
            )));
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        })
    }

    /// A fully populated kernel from rows of equal length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> ChanResult<Self> {
        let cells: Vec<Vec<KernelCell>> = rows
            .iter()
            .map(|r| r.as_ref().iter().copied().map(Some).collect())
            .collect();
        Self::from_cells(cells)
    }

    /// Rows of possibly-unset cells.
    pub fn from_cells(rows: Vec<Vec<KernelCell>>) -> ChanResult<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut kernel = Self::unset(n_rows, n_cols)?;
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(ChanError::parameter(format!(
                    "kernel row {r} has {} cells, expected {n_cols}",
                    row.len()
                )));
            }
            for (c, cell) in row.into_iter().enumerate() {
                kernel.set_cell(r, c, cell)?;
            }
        }
        Ok(kernel)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn min_dim(&self) -> usize {
        self.rows.min(self.cols)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<KernelCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells[row * self.cols + col])
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: KernelCell) -> ChanResult<()> {
        if row >= self.rows || col >= self.cols {
            return Err(ChanError::parameter(format!(
                "cell ({row}, {col}) outside {}x{} kernel",
                self.rows, self.cols
            )));
        }
        if let Some(v) = value
            && !v.is_finite()
        {
            return Err(ChanError::parameter(format!(
                "kernel cell ({row}, {col}) must be finite"
            )));
        }
        self.cells[row * self.cols + col] = value;
        Ok(())
    }

    /// Set a cell from raw entry text. An empty entry or a lone sign leaves it unset.
    pub fn set_cell_str(&mut self, row: usize, col: usize, text: &str) -> ChanResult<()> {
        let text = text.trim();
        let value = match text {
            "" | "-" | "+" => None,
            _ => Some(text.parse::<f64>().map_err(|_| {
                ChanError::parameter(format!("kernel cell ({row}, {col}): '{text}' is not a number"))
            })?),
        };
        self.set_cell(row, col, value)
    }

    pub fn first_unset(&self) -> Option<(usize, usize)> {
        self.cells
            .iter()
            .position(Option::is_none)
            .map(|i| (i / self.cols, i % self.cols))
    }

    pub fn is_complete(&self) -> bool {
        self.first_unset().is_none()
    }

    /// Row-major weights; fails on the first unset cell.
    pub fn weights(&self) -> ChanResult<Vec<f64>> {
        if let Some((row, col)) = self.first_unset() {
            return Err(ChanError::MissingKernelCell { row, col });
        }
        Ok(self.cells.iter().map(|c| c.unwrap_or_default()).collect())
    }

    /// Copy scaled by the sum of absolute weights. A zero sum leaves it unchanged.
    pub fn normalized(&self) -> ChanResult<Self> {
        let weights = self.weights()?;
        let sum: f64 = weights.iter().map(|w| w.abs()).sum();
        if sum == 0.0 {
            return Ok(self.clone());
        }
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            cells: weights.into_iter().map(|w| Some(w / sum)).collect(),
        })
    }
}

/// Named kernels offered to the user.
pub const PRESET_NAMES: [&str; 5] = [
    "mean-blur",
    "gaussian-blur",
    "gaussian-blur-bigger",
    "sobel-x",
    "sobel-y",
];

pub fn preset(name: &str) -> ChanResult<Kernel> {
    let key = name.trim().to_ascii_lowercase().replace([' ', '_'], "-");
    match key.as_str() {
        "mean-blur" => Kernel::from_rows(&[[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]),
        "gaussian-blur" => {
            Kernel::from_rows(&[[1.0, 2.0, 1.0], [2.0, 3.0, 2.0], [1.0, 2.0, 1.0]])
        }
        "gaussian-blur-bigger" => Kernel::from_rows(&[
            [0.023528, 0.033969, 0.038393, 0.033969, 0.023528],
            [0.033969, 0.049045, 0.055432, 0.049045, 0.033969],
            [0.038393, 0.055432, 0.062651, 0.055432, 0.038393],
            [0.033969, 0.049045, 0.055432, 0.049045, 0.033969],
            [0.023528, 0.033969, 0.038393, 0.033969, 0.023528],
        ]),
        "sobel-x" => Kernel::from_rows(&[[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]]),
        "sobel-y" => Kernel::from_rows(&[[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]]),
        _ => Err(ChanError::parameter(format!(
            "unknown kernel preset '{name}' (known: {})",
            PRESET_NAMES.join(", ")
        ))),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct KernelLimits {
    pub max_rows: usize,
    pub max_cols: usize,
    pub max_count: usize,
}

impl Default for KernelLimits {
    fn default() -> Self {
        Self {
            max_rows: 5,
            max_cols: 5,
            max_count: 5,
        }
    }
}

/// Kernels staged for the next convolve action.
#[derive(Clone, Debug, Default)]
pub struct KernelStack {
    limits: KernelLimits,
    kernels: Vec<Kernel>,
}

impl KernelStack {
    pub fn new(limits: KernelLimits) -> Self {
        Self {
            limits,
            kernels: Vec::new(),
        }
    }

    /// A stack holding exactly one kernel, checked against `limits`.
    pub fn single(kernel: Kernel, limits: KernelLimits) -> ChanResult<Self> {
        let mut stack = Self::new(limits);
        stack.stage(kernel)?;
        Ok(stack)
    }

    pub fn stage(&mut self, kernel: Kernel) -> ChanResult<usize> {
        if self.kernels.len() >= self.limits.max_count {
            return Err(ChanError::kernel_limit(format!(
                "at most {} kernels may be staged at once",
                self.limits.max_count
            )));
        }
        if kernel.rows() > self.limits.max_rows || kernel.cols() > self.limits.max_cols {
            return Err(ChanError::kernel_limit(format!(
                "kernel is {}x{}, allowed range is [1,{}] x [1,{}]",
                kernel.rows(),
                kernel.cols(),
                self.limits.max_rows,
                self.limits.max_cols
            )));
        }
        self.kernels.push(kernel);
        Ok(self.kernels.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> ChanResult<Kernel> {
        if index >= self.kernels.len() {
            return Err(ChanError::parameter(format!("no staged kernel #{index}")));
        }
        Ok(self.kernels.remove(index))
    }

    pub fn clear(&mut self) {
        self.kernels.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Kernel> {
        self.kernels.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> ChanResult<&mut Kernel> {
        self.kernels
            .get_mut(index)
            .ok_or_else(|| ChanError::parameter(format!("no staged kernel #{index}")))
    }

    /// Normalize a staged kernel in place.
    pub fn normalize(&mut self, index: usize) -> ChanResult<()> {
        let kernel = self.get_mut(index)?;
        *kernel = kernel.normalized()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Kernel> {
        self.kernels.iter()
    }

    fn smallest_dim(&self) -> Option<usize> {
        self.kernels.iter().map(Kernel::min_dim).min()
    }

    /// Largest padding valid for every staged kernel.
    pub fn max_padding(&self) -> usize {
        self.smallest_dim().map_or(0, |d| (d - 1) / 2)
    }

    /// Largest stride valid for every staged kernel.
    pub fn max_stride(&self) -> usize {
        self.smallest_dim().map_or(0, |d| d - 1)
    }

    /// Fail fast on anything that would block a convolve of the whole stack.
    pub fn check(&self, padding: usize, stride: usize) -> ChanResult<()> {
        if self.kernels.is_empty() {
            return Err(ChanError::kernel_limit("no kernels staged"));
        }
        for kernel in &self.kernels {
            kernel.weights()?;
        }
        let max_padding = self.max_padding();
        if padding > max_padding {
            return Err(ChanError::InvalidPadding {
                padding: i64::try_from(padding).unwrap_or(i64::MAX),
                max: max_padding,
            });
        }
        let max_stride = self.max_stride();
        if stride == 0 || stride > max_stride {
            return Err(ChanError::InvalidStride {
                stride: i64::try_from(stride).unwrap_or(i64::MAX),
                max: max_stride,
            });
        }
        Ok(())
    }
}
