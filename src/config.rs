use std::{fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::Context as _;

use crate::{
    anim_ease::{Ease, validate_curve},
    convolve::{ConvolveParams, StrideMode},
    foundation::error::{ChanError, ChanResult},
    kernel::KernelLimits,
    transition::TransitionMode,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// When `false`, every change is shown as a hard cut.
    pub enabled: bool,
    pub duration_ms: u64,
    pub ease: Ease,
    pub mode: TransitionMode,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 200,
            ease: Ease::default(),
            mode: TransitionMode::Proportional,
        }
    }
}

impl TransitionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kernel_limits: KernelLimits,
    pub stride_mode: StrideMode,
    /// Parameters used when the host supplies none.
    pub defaults: ConvolveParams,
    pub transition: TransitionConfig,
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> ChanResult<Self> {
        let cfg: Self = serde_json::from_str(s).context("parse engine config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path(path: &Path) -> ChanResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open engine config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse engine config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ChanResult<()> {
        let limits = &self.kernel_limits;
        if limits.max_rows == 0 || limits.max_cols == 0 || limits.max_count == 0 {
            return Err(ChanError::parameter(
                "kernel_limits entries must all be >= 1",
            ));
        }
        if self.defaults.stride == 0 {
            return Err(ChanError::parameter("defaults.stride must be >= 1"));
        }
        validate_curve(&self.transition.ease)?;
        Ok(())
    }
}
