//! Run configuration: a serde-deserialized settings struct plus a
//! `parse_*_json` free function.

use serde::{Deserialize, Serialize};

use crate::error::{InpaintError, Result};

/// Patch distance metric used by the KNN scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Sum of squared per-channel differences.
    Ssd,
    /// Sum of absolute per-channel differences.
    Sad,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::Ssd
    }
}

/// Second-stage tiebreaker that picks one source patch out of the K
/// candidates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefinerKind {
    /// Smallest-distance candidate (the baseline).
    Identity,
    /// Minimize the L2 energy introduced across the target patch's seam.
    IntroducedEnergy,
    /// Reject candidates that have already contributed more than `frac` of
    /// the target's hole pixels as source pixels; among the rest, pick the
    /// minimum-distance candidate.
    ReuseLimited { frac: f32 },
}

impl Default for RefinerKind {
    fn default() -> Self {
        RefinerKind::Identity
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InpaintConfig {
    /// Patch half-width; patch side length is `2*r + 1`.
    pub r: usize,
    /// Number of KNN candidates to retain per target.
    pub k: usize,
    #[serde(default)]
    pub distance: DistanceMetric,
    #[serde(default)]
    pub refiner: RefinerKind,
    /// Variance of the Gaussian blur used when computing isophotes.
    #[serde(default = "default_blur_variance")]
    pub blur_variance: f32,
    /// Defensive cap independent of hole geometry; `None` relies solely on
    /// the driver's own hole-exhaustion termination bound.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

fn default_blur_variance() -> f32 {
    2.0
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            r: 5,
            k: 200,
            distance: DistanceMetric::default(),
            refiner: RefinerKind::default(),
            blur_variance: default_blur_variance(),
            max_iterations: None,
        }
    }
}

impl InpaintConfig {
    /// Validate the fields `InvalidConfiguration` covers: `r == 0`, `k == 0`,
    /// an out-of-range reuse fraction, or a non-positive blur variance.
    /// Image/mask size checks happen once both are in hand (see
    /// `driver::Inpainter::run`).
    pub fn validate(&self) -> Result<()> {
        if self.r == 0 {
            return Err(InpaintError::InvalidConfiguration(
                "patch radius r must be positive".into(),
            ));
        }
        if self.k == 0 {
            return Err(InpaintError::InvalidConfiguration(
                "candidate count k must be positive".into(),
            ));
        }
        if let RefinerKind::ReuseLimited { frac } = self.refiner {
            if !(0.0..=1.0).contains(&frac) {
                return Err(InpaintError::InvalidConfiguration(format!(
                    "reuse-limited fraction must be in [0,1], got {frac}"
                )));
            }
        }
        if self.blur_variance <= 0.0 {
            return Err(InpaintError::InvalidConfiguration(
                "blur_variance must be positive".into(),
            ));
        }
        Ok(())
    }
}

pub fn parse_config_json(json_text: &str) -> Result<InpaintConfig> {
    let config: InpaintConfig = serde_json::from_str(json_text)
        .map_err(|e| InpaintError::InvalidConfiguration(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
