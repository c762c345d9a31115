use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_DIST_TOLERANCE: f64 = 0.6;
pub const DEFAULT_PROBE_OFFSET: f64 = 200.0;
pub const DEFAULT_TWIST_SCAN_STEP_DEG: f64 = 0.4;
pub const DEFAULT_TWIST_SCAN_STEPS: usize = 21;
pub const DEFAULT_MAX_STEPS: usize = 40;
pub const DEFAULT_TILT_STEP_RAD: f64 = 0.02;
pub const DEFAULT_RADIUS_STEP: f64 = 1.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value {value} for parameter '{name}': {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Which sheets of the unit are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layering {
    /// Both sheets.
    #[default]
    Bilayer,
    /// Sheet 1 only.
    Monolayer,
}

impl Layering {
    pub fn sheet_count(self) -> usize {
        match self {
            Layering::Bilayer => 2,
            Layering::Monolayer => 1,
        }
    }
}

/// Numerical settings shared by the clash probe, the refiner and the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Clash distance in Angstroms.
    pub dist_tolerance: f64,
    /// Axial displacement of probe copies away from the permanent structure.
    pub probe_offset: f64,
    /// Spacing of the twist envelope scan, in degrees.
    pub twist_scan_step: f64,
    /// Number of angles in the twist envelope scan, starting at zero.
    pub twist_scan_steps: usize,
    /// Refinement step budget per build.
    pub max_steps: usize,
    /// Tilt adjustment per refinement step, in radians.
    pub tilt_step: f64,
    /// Radius adjustment per refinement step, in Angstroms.
    pub radius_step: f64,
    /// Extra tilt per sheet, in degrees.
    pub tilt_offsets: [f64; 2],
    pub layering: Layering,
    /// Seed for the ambiguous-branch radius perturbation; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dist_tolerance: DEFAULT_DIST_TOLERANCE,
            probe_offset: DEFAULT_PROBE_OFFSET,
            twist_scan_step: DEFAULT_TWIST_SCAN_STEP_DEG,
            twist_scan_steps: DEFAULT_TWIST_SCAN_STEPS,
            max_steps: DEFAULT_MAX_STEPS,
            tilt_step: DEFAULT_TILT_STEP_RAD,
            radius_step: DEFAULT_RADIUS_STEP,
            tilt_offsets: [0.0, 0.0],
            layering: Layering::Bilayer,
            seed: None,
        }
    }
}

#[derive(Default)]
pub struct BuildConfigBuilder {
    dist_tolerance: Option<f64>,
    probe_offset: Option<f64>,
    twist_scan_step: Option<f64>,
    twist_scan_steps: Option<usize>,
    max_steps: Option<usize>,
    tilt_step: Option<f64>,
    radius_step: Option<f64>,
    tilt_offsets: Option<[f64; 2]>,
    layering: Option<Layering>,
    seed: Option<u64>,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dist_tolerance(mut self, tolerance: f64) -> Self {
        self.dist_tolerance = Some(tolerance);
        self
    }
    pub fn probe_offset(mut self, offset: f64) -> Self {
        self.probe_offset = Some(offset);
        self
    }
    pub fn twist_scan_step(mut self, degrees: f64) -> Self {
        self.twist_scan_step = Some(degrees);
        self
    }
    pub fn twist_scan_steps(mut self, steps: usize) -> Self {
        self.twist_scan_steps = Some(steps);
        self
    }
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
    pub fn tilt_step(mut self, radians: f64) -> Self {
        self.tilt_step = Some(radians);
        self
    }
    pub fn radius_step(mut self, step: f64) -> Self {
        self.radius_step = Some(step);
        self
    }
    pub fn tilt_offsets(mut self, degrees: [f64; 2]) -> Self {
        self.tilt_offsets = Some(degrees);
        self
    }
    pub fn layering(mut self, layering: Layering) -> Self {
        self.layering = Some(layering);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        let defaults = BuildConfig::default();
        let config = BuildConfig {
            dist_tolerance: positive(
                "dist_tolerance",
                self.dist_tolerance.unwrap_or(defaults.dist_tolerance),
            )?,
            probe_offset: positive(
                "probe_offset",
                self.probe_offset.unwrap_or(defaults.probe_offset),
            )?,
            twist_scan_step: positive(
                "twist_scan_step",
                self.twist_scan_step.unwrap_or(defaults.twist_scan_step),
            )?,
            twist_scan_steps: at_least_one(
                "twist_scan_steps",
                self.twist_scan_steps.unwrap_or(defaults.twist_scan_steps),
            )?,
            max_steps: at_least_one("max_steps", self.max_steps.unwrap_or(defaults.max_steps))?,
            tilt_step: positive("tilt_step", self.tilt_step.unwrap_or(defaults.tilt_step))?,
            radius_step: positive(
                "radius_step",
                self.radius_step.unwrap_or(defaults.radius_step),
            )?,
            tilt_offsets: self.tilt_offsets.unwrap_or(defaults.tilt_offsets),
            layering: self.layering.unwrap_or(defaults.layering),
            seed: self.seed,
        };
        if let Some(&bad) = config.tilt_offsets.iter().find(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                name: "tilt_offsets",
                value: bad,
                reason: "must be finite",
            });
        }
        Ok(config)
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be a positive finite number",
        })
    }
}

fn at_least_one(name: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value: value as f64,
            reason: "must be at least 1",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_without_overrides_yields_defaults() {
        let config = BuildConfigBuilder::new().build().unwrap();
        assert_eq!(config, BuildConfig::default());
        assert_eq!(config.dist_tolerance, 0.6);
        assert_eq!(config.probe_offset, 200.0);
        assert_eq!(config.twist_scan_steps, 21);
        assert_eq!(config.max_steps, 40);
        assert_eq!(config.tilt_step, 0.02);
        assert_eq!(config.layering, Layering::Bilayer);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn builder_applies_overrides() {
        let config = BuildConfigBuilder::new()
            .dist_tolerance(1.0)
            .max_steps(5)
            .tilt_offsets([2.0, -2.0])
            .layering(Layering::Monolayer)
            .seed(Some(7))
            .build()
            .unwrap();
        assert_eq!(config.dist_tolerance, 1.0);
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.tilt_offsets, [2.0, -2.0]);
        assert_eq!(config.layering.sheet_count(), 1);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn builder_rejects_invalid_values() {
        assert_eq!(
            BuildConfigBuilder::new().dist_tolerance(0.0).build(),
            Err(ConfigError::InvalidParameter {
                name: "dist_tolerance",
                value: 0.0,
                reason: "must be a positive finite number",
            })
        );
        assert!(BuildConfigBuilder::new().max_steps(0).build().is_err());
        assert!(BuildConfigBuilder::new().tilt_step(f64::NAN).build().is_err());
        assert!(
            BuildConfigBuilder::new()
                .tilt_offsets([f64::INFINITY, 0.0])
                .build()
                .is_err()
        );
    }
}
