use super::refine::GeometryParameters;
use crate::core::utils::geometry::BoundingBox;
use serde::Serialize;
use std::f64::consts::TAU;
use std::fmt;

/// Twists below this many radians count as an untwisted sheet. The threshold is
/// applied to the twist in radians, not to its value in degrees.
pub const MIN_TWIST: f64 = 1e-3;

/// Axis-aligned extents of the built structure, in Angstroms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxExtents {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl From<&BoundingBox> for BoxExtents {
    fn from(bbox: &BoundingBox) -> Self {
        Self {
            min: bbox.min.coords.into(),
            max: bbox.max.coords.into(),
        }
    }
}

impl BoxExtents {
    pub fn size(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.max[i] - self.min[i])
    }
}

/// Human-readable dimensions of a built fibril.
///
/// Lengths are in Angstroms and angles in degrees. `period` counts peptides per
/// full turn; `period` and `pitch` are infinite for untwisted structures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionReport {
    pub radius: f64,
    pub tilt: f64,
    pub twist: f64,
    pub rise: f64,
    pub period: f64,
    pub pitch: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoxExtents>,
}

impl DimensionReport {
    /// Derives the report from a radius, tilt and twist in radians, and the
    /// axial rise per peptide.
    pub fn from_parameters(radius: f64, tilt: f64, twist: f64, rise: f64) -> Self {
        let (period, pitch) = if twist >= MIN_TWIST {
            let period = TAU / twist;
            (period, rise * period)
        } else {
            (f64::INFINITY, f64::INFINITY)
        };
        Self {
            radius,
            tilt: tilt.to_degrees(),
            twist: twist.to_degrees(),
            rise,
            period,
            pitch,
            bounding_box: None,
        }
    }

    pub fn from_geometry(params: &GeometryParameters) -> Self {
        Self::from_parameters(params.radius, params.tilt_z, params.twist_y, params.rise_y)
    }

    /// Report of a flat sheet with peptide spacing `rise`.
    pub fn flat(rise: f64) -> Self {
        Self::from_parameters(0.0, 0.0, 0.0, rise)
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_bounding_box(mut self, bbox: Option<&BoundingBox>) -> Self {
        self.bounding_box = bbox.map(BoxExtents::from);
        self
    }

    pub fn is_twisted(&self) -> bool {
        self.period.is_finite()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

impl fmt::Display for DimensionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Radius: {:.3} nm", self.radius / 10.0)?;
        if self.is_twisted() {
            writeln!(f, "Pitch length: {:.3} nm", self.pitch / 10.0)?;
        }
        writeln!(f, "Tilt angle: {:.3} degree", self.tilt)?;
        writeln!(f, "Twist angle: {:.3} degree", self.twist)?;
        write!(f, "Period: {:.3} peptides", self.period)?;
        if let Some(bbox) = &self.bounding_box {
            let [x, y, z] = bbox.size();
            write!(f, "\nBox: {:.1} x {:.1} x {:.1} Å", x, y, z)?;
        }
        Ok(())
    }
}
