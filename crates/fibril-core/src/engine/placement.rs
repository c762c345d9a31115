use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};

/// Rigid pose of one unit-chain copy along a twisted fibril.
///
/// Applied to a copy in this order: translate by `offset`, bring the Cα
/// centroid to `y = 0`, rotate about `z` by `tilt`, rotate about `y` by
/// `twist`, translate by `rise` along `y`. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelicalPose {
    pub offset: Vector3<f64>,
    pub tilt: f64,
    pub twist: f64,
    pub rise: f64,
}

impl HelicalPose {
    /// The composed isometry for a chain whose Cα centroid is `ca_centroid`
    /// before the pose is applied.
    pub fn isometry(&self, ca_centroid: &Point3<f64>) -> Isometry3<f64> {
        let recenter_y = ca_centroid.y + self.offset.y;
        let pre = Translation3::new(self.offset.x, self.offset.y - recenter_y, self.offset.z);
        let tilt = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.tilt.to_radians());
        let twist = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.twist.to_radians());
        let post = Translation3::new(0.0, self.rise, 0.0);

        Isometry3::from_parts(post, UnitQuaternion::identity())
            * Isometry3::from_parts(Translation3::identity(), twist * tilt)
            * Isometry3::from_parts(pre, UnitQuaternion::identity())
    }
}

/// Flip of one copy of a single-peptide sheet.
///
/// The sidechain flip turns the copy about `z` then `y`, the backbone flip about
/// `y` then `z`, both through the Cα centroid of the window. The copy is then
/// shifted along `x` so its register Cα lands on the first window Cα of the
/// unflipped peptide. The register is the last window Cα when the backbone flip
/// reverses the strand and the first one otherwise. Angles are `(y, z)` in
/// degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrandFlip {
    pub backbone: (f64, f64),
    pub sidechain: (f64, f64),
}

impl StrandFlip {
    /// Whether the backbone flip reverses the strand direction.
    pub fn reverses(&self) -> bool {
        (self.backbone.0 + self.backbone.1).rem_euclid(360.0) != 0.0
    }

    /// The flip for a peptide whose window Cα positions are `window`.
    ///
    /// `window` must not be empty.
    pub fn isometry(&self, window: &[Point3<f64>]) -> Isometry3<f64> {
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return Isometry3::identity();
        };
        let center = window
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / window.len() as f64;
        let about = |axis: Unit<Vector3<f64>>, degrees: f64| {
            UnitQuaternion::from_axis_angle(&axis, degrees.to_radians())
        };
        let sidechain =
            about(Vector3::y_axis(), self.sidechain.0) * about(Vector3::z_axis(), self.sidechain.1);
        let backbone =
            about(Vector3::z_axis(), self.backbone.1) * about(Vector3::y_axis(), self.backbone.0);
        let flip = Isometry3::rotation_wrt_point(backbone * sidechain, Point3::from(center));

        let register = if self.reverses() { last } else { first };
        let shift = first.x - (flip * register).x;
        Isometry3::from_parts(Translation3::new(shift, 0.0, 0.0), UnitQuaternion::identity()) * flip
    }
}

/// Pure translation used by flat and stacked sheets.
pub fn sheet_isometry(offset: Vector3<f64>) -> Isometry3<f64> {
    Isometry3::from_parts(Translation3::from(offset), UnitQuaternion::identity())
}
