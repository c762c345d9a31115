use nalgebra::{Matrix3, Point3, Rotation3, Unit, UnitQuaternion, Vector3};

const COLLINEAR_EPSILON: f64 = 1e-6;

/// Sign of `value` as `-1.0`, `0.0` or `1.0`.
///
/// Unlike [`f64::signum`], zero maps to zero so that a sheet lying exactly on
/// the helical axis receives no tilt.
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// An orthonormal, right-handed reference triad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: Unit<Vector3<f64>>,
    pub y: Unit<Vector3<f64>>,
    pub z: Unit<Vector3<f64>>,
}

impl Frame {
    /// Builds a frame from three anchor points.
    ///
    /// `y` points from `po1` to `po3`, `z` is normal to the plane spanned by
    /// `po2 - po1` and `y`, and `x` completes the triad. Returns `None` when the
    /// anchors are (nearly) collinear.
    pub fn from_anchors(
        po1: &Point3<f64>,
        po2: &Point3<f64>,
        po3: &Point3<f64>,
    ) -> Option<Self> {
        let x_raw = po2 - po1;
        let y_raw = po3 - po1;
        let z_raw = x_raw.cross(&y_raw);
        if z_raw.norm() < COLLINEAR_EPSILON || y_raw.norm() < COLLINEAR_EPSILON {
            return None;
        }
        let x_raw = y_raw.cross(&z_raw);
        Some(Self {
            x: Unit::new_normalize(x_raw),
            y: Unit::new_normalize(y_raw),
            z: Unit::new_normalize(z_raw),
        })
    }

    /// The rotation mapping a point `p` to `(x·p, y·p, z·p)`.
    pub fn to_local(&self) -> UnitQuaternion<f64> {
        let matrix = Matrix3::from_rows(&[
            self.x.into_inner().transpose(),
            self.y.into_inner().transpose(),
            self.z.into_inner().transpose(),
        ]);
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(matrix))
    }

    pub fn is_right_handed(&self) -> bool {
        let cross = self.x.into_inner().cross(&self.y.into_inner());
        (cross - self.z.into_inner()).norm() < COLLINEAR_EPSILON
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(
            Self {
                min: first,
                max: first,
            },
            |bbox, p| Self {
                min: bbox.min.inf(p),
                max: bbox.max.sup(p),
            },
        ))
    }

    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }
}
