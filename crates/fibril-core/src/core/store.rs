use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use std::fmt;
use thiserror::Error;

/// Cartesian axis used by the rotation primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit_vector(self) -> Unit<Vector3<f64>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Axis::X => "x",
                Axis::Y => "y",
                Axis::Z => "z",
            }
        )
    }
}

/// Restricts a coordinate query to a subset of the matched atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtomFilter {
    #[default]
    All,
    /// Only alpha carbons (atom name `CA`).
    CAlpha,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No object or selection matches '{0}'")]
    NotFound(String),
    #[error("An object named '{0}' already exists")]
    DuplicateName(String),
    #[error("Invalid name '{0}': names must be non-empty and contain no whitespace or '*'")]
    InvalidName(String),
}

/// The capability interface the fibril engine needs from a molecular modeling host.
///
/// Every operation addresses atoms through a *pattern*: one or more
/// whitespace-separated names where `*` is a wildcard and a group name expands
/// to its members. Implementors own all scene state; the engine never caches
/// coordinates across calls.
pub trait StructureStore {
    /// Duplicates the atoms matched by `source` into a new object named `dest`.
    fn create_copy(&mut self, dest: &str, source: &str) -> Result<(), StoreError>;

    /// Returns the coordinates of the matched atoms, or `None` if nothing matches
    /// or the filtered match is empty.
    fn coordinates(&self, pattern: &str, filter: AtomFilter) -> Option<Vec<Point3<f64>>>;

    /// Applies a rigid transformation to every matched atom.
    fn transform(&mut self, pattern: &str, isometry: &Isometry3<f64>) -> Result<(), StoreError>;

    /// Returns the coordinates of atoms that belong to *other* objects and lie
    /// within `radius` of any matched atom, or `None` if there are none.
    fn neighbors_within(&self, pattern: &str, radius: f64) -> Option<Vec<Point3<f64>>>;

    /// Deletes every object, selection and group matched by `pattern` and returns
    /// how many entries were removed.
    fn delete(&mut self, pattern: &str) -> usize;

    /// Creates (or replaces) a named group whose members are the objects matched
    /// by `members`.
    fn group(&mut self, name: &str, members: &str) -> Result<(), StoreError>;

    /// Records a display color for the matched objects.
    fn color(&mut self, color: &str, pattern: &str);

    /// Names of all objects currently held by the store.
    fn object_names(&self) -> Vec<String>;

    fn translate(&mut self, pattern: &str, vector: &Vector3<f64>) -> Result<(), StoreError> {
        let isometry =
            Isometry3::from_parts(Translation3::from(*vector), UnitQuaternion::identity());
        self.transform(pattern, &isometry)
    }

    /// Rotates the matched atoms about `axis` through `origin`.
    fn rotate(
        &mut self,
        pattern: &str,
        axis: Axis,
        angle_degrees: f64,
        origin: &Point3<f64>,
    ) -> Result<(), StoreError> {
        let rotation =
            UnitQuaternion::from_axis_angle(&axis.unit_vector(), angle_degrees.to_radians());
        let isometry = Isometry3::rotation_wrt_point(rotation, *origin);
        self.transform(pattern, &isometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_unit_vectors_form_a_right_handed_triad() {
        let x = Axis::X.unit_vector().into_inner();
        let y = Axis::Y.unit_vector().into_inner();
        let z = Axis::Z.unit_vector().into_inner();
        assert!((x.cross(&y) - z).norm() < 1e-12);
        assert_eq!(Axis::Y.to_string(), "y");
    }

    #[test]
    fn default_filter_is_all() {
        assert_eq!(AtomFilter::default(), AtomFilter::All);
    }
}
