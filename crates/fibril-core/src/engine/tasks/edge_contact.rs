use nalgebra::Point3;
use std::f64::consts::TAU;

/// Upper bound on the number of helical steps sampled per test.
pub const MAX_EDGE_SAMPLES: usize = 10_000;

const TOO_CLOSE: f64 = 1.0;
const GOOD_CONTACT: f64 = 4.0;

/// How the trailing edge of one ribbon stack meets the leading edge of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeContact {
    TooClose,
    GoodDistance,
    TooFar,
}

/// Classifies the contact between neighbouring stacks of a stacked ribbon.
///
/// `length` is the strand length, `radius` the distance of the inner sheet from
/// the axis, `tilt`, `twist` and `stack_angle` are in radians and `rise` is the
/// axial step per peptide.
pub fn classify_edge_contact(
    length: f64,
    radius: f64,
    tilt: f64,
    twist: f64,
    rise: f64,
    stack_angle: f64,
    num_stack: usize,
) -> EdgeContact {
    let half_span = length * tilt.cos() / 2.0;
    let edge = radius.hypot(half_span);
    let shift = 2.0 * (half_span / edge).asin();
    if !shift.is_finite() || stack_angle < shift || num_stack as f64 * stack_angle > TAU {
        return EdgeContact::TooClose;
    }

    let y_shift = length * tilt.sin() / 2.0;
    let leading = Point3::new(stack_angle.cos() * edge, y_shift, stack_angle.sin() * edge);

    let mut closest = f64::INFINITY;
    for i in 0..sample_count(twist) {
        let angle = shift + twist * i as f64;
        let trailing = Point3::new(
            angle.cos() * edge,
            -y_shift + rise * i as f64,
            angle.sin() * edge,
        );
        let distance = (leading - trailing).norm();
        if distance <= TOO_CLOSE {
            return EdgeContact::TooClose;
        }
        closest = closest.min(distance);
    }

    if closest < GOOD_CONTACT {
        EdgeContact::GoodDistance
    } else {
        EdgeContact::TooFar
    }
}

/// Steps per full helical turn, capped at [`MAX_EDGE_SAMPLES`].
fn sample_count(twist: f64) -> usize {
    if twist > 0.0 {
        ((TAU / twist).floor() as usize).min(MAX_EDGE_SAMPLES)
    } else {
        MAX_EDGE_SAMPLES
    }
}
