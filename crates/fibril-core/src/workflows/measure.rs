use crate::core::io::trajectory::Trajectory;
use nalgebra::{Point3, Vector3};
use serde::Serialize;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeasureError {
    #[error("At least one segment is required")]
    NoSegments,
    #[error("Segment {start}-{end} must span at least two beads")]
    ShortSegment { start: usize, end: usize },
    #[error("Segment {start}-{end} exceeds the {beads} beads of each frame")]
    SegmentOutOfRange {
        start: usize,
        end: usize,
        beads: usize,
    },
    #[error("Frame {0} has no resolvable axis")]
    DegenerateAxis(u64),
}

/// Axis, radius and pitch fitted to one trajectory frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameMorphology {
    pub frame: u64,
    pub radius: f64,
    pub pitch: f64,
    pub mean_axial_step: f64,
}

/// Fits a straight helical axis through bead segments of a fibril trajectory.
///
/// Each segment is an inclusive range of bead indices describing one strand of
/// the fibril. Beads are parameterized by their index offset from the bead of
/// their segment closest to the centroid, and each coordinate is fitted linearly
/// against that offset. The slope is the axis direction scaled by the pitch per
/// bead; the intercept is a point on the axis.
#[derive(Debug, Clone)]
pub struct MorphologyAnalyzer {
    segments: Vec<RangeInclusive<usize>>,
}

impl MorphologyAnalyzer {
    pub fn new(segments: Vec<RangeInclusive<usize>>) -> Result<Self, MeasureError> {
        if segments.is_empty() {
            return Err(MeasureError::NoSegments);
        }
        if let Some(short) = segments.iter().find(|s| s.end() <= s.start()) {
            return Err(MeasureError::ShortSegment {
                start: *short.start(),
                end: *short.end(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[RangeInclusive<usize>] {
        &self.segments
    }

    #[instrument(skip_all, name = "morphology_analysis", fields(frames = trajectory.len()))]
    pub fn analyze(&self, trajectory: &Trajectory) -> Result<Vec<FrameMorphology>, MeasureError> {
        let beads = trajectory.num_beads();
        if let Some(segment) = self.segments.iter().find(|s| *s.end() >= beads) {
            return Err(MeasureError::SegmentOutOfRange {
                start: *segment.start(),
                end: *segment.end(),
                beads,
            });
        }

        let results = trajectory
            .frames()
            .map(|(frame, beads)| self.analyze_frame(frame, beads))
            .collect::<Result<Vec<_>, _>>()?;
        info!(frames = results.len(), "Morphology analysis complete.");
        Ok(results)
    }

    fn analyze_frame(
        &self,
        frame: u64,
        beads: &[Point3<f64>],
    ) -> Result<FrameMorphology, MeasureError> {
        let indices: Vec<usize> = self.segments.iter().cloned().flatten().collect();
        let centroid = indices
            .iter()
            .fold(Vector3::zeros(), |acc, &i| acc + beads[i].coords)
            / indices.len() as f64;

        let offsets: Vec<f64> = self
            .segments
            .iter()
            .flat_map(|segment| {
                let closest = segment
                    .clone()
                    .min_by(|&a, &b| {
                        let da = (beads[a].coords - centroid).norm_squared();
                        let db = (beads[b].coords - centroid).norm_squared();
                        da.total_cmp(&db)
                    })
                    .unwrap_or(*segment.start());
                segment.clone().map(move |i| i as f64 - closest as f64)
            })
            .collect();

        let (axis, anchor) = fit_line(&offsets, indices.iter().map(|&i| &beads[i]));
        let pitch = axis.norm();
        if !pitch.is_finite() || pitch < f64::EPSILON {
            return Err(MeasureError::DegenerateAxis(frame));
        }
        let direction = axis / pitch;

        let radius = indices
            .iter()
            .map(|&i| (beads[i] - anchor).cross(&direction).norm())
            .sum::<f64>()
            / indices.len() as f64;

        let steps: Vec<f64> = self
            .segments
            .iter()
            .flat_map(|segment| {
                let (start, end) = (*segment.start(), *segment.end());
                (start..end).map(move |i| (beads[i + 1] - beads[i]).dot(&direction))
            })
            .collect();
        let mean_axial_step = steps.iter().sum::<f64>() / steps.len() as f64;

        debug!(frame, radius, pitch, mean_axial_step, "Fitted frame axis.");
        Ok(FrameMorphology {
            frame,
            radius,
            pitch,
            mean_axial_step,
        })
    }
}

/// Least-squares fit of `point = anchor + t * slope`, returning `(slope, anchor)`.
fn fit_line<'a>(
    t: &[f64],
    points: impl Iterator<Item = &'a Point3<f64>>,
) -> (Vector3<f64>, Point3<f64>) {
    let n = t.len() as f64;
    let points: Vec<&Point3<f64>> = points.collect();
    let t_mean = t.iter().sum::<f64>() / n;
    let p_mean = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / n;

    let (mut covariance, mut variance) = (Vector3::<f64>::zeros(), 0.0);
    for (&ti, p) in t.iter().zip(&points) {
        let dt = ti - t_mean;
        covariance += (p.coords - p_mean) * dt;
        variance += dt * dt;
    }
    let slope = covariance / variance;
    (slope, Point3::from(p_mean - slope * t_mean))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helix(radius: f64, pitch: f64) -> Vec<Point3<f64>> {
        (0..36)
            .map(|i| {
                let angle = (10.0 * i as f64).to_radians();
                Point3::new(radius * angle.cos(), radius * angle.sin(), pitch * i as f64)
            })
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn straight_segment_has_zero_radius_and_unit_spacing_pitch() {
        let beads = (0..10).map(|i| Point3::new(1.0, 2.0 + 0.5 * i as f64, 3.0)).collect();
        let trajectory = Trajectory::from_frames(vec![beads]).unwrap();
        let result = MorphologyAnalyzer::new(vec![0..=9])
            .unwrap()
            .analyze(&trajectory)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_close(result[0].radius, 0.0);
        assert_close(result[0].pitch, 0.5);
        assert_close(result[0].mean_axial_step, 0.5);
    }

    #[test]
    fn single_turn_helices_fit_per_frame() {
        let trajectory =
            Trajectory::from_frames(vec![helix(20.0, 3.0), helix(18.0, 4.0), helix(16.0, 5.0)])
                .unwrap();
        let result = MorphologyAnalyzer::new(vec![0..=35])
            .unwrap()
            .analyze(&trajectory)
            .unwrap();

        let expected = [
            (15.743152630725765, 3.1828284355177816, 2.8609464835028695),
            (14.302278832916572, 4.112860494649905, 3.9110931419328754),
            (12.766135553750724, 5.071829451387533, 4.942551283553525),
        ];
        for (frame, (radius, pitch, step)) in result.iter().zip(expected) {
            assert_close(frame.radius, radius);
            assert_close(frame.pitch, pitch);
            assert_close(frame.mean_axial_step, step);
        }
        assert_eq!(result[2].frame, 2);
        assert!(result.windows(2).all(|w| w[0].radius > w[1].radius));
    }

    #[test]
    fn segments_are_validated() {
        assert_eq!(
            MorphologyAnalyzer::new(vec![]).unwrap_err(),
            MeasureError::NoSegments
        );
        assert_eq!(
            MorphologyAnalyzer::new(vec![4..=4]).unwrap_err(),
            MeasureError::ShortSegment { start: 4, end: 4 }
        );

        let trajectory = Trajectory::from_frames(vec![helix(20.0, 3.0)]).unwrap();
        let analyzer = MorphologyAnalyzer::new(vec![0..=10, 30..=36]).unwrap();
        assert_eq!(
            analyzer.analyze(&trajectory).unwrap_err(),
            MeasureError::SegmentOutOfRange {
                start: 30,
                end: 36,
                beads: 36
            }
        );
    }

    #[test]
    fn collapsed_frame_is_degenerate() {
        let beads = vec![Point3::new(1.0, 1.0, 1.0); 5];
        let trajectory = Trajectory::from_frames(vec![beads]).unwrap();
        let analyzer = MorphologyAnalyzer::new(vec![0..=4]).unwrap();
        assert_eq!(
            analyzer.analyze(&trajectory).unwrap_err(),
            MeasureError::DegenerateAxis(0)
        );
    }
}
