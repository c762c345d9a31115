use super::assembly::stacked_rod_offsets;
use super::config::BuildConfig;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::tasks::clash_probe::ClashProbe;
use super::tasks::edge_contact::{EdgeContact, classify_edge_contact};
use super::unit::PeriodicUnit;
use crate::core::models::morphology::{Handedness, Morphology, MorphologyKind};
use crate::core::store::StructureStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Helical parameters of a fibril. Angles are in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParameters {
    /// Tilt of each strand about `z`.
    pub tilt_z: f64,
    /// Twist between consecutive peptides about the fibril axis.
    pub twist_y: f64,
    /// Axial rise between consecutive peptides.
    pub rise_y: f64,
    /// Distance of the helix from the fibril axis.
    pub radius: f64,
}

impl GeometryParameters {
    /// Parameters of an untwisted sheet with peptide spacing `rise`.
    pub fn flat(rise: f64) -> Self {
        Self {
            tilt_z: 0.0,
            twist_y: 0.0,
            rise_y: rise,
            radius: 0.0,
        }
    }

    /// Closes a helix of `radius` through peptides `rise` apart tilted by
    /// `tilt_z`.
    ///
    /// The chord `rise·sin(tilt_z)` spans the twist on the circle of `radius`;
    /// the twist is NaN when no such angle exists.
    pub fn from_closure(rise: f64, tilt_z: f64, radius: f64) -> Self {
        let chord = rise * tilt_z.sin();
        let cosine = 1.0 - 0.5 * (chord / radius).powi(2);
        Self {
            tilt_z,
            twist_y: cosine.acos(),
            rise_y: rise * tilt_z.cos(),
            radius,
        }
    }

    pub fn has_valid_twist(&self) -> bool {
        self.twist_y.is_finite()
    }
}

impl fmt::Display for GeometryParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tilt {:.2}°, twist {:.3}°, rise {:.3} Å, radius {:.2} Å",
            self.tilt_z.to_degrees(),
            self.twist_y.to_degrees(),
            self.rise_y,
            self.radius
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Family {
    /// Radius is fixed; only the tilt is relaxed.
    Rod,
    /// Radius grows while the tilt is relaxed.
    Ribbon,
    /// Radius and tilt are steered by the edge contact between stacks.
    StackedRibbon { stack_angle: f64, num_stack: usize },
}

impl Family {
    fn radial_offset(self, radius: f64) -> f64 {
        match self {
            Family::Rod => 0.0,
            Family::Ribbon | Family::StackedRibbon { .. } => radius,
        }
    }
}

/// Searches for helical parameters that close the requested morphology without
/// clashes, within a bounded number of steps.
pub struct Refiner<'a> {
    unit: &'a PeriodicUnit,
    config: &'a BuildConfig,
    probe: ClashProbe<'a>,
    handedness_sign: f64,
    rng: StdRng,
}

impl<'a> Refiner<'a> {
    pub fn new(unit: &'a PeriodicUnit, config: &'a BuildConfig, handedness: Handedness) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            unit,
            config,
            probe: ClashProbe::new(config, handedness),
            handedness_sign: handedness.sign(),
            rng,
        }
    }

    /// Refines `morphology` against the clash oracle. Flat sheets need no
    /// search and return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Infeasible`] if no step is accepted within
    /// `max_steps`, or any store error raised by the probes.
    #[instrument(skip_all, name = "refinement", fields(morphology = %morphology.kind()))]
    pub fn refine<S: StructureStore + ?Sized>(
        &mut self,
        store: &mut S,
        morphology: &Morphology,
        reporter: &ProgressReporter,
    ) -> Result<GeometryParameters, EngineError> {
        let kind = morphology.kind();
        let half_width = self.unit.d.abs() / 2.0;
        let (family, radius) = match morphology {
            Morphology::FlatSheet | Morphology::StackedSheet { .. } => {
                return Ok(GeometryParameters::flat(self.unit.b));
            }
            Morphology::Rod { .. } => (Family::Rod, half_width),
            Morphology::StackedRod { tilt, stacking } => {
                let innermost = stacked_rod_offsets(self.unit, stacking, *tilt)
                    .iter()
                    .map(|offset| offset.x.hypot(offset.z))
                    .fold(f64::INFINITY, f64::min);
                (Family::Rod, innermost.max(half_width))
            }
            Morphology::Ribbon { radius, .. } => (Family::Ribbon, *radius),
            Morphology::StackedRibbon {
                radius,
                stack_angle,
                num_stack,
                ..
            } => (
                Family::StackedRibbon {
                    stack_angle: stack_angle.to_radians(),
                    num_stack: *num_stack,
                },
                *radius,
            ),
        };

        reporter.report(Progress::TaskStart {
            total_steps: self.config.max_steps as u64,
        });
        let result = self.search(
            store,
            kind,
            family,
            morphology.tilt().to_radians(),
            radius,
            reporter,
        );
        reporter.report(Progress::TaskFinish);
        result
    }

    fn search<S: StructureStore + ?Sized>(
        &mut self,
        store: &mut S,
        kind: MorphologyKind,
        family: Family,
        mut tilt: f64,
        mut radius: f64,
        reporter: &ProgressReporter,
    ) -> Result<GeometryParameters, EngineError> {
        let half_width = self.unit.d.abs() / 2.0;
        let radius_step = self.config.radius_step;
        let mut last = GeometryParameters::from_closure(self.unit.b, tilt, radius);

        for step in 0..self.config.max_steps {
            let params = GeometryParameters::from_closure(self.unit.b, tilt, radius);
            let clear = self.twist_is_clear(store, &params, family.radial_offset(radius))?;
            debug!(step, %params, clear, "Refinement step.");
            reporter.report(Progress::RefinementStep {
                step,
                tilt: params.tilt_z.to_degrees(),
                twist: params.twist_y.to_degrees(),
                radius,
            });
            last = params;

            match family {
                Family::Rod => {
                    if clear {
                        return Ok(self.accept(step, params));
                    }
                    tilt = self.relax_tilt(tilt);
                }
                Family::Ribbon => {
                    if clear {
                        return Ok(self.accept(step, params));
                    }
                    radius += radius_step;
                    tilt = self.relax_tilt(tilt);
                }
                Family::StackedRibbon {
                    stack_angle,
                    num_stack,
                } => {
                    let contact = if params.has_valid_twist() {
                        classify_edge_contact(
                            self.unit.l,
                            radius - half_width,
                            tilt,
                            params.twist_y,
                            params.rise_y,
                            stack_angle,
                            num_stack,
                        )
                    } else {
                        EdgeContact::TooClose
                    };
                    debug!(step, ?contact, "Edge contact classified.");

                    match (clear, contact) {
                        (true, EdgeContact::GoodDistance) => return Ok(self.accept(step, params)),
                        (false, EdgeContact::TooClose) => {
                            radius += radius_step;
                            tilt = self.relax_tilt(tilt);
                        }
                        (true, EdgeContact::TooFar) => {
                            radius = (radius - radius_step).max(half_width);
                            tilt += self.config.tilt_step;
                        }
                        _ => {
                            let nudge = self.rng.gen_range(-1..=1) as f64;
                            radius = (radius + nudge * radius_step).max(half_width);
                        }
                    }
                }
            }
        }

        warn!(steps = self.config.max_steps, %last, "Refinement did not converge.");
        Err(EngineError::Infeasible {
            morphology: kind,
            hint: kind.infeasible_hint(),
            steps: self.config.max_steps,
            last,
        })
    }

    fn twist_is_clear<S: StructureStore + ?Sized>(
        &self,
        store: &mut S,
        params: &GeometryParameters,
        radial_offset: f64,
    ) -> Result<bool, EngineError> {
        if !params.has_valid_twist() {
            return Ok(false);
        }
        let signs = self.unit.tilt_signs(radial_offset, self.handedness_sign);
        let envelope = self.probe.max_twist(
            store,
            self.unit,
            params.tilt_z.to_degrees(),
            signs,
            radial_offset,
        )?;
        Ok(params.twist_y < envelope.to_radians())
    }

    /// Lowers the tilt by one step unless that would cross zero.
    fn relax_tilt(&self, tilt: f64) -> f64 {
        if tilt > self.config.tilt_step {
            tilt - self.config.tilt_step
        } else {
            tilt
        }
    }

    fn accept(&self, step: usize, params: GeometryParameters) -> GeometryParameters {
        info!(step, %params, "Refinement converged.");
        params
    }
}
