use crate::core::models::morphology::{
    Handedness, Morphology, MorphologySpec, SheetAlignment, StackingPattern,
};
use crate::core::store::StructureStore;
use crate::core::utils::geometry::BoundingBox;
use crate::engine::assembly::{AssembledFibril, Assembler, stacked_rod_offsets};
use crate::engine::config::BuildConfig;
use crate::engine::dimension::DimensionReport;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::refine::{GeometryParameters, Refiner};
use crate::engine::unit::PeriodicUnit;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub params: GeometryParameters,
    pub assembly: AssembledFibril,
    pub report: DimensionReport,
    pub bounding_box: Option<BoundingBox>,
}

/// The unit, settings and progress sink shared by the `build_a_*` helpers.
pub struct BuildContext<'a> {
    pub unit: &'a PeriodicUnit,
    pub config: &'a BuildConfig,
    pub reporter: &'a ProgressReporter<'a>,
}

/// Refines, assembles and realizes `spec` in `store`.
///
/// On an infeasible refinement nothing is added to the store and the error
/// carries the hint for the user.
#[instrument(skip_all, name = "build_workflow", fields(morphology = %spec.kind()))]
pub fn run<S: StructureStore + ?Sized>(
    store: &mut S,
    unit: &PeriodicUnit,
    spec: &MorphologySpec,
    config: &BuildConfig,
    reporter: &ProgressReporter,
) -> Result<BuildResult, EngineError> {
    // === Phase 1: Refinement ===
    reporter.report(Progress::PhaseStart { name: "Refinement" });
    info!(
        num_half = spec.num_half,
        handedness = %spec.handedness,
        "Refining helical parameters."
    );
    let refined =
        Refiner::new(unit, config, spec.handedness).refine(store, &spec.morphology, reporter);
    reporter.report(Progress::PhaseFinish);
    let params = refined?;

    // === Phase 2: Assembly ===
    reporter.report(Progress::PhaseStart { name: "Assembly" });
    let assembly = Assembler::plan(unit, spec, &params, config)?;
    let bounding_box = assembly.realize(store)?;
    reporter.report(Progress::PhaseFinish);

    let report = dimension_report(unit, spec, &params).with_bounding_box(bounding_box.as_ref());
    info!(copies = assembly.len(), group = assembly.group_name(), "Build complete.");
    Ok(BuildResult {
        params,
        assembly,
        report,
        bounding_box,
    })
}

fn dimension_report(
    unit: &PeriodicUnit,
    spec: &MorphologySpec,
    params: &GeometryParameters,
) -> DimensionReport {
    match &spec.morphology {
        Morphology::FlatSheet | Morphology::StackedSheet { .. } => DimensionReport::flat(unit.b),
        Morphology::StackedRod { tilt, stacking } => {
            let outermost = stacked_rod_offsets(unit, stacking, *tilt)
                .iter()
                .map(|offset| offset.x.hypot(offset.z))
                .fold(unit.d.abs() / 2.0, f64::max);
            DimensionReport::from_geometry(params).with_radius(outermost)
        }
        _ => DimensionReport::from_geometry(params),
    }
}

fn run_with<S: StructureStore + ?Sized>(
    store: &mut S,
    context: &BuildContext,
    morphology: Morphology,
    num_half: usize,
    handedness: Handedness,
) -> Result<BuildResult, EngineError> {
    let spec = MorphologySpec::new(morphology, num_half, handedness)?;
    run(store, context.unit, &spec, context.config, context.reporter)
}

pub fn build_a_flat_sheet<S: StructureStore + ?Sized>(
    store: &mut S,
    context: &BuildContext,
    num_half: usize,
) -> Result<BuildResult, EngineError> {
    run_with(store, context, Morphology::FlatSheet, num_half, Handedness::default())
}

/// Flat sheet made of copies of the first peptide, flipped per `alignment`.
pub fn build_a_plain_sheet<S: StructureStore + ?Sized>(
    store: &mut S,
    context: &BuildContext,
    alignment: SheetAlignment,
    num_half: usize,
) -> Result<BuildResult, EngineError> {
    let spec = MorphologySpec::new(Morphology::FlatSheet, num_half, Handedness::default())?
        .with_alignment(alignment)?;
    run(store, context.unit, &spec, context.config, context.reporter)
}

pub fn build_a_stacked_sheet<S: StructureStore + ?Sized>(
    store: &mut S,
    context: &BuildContext,
    stacking: StackingPattern,
    num_half: usize,
) -> Result<BuildResult, EngineError> {
    let morphology = Morphology::StackedSheet { stacking };
    run_with(store, context, morphology, num_half, Handedness::default())
}

/// Two-sheet rod around the unit's own axis; `tilt` is in degrees.
pub fn build_a_rod<S: StructureStore + ?Sized>(
    store: &mut S,
    context: &BuildContext,
    tilt: f64,
    num_half: usize,
    handedness: Handedness,
) -> Result<BuildResult, EngineError> {
    run_with(store, context, Morphology::Rod { tilt }, num_half, handedness)
}

pub fn build_a_stacked_rod<S: StructureStore + ?Sized>(
    store: &mut S,
    context: &BuildContext,
    tilt: f64,
    stacking: StackingPattern,
    num_half: usize,
    handedness: Handedness,
) -> Result<BuildResult, EngineError> {
    let morphology = Morphology::StackedRod { tilt, stacking };
    run_with(store, context, morphology, num_half, handedness)
}

/// Ribbon wound at `radius` Å from the axis; `tilt` is in degrees.
pub fn build_a_ribbon<S: StructureStore + ?Sized>(
    store: &mut S,
    context: &BuildContext,
    tilt: f64,
    radius: f64,
    num_half: usize,
    handedness: Handedness,
) -> Result<BuildResult, EngineError> {
    run_with(store, context, Morphology::Ribbon { tilt, radius }, num_half, handedness)
}

/// `num_stack` ribbons spaced `stack_angle` degrees apart about the axis.
#[allow(clippy::too_many_arguments)]
pub fn build_a_stacked_ribbon<S: StructureStore + ?Sized>(
    store: &mut S,
    context: &BuildContext,
    tilt: f64,
    radius: f64,
    stack_angle: f64,
    num_stack: usize,
    num_half: usize,
    handedness: Handedness,
) -> Result<BuildResult, EngineError> {
    let morphology = Morphology::StackedRibbon {
        tilt,
        radius,
        stack_angle,
        num_stack,
    };
    run_with(store, context, morphology, num_half, handedness)
}
