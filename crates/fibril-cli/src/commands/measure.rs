use crate::cli::MeasureArgs;
use crate::error::{CliError, Result};
use fibrilkit::core::io::trajectory::Trajectory;
use fibrilkit::workflows::measure::{FrameMorphology, MorphologyAnalyzer};
use std::io::Write;
use tracing::info;

pub fn run(args: MeasureArgs) -> Result<()> {
    info!("Loading trajectory from {:?}", &args.trajectory);
    let trajectory =
        Trajectory::read_from_path(&args.trajectory).map_err(|e| CliError::FileParsing {
            path: args.trajectory.clone(),
            source: e.into(),
        })?;
    info!(
        frames = trajectory.len(),
        beads = trajectory.num_beads(),
        "Trajectory loaded."
    );

    let analyzer = MorphologyAnalyzer::new(args.segments)?;
    let results = analyzer.analyze(&trajectory)?;
    write_table(&results, &mut std::io::stdout().lock())?;
    Ok(())
}

fn write_table(results: &[FrameMorphology], out: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>8} {:>12} {:>12} {:>12}",
        "frame", "radius", "pitch", "axial_step"
    )?;
    for r in results {
        writeln!(
            out,
            "{:>8} {:>12.4} {:>12.4} {:>12.4}",
            r.frame, r.radius, r.pitch, r.mean_axial_step
        )?;
    }
    Ok(())
}
