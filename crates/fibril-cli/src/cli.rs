use crate::utils::parser::parse_segment;
use clap::{Args, Parser, Subcommand};
use fibrilkit::core::models::morphology::{
    Handedness, MorphologyKind, SidechainFlip, StrandAlignment,
};
use std::ops::RangeInclusive;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "fibril - build amyloid fibril models (sheets, rods and ribbons) from a periodic beta-sheet unit and measure fibril trajectories.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refine and assemble a fibril of the requested morphology from a template structure.
    Build(BuildArgs),
    /// Fit the fibril axis, radius and pitch of every frame of a bead trajectory.
    Measure(MeasureArgs),
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    // --- Core Arguments ---
    /// Path to the template structure holding the periodic unit (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the assembled fibril (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the build configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Also write the dimension report as TOML to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    // --- Morphology Overrides ---
    /// Override the morphology (e.g. 'a_rod', 'stacked-ribbon').
    #[arg(short, long, value_name = "NAME")]
    pub morphology: Option<MorphologyKind>,

    /// Override the requested tilt angle, in degrees.
    #[arg(short, long, value_name = "DEGREES")]
    pub tilt: Option<f64>,

    /// Override the ribbon radius, in Angstroms.
    #[arg(short, long, value_name = "FLOAT")]
    pub radius: Option<f64>,

    /// Override the angle between neighbouring ribbon stacks, in degrees.
    #[arg(long, value_name = "DEGREES")]
    pub stack_angle: Option<f64>,

    /// Override the number of ribbon stacks.
    #[arg(long, value_name = "INT")]
    pub num_stack: Option<usize>,

    /// Override the number of peptide pairs placed along each strand.
    #[arg(short, long, value_name = "INT")]
    pub num_half: Option<usize>,

    /// Override the helical sense ('left' or 'right').
    #[arg(long, value_name = "SENSE")]
    pub handedness: Option<Handedness>,

    /// Build a flat sheet from the first peptide with these strand directions
    /// (three of 'a'/'p', e.g. 'pap').
    #[arg(long, value_name = "PATTERN")]
    pub alignment: Option<StrandAlignment>,

    /// Sidechain flip of the second sheet ('s' or 'd'), with --alignment.
    #[arg(long, value_name = "FLIP")]
    pub sidechain_flip: Option<SidechainFlip>,

    // --- Refinement Overrides ---
    /// Override the clash distance, in Angstroms.
    #[arg(short, long, value_name = "FLOAT")]
    pub dist_tolerance: Option<f64>,

    /// Seed the radius perturbation for reproducible builds.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S refinement.max-steps=60
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `measure` subcommand.
#[derive(Args, Debug, Clone)]
pub struct MeasureArgs {
    /// Path to the bead trajectory (CSV with a `frame,x,y,z` header).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub trajectory: PathBuf,

    /// Inclusive bead index range of one strand, e.g. '0-35'. Repeat for more strands.
    #[arg(short, long = "segment", required = true, value_name = "START-END", value_parser = parse_segment)]
    pub segments: Vec<RangeInclusive<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_arguments_parse_with_overrides() {
        let cli = Cli::parse_from([
            "fibril", "-vv", "build", "-i", "in.pdb", "-o", "out.pdb", "-c", "build.toml",
            "--morphology", "s_ribbon", "--tilt", "12.5", "--handedness", "right", "-S",
            "refinement.max-steps=5", "--alignment", "apa", "--sidechain-flip", "d",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Build(args) = cli.command else {
            panic!("expected build subcommand");
        };
        assert_eq!(args.morphology, Some(MorphologyKind::StackedRibbon));
        assert_eq!(args.tilt, Some(12.5));
        assert_eq!(args.handedness, Some(Handedness::Right));
        assert_eq!(args.set_values, vec!["refinement.max-steps=5"]);
        assert_eq!(args.alignment.unwrap().to_string(), "apa");
        assert_eq!(args.sidechain_flip, Some(SidechainFlip::Flipped));
    }

    #[test]
    fn measure_collects_repeated_segments() {
        let cli = Cli::parse_from([
            "fibril", "measure", "-t", "traj.csv", "--segment", "0-35", "-s", "36-71",
        ]);
        let Commands::Measure(args) = cli.command else {
            panic!("expected measure subcommand");
        };
        assert_eq!(args.segments, vec![0..=35, 36..=71]);
    }

    #[test]
    fn unknown_morphology_is_rejected() {
        let result = Cli::try_parse_from([
            "fibril", "build", "-i", "a", "-o", "b", "-c", "c", "--morphology", "helix",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["fibril", "-q", "-v", "measure", "-t", "x", "-s", "0-1"]);
        assert!(result.is_err());
    }
}
