use super::defaults::DefaultsConfig;
use super::file::{FileAnchorAtom, FileConfig, FileResidueRange, FileUnitConfig};
use super::models::{AppConfig, UnitSelections};
use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use fibrilkit::core::models::morphology::{
    Morphology, MorphologyParams, MorphologySpec, SheetAlignment,
};
use fibrilkit::core::models::scene::AtomSelection;
use fibrilkit::engine::config::{BuildConfigBuilder, Layering};
use std::str::FromStr;

/// Merges the config file, `-S` overrides and command-line flags, in increasing
/// order of precedence, into a validated build configuration.
pub fn build_config(args: &BuildArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let unit_file = file_config.unit.take().ok_or_else(|| {
        CliError::Config("`[unit]` section is required in the config file.".to_string())
    })?;
    let unit = merge_unit(unit_file, &defaults)?;

    let morph_file = file_config.morphology.take().unwrap_or_default();
    let kind = args.morphology.or(morph_file.kind).ok_or_else(|| {
        CliError::Config(
            "A morphology is required either as `morphology.type` or via --morphology."
                .to_string(),
        )
    })?;
    let params = MorphologyParams {
        tilt: args.tilt.or(morph_file.tilt),
        radius: args.radius.or(morph_file.radius),
        stacking: morph_file.stacking,
        stack_angle: args.stack_angle.or(morph_file.stack_angle),
        num_stack: args.num_stack.or(morph_file.num_stack),
    };
    let morphology =
        Morphology::from_params(kind, params).map_err(|e| CliError::Config(e.to_string()))?;
    let spec = MorphologySpec::new(
        morphology,
        args.num_half
            .or(morph_file.num_half)
            .unwrap_or(defaults.num_half),
        args.handedness
            .or(morph_file.handedness)
            .unwrap_or(defaults.handedness),
    )
    .map_err(|e| CliError::Config(e.to_string()))?;

    let sidechains = args.sidechain_flip.or(morph_file.sidechain_flip);
    let spec = match args.alignment.or(morph_file.alignment) {
        Some(strands) => {
            let mut alignment = SheetAlignment::new(strands, sidechains.unwrap_or_default());
            if let Some([first, last]) = morph_file.alignment_window {
                alignment = alignment.with_window(first, last);
            }
            spec.with_alignment(alignment)
                .map_err(|e| CliError::Config(e.to_string()))?
        }
        None if sidechains.is_some() || morph_file.alignment_window.is_some() => {
            return Err(CliError::Config(
                "`sidechain-flip` and `alignment-window` require `morphology.alignment`."
                    .to_string(),
            ));
        }
        None => spec,
    };

    let refine_file = file_config.refinement.take().unwrap_or_default();
    let mut builder = BuildConfigBuilder::new().seed(args.seed.or(refine_file.seed));
    if let Some(v) = args.dist_tolerance.or(refine_file.dist_tolerance) {
        builder = builder.dist_tolerance(v);
    }
    if let Some(v) = refine_file.probe_offset {
        builder = builder.probe_offset(v);
    }
    if let Some(v) = refine_file.twist_scan_step {
        builder = builder.twist_scan_step(v);
    }
    if let Some(v) = refine_file.twist_scan_steps {
        builder = builder.twist_scan_steps(v);
    }
    if let Some(v) = refine_file.max_steps {
        builder = builder.max_steps(v);
    }
    if let Some(v) = refine_file.tilt_step {
        builder = builder.tilt_step(v);
    }
    if let Some(v) = refine_file.radius_step {
        builder = builder.radius_step(v);
    }
    if let Some(v) = refine_file.tilt_offsets {
        builder = builder.tilt_offsets(v);
    }
    if let Some(v) = refine_file.layering {
        builder = builder.layering(v);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        input_path: args.input.clone(),
        output_path: args.output.clone(),
        report_path: args.report.clone(),
        unit,
        spec,
        core_config,
    })
}

fn merge_unit(file: FileUnitConfig, defaults: &DefaultsConfig) -> Result<UnitSelections> {
    let anchors: [FileAnchorAtom; 3] = file.anchors.try_into().map_err(|v: Vec<_>| {
        CliError::Config(format!(
            "`unit.anchors` must list exactly 3 atoms, found {}.",
            v.len()
        ))
    })?;
    let chains = [
        file.sheet1_peptide1,
        file.sheet1_peptide2,
        file.sheet2_peptide1,
        file.sheet2_peptide2,
    ];
    if let Some(bad) = chains.iter().find(|r| r.residues[1] < r.residues[0]) {
        return Err(CliError::Config(format!(
            "Residue range {}-{} of chain {} ends before it starts.",
            bad.residues[0], bad.residues[1], bad.chain
        )));
    }

    Ok(UnitSelections {
        template_object: defaults.template_object.to_string(),
        chains: chains.map(|r: FileResidueRange| {
            AtomSelection::new()
                .chain(r.chain)
                .residues(r.residues[0]..=r.residues[1])
        }),
        anchors: anchors.map(|a| {
            AtomSelection::new()
                .chain(a.chain)
                .residue(a.residue)
                .atom_name(a.atom.as_deref().unwrap_or(defaults.anchor_atom))
        }),
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) = parser::parse_key_value(kv_pair)?;

        if let Some(field) = key.strip_prefix("morphology.") {
            let morph = config.morphology.get_or_insert_with(Default::default);
            match field {
                "type" => morph.kind = Some(parse_value(key, value)?),
                "tilt" => morph.tilt = Some(parse_value(key, value)?),
                "radius" => morph.radius = Some(parse_value(key, value)?),
                "stack-angle" => morph.stack_angle = Some(parse_value(key, value)?),
                "num-stack" => morph.num_stack = Some(parse_value(key, value)?),
                "num-half" => morph.num_half = Some(parse_value(key, value)?),
                "handedness" => morph.handedness = Some(parse_value(key, value)?),
                "alignment" => morph.alignment = Some(parse_value(key, value)?),
                "sidechain-flip" => morph.sidechain_flip = Some(parse_value(key, value)?),
                _ => return Err(unsupported(key)),
            }
        } else if let Some(field) = key.strip_prefix("refinement.") {
            let refine = config.refinement.get_or_insert_with(Default::default);
            match field {
                "dist-tolerance" => refine.dist_tolerance = Some(parse_value(key, value)?),
                "probe-offset" => refine.probe_offset = Some(parse_value(key, value)?),
                "twist-scan-step" => refine.twist_scan_step = Some(parse_value(key, value)?),
                "twist-scan-steps" => refine.twist_scan_steps = Some(parse_value(key, value)?),
                "max-steps" => refine.max_steps = Some(parse_value(key, value)?),
                "tilt-step" => refine.tilt_step = Some(parse_value(key, value)?),
                "radius-step" => refine.radius_step = Some(parse_value(key, value)?),
                "seed" => refine.seed = Some(parse_value(key, value)?),
                "layering" => {
                    refine.layering = Some(match value.to_ascii_lowercase().as_str() {
                        "bilayer" => Layering::Bilayer,
                        "monolayer" => Layering::Monolayer,
                        _ => {
                            return Err(CliError::Config(format!(
                                "Invalid value for {}: {}",
                                key, value
                            )));
                        }
                    })
                }
                _ => return Err(unsupported(key)),
            }
        } else {
            return Err(unsupported(key));
        }
    }
    Ok(config)
}

fn unsupported(key: &str) -> CliError {
    CliError::Config(format!("Unsupported configuration key for --set: '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fibrilkit::core::models::morphology::{
        Handedness, MorphologyKind, SidechainFlip, StackingPattern,
    };
    use fibrilkit::engine::config::DEFAULT_MAX_STEPS;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    const UNIT: &str = r#"
        [unit]
        sheet1-peptide1 = { chain = "A", residues = [1, 5] }
        sheet1-peptide2 = { chain = "B", residues = [1, 5] }
        sheet2-peptide1 = { chain = "C", residues = [1, 5] }
        sheet2-peptide2 = { chain = "D", residues = [1, 5] }
        anchors = [
            { chain = "A", residue = 1 },
            { chain = "A", residue = 5 },
            { chain = "B", residue = 1, atom = "N" },
        ]
    "#;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("build.toml");
        fs::write(&path, format!("{UNIT}\n{body}")).unwrap();
        path
    }

    fn base_build_args(config: PathBuf) -> BuildArgs {
        BuildArgs {
            input: PathBuf::from("template.pdb"),
            output: PathBuf::from("fibril.pdb"),
            config,
            report: None,
            morphology: None,
            tilt: None,
            radius: None,
            stack_angle: None,
            num_stack: None,
            num_half: None,
            handedness: None,
            alignment: None,
            sidechain_flip: None,
            dist_tolerance: None,
            seed: None,
            set_values: vec![],
        }
    }

    #[test]
    fn file_values_merge_with_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [morphology]
            type = "a_rod"
            tilt = 20.0
            "#,
        );

        let app = build_config(&base_build_args(path)).expect("build ok");
        assert_eq!(app.spec.morphology, Morphology::Rod { tilt: 20.0 });
        assert_eq!(app.spec.num_half, 10);
        assert_eq!(app.spec.handedness, Handedness::Left);
        assert_eq!(app.core_config.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(app.core_config.seed, None);

        assert_eq!(
            app.unit.chains[1],
            AtomSelection::new().chain('B').residues(1..=5)
        );
        assert_eq!(
            app.unit.anchors[0],
            AtomSelection::new().chain('A').residue(1).atom_name("CA")
        );
        assert_eq!(app.unit.anchors[2].atom_name.as_deref(), Some("N"));
        assert_eq!(app.unit.template_object, "template");
    }

    #[test]
    fn full_file_is_read() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [morphology]
            type = "stacked-rod"
            tilt = 10.0
            stacking = [[1, 1], [0, 1]]
            num-half = 4
            handedness = "right"

            [refinement]
            dist-tolerance = 0.8
            max-steps = 12
            tilt-offsets = [1.0, -1.0]
            layering = "monolayer"
            seed = 42
            "#,
        );

        let app = build_config(&base_build_args(path)).expect("build ok");
        let stacking = StackingPattern::try_from(vec![vec![1, 1], vec![0, 1]]).unwrap();
        assert_eq!(
            app.spec.morphology,
            Morphology::StackedRod {
                tilt: 10.0,
                stacking
            }
        );
        assert_eq!(app.spec.num_half, 4);
        assert_eq!(app.spec.handedness, Handedness::Right);
        assert_eq!(app.core_config.dist_tolerance, 0.8);
        assert_eq!(app.core_config.max_steps, 12);
        assert_eq!(app.core_config.tilt_offsets, [1.0, -1.0]);
        assert_eq!(app.core_config.layering, Layering::Monolayer);
        assert_eq!(app.core_config.seed, Some(42));
    }

    #[test]
    fn cli_overrides_set_values_which_override_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [morphology]
            type = "ribbon"
            tilt = 20.0
            radius = 30.0
            num-half = 3

            [refinement]
            max-steps = 5
            "#,
        );

        let mut args = base_build_args(path);
        args.set_values = vec![
            "morphology.radius=40".to_string(),
            "morphology.tilt=15".to_string(),
            "refinement.max-steps=8".to_string(),
            "refinement.layering=monolayer".to_string(),
        ];
        args.tilt = Some(12.0);
        args.num_half = Some(6);
        args.seed = Some(3);

        let app = build_config(&args).expect("build ok");
        assert_eq!(
            app.spec.morphology,
            Morphology::Ribbon {
                tilt: 12.0,
                radius: 40.0
            }
        );
        assert_eq!(app.spec.num_half, 6);
        assert_eq!(app.core_config.max_steps, 8);
        assert_eq!(app.core_config.layering, Layering::Monolayer);
        assert_eq!(app.core_config.seed, Some(3));
    }

    #[test]
    fn morphology_flag_replaces_file_type() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[morphology]\ntype = \"rod\"\ntilt = 5.0\n");
        let mut args = base_build_args(path);
        args.morphology = Some(MorphologyKind::FlatSheet);

        let app = build_config(&args).expect("build ok");
        assert_eq!(app.spec.morphology, Morphology::FlatSheet);
    }

    #[test]
    fn sheet_alignment_merges_file_set_values_and_flags() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [morphology]
            type = "a_sheet"
            alignment = "aaa"
            alignment-window = [0, 3]
            "#,
        );
        let mut args = base_build_args(path);
        args.set_values = vec!["morphology.sidechain-flip=d".to_string()];
        let app = build_config(&args).expect("build ok");
        let alignment = app.spec.alignment.unwrap();
        assert_eq!(alignment.strands.to_string(), "aaa");
        assert_eq!(alignment.sidechains, SidechainFlip::Flipped);
        assert_eq!(alignment.window, Some([0, 3]));

        args.alignment = Some("pap".parse().unwrap());
        args.sidechain_flip = Some(SidechainFlip::Same);
        let alignment = build_config(&args).unwrap().spec.alignment.unwrap();
        assert_eq!(alignment.strands.to_string(), "pap");
        assert_eq!(alignment.sidechains, SidechainFlip::Same);
    }

    #[test]
    fn sheet_alignment_needs_a_flat_sheet_and_a_pattern() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[morphology]\ntype = \"rod\"\ntilt = 5.0\nalignment = \"ppp\"\n",
        );
        assert!(matches!(
            &build_config(&base_build_args(path)),
            Err(CliError::Config(msg)) if msg.contains("flat sheets only")
        ));

        let path = write_config(
            dir.path(),
            "[morphology]\ntype = \"a_sheet\"\nsidechain-flip = \"d\"\n",
        );
        assert!(matches!(
            &build_config(&base_build_args(path)),
            Err(CliError::Config(msg)) if msg.contains("require `morphology.alignment`")
        ));

        let path = write_config(
            dir.path(),
            "[morphology]\ntype = \"a_sheet\"\nalignment = \"pxp\"\n",
        );
        assert!(matches!(
            build_config(&base_build_args(path)),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn missing_morphology_parameters_are_config_errors() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[morphology]\ntype = \"ribbon\"\ntilt = 5.0\n");
        let result = build_config(&base_build_args(path));
        assert!(matches!(&result, Err(CliError::Config(msg)) if msg.contains("radius")));

        let path = write_config(dir.path(), "");
        let result = build_config(&base_build_args(path));
        assert!(matches!(&result, Err(CliError::Config(msg)) if msg.contains("morphology")));
    }

    #[test]
    fn invalid_unit_sections_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_unit.toml");
        fs::write(&path, "[morphology]\ntype = \"a_sheet\"\n").unwrap();
        let result = build_config(&base_build_args(path));
        assert!(matches!(&result, Err(CliError::Config(msg)) if msg.contains("[unit]")));

        let path = dir.path().join("two_anchors.toml");
        let unit = UNIT.replace("{ chain = \"A\", residue = 5 },", "");
        fs::write(&path, format!("{unit}\n[morphology]\ntype = \"a_sheet\"\n")).unwrap();
        let result = build_config(&base_build_args(path));
        assert!(matches!(&result, Err(CliError::Config(msg)) if msg.contains("exactly 3")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[refinement]\nmax-step = 3\n");
        assert!(matches!(
            build_config(&base_build_args(path)),
            Err(CliError::FileParsing { .. })
        ));

        let path = write_config(dir.path(), "[morphology]\ntype = \"a_sheet\"\n");
        let mut args = base_build_args(path);
        args.set_values = vec!["refinement.temperature=300".to_string()];
        assert!(matches!(
            &build_config(&args),
            Err(CliError::Config(msg)) if msg.contains("Unsupported")
        ));

        args.set_values = vec!["refinement.max-steps=many".to_string()];
        assert!(matches!(
            &build_config(&args),
            Err(CliError::Config(msg)) if msg.contains("Invalid value")
        ));
    }

    #[test]
    fn invalid_refinement_values_fail_validation() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[morphology]\ntype = \"a_sheet\"\n");
        let mut args = base_build_args(path);
        args.dist_tolerance = Some(-1.0);
        assert!(matches!(
            &build_config(&args),
            Err(CliError::Config(msg)) if msg.contains("dist_tolerance")
        ));
    }
}
