use crate::cli::BuildArgs;
use crate::config::{ANCHOR_SELECTIONS, AppConfig, CHAIN_SELECTIONS, build_config};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use fibrilkit::{
    core::io::{pdb::PdbFile, traits::StructureFile},
    core::models::object::MolecularObject,
    core::models::scene::Scene,
    engine::{error::EngineError, progress::ProgressReporter, unit::PeriodicUnit},
    workflows,
};
use std::path::Path;
use tracing::{debug, info};

pub fn run(args: BuildArgs) -> Result<()> {
    let app = build_config(&args)?;
    let handler = CliProgressHandler::new();
    execute(&app, &handler)
}

fn execute(app: &AppConfig, handler: &CliProgressHandler) -> Result<()> {
    info!("Loading template structure from {:?}", &app.input_path);
    let mut scene = load_template(app)?;

    let unit = PeriodicUnit::extract(&mut scene, CHAIN_SELECTIONS, ANCHOR_SELECTIONS)?;
    info!(
        b1 = unit.b1,
        b2 = unit.b2,
        d = unit.d,
        l = unit.l,
        "Extracted periodic unit."
    );

    let reporter = ProgressReporter::with_callback(handler.get_callback());
    println!("Building a {}...", app.spec.kind());
    let result =
        workflows::build::run(&mut scene, &unit, &app.spec, &app.core_config, &reporter)?;

    println!("{}", result.report);
    write_group(&scene, result.assembly.group_name(), &app.output_path)?;
    println!(
        "✓ {} copies written to: {}",
        result.assembly.len(),
        app.output_path.display()
    );

    if let Some(path) = &app.report_path {
        let toml = result
            .report
            .to_toml()
            .map_err(|e| CliError::Other(e.into()))?;
        std::fs::write(path, toml)?;
        info!("Dimension report written to {:?}", path);
    }
    Ok(())
}

fn load_template(app: &AppConfig) -> Result<Scene> {
    let atoms = PdbFile::read_from_path(&app.input_path).map_err(|e| CliError::FileParsing {
        path: app.input_path.clone(),
        source: e.into(),
    })?;
    let mut scene = Scene::new();
    scene
        .add_object(&app.unit.template_object, atoms)
        .map_err(EngineError::from)?;
    for (name, criteria) in app.unit.named() {
        let count = scene
            .select(name, &app.unit.template_object, criteria)
            .map_err(EngineError::from)?;
        debug!(selection = name, atoms = count, "Created selection.");
    }
    Ok(scene)
}

fn write_group(scene: &Scene, group: &str, path: &Path) -> Result<()> {
    let objects: Vec<&MolecularObject> = scene
        .group_members(group)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|name| scene.object(name))
        .collect();
    info!(group, objects = objects.len(), "Writing assembled fibril to {:?}", path);
    PdbFile::write_to_path(&objects, path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}
