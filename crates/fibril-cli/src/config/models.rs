use fibrilkit::core::models::morphology::MorphologySpec;
use fibrilkit::core::models::scene::AtomSelection;
use fibrilkit::engine::config::BuildConfig;
use std::path::PathBuf;

/// Selection names for the four unit chains, in unit order.
pub const CHAIN_SELECTIONS: [&str; 4] = ["p1", "p2", "p3", "p4"];
/// Selection names for the three frame anchors.
pub const ANCHOR_SELECTIONS: [&str; 3] = ["po1", "po2", "po3"];

/// Where the periodic unit sits in the template structure.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSelections {
    pub template_object: String,
    pub chains: [AtomSelection; 4],
    pub anchors: [AtomSelection; 3],
}

impl UnitSelections {
    /// `(selection name, criteria)` pairs for every chain and anchor.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, &AtomSelection)> {
        CHAIN_SELECTIONS
            .into_iter()
            .zip(&self.chains)
            .chain(ANCHOR_SELECTIONS.into_iter().zip(&self.anchors))
    }
}

pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub unit: UnitSelections,
    pub spec: MorphologySpec,
    pub core_config: BuildConfig,
}
