use crate::core::models::morphology::Handedness;
use crate::core::store::StructureStore;
use crate::engine::config::BuildConfig;
use crate::engine::error::EngineError;
use crate::engine::placement::HelicalPose;
use crate::engine::unit::{Peptide, PeriodicUnit, Sheet, UnitChain};
use nalgebra::Vector3;
use tracing::{debug, instrument, trace};

const PROBE_PREFIX: &str = "probe";

/// Copies placed per sheet: peptide and helical index.
const PROBE_SLOTS: [(Peptide, usize); 3] =
    [(Peptide::One, 0), (Peptide::Two, 1), (Peptide::One, 2)];

/// Tests candidate helical parameters by placing throw-away copies of the unit
/// far along the axis and looking for atoms closer than the clash tolerance.
#[derive(Debug, Clone, Copy)]
pub struct ClashProbe<'a> {
    config: &'a BuildConfig,
    twist_sign: f64,
}

impl<'a> ClashProbe<'a> {
    pub fn new(config: &'a BuildConfig, handedness: Handedness) -> Self {
        Self {
            config,
            twist_sign: -handedness.sign(),
        }
    }

    /// Returns `true` if three consecutive copies of every placed sheet, posed
    /// with `tilt` and `twist` (degrees), are free of clashes.
    ///
    /// `signs` are the per-sheet tilt signs and `radial_offset` the distance of
    /// the unit center from the helical axis. The store holds no probe objects
    /// when this returns, whatever the outcome.
    pub fn is_clear<S: StructureStore + ?Sized>(
        &self,
        store: &mut S,
        unit: &PeriodicUnit,
        tilt: f64,
        twist: f64,
        signs: [f64; 2],
        radial_offset: f64,
    ) -> Result<bool, EngineError> {
        with_probes(store, |store, created| {
            for &sheet in self.sheets() {
                let slot = sheet.index();
                let sheet_tilt = signs[slot] * (tilt + self.config.tilt_offsets[slot]);
                for (peptide, index) in PROBE_SLOTS {
                    let chain = UnitChain::new(sheet, peptide);
                    let name = format!("{PROBE_PREFIX}_{chain}_{index}");
                    store.create_copy(&name, unit.chain_name(chain))?;
                    created.push(name.clone());

                    let pose = HelicalPose {
                        offset: Vector3::new(0.0, 0.0, radial_offset),
                        tilt: sheet_tilt,
                        twist: self.twist_sign * twist * index as f64,
                        rise: unit.sheet_rise(sheet) * index as f64 + self.config.probe_offset,
                    };
                    store.transform(&name, &pose.isometry(&unit.ca_centroid(chain)))?;
                }
            }

            for name in created.iter() {
                if let Some(contacts) = store.neighbors_within(name, self.config.dist_tolerance) {
                    trace!(probe = %name, contacts = contacts.len(), twist, "Probe clashes.");
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Scans twist angles `0, step, 2·step, ...` and returns the last clash-free
    /// angle before the first clash, in degrees. Zero if the untwisted pose
    /// already clashes.
    #[instrument(skip_all, name = "twist_envelope", fields(tilt = tilt))]
    pub fn max_twist<S: StructureStore + ?Sized>(
        &self,
        store: &mut S,
        unit: &PeriodicUnit,
        tilt: f64,
        signs: [f64; 2],
        radial_offset: f64,
    ) -> Result<f64, EngineError> {
        let mut envelope = 0.0;
        for i in 0..self.config.twist_scan_steps {
            let twist = i as f64 * self.config.twist_scan_step;
            if !self.is_clear(store, unit, tilt, twist, signs, radial_offset)? {
                break;
            }
            envelope = twist;
        }
        debug!(envelope, "Twist envelope scanned.");
        Ok(envelope)
    }

    fn sheets(&self) -> &'static [Sheet] {
        &Sheet::BOTH[..self.config.layering.sheet_count()]
    }
}

/// Runs `action` and then deletes every object name it pushed onto the list,
/// on success and on error alike.
pub(crate) fn with_probes<S, T, F>(store: &mut S, action: F) -> Result<T, EngineError>
where
    S: StructureStore + ?Sized,
    F: FnOnce(&mut S, &mut Vec<String>) -> Result<T, EngineError>,
{
    let mut created = Vec::new();
    let result = action(store, &mut created);
    for name in &created {
        store.delete(name);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::scene::Scene;
    use crate::core::store::{AtomFilter, StoreError};
    use crate::engine::config::{BuildConfigBuilder, Layering};
    use crate::engine::testing::{self, FixtureGeometry};
    use nalgebra::Point3;

    fn setup() -> (Scene, PeriodicUnit, BuildConfig) {
        let (scene, unit) = testing::extracted_unit(&FixtureGeometry::default());
        (scene, unit, BuildConfig::default())
    }

    fn probe_names(scene: &Scene) -> Vec<String> {
        scene
            .object_names()
            .into_iter()
            .filter(|n| n.starts_with(PROBE_PREFIX))
            .collect()
    }

    #[test]
    fn isolated_unit_is_clear_and_leaves_no_probes() {
        let (mut scene, unit, config) = setup();
        let probe = ClashProbe::new(&config, Handedness::Left);
        let before = scene.object_names();

        let signs = unit.tilt_signs(0.0, 1.0);
        assert!(probe.is_clear(&mut scene, &unit, 10.0, 2.0, signs, 0.0).unwrap());
        assert_eq!(scene.object_names(), before);
        assert!(probe_names(&scene).is_empty());
    }

    #[test]
    fn obstacle_at_probe_height_blocks_every_twist() {
        let (mut scene, unit, config) = setup();
        let target = Point3::new(0.0, config.probe_offset, -unit.d / 2.0);
        scene
            .add_object("obstacle", vec![Atom::new("CA", 1, target)])
            .unwrap();

        let probe = ClashProbe::new(&config, Handedness::Left);
        let signs = unit.tilt_signs(0.0, 1.0);
        assert!(!probe.is_clear(&mut scene, &unit, 0.0, 0.0, signs, 0.0).unwrap());
        assert_eq!(probe.max_twist(&mut scene, &unit, 0.0, signs, 0.0).unwrap(), 0.0);
        assert!(probe_names(&scene).is_empty());
    }

    #[test]
    fn repeated_clashing_probe_gives_the_same_verdict_and_leaves_the_scene_intact() {
        let (mut scene, unit, config) = setup();
        let target = Point3::new(0.0, config.probe_offset, -unit.d / 2.0);
        scene
            .add_object("obstacle", vec![Atom::new("CA", 1, target)])
            .unwrap();
        let names = scene.object_names();
        let coords = scene.coordinates("*", AtomFilter::All).unwrap();

        let probe = ClashProbe::new(&config, Handedness::Left);
        let signs = unit.tilt_signs(0.0, 1.0);
        let first = probe.is_clear(&mut scene, &unit, 5.0, 1.2, signs, 0.0).unwrap();
        let second = probe.is_clear(&mut scene, &unit, 5.0, 1.2, signs, 0.0).unwrap();
        assert!(!first);
        assert_eq!(first, second);
        assert_eq!(scene.object_names(), names);
        assert_eq!(scene.coordinates("*", AtomFilter::All).unwrap(), coords);
    }

    #[test]
    fn unobstructed_envelope_reaches_the_last_scanned_angle() {
        let (mut scene, unit, config) = setup();
        let probe = ClashProbe::new(&config, Handedness::Right);
        let signs = unit.tilt_signs(0.0, -1.0);
        let envelope = probe.max_twist(&mut scene, &unit, 20.0, signs, 0.0).unwrap();
        let last = (config.twist_scan_steps - 1) as f64 * config.twist_scan_step;
        assert!((envelope - last).abs() < 1e-9);
    }

    #[test]
    fn envelope_stops_at_the_first_clashing_angle() {
        let (mut scene, unit, config) = setup();
        let chain = UnitChain::new(Sheet::One, Peptide::Two);

        // Park an obstacle where the far end of the index-1 probe lands at 8°.
        let far_end = scene
            .coordinates(unit.chain_name(chain), AtomFilter::All)
            .unwrap()
            .into_iter()
            .max_by(|a, b| a.x.total_cmp(&b.x))
            .unwrap();
        let pose = HelicalPose {
            offset: Vector3::zeros(),
            tilt: 0.0,
            twist: -8.0,
            rise: unit.b1 + config.probe_offset,
        };
        let target = pose.isometry(&unit.ca_centroid(chain)) * far_end;
        scene
            .add_object("obstacle", vec![Atom::new("CA", 1, target)])
            .unwrap();

        let probe = ClashProbe::new(&config, Handedness::Left);
        let signs = [0.0, 0.0];
        let envelope = probe.max_twist(&mut scene, &unit, 0.0, signs, 0.0).unwrap();
        assert!(envelope > 0.0 && envelope < 8.0);
        assert!(probe.is_clear(&mut scene, &unit, 0.0, envelope, signs, 0.0).unwrap());
        let next = envelope + config.twist_scan_step;
        assert!(!probe.is_clear(&mut scene, &unit, 0.0, next, signs, 0.0).unwrap());
        assert!(probe_names(&scene).is_empty());
    }

    #[test]
    fn monolayer_probes_only_the_first_sheet() {
        let (mut scene, unit, _) = setup();
        let config = BuildConfigBuilder::new()
            .layering(Layering::Monolayer)
            .build()
            .unwrap();
        // Would hit a sheet 2 probe but not a sheet 1 probe.
        let target = Point3::new(0.0, config.probe_offset, unit.d / 2.0);
        scene
            .add_object("obstacle", vec![Atom::new("CA", 1, target)])
            .unwrap();

        let probe = ClashProbe::new(&config, Handedness::Left);
        assert!(probe.is_clear(&mut scene, &unit, 0.0, 0.0, [0.0, 0.0], 0.0).unwrap());

        let bilayer = BuildConfig::default();
        let probe = ClashProbe::new(&bilayer, Handedness::Left);
        assert!(!probe.is_clear(&mut scene, &unit, 0.0, 0.0, [0.0, 0.0], 0.0).unwrap());
    }

    #[test]
    fn store_failure_mid_probe_still_removes_created_probes() {
        let (mut scene, unit, config) = setup();
        scene
            .add_object("probe_s2_pep1_0", vec![Atom::new("CA", 1, Point3::origin())])
            .unwrap();

        let probe = ClashProbe::new(&config, Handedness::Left);
        let err = probe
            .is_clear(&mut scene, &unit, 0.0, 0.0, [0.0, 0.0], 0.0)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Store(StoreError::DuplicateName(ref n)) if n == "probe_s2_pep1_0"
        ));
        assert_eq!(probe_names(&scene), vec!["probe_s2_pep1_0".to_string()]);
    }

    #[test]
    fn with_probes_cleans_up_after_an_error() {
        let (mut scene, unit, _) = setup();
        let result: Result<(), EngineError> = with_probes(&mut scene, |store, created| {
            store.create_copy("probe_a", unit.chain_name(UnitChain::ALL[0]))?;
            created.push("probe_a".to_string());
            Err(EngineError::Internal("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(scene.object("probe_a").is_none());
    }
}
