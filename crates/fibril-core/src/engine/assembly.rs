use super::config::BuildConfig;
use super::error::EngineError;
use super::placement::{HelicalPose, StrandFlip, sheet_isometry};
use super::refine::GeometryParameters;
use super::unit::{Peptide, PeriodicUnit, Sheet, UnitChain};
use crate::core::models::morphology::{
    Morphology, MorphologyKind, MorphologySpec, SheetAlignment, StackingPattern,
};
use crate::core::store::{AtomFilter, StoreError, StructureStore};
use crate::core::utils::geometry::BoundingBox;
use nalgebra::{Isometry3, Vector3};
use tracing::{info, instrument};

/// One copy of a unit chain in the assembled fibril.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: String,
    /// Store name of the template object the copy is made from.
    pub source: String,
    pub chain: UnitChain,
    /// Peptide-pair repeat along the strand.
    pub repeat: usize,
    /// Ordinal of the stack position, for stacked morphologies.
    pub stack: Option<usize>,
    /// Helical index, `2·repeat` for peptide 1 and `2·repeat + 1` for peptide 2.
    pub index: usize,
    pub isometry: Isometry3<f64>,
}

/// A planned fibril: every copy with its name and rigid transform.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFibril {
    kind: MorphologyKind,
    placements: Vec<Placement>,
}

impl AssembledFibril {
    pub fn kind(&self) -> MorphologyKind {
        self.kind
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Name of the group holding every copy once realized.
    pub fn group_name(&self) -> &'static str {
        self.kind.group_name()
    }

    /// Space-separated names of the copies of `sheet`.
    fn sheet_pattern(&self, sheet: Sheet) -> String {
        self.placements
            .iter()
            .filter(|p| p.chain.sheet == sheet)
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Creates every planned copy in `store`, colors sheets 1 and 2 and groups
    /// the copies. Returns the bounding box of the group.
    ///
    /// If any copy or the group fails, the copies created so far are removed
    /// again.
    #[instrument(skip_all, name = "fibril_realization", fields(copies = self.len()))]
    pub fn realize<S: StructureStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<Option<BoundingBox>, EngineError> {
        let mut created: Vec<&str> = Vec::with_capacity(self.placements.len());
        let result = (|| -> Result<(), StoreError> {
            for placement in &self.placements {
                store.create_copy(&placement.name, &placement.source)?;
                created.push(&placement.name);
                store.transform(&placement.name, &placement.isometry)?;
            }
            for sheet in Sheet::BOTH {
                let pattern = self.sheet_pattern(sheet);
                if !pattern.is_empty() {
                    store.color(sheet.color(), &pattern);
                }
            }
            if created.is_empty() {
                return Ok(());
            }
            store.group(self.group_name(), &created.join(" "))
        })();
        if let Err(err) = result {
            for name in created {
                store.delete(name);
            }
            return Err(err.into());
        }

        let bounding_box = store
            .coordinates(self.group_name(), AtomFilter::All)
            .and_then(|coords| BoundingBox::from_points(&coords));
        info!(
            group = self.group_name(),
            copies = self.len(),
            "Fibril realized."
        );
        Ok(bounding_box)
    }
}

/// A stack position: ordinal, offset of the unit center and extra twist in
/// degrees.
#[derive(Debug, Clone, Copy)]
struct StackSlot {
    ordinal: Option<usize>,
    offset: Vector3<f64>,
    twist: f64,
}

impl StackSlot {
    /// The single, unnumbered position of an unstacked morphology.
    fn single(radial: f64) -> Self {
        Self {
            ordinal: None,
            offset: Vector3::new(0.0, 0.0, radial),
            twist: 0.0,
        }
    }
}

/// Offsets of the occupied cells of `stacking`, row-major.
///
/// Rows stack along `z` from `+z` down and columns along `x`, both centered on
/// the middle of the grid.
pub fn stack_offsets(
    stacking: &StackingPattern,
    spacing_x: f64,
    spacing_z: f64,
) -> Vec<Vector3<f64>> {
    let (center_z, center_x) = stacking.center();
    stacking
        .occupied()
        .map(|(row, column)| {
            Vector3::new(
                (column as f64 - center_x) * spacing_x,
                0.0,
                (center_z - row as f64) * spacing_z,
            )
        })
        .collect()
}

/// Stack offsets of a stacked rod requested at `tilt` degrees. Tilted strands
/// need `box_l·cos(tilt) + b·sin(tilt)` of room along `x`.
pub fn stacked_rod_offsets(
    unit: &PeriodicUnit,
    stacking: &StackingPattern,
    tilt: f64,
) -> Vec<Vector3<f64>> {
    let tilt = tilt.to_radians();
    let spacing_x = unit.box_l * tilt.cos() + unit.b * tilt.sin();
    stack_offsets(stacking, spacing_x, unit.box_w)
}

/// A flat sheet whose copies are all made from the first peptide and flipped
/// into place.
#[derive(Debug, Clone)]
struct AlignedSheet<'a> {
    source: &'a str,
    /// Flip of each chain, indexed like [`UnitChain::ALL`].
    flips: [Isometry3<f64>; 4],
}

impl<'a> AlignedSheet<'a> {
    fn new(unit: &'a PeriodicUnit, alignment: &SheetAlignment) -> Result<Self, EngineError> {
        let base = UnitChain::ALL[0];
        let trace = unit.ca_trace(base);
        let [first, last] = alignment
            .window
            .unwrap_or([0, trace.len().saturating_sub(1)]);
        if first >= last || last >= trace.len() {
            return Err(EngineError::AlignmentWindow {
                first,
                last,
                residues: trace.len(),
            });
        }
        let window = &trace[first..=last];
        let backbone = alignment.strands.backbone_flips();
        let flips = UnitChain::ALL.map(|chain| {
            let sidechain = match chain.sheet {
                Sheet::One => (0.0, 0.0),
                Sheet::Two => alignment.sidechains.angles(),
            };
            StrandFlip {
                backbone: backbone[chain.slot()],
                sidechain,
            }
            .isometry(window)
        });
        Ok(Self {
            source: unit.chain_name(base),
            flips,
        })
    }

    /// Sheet 2 sits `d` above sheet 1 and helical index `i` is `i` rises up `y`.
    fn isometry(
        &self,
        unit: &PeriodicUnit,
        chain: UnitChain,
        index: usize,
        offset: Vector3<f64>,
    ) -> Isometry3<f64> {
        let z = match chain.sheet {
            Sheet::One => 0.0,
            Sheet::Two => unit.d,
        };
        let rise = unit.sheet_rise(chain.sheet) * index as f64;
        sheet_isometry(offset + Vector3::new(0.0, rise, z)) * self.flips[chain.slot()]
    }
}

/// Turns refined parameters into concrete placements.
pub struct Assembler;

impl Assembler {
    /// Plans every copy of the fibril described by `spec` with `params`.
    ///
    /// Pure: nothing is written to any store. Fails only when the alignment
    /// window of a single-peptide sheet does not fit the peptide.
    pub fn plan(
        unit: &PeriodicUnit,
        spec: &MorphologySpec,
        params: &GeometryParameters,
        config: &BuildConfig,
    ) -> Result<AssembledFibril, EngineError> {
        let kind = spec.kind();
        let aligned = spec
            .alignment
            .as_ref()
            .map(|alignment| AlignedSheet::new(unit, alignment))
            .transpose()?;
        let handedness_sign = spec.handedness.sign();
        let sheets = &Sheet::BOTH[..config.layering.sheet_count()];
        let prefix = kind.object_prefix();

        let slots: Vec<StackSlot> = match &spec.morphology {
            Morphology::FlatSheet | Morphology::Rod { .. } => vec![StackSlot::single(0.0)],
            Morphology::Ribbon { .. } => vec![StackSlot::single(params.radius)],
            Morphology::StackedSheet { stacking } => {
                ordinal_slots(stack_offsets(stacking, unit.box_l, unit.box_w))
            }
            Morphology::StackedRod { tilt, stacking } => {
                ordinal_slots(stacked_rod_offsets(unit, stacking, *tilt))
            }
            Morphology::StackedRibbon {
                stack_angle,
                num_stack,
                ..
            } => (0..*num_stack)
                .map(|j| StackSlot {
                    ordinal: Some(j),
                    offset: Vector3::new(0.0, 0.0, params.radius),
                    twist: stack_angle * j as f64,
                })
                .collect(),
        };

        let mut placements = Vec::new();
        for slot in &slots {
            for &sheet in sheets {
                let tilt_sign = unit.tilt_sign(sheet, slot.offset.z, handedness_sign);
                let sheet_tilt = params.tilt_z.to_degrees() + config.tilt_offsets[sheet.index()];
                let tilt = tilt_sign * sheet_tilt;
                for repeat in 0..spec.num_half {
                    for peptide in [Peptide::One, Peptide::Two] {
                        let chain = UnitChain::new(sheet, peptide);
                        let index = 2 * repeat + peptide.number() - 1;
                        let isometry = if kind.is_twisted() {
                            let twist = params.twist_y.to_degrees() * index as f64;
                            HelicalPose {
                                offset: slot.offset,
                                tilt,
                                twist: -handedness_sign * twist - slot.twist,
                                rise: params.rise_y * index as f64,
                            }
                            .isometry(&unit.ca_centroid(chain))
                        } else if let Some(aligned) = &aligned {
                            aligned.isometry(unit, chain, index, slot.offset)
                        } else {
                            let rise = unit.sheet_rise(sheet) * (2 * repeat) as f64;
                            sheet_isometry(slot.offset + Vector3::new(0.0, rise, 0.0))
                        };
                        let source = match &aligned {
                            Some(aligned) => aligned.source,
                            None => unit.chain_name(chain),
                        };
                        let name = match slot.ordinal {
                            Some(stack) => format!("{prefix}_{chain}_{repeat}_{stack}"),
                            None => format!("{prefix}_{chain}_{repeat}"),
                        };
                        placements.push(Placement {
                            name,
                            source: source.to_string(),
                            chain,
                            repeat,
                            stack: slot.ordinal,
                            index,
                            isometry,
                        });
                    }
                }
            }
        }

        Ok(AssembledFibril { kind, placements })
    }
}

fn ordinal_slots(offsets: Vec<Vector3<f64>>) -> Vec<StackSlot> {
    offsets
        .into_iter()
        .enumerate()
        .map(|(ordinal, offset)| StackSlot {
            ordinal: Some(ordinal),
            offset,
            twist: 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::morphology::{Handedness, SidechainFlip};
    use crate::core::models::scene::Scene;
    use crate::core::utils::geometry::centroid;
    use crate::engine::config::{BuildConfigBuilder, Layering};
    use crate::engine::testing::{self, FixtureGeometry};
    use nalgebra::Point3;

    const EPS: f64 = 1e-6;

    fn spec(morphology: Morphology, num_half: usize) -> MorphologySpec {
        MorphologySpec::new(morphology, num_half, Handedness::Left).unwrap()
    }

    fn placed_ca_centroid(scene: &Scene, name: &str) -> Point3<f64> {
        centroid(&scene.coordinates(name, AtomFilter::CAlpha).unwrap()).unwrap()
    }

    #[test]
    fn flat_sheet_is_translated_by_twice_the_rise() {
        let (mut scene, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let fibril = Assembler::plan(
            &unit,
            &spec(Morphology::FlatSheet, 3),
            &GeometryParameters::flat(unit.b),
            &BuildConfig::default(),
        )
        .unwrap();
        assert_eq!(fibril.len(), 3 * 4);
        assert_eq!(fibril.placements()[0].name, "p_s1_pep1_0");

        let bbox = fibril.realize(&mut scene).unwrap().unwrap();
        for repeat in 0..3 {
            for chain in UnitChain::ALL {
                let name = format!("p_{chain}_{repeat}");
                let moved = placed_ca_centroid(&scene, &name);
                let expected = unit.ca_centroid(chain)
                    + Vector3::new(0.0, unit.sheet_rise(chain.sheet) * 2.0 * repeat as f64, 0.0);
                assert!((moved - expected).norm() < EPS, "{name}");
            }
        }
        assert_eq!(scene.color_of("p_s1_pep2_1"), Some("green"));
        assert_eq!(scene.color_of("p_s2_pep1_2"), Some("orange"));
        assert_eq!(scene.group_members("plain_sheet").unwrap().len(), 12);
        assert!((bbox.extent().y - (unit.b * 5.0)).abs() < EPS);
    }

    fn aligned_sheet(pattern: &str, flip: SidechainFlip, num_half: usize) -> MorphologySpec {
        spec(Morphology::FlatSheet, num_half)
            .with_alignment(SheetAlignment::new(pattern.parse().unwrap(), flip))
            .unwrap()
    }

    /// Asserts that the Cα atoms of `name` are those of `source` shifted by
    /// `shift`, in reverse residue order when `reversed`.
    fn assert_ca_trace(
        scene: &Scene,
        name: &str,
        source: &[Point3<f64>],
        reversed: bool,
        shift: Vector3<f64>,
    ) {
        let placed = scene.coordinates(name, AtomFilter::CAlpha).unwrap();
        assert_eq!(placed.len(), source.len(), "{name}");
        for (k, p) in placed.iter().enumerate() {
            let j = if reversed { source.len() - 1 - k } else { k };
            assert!((p - (source[j] + shift)).norm() < EPS, "{name} residue {k}");
        }
    }

    #[test]
    fn parallel_aligned_sheet_repeats_the_first_peptide() {
        let (mut scene, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let fibril = Assembler::plan(
            &unit,
            &aligned_sheet("ppp", SidechainFlip::Same, 2),
            &GeometryParameters::flat(unit.b),
            &BuildConfig::default(),
        )
        .unwrap();
        assert_eq!(fibril.len(), 8);
        assert!(fibril.placements().iter().all(|p| p.source == "s1_pep1"));
        fibril.realize(&mut scene).unwrap();

        let source = unit.ca_trace(UnitChain::ALL[0]).to_vec();
        let (b1, b2, d) = (unit.b1, unit.b2, unit.d);
        assert_ca_trace(&scene, "p_s1_pep1_0", &source, false, Vector3::zeros());
        assert_ca_trace(&scene, "p_s1_pep2_0", &source, false, Vector3::new(0.0, b1, 0.0));
        assert_ca_trace(&scene, "p_s1_pep1_1", &source, false, Vector3::new(0.0, 2.0 * b1, 0.0));
        assert_ca_trace(&scene, "p_s2_pep1_0", &source, false, Vector3::new(0.0, 0.0, d));
        assert_ca_trace(&scene, "p_s2_pep2_1", &source, false, Vector3::new(0.0, 3.0 * b2, d));
        assert_eq!(scene.group_members("plain_sheet").unwrap().len(), 8);
    }

    #[test]
    fn antiparallel_aligned_sheet_reverses_alternate_strands_on_one_register() {
        let (mut scene, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let fibril = Assembler::plan(
            &unit,
            &aligned_sheet("aaa", SidechainFlip::Flipped, 1),
            &GeometryParameters::flat(unit.b),
            &BuildConfig::default(),
        )
        .unwrap();
        fibril.realize(&mut scene).unwrap();

        let source = unit.ca_trace(UnitChain::ALL[0]).to_vec();
        let (b1, b2, d) = (unit.b1, unit.b2, unit.d);
        assert_ca_trace(&scene, "p_s1_pep1_0", &source, false, Vector3::zeros());
        assert_ca_trace(&scene, "p_s1_pep2_0", &source, true, Vector3::new(0.0, b1, 0.0));
        assert_ca_trace(&scene, "p_s2_pep1_0", &source, true, Vector3::new(0.0, 0.0, d));
        assert_ca_trace(&scene, "p_s2_pep2_0", &source, false, Vector3::new(0.0, b2, d));
    }

    #[test]
    fn alignment_window_must_fit_the_peptide() {
        let (_, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let alignment = SheetAlignment::new("pap".parse().unwrap(), SidechainFlip::Same);
        let plan = |alignment: SheetAlignment| {
            Assembler::plan(
                &unit,
                &spec(Morphology::FlatSheet, 1).with_alignment(alignment).unwrap(),
                &GeometryParameters::flat(unit.b),
                &BuildConfig::default(),
            )
        };
        assert!(matches!(
            plan(alignment.clone().with_window(3, 9)),
            Err(EngineError::AlignmentWindow {
                first: 3,
                last: 9,
                residues: 5
            })
        ));
        assert!(matches!(
            plan(alignment.clone().with_window(2, 2)),
            Err(EngineError::AlignmentWindow { .. })
        ));
        assert!(plan(alignment.with_window(1, 3)).is_ok());
    }

    #[test]
    fn stacked_sheet_names_and_offsets_follow_the_pattern() {
        let (_, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let stacking = StackingPattern::new(vec![vec![true, false], vec![true, true]]).unwrap();
        let fibril = Assembler::plan(
            &unit,
            &spec(Morphology::StackedSheet { stacking }, 1),
            &GeometryParameters::flat(unit.b),
            &BuildConfig::default(),
        )
        .unwrap();
        assert_eq!(fibril.len(), 3 * 4);

        let first = &fibril.placements()[0];
        assert_eq!(first.name, "sp_s1_pep1_0_0");
        let shift = first.isometry.translation.vector;
        assert!((shift - Vector3::new(-unit.box_l / 2.0, 0.0, unit.box_w / 2.0)).norm() < EPS);

        let last = fibril.placements().last().unwrap();
        assert_eq!(last.name, "sp_s2_pep2_0_2");
        let shift = last.isometry.translation.vector;
        assert!((shift - Vector3::new(unit.box_l / 2.0, 0.0, -unit.box_w / 2.0)).norm() < EPS);
    }

    #[test]
    fn rod_copies_sit_on_a_helix() {
        let (mut scene, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let params = GeometryParameters::from_closure(unit.b, 0.12, unit.d / 2.0);
        let fibril = Assembler::plan(
            &unit,
            &spec(Morphology::Rod { tilt: 7.0 }, 4),
            &params,
            &BuildConfig::default(),
        )
        .unwrap();
        fibril.realize(&mut scene).unwrap();

        for repeat in 0..4 {
            let pep1 = placed_ca_centroid(&scene, &format!("nr_s1_pep1_{repeat}"));
            let pep2 = placed_ca_centroid(&scene, &format!("nr_s1_pep2_{repeat}"));
            assert!((pep2.y - pep1.y - params.rise_y).abs() < EPS);
            let r1 = pep1.x.hypot(pep1.z);
            let r2 = pep2.x.hypot(pep2.z);
            assert!((r1 - r2).abs() < EPS);
            // Consecutive copies subtend the refined twist about the axis.
            let angle = (pep1.x * pep2.x + pep1.z * pep2.z) / (r1 * r2);
            assert!((angle.clamp(-1.0, 1.0).acos() - params.twist_y).abs() < 1e-6);
        }
        assert_eq!(scene.group_members("a_rod").unwrap().len(), 16);
    }

    #[test]
    fn handedness_reverses_the_twist() {
        let (_, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let params = GeometryParameters::from_closure(unit.b, 0.12, unit.d / 2.0);
        let plan = |handedness| {
            Assembler::plan(
                &unit,
                &MorphologySpec::new(Morphology::Rod { tilt: 7.0 }, 1, handedness).unwrap(),
                &params,
                &BuildConfig::default(),
            )
            .unwrap()
        };
        let chain = UnitChain::new(Sheet::One, Peptide::Two);
        let centroid = unit.ca_centroid(chain);
        let left = plan(Handedness::Left).placements()[1].isometry * centroid;
        let right = plan(Handedness::Right).placements()[1].isometry * centroid;
        assert!(left.x.abs() > 1e-3);
        assert!((left.x + right.x).abs() < EPS);
        assert!((left.y - right.y).abs() < EPS);
    }

    #[test]
    fn stacked_ribbon_stacks_are_rotated_by_the_stack_angle() {
        let (_, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let params = GeometryParameters::from_closure(unit.b, 0.17, 20.0);
        let fibril = Assembler::plan(
            &unit,
            &spec(
                Morphology::StackedRibbon {
                    tilt: 10.0,
                    radius: 20.0,
                    stack_angle: 60.0,
                    num_stack: 3,
                },
                2,
            ),
            &params,
            &BuildConfig::default(),
        )
        .unwrap();
        assert_eq!(fibril.len(), 3 * 2 * 4);
        let names: Vec<&str> = fibril.placements().iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"sr_s1_pep1_0_0"));
        assert!(names.contains(&"sr_s2_pep2_1_2"));

        let chain = UnitChain::new(Sheet::One, Peptide::One);
        let centroid = unit.ca_centroid(chain);
        let base = fibril.placements()[0].isometry * centroid;
        let turned = fibril
            .placements()
            .iter()
            .find(|p| p.name == "sr_s1_pep1_0_1")
            .unwrap()
            .isometry
            * centroid;
        let cosine = (base.x * turned.x + base.z * turned.z)
            / (base.x.hypot(base.z) * turned.x.hypot(turned.z));
        assert!((cosine - 60f64.to_radians().cos()).abs() < 1e-9);
    }

    #[test]
    fn monolayer_places_only_the_first_sheet() {
        let (_, unit) = testing::extracted_unit(&FixtureGeometry::default());
        let config = BuildConfigBuilder::new()
            .layering(Layering::Monolayer)
            .build()
            .unwrap();
        let fibril = Assembler::plan(
            &unit,
            &spec(Morphology::FlatSheet, 2),
            &GeometryParameters::flat(unit.b),
            &config,
        )
        .unwrap();
        assert_eq!(fibril.len(), 4);
        assert!(fibril.placements().iter().all(|p| p.chain.sheet == Sheet::One));
    }

    #[test]
    fn failed_realization_removes_partial_copies() {
        let (mut scene, unit) = testing::extracted_unit(&FixtureGeometry::default());
        scene.create_copy("p_s1_pep2_1", "s1_pep1").unwrap();
        let fibril = Assembler::plan(
            &unit,
            &spec(Morphology::FlatSheet, 2),
            &GeometryParameters::flat(unit.b),
            &BuildConfig::default(),
        )
        .unwrap();
        let err = fibril.realize(&mut scene).unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::DuplicateName(_))));
        assert!(scene.object("p_s1_pep1_0").is_none());
        assert!(scene.object("p_s1_pep2_1").is_some());
        assert!(scene.group_members("plain_sheet").is_none());
    }

    #[test]
    fn failed_grouping_removes_every_copy() {
        let (mut scene, unit) = testing::extracted_unit(&FixtureGeometry::default());
        scene.create_copy("plain_sheet", "s1_pep1").unwrap();
        let before = scene.object_names();
        let fibril = Assembler::plan(
            &unit,
            &spec(Morphology::FlatSheet, 2),
            &GeometryParameters::flat(unit.b),
            &BuildConfig::default(),
        )
        .unwrap();
        let err = fibril.realize(&mut scene).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Store(StoreError::DuplicateName(ref name)) if name == "plain_sheet"
        ));
        assert_eq!(scene.object_names(), before);
    }
}
