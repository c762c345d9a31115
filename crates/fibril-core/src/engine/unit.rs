use super::error::EngineError;
use crate::core::store::{AtomFilter, StructureStore};
use crate::core::utils::geometry::{BoundingBox, Frame, centroid, sign};
use nalgebra::{Isometry3, Point3, Translation3};
use std::fmt;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sheet {
    One,
    Two,
}

impl Sheet {
    pub const BOTH: [Sheet; 2] = [Sheet::One, Sheet::Two];

    /// 1-based sheet number used in object names.
    pub fn number(self) -> usize {
        match self {
            Sheet::One => 1,
            Sheet::Two => 2,
        }
    }

    pub fn index(self) -> usize {
        self.number() - 1
    }

    /// Display color of every copy of this sheet.
    pub fn color(self) -> &'static str {
        match self {
            Sheet::One => "green",
            Sheet::Two => "orange",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peptide {
    One,
    Two,
}

impl Peptide {
    pub fn number(self) -> usize {
        match self {
            Peptide::One => 1,
            Peptide::Two => 2,
        }
    }
}

/// One of the four peptide chains making up a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitChain {
    pub sheet: Sheet,
    pub peptide: Peptide,
}

impl UnitChain {
    pub const ALL: [UnitChain; 4] = [
        UnitChain::new(Sheet::One, Peptide::One),
        UnitChain::new(Sheet::One, Peptide::Two),
        UnitChain::new(Sheet::Two, Peptide::One),
        UnitChain::new(Sheet::Two, Peptide::Two),
    ];

    pub const fn new(sheet: Sheet, peptide: Peptide) -> Self {
        Self { sheet, peptide }
    }

    pub(crate) fn slot(self) -> usize {
        self.sheet.index() * 2 + self.peptide.number() - 1
    }
}

impl fmt::Display for UnitChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}_pep{}", self.sheet.number(), self.peptide.number())
    }
}

/// The rigid repeating unit: two sheets of two peptides each, aligned to its
/// own reference frame with the Cα centroid at the origin.
///
/// In the aligned frame strands run along `x`, the sheets stack along `z` and
/// consecutive strands of one sheet are separated along `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicUnit {
    /// Axial rise between the peptides of sheet 1.
    pub b1: f64,
    /// Axial rise between the peptides of sheet 2.
    pub b2: f64,
    /// Limiting rise, `min(b1, b2)`.
    pub b: f64,
    /// Inter-sheet separation along `z`.
    pub d: f64,
    /// Extent of sheet 1 along `x`.
    pub l: f64,
    /// Extent of the unit along `z`.
    pub box_w: f64,
    /// Extent of the unit along `x`.
    pub box_l: f64,
    pub frame: Frame,
    chain_names: [String; 4],
    ca_centroids: [Point3<f64>; 4],
    ca_traces: [Vec<Point3<f64>>; 4],
}

impl PeriodicUnit {
    /// Extracts a unit from the store.
    ///
    /// `chains` are the selections for sheet 1 peptide 1, sheet 1 peptide 2,
    /// sheet 2 peptide 1 and sheet 2 peptide 2. `anchors` are three
    /// single-atom selections defining the reference frame. On success the store
    /// holds four new objects named after [`UnitChain`] (`s1_pep1`, ...); on
    /// failure it is left unchanged.
    ///
    /// # Errors
    ///
    /// - [`EngineError::EmptySelection`] if a chain selection has no atoms or no
    ///   alpha carbons.
    /// - [`EngineError::DegenerateFrame`] if an anchor does not resolve to exactly
    ///   one atom or the anchors are collinear.
    /// - [`EngineError::NonPositiveRise`] if a sheet's second peptide is not
    ///   above its first along the frame's `y` axis.
    #[instrument(skip_all, name = "unit_extraction")]
    pub fn extract<S: StructureStore + ?Sized>(
        store: &mut S,
        chains: [&str; 4],
        anchors: [&str; 3],
    ) -> Result<Self, EngineError> {
        for source in chains {
            if store.coordinates(source, AtomFilter::CAlpha).is_none() {
                return Err(EngineError::EmptySelection(source.to_string()));
            }
        }
        let frame = anchor_frame(store, anchors)?;

        let names = UnitChain::ALL.map(|chain| chain.to_string());
        let mut created = Vec::with_capacity(names.len());
        let result = (|| {
            for (name, source) in names.iter().zip(chains) {
                store.create_copy(name, source)?;
                created.push(name.clone());
            }
            Self::align_and_measure(store, names.clone(), frame)
        })();
        if result.is_err() {
            for name in &created {
                store.delete(name);
            }
        }
        result
    }

    fn align_and_measure<S: StructureStore + ?Sized>(
        store: &mut S,
        names: [String; 4],
        frame: Frame,
    ) -> Result<Self, EngineError> {
        let all = names.join(" ");
        let ca = store
            .coordinates(&all, AtomFilter::CAlpha)
            .ok_or_else(|| EngineError::EmptySelection(all.clone()))?;
        let com = centroid(&ca).ok_or_else(|| EngineError::EmptySelection(all.clone()))?;

        let rotation = frame.to_local();
        let alignment = Isometry3::from_parts(Translation3::from(-(rotation * com.coords)), rotation);
        for name in &names {
            store.transform(name, &alignment)?;
        }

        let ca_of = |pattern: &str| -> Result<Vec<Point3<f64>>, EngineError> {
            store
                .coordinates(pattern, AtomFilter::CAlpha)
                .ok_or_else(|| EngineError::EmptySelection(pattern.to_string()))
        };
        let mut ca_centroids = [Point3::origin(); 4];
        let mut ca_traces: [Vec<Point3<f64>>; 4] = Default::default();
        for (slot, name) in names.iter().enumerate() {
            let trace = ca_of(name)?;
            ca_centroids[slot] =
                centroid(&trace).ok_or_else(|| EngineError::EmptySelection(name.clone()))?;
            ca_traces[slot] = trace;
        }
        let sheet_centroid = |sheet: usize| -> Result<Point3<f64>, EngineError> {
            let pattern = format!("{} {}", names[sheet * 2], names[sheet * 2 + 1]);
            centroid(&ca_of(&pattern)?).ok_or(EngineError::EmptySelection(pattern))
        };
        let d = (sheet_centroid(1)? - sheet_centroid(0)?).z;

        let b1 = ca_centroids[1].y - ca_centroids[0].y;
        let b2 = ca_centroids[3].y - ca_centroids[2].y;
        for (sheet, value) in [(1, b1), (2, b2)] {
            if value <= 0.0 || !value.is_finite() {
                return Err(EngineError::NonPositiveRise { sheet, value });
            }
        }

        let extent_of = |pattern: &str| -> Result<BoundingBox, EngineError> {
            let coords = store
                .coordinates(pattern, AtomFilter::All)
                .ok_or_else(|| EngineError::EmptySelection(pattern.to_string()))?;
            BoundingBox::from_points(&coords)
                .ok_or_else(|| EngineError::EmptySelection(pattern.to_string()))
        };
        let sheet1_box = extent_of(&format!("{} {}", names[0], names[1]))?;
        let unit_box = extent_of(&all)?;

        let unit = Self {
            b1,
            b2,
            b: b1.min(b2),
            d,
            l: sheet1_box.extent().x,
            box_w: unit_box.extent().z,
            box_l: unit_box.extent().x,
            frame,
            chain_names: names,
            ca_centroids,
            ca_traces,
        };
        info!(
            b1 = unit.b1,
            b2 = unit.b2,
            d = unit.d,
            l = unit.l,
            box_w = unit.box_w,
            box_l = unit.box_l,
            "Periodic unit extracted."
        );
        Ok(unit)
    }

    /// Store name of `chain`'s template object.
    pub fn chain_name(&self, chain: UnitChain) -> &str {
        &self.chain_names[chain.slot()]
    }

    /// Cα centroid of `chain` in the aligned frame.
    pub fn ca_centroid(&self, chain: UnitChain) -> Point3<f64> {
        self.ca_centroids[chain.slot()]
    }

    /// Cα positions of `chain` in the aligned frame, in residue order.
    pub fn ca_trace(&self, chain: UnitChain) -> &[Point3<f64>] {
        &self.ca_traces[chain.slot()]
    }

    /// Rise between the peptides of `sheet`.
    pub fn sheet_rise(&self, sheet: Sheet) -> f64 {
        match sheet {
            Sheet::One => self.b1,
            Sheet::Two => self.b2,
        }
    }

    /// Pattern matching all four template objects.
    pub fn all_chains_pattern(&self) -> String {
        self.chain_names.join(" ")
    }

    /// Tilt sign of `sheet` for a copy displaced by `offset_z` along `z`.
    ///
    /// Sheet 1 sits at `-d/2` and sheet 2 at `+d/2` relative to the unit center;
    /// a sheet whose displaced center lies exactly on the axis gets no tilt.
    pub fn tilt_sign(&self, sheet: Sheet, offset_z: f64, handedness_sign: f64) -> f64 {
        let half = self.d / 2.0;
        let z_sheet = match sheet {
            Sheet::One => offset_z - half,
            Sheet::Two => offset_z + half,
        };
        sign(z_sheet) * handedness_sign
    }

    /// Tilt signs of both sheets for a copy displaced by `offset_z`.
    pub fn tilt_signs(&self, offset_z: f64, handedness_sign: f64) -> [f64; 2] {
        Sheet::BOTH.map(|sheet| self.tilt_sign(sheet, offset_z, handedness_sign))
    }
}

fn anchor_frame<S: StructureStore + ?Sized>(
    store: &S,
    anchors: [&str; 3],
) -> Result<Frame, EngineError> {
    let mut points = [Point3::origin(); 3];
    for (point, anchor) in points.iter_mut().zip(anchors) {
        match store.coordinates(anchor, AtomFilter::All).as_deref() {
            Some([p]) => *point = *p,
            Some(found) => {
                return Err(EngineError::DegenerateFrame(format!(
                    "anchor '{}' matched {} atoms, expected exactly one",
                    anchor,
                    found.len()
                )));
            }
            None => {
                return Err(EngineError::DegenerateFrame(format!(
                    "anchor '{}' matched no atoms",
                    anchor
                )));
            }
        }
    }
    debug!(?points, "Resolved frame anchors.");
    Frame::from_anchors(&points[0], &points[1], &points[2])
        .ok_or_else(|| EngineError::DegenerateFrame("anchors are collinear".to_string()))
}
