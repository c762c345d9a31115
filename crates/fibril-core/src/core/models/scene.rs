use super::atom::Atom;
use super::ids::ObjectId;
use super::object::MolecularObject;
use crate::core::store::{AtomFilter, StoreError, StructureStore};
use crate::core::utils::geometry::BoundingBox;
use crate::core::utils::pattern::{glob_match, is_valid_name, tokens};
use itertools::Itertools;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Isometry3, Point3};
use slotmap::SlotMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AtomRef {
    object: ObjectId,
    index: usize,
}

/// Criteria for [`Scene::select`]. Unset fields match every atom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomSelection {
    pub chain: Option<char>,
    pub residues: Option<RangeInclusive<isize>>,
    pub atom_name: Option<String>,
}

impl AtomSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain_id: char) -> Self {
        self.chain = Some(chain_id);
        self
    }

    pub fn residues(mut self, range: RangeInclusive<isize>) -> Self {
        self.residues = Some(range);
        self
    }

    pub fn residue(self, residue_number: isize) -> Self {
        self.residues(residue_number..=residue_number)
    }

    pub fn atom_name(mut self, name: &str) -> Self {
        self.atom_name = Some(name.to_string());
        self
    }

    fn matches(&self, atom: &Atom) -> bool {
        self.chain.is_none_or(|c| atom.chain_id == c)
            && self
                .residues
                .as_ref()
                .is_none_or(|r| r.contains(&atom.residue_number))
            && self
                .atom_name
                .as_deref()
                .is_none_or(|n| atom.name.eq_ignore_ascii_case(n))
    }
}

/// An in-memory molecular scene implementing [`StructureStore`].
///
/// Objects own their atoms. Selections are lists of references into objects and
/// never duplicate atoms; groups are ordered lists of member objects. Objects,
/// selections and groups share a single namespace.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: SlotMap<ObjectId, MolecularObject>,
    /// Creation order of live objects.
    order: Vec<ObjectId>,
    object_name_map: HashMap<String, ObjectId>,
    selections: BTreeMap<String, Vec<AtomRef>>,
    groups: BTreeMap<String, Vec<ObjectId>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new object owning `atoms`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidName`] or [`StoreError::DuplicateName`] if
    /// `name` cannot be used.
    pub fn add_object(&mut self, name: &str, atoms: Vec<Atom>) -> Result<ObjectId, StoreError> {
        self.check_new_name(name)?;
        let id = self.objects.insert(MolecularObject::new(name, atoms));
        self.order.push(id);
        self.object_name_map.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn object(&self, name: &str) -> Option<&MolecularObject> {
        self.object_name_map
            .get(name)
            .and_then(|&id| self.objects.get(id))
    }

    /// Iterates over objects in creation order.
    pub fn objects_iter(&self) -> impl Iterator<Item = &MolecularObject> {
        self.order.iter().filter_map(|&id| self.objects.get(id))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Creates (or replaces) the selection `name` holding every atom matched by
    /// `source` that also satisfies `criteria`. Returns the number of selected
    /// atoms; an empty selection is not an error.
    pub fn select(
        &mut self,
        name: &str,
        source: &str,
        criteria: &AtomSelection,
    ) -> Result<usize, StoreError> {
        if !is_valid_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if self.object_name_map.contains_key(name) || self.groups.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        let refs: Vec<AtomRef> = self
            .resolve(source)
            .into_iter()
            .filter(|r| self.atom(*r).is_some_and(|a| criteria.matches(a)))
            .collect();
        let count = refs.len();
        self.selections.insert(name.to_string(), refs);
        Ok(count)
    }

    /// Names of the member objects of group `name`, in group order.
    pub fn group_members(&self, name: &str) -> Option<Vec<&str>> {
        self.groups.get(name).map(|members| {
            members
                .iter()
                .filter_map(|&id| self.objects.get(id).map(|o| o.name.as_str()))
                .collect()
        })
    }

    pub fn color_of(&self, object_name: &str) -> Option<&str> {
        self.object(object_name).and_then(|o| o.color.as_deref())
    }

    /// Resolves `pattern` to the matched atoms, in scene order.
    pub fn atoms(&self, pattern: &str) -> Vec<&Atom> {
        self.resolve(pattern)
            .into_iter()
            .filter_map(|r| self.atom(r))
            .collect()
    }

    fn atom(&self, r: AtomRef) -> Option<&Atom> {
        self.objects.get(r.object).and_then(|o| o.atoms().get(r.index))
    }

    fn check_new_name(&self, name: &str) -> Result<(), StoreError> {
        if !is_valid_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if self.object_name_map.contains_key(name)
            || self.selections.contains_key(name)
            || self.groups.contains_key(name)
        {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn whole_object(&self, id: ObjectId) -> impl Iterator<Item = AtomRef> + '_ {
        let len = self.objects.get(id).map_or(0, MolecularObject::len);
        (0..len).map(move |index| AtomRef { object: id, index })
    }

    /// Objects directly named by `token` or reached through a matching group.
    fn matching_objects(&self, token: &str) -> Vec<ObjectId> {
        let grouped = self
            .groups
            .iter()
            .filter(|(name, _)| glob_match(token, name))
            .flat_map(|(_, members)| members.iter().copied());
        let direct = self
            .order
            .iter()
            .copied()
            .filter(|&id| self.objects.get(id).is_some_and(|o| glob_match(token, &o.name)));
        grouped.chain(direct).unique().collect()
    }

    fn resolve(&self, pattern: &str) -> Vec<AtomRef> {
        tokens(pattern)
            .flat_map(|token| {
                let from_objects: Vec<AtomRef> = self
                    .matching_objects(token)
                    .into_iter()
                    .flat_map(|id| self.whole_object(id))
                    .collect();
                let from_selections: Vec<AtomRef> = self
                    .selections
                    .iter()
                    .filter(|(name, _)| glob_match(token, name))
                    .flat_map(|(_, refs)| refs.iter().copied())
                    .collect();
                from_objects.into_iter().chain(from_selections)
            })
            .unique()
            .filter(|r| self.atom(*r).is_some())
            .collect()
    }

    fn remove_object(&mut self, id: ObjectId) -> bool {
        match self.objects.remove(id) {
            Some(object) => {
                self.object_name_map.remove(&object.name);
                self.order.retain(|&o| o != id);
                true
            }
            None => false,
        }
    }

    fn prune_dangling(&mut self) {
        let objects = &self.objects;
        for refs in self.selections.values_mut() {
            refs.retain(|r| objects.contains_key(r.object));
        }
        for members in self.groups.values_mut() {
            members.retain(|&id| objects.contains_key(id));
        }
    }
}

impl StructureStore for Scene {
    fn create_copy(&mut self, dest: &str, source: &str) -> Result<(), StoreError> {
        self.check_new_name(dest)?;
        let atoms: Vec<Atom> = self
            .resolve(source)
            .into_iter()
            .filter_map(|r| self.atom(r).cloned())
            .collect();
        if atoms.is_empty() {
            return Err(StoreError::NotFound(source.to_string()));
        }
        self.add_object(dest, atoms)?;
        Ok(())
    }

    fn coordinates(&self, pattern: &str, filter: AtomFilter) -> Option<Vec<Point3<f64>>> {
        let coords: Vec<Point3<f64>> = self
            .atoms(pattern)
            .into_iter()
            .filter(|a| match filter {
                AtomFilter::All => true,
                AtomFilter::CAlpha => a.is_alpha_carbon(),
            })
            .map(|a| a.position)
            .collect();
        (!coords.is_empty()).then_some(coords)
    }

    fn transform(&mut self, pattern: &str, isometry: &Isometry3<f64>) -> Result<(), StoreError> {
        let refs = self.resolve(pattern);
        if refs.is_empty() {
            return Err(StoreError::NotFound(pattern.to_string()));
        }
        for r in refs {
            if let Some(atom) = self
                .objects
                .get_mut(r.object)
                .and_then(|o| o.atoms_mut().get_mut(r.index))
            {
                atom.position = isometry.transform_point(&atom.position);
            }
        }
        Ok(())
    }

    fn neighbors_within(&self, pattern: &str, radius: f64) -> Option<Vec<Point3<f64>>> {
        let refs = self.resolve(pattern);
        let owners: HashSet<ObjectId> = refs.iter().map(|r| r.object).collect();
        let probe: Vec<[f64; 3]> = refs
            .iter()
            .filter_map(|&r| self.atom(r))
            .map(|a| [a.position.x, a.position.y, a.position.z])
            .collect();
        if probe.is_empty() {
            return None;
        }

        let bounds = BoundingBox::from_points(
            refs.iter()
                .filter_map(|&r| self.atom(r))
                .map(|a| &a.position),
        )?
        .expanded(radius);
        let kdtree: KdTree<f64, 3> = (&probe).into();
        let radius_sq = radius * radius;

        let neighbors: Vec<Point3<f64>> = self
            .order
            .iter()
            .filter(|id| !owners.contains(id))
            .filter_map(|&id| self.objects.get(id))
            .flat_map(|o| o.positions())
            .filter(|p| bounds.contains(p))
            .filter(|p| {
                let nearest = kdtree.nearest_one::<SquaredEuclidean>(&[p.x, p.y, p.z]);
                nearest.distance <= radius_sq
            })
            .copied()
            .collect();
        (!neighbors.is_empty()).then_some(neighbors)
    }

    fn delete(&mut self, pattern: &str) -> usize {
        let mut removed = 0;
        for token in tokens(pattern) {
            let group_names: Vec<String> = self
                .groups
                .keys()
                .filter(|name| glob_match(token, name))
                .cloned()
                .collect();
            for name in group_names {
                if let Some(members) = self.groups.remove(&name) {
                    removed += 1;
                    removed += members
                        .into_iter()
                        .filter(|&id| self.remove_object(id))
                        .count();
                }
            }

            let object_ids: Vec<ObjectId> = self
                .order
                .iter()
                .copied()
                .filter(|&id| self.objects.get(id).is_some_and(|o| glob_match(token, &o.name)))
                .collect();
            removed += object_ids
                .into_iter()
                .filter(|&id| self.remove_object(id))
                .count();

            let before = self.selections.len();
            self.selections.retain(|name, _| !glob_match(token, name));
            removed += before - self.selections.len();
        }
        self.prune_dangling();
        removed
    }

    fn group(&mut self, name: &str, members: &str) -> Result<(), StoreError> {
        if !is_valid_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if self.object_name_map.contains_key(name) || self.selections.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        let ids: Vec<ObjectId> = tokens(members)
            .flat_map(|token| self.matching_objects(token))
            .unique()
            .collect();
        if ids.is_empty() {
            return Err(StoreError::NotFound(members.to_string()));
        }
        self.groups.insert(name.to_string(), ids);
        Ok(())
    }

    fn color(&mut self, color: &str, pattern: &str) {
        let touched: Vec<ObjectId> = self
            .resolve(pattern)
            .into_iter()
            .map(|r| r.object)
            .unique()
            .collect();
        for id in touched {
            if let Some(object) = self.objects.get_mut(id) {
                object.color = Some(color.to_string());
            }
        }
    }

    fn object_names(&self) -> Vec<String> {
        self.objects_iter().map(|o| o.name.clone()).collect()
    }
}
