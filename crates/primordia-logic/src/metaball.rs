//! Metaball body layouts.
//!
//! A macroscopic body is a tree of metaballs. Each metaball except the root
//! hangs off exactly one parent, which gives every metaball a well defined
//! tree depth. Ids are local to one layout and handed out by its allocator;
//! copying metaballs between layouts goes through an identity-remapping
//! table so parent links always point inside the layout that owns them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell_type::CellTypeId;
use crate::geometry::Vec3;

/// Positions closer than this to the ground count as already grounded
const GROUND_EPSILON: f32 = 0.0001;

/// Handle to a metaball inside one layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetaballId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metaball {
    pub id: MetaballId,
    pub position: Vec3,
    /// Diameter before species scale is applied
    pub size: f32,
    pub parent: Option<MetaballId>,
    pub cell_type: CellTypeId,
}

impl Metaball {
    pub fn radius(&self, scale: f32) -> f32 {
        self.size * 0.5 * scale
    }

    /// Sphere volume at the given species scale
    pub fn volume(&self, scale: f32) -> f32 {
        let radius = self.radius(scale);
        4.0 / 3.0 * std::f32::consts::PI * radius * radius * radius
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("metaball {0:?} does not exist in this layout")]
    UnknownMetaball(MetaballId),
    #[error("metaball {metaball:?} points at missing parent {parent:?}")]
    DanglingParent {
        metaball: MetaballId,
        parent: MetaballId,
    },
    #[error("parent {parent:?} of metaball {metaball:?} has not been cloned yet")]
    UnmappedParent {
        metaball: MetaballId,
        parent: MetaballId,
    },
    #[error("metaball {0:?} is part of a parent cycle")]
    Cycle(MetaballId),
    #[error("layout already has root {existing:?}, cannot add another")]
    MultipleRoots { existing: MetaballId },
    #[error("layout has metaballs but no root")]
    NoRoot,
    #[error("metaball {0:?} still has children")]
    HasChildren(MetaballId),
    #[error("metaball {metaball:?} uses unknown cell type {cell_type:?}")]
    UnknownCellType {
        metaball: MetaballId,
        cell_type: CellTypeId,
    },
}

/// Ordered tree of metaballs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaballLayout {
    metaballs: Vec<Metaball>,
    next_id: u32,
}

impl MetaballLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty layout that keeps allocating ids after this one's
    pub fn emptied(&self) -> Self {
        Self {
            metaballs: Vec::new(),
            next_id: self.next_id,
        }
    }

    fn allocate_id(&mut self) -> MetaballId {
        let id = MetaballId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds a metaball. The parent must already be in the layout and only
    /// one root is allowed.
    pub fn add(
        &mut self,
        position: Vec3,
        size: f32,
        parent: Option<MetaballId>,
        cell_type: CellTypeId,
    ) -> Result<MetaballId, LayoutError> {
        match parent {
            Some(parent_id) if self.get(parent_id).is_none() => {
                return Err(LayoutError::UnknownMetaball(parent_id));
            }
            None => {
                if let Some(root) = self.root() {
                    return Err(LayoutError::MultipleRoots { existing: root.id });
                }
            }
            _ => {}
        }

        let id = self.allocate_id();
        self.metaballs.push(Metaball {
            id,
            position,
            size,
            parent,
            cell_type,
        });
        Ok(id)
    }

    pub fn get(&self, id: MetaballId) -> Option<&Metaball> {
        self.metaballs.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: MetaballId) -> Option<&mut Metaball> {
        self.metaballs.iter_mut().find(|m| m.id == id)
    }

    /// Removes a leaf metaball
    pub fn remove(&mut self, id: MetaballId) -> Result<Metaball, LayoutError> {
        if self.children_of(id).next().is_some() {
            return Err(LayoutError::HasChildren(id));
        }

        let index = self
            .metaballs
            .iter()
            .position(|m| m.id == id)
            .ok_or(LayoutError::UnknownMetaball(id))?;

        Ok(self.metaballs.remove(index))
    }

    /// Removes every metaball. The id allocator keeps counting.
    pub fn clear(&mut self) {
        self.metaballs.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metaball> {
        self.metaballs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Metaball> {
        self.metaballs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.metaballs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metaballs.is_empty()
    }

    pub fn root(&self) -> Option<&Metaball> {
        self.metaballs.iter().find(|m| m.parent.is_none())
    }

    pub fn children_of(&self, id: MetaballId) -> impl Iterator<Item = &Metaball> {
        self.metaballs.iter().filter(move |m| m.parent == Some(id))
    }

    /// Distance from the root, which has depth 0
    pub fn tree_depth(&self, id: MetaballId) -> Result<usize, LayoutError> {
        let mut current = self.get(id).ok_or(LayoutError::UnknownMetaball(id))?;
        let mut depth = 0;

        while let Some(parent_id) = current.parent {
            depth += 1;
            if depth > self.metaballs.len() {
                return Err(LayoutError::Cycle(id));
            }

            current = self.get(parent_id).ok_or(LayoutError::DanglingParent {
                metaball: current.id,
                parent: parent_id,
            })?;
        }

        Ok(depth)
    }

    /// Depth of every metaball, computed in one pass
    pub fn tree_depths(&self) -> Result<HashMap<MetaballId, usize>, LayoutError> {
        let index: HashMap<MetaballId, &Metaball> =
            self.metaballs.iter().map(|m| (m.id, m)).collect();
        let mut depths: HashMap<MetaballId, usize> = HashMap::with_capacity(self.metaballs.len());

        for metaball in &self.metaballs {
            // Walk up until we hit something already known or the root
            let mut chain = vec![metaball.id];
            let mut current = metaball;
            let base = loop {
                if let Some(&known) = depths.get(&current.id) {
                    chain.pop();
                    break known + 1;
                }
                let Some(parent_id) = current.parent else {
                    break 0;
                };
                current = index.get(&parent_id).copied().ok_or(LayoutError::DanglingParent {
                    metaball: current.id,
                    parent: parent_id,
                })?;
                if chain.len() > self.metaballs.len() {
                    return Err(LayoutError::Cycle(metaball.id));
                }
                chain.push(current.id);
            };

            // chain runs child -> ancestor; the last entry sits at `base`
            for (offset, id) in chain.iter().rev().enumerate() {
                depths.insert(*id, base + offset);
            }
        }

        Ok(depths)
    }

    /// Checks the tree invariants: one root, every parent present, no cycles
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.metaballs.is_empty() {
            return Ok(());
        }

        let mut roots = self.metaballs.iter().filter(|m| m.parent.is_none());
        let Some(root) = roots.next() else {
            return Err(LayoutError::NoRoot);
        };
        if roots.next().is_some() {
            return Err(LayoutError::MultipleRoots { existing: root.id });
        }

        self.tree_depths().map(|_| ())
    }

    /// Metaballs ordered parents-before-children (stable within a depth)
    pub fn depth_ordered(&self) -> Result<Vec<&Metaball>, LayoutError> {
        let depths = self.tree_depths()?;
        let mut ordered: Vec<&Metaball> = self.metaballs.iter().collect();
        ordered.sort_by_key(|m| depths.get(&m.id).copied().unwrap_or(usize::MAX));
        Ok(ordered)
    }

    /// Clones `source` into this layout under a fresh id. Its parent must
    /// already have been cloned and recorded in `mapping`.
    pub fn clone_metaball(
        &mut self,
        source: &Metaball,
        mapping: &mut HashMap<MetaballId, MetaballId>,
    ) -> Result<MetaballId, LayoutError> {
        let parent = match source.parent {
            Some(parent_id) => Some(*mapping.get(&parent_id).ok_or(
                LayoutError::UnmappedParent {
                    metaball: source.id,
                    parent: parent_id,
                },
            )?),
            None => None,
        };

        let id = self.add(source.position, source.size, parent, source.cell_type)?;
        mapping.insert(source.id, id);
        Ok(id)
    }

    /// Clones all of `other` into this layout, parents first. Returns the
    /// table mapping `other`'s ids to the new ones.
    pub fn extend_cloned_from(
        &mut self,
        other: &MetaballLayout,
    ) -> Result<HashMap<MetaballId, MetaballId>, LayoutError> {
        other.validate()?;

        let mut mapping = HashMap::with_capacity(other.len());
        for metaball in other.depth_ordered()? {
            self.clone_metaball(metaball, &mut mapping)?;
        }

        Ok(mapping)
    }

    #[cfg(test)]
    pub(crate) fn storage_mut(&mut self) -> &mut Vec<Metaball> {
        &mut self.metaballs
    }

    /// Moves the layout vertically so its lowest surface point rests at
    /// y = 0. Returns true if anything moved.
    pub fn reposition_to_ground(&mut self) -> bool {
        let Some(lowest) = self
            .metaballs
            .iter()
            .map(|m| m.position.y - m.size * 0.5)
            .reduce(f32::min)
        else {
            return false;
        };

        if lowest.abs() < GROUND_EPSILON {
            return false;
        }

        for metaball in &mut self.metaballs {
            metaball.position.y -= lowest;
        }
        true
    }

    /// Same shape, placement and cell types, ignoring ids. Metaballs are
    /// paired up in depth order, siblings in insertion order.
    pub fn structurally_eq(&self, other: &MetaballLayout) -> bool {
        if self.len() != other.len() {
            return false;
        }

        let (Ok(ours), Ok(theirs)) = (self.depth_ordered(), other.depth_ordered()) else {
            return false;
        };

        let ordinal = |ordered: &[&Metaball]| -> HashMap<MetaballId, usize> {
            ordered.iter().enumerate().map(|(i, m)| (m.id, i)).collect()
        };
        let our_ordinals = ordinal(&ours);
        let their_ordinals = ordinal(&theirs);

        ours.iter().zip(theirs.iter()).all(|(a, b)| {
            a.position == b.position
                && a.size == b.size
                && a.cell_type == b.cell_type
                && a.parent.map(|p| our_ordinals.get(&p)) == b.parent.map(|p| their_ordinals.get(&p))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: CellTypeId = CellTypeId(0);

    /// root -> a -> b, root -> c
    fn three_level() -> (MetaballLayout, [MetaballId; 4]) {
        let mut layout = MetaballLayout::new();
        let root = layout.add(Vec3::new(0.0, 1.0, 0.0), 1.0, None, CELL).unwrap();
        let a = layout.add(Vec3::new(1.0, 1.0, 0.0), 0.5, Some(root), CELL).unwrap();
        let b = layout.add(Vec3::new(2.0, 1.0, 0.0), 0.25, Some(a), CELL).unwrap();
        let c = layout.add(Vec3::new(-1.0, 1.0, 0.0), 0.5, Some(root), CELL).unwrap();
        (layout, [root, a, b, c])
    }

    #[test]
    fn test_volume_uses_scale() {
        let metaball = Metaball {
            id: MetaballId(0),
            position: Vec3::ZERO,
            size: 2.0,
            parent: None,
            cell_type: CELL,
        };
        let unit = 4.0 / 3.0 * std::f32::consts::PI;
        assert!((metaball.volume(1.0) - unit).abs() < 0.0001);
        assert!((metaball.volume(2.0) - unit * 8.0).abs() < 0.001);
    }

    #[test]
    fn test_tree_depth() {
        let (layout, [root, a, b, c]) = three_level();
        assert_eq!(layout.tree_depth(root).unwrap(), 0);
        assert_eq!(layout.tree_depth(a).unwrap(), 1);
        assert_eq!(layout.tree_depth(b).unwrap(), 2);
        assert_eq!(layout.tree_depth(c).unwrap(), 1);

        let depths = layout.tree_depths().unwrap();
        assert_eq!(depths[&b], 2);
        assert_eq!(depths[&c], 1);
    }

    #[test]
    fn test_second_root_rejected() {
        let (mut layout, [root, ..]) = three_level();
        let err = layout.add(Vec3::ZERO, 1.0, None, CELL).unwrap_err();
        assert_eq!(err, LayoutError::MultipleRoots { existing: root });
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut layout = MetaballLayout::new();
        let err = layout
            .add(Vec3::ZERO, 1.0, Some(MetaballId(42)), CELL)
            .unwrap_err();
        assert_eq!(err, LayoutError::UnknownMetaball(MetaballId(42)));
    }

    #[test]
    fn test_remove_refuses_parent() {
        let (mut layout, [_, a, b, _]) = three_level();
        assert_eq!(layout.remove(a).unwrap_err(), LayoutError::HasChildren(a));
        assert_eq!(layout.remove(b).unwrap().id, b);
        assert!(layout.remove(a).is_ok());
    }

    #[test]
    fn test_dangling_parent_detected() {
        let (mut layout, [_, a, b, _]) = three_level();
        layout.get_mut(b).unwrap().parent = Some(MetaballId(99));
        assert_eq!(
            layout.validate().unwrap_err(),
            LayoutError::DanglingParent {
                metaball: b,
                parent: MetaballId(99)
            }
        );
        assert!(layout.tree_depth(a).is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        let (mut layout, [_, a, b, _]) = three_level();
        layout.get_mut(a).unwrap().parent = Some(b);
        assert!(matches!(layout.tree_depth(b), Err(LayoutError::Cycle(_))));
        assert!(matches!(layout.tree_depths(), Err(LayoutError::Cycle(_))));
    }

    #[test]
    fn test_clone_needs_parent_mapped_first() {
        let (source, [_, a, ..]) = three_level();
        let mut target = MetaballLayout::new();
        let mut mapping = HashMap::new();

        let err = target
            .clone_metaball(source.get(a).unwrap(), &mut mapping)
            .unwrap_err();
        assert!(matches!(err, LayoutError::UnmappedParent { .. }));
    }

    #[test]
    fn test_extend_cloned_from_handles_children_listed_first() {
        let mut source = MetaballLayout::new();
        let root = source.add(Vec3::ZERO, 1.0, None, CELL).unwrap();
        let mid = source.add(Vec3::new(1.0, 0.0, 0.0), 1.0, Some(root), CELL).unwrap();
        let leaf = source.add(Vec3::new(2.0, 0.0, 0.0), 1.0, Some(mid), CELL).unwrap();
        // Put the leaf first in storage order
        source.metaballs.rotate_right(1);
        assert_eq!(source.metaballs[0].id, leaf);

        let mut target = MetaballLayout::new();
        let mapping = target.extend_cloned_from(&source).unwrap();

        assert_eq!(target.len(), 3);
        target.validate().unwrap();
        let new_leaf = target.get(mapping[&leaf]).unwrap();
        assert_eq!(new_leaf.parent, Some(mapping[&mid]));
        assert!(target.structurally_eq(&source));
    }

    #[test]
    fn test_clear_keeps_allocating_fresh_ids() {
        let (mut layout, ids) = three_level();
        layout.clear();
        let new_root = layout.add(Vec3::ZERO, 1.0, None, CELL).unwrap();
        assert!(!ids.contains(&new_root));
    }

    #[test]
    fn test_reposition_to_ground() {
        let (mut layout, [root, ..]) = three_level();
        // lowest surface point is root: 1.0 - 0.5
        assert!(layout.reposition_to_ground());
        assert!((layout.get(root).unwrap().position.y - 0.5).abs() < 0.0001);
        assert!(!layout.reposition_to_ground());
    }

    #[test]
    fn test_reposition_empty_layout() {
        assert!(!MetaballLayout::new().reposition_to_ground());
    }

    #[test]
    fn test_structural_eq_detects_changes() {
        let (layout, [_, _, b, _]) = three_level();
        let mut other = layout.clone();
        assert!(layout.structurally_eq(&other));

        other.get_mut(b).unwrap().size = 9.0;
        assert!(!layout.structurally_eq(&other));
    }
}
