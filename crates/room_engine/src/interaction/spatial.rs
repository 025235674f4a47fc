//! Broad-phase index of hit-target rectangles.
//!
//! Backed by an R-tree (`rstar`). The tree has no move operation, so a
//! changed rectangle is removed and inserted again.

use std::collections::HashMap;

use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use super::target::{InteractionError, Rect, TargetId};

#[derive(Debug, Clone, PartialEq)]
struct IndexedRect {
    target: TargetId,
    rect: Rect,
}

impl RTreeObject for IndexedRect {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.rect.min(), self.rect.max())
    }
}

#[derive(Debug, Clone, Default)]
struct SpatialNode {
    rect: Option<Rect>,
    received_first: bool,
    inserted: bool,
}

#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedRect>,
    nodes: HashMap<TargetId, SpatialNode>,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("registered", &self.nodes.len())
            .field("indexed", &self.tree.size())
            .finish_non_exhaustive()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: TargetId) -> Result<(), InteractionError> {
        if self.nodes.contains_key(&target) {
            return Err(InteractionError::DuplicateTarget(target));
        }
        self.nodes.insert(target, SpatialNode::default());
        Ok(())
    }

    /// Applies a rectangle change for `target`. `None` hides the target from
    /// hit-testing. Returns whether the tree was touched; an unchanged
    /// rectangle is ignored, except for the first value ever received.
    pub fn update_rectangle(
        &mut self,
        target: TargetId,
        rect: Option<Rect>,
    ) -> Result<bool, InteractionError> {
        let node = self
            .nodes
            .get_mut(&target)
            .ok_or(InteractionError::UnknownTarget(target))?;
        if node.received_first && node.rect == rect {
            return Ok(false);
        }
        node.received_first = true;

        if node.inserted {
            if let Some(previous) = node.rect {
                self.tree.remove(&IndexedRect {
                    target,
                    rect: previous,
                });
            }
            node.inserted = false;
        }
        if let Some(next) = rect {
            self.tree.insert(IndexedRect { target, rect: next });
            node.inserted = true;
        }
        node.rect = rect;
        debug!(target = target.0, visible = node.inserted, "spatial_index_reinserted");
        Ok(true)
    }

    pub fn remove(&mut self, target: TargetId) -> Result<(), InteractionError> {
        let node = self
            .nodes
            .remove(&target)
            .ok_or(InteractionError::UnknownTarget(target))?;
        if node.inserted {
            if let Some(rect) = node.rect {
                self.tree.remove(&IndexedRect { target, rect });
            }
        }
        Ok(())
    }

    /// Every target whose rectangle contains the point, in tree order.
    pub fn query_point(&self, x: f32, y: f32) -> Vec<TargetId> {
        let point = AABB::from_point([x, y]);
        self.tree
            .locate_in_envelope_intersecting(&point)
            .map(|entry| entry.target)
            .collect()
    }

    pub fn contains(&self, target: TargetId) -> bool {
        self.nodes.contains_key(&target)
    }

    pub fn rectangle(&self, target: TargetId) -> Option<Rect> {
        self.nodes.get(&target).and_then(|node| node.rect)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn indexed_len(&self) -> usize {
        self.tree.size()
    }
}
