use std::sync::Arc;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::body::{BodyTree, NodeId, PartKind};

/// Drawable state of a single body part, with its position resolved into
/// the root's frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartPose {
    pub node: NodeId,
    pub kind: PartKind,
    pub world_position: Vec2,
    pub orientation: f32,
    pub size: f32,
}

/// Computes the renderer-facing poses of every part, in depth-first order.
pub fn poses_of(tree: &BodyTree) -> Vec<PartPose> {
    tree.depth_first()
        .into_iter()
        .filter_map(|node| {
            let part = tree.get(node)?;
            Some(PartPose {
                node,
                kind: part.kind,
                world_position: tree.world_position(node)?,
                orientation: part.orientation,
                size: part.size,
            })
        })
        .collect()
}

/// Thread-safe container mirroring the poses an external renderer draws.
///
/// The game loop publishes a fresh snapshot between frames; the renderer
/// only ever reads. Clones share the same underlying storage.
#[derive(Debug, Default)]
pub struct PoseModel {
    poses: Arc<RwLock<Vec<PartPose>>>,
}

impl Clone for PoseModel {
    fn clone(&self) -> Self {
        Self {
            poses: Arc::clone(&self.poses),
        }
    }
}

impl PoseModel {
    /// Creates an empty pose model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored poses with a snapshot taken from the tree.
    pub fn publish(&self, tree: &BodyTree) {
        *self.poses.write() = poses_of(tree);
    }

    /// Returns a copy of all stored poses.
    pub fn snapshot(&self) -> Vec<PartPose> {
        self.poses.read().clone()
    }

    /// Returns the pose of the requested part.
    pub fn get(&self, node: NodeId) -> Option<PartPose> {
        self.poses
            .read()
            .iter()
            .find(|pose| pose.node == node)
            .copied()
    }
}
