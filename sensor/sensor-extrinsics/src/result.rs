//! Calibration results as a parent → child → transform mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::frame::{FrameName, FramePair};
use crate::transform::RigidTransform;

/// Set of edges produced by a calibration.
///
/// Keyed first by parent frame, then by child frame. Raw calibrator output
/// and derived results share this shape, so the output of one stage can be
/// fed to the next. Iteration order is the lexical order of frame names.
///
/// # Example
///
/// ```
/// use sensor_extrinsics::{CalibrationResult, RigidTransform};
///
/// let mut result = CalibrationResult::new();
/// result.insert("camera_front_optical", "lidar_top", RigidTransform::identity());
/// assert_eq!(result.len(), 1);
/// assert!(result.get("camera_front_optical", "lidar_top").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationResult {
    edges: BTreeMap<FrameName, BTreeMap<FrameName, RigidTransform>>,
}

impl CalibrationResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an edge, returning the transform it replaced.
    pub fn insert(
        &mut self,
        parent: impl Into<FrameName>,
        child: impl Into<FrameName>,
        transform: RigidTransform,
    ) -> Option<RigidTransform> {
        self.edges
            .entry(parent.into())
            .or_default()
            .insert(child.into(), transform)
    }

    /// Returns the transform of the edge `parent -> child`.
    #[must_use]
    pub fn get(&self, parent: &str, child: &str) -> Option<&RigidTransform> {
        self.edges.get(parent).and_then(|children| children.get(child))
    }

    /// Returns the transform of `pair`.
    #[must_use]
    pub fn edge(&self, pair: &FramePair) -> Option<&RigidTransform> {
        self.get(pair.parent.as_str(), pair.child.as_str())
    }

    /// Returns true if the edge is present.
    #[must_use]
    pub fn contains(&self, pair: &FramePair) -> bool {
        self.edge(pair).is_some()
    }

    /// Removes an edge, dropping the parent entry once it has no children.
    pub fn remove(&mut self, pair: &FramePair) -> Option<RigidTransform> {
        let children = self.edges.get_mut(pair.parent.as_str())?;
        let removed = children.remove(pair.child.as_str());
        if children.is_empty() {
            self.edges.remove(pair.parent.as_str());
        }
        removed
    }

    /// Total number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    /// Returns true if there are no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterates over `(parent, child, transform)` in frame-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&FrameName, &FrameName, &RigidTransform)> {
        self.edges.iter().flat_map(|(parent, children)| {
            children
                .iter()
                .map(move |(child, transform)| (parent, child, transform))
        })
    }

    /// Returns all edges as frame pairs.
    #[must_use]
    pub fn pairs(&self) -> Vec<FramePair> {
        self.iter()
            .map(|(parent, child, _)| FramePair {
                parent: parent.clone(),
                child: child.clone(),
            })
            .collect()
    }

    /// Consumes the result, returning the nested map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<FrameName, BTreeMap<FrameName, RigidTransform>> {
        self.edges
    }
}

impl FromIterator<(FramePair, RigidTransform)> for CalibrationResult {
    fn from_iter<I: IntoIterator<Item = (FramePair, RigidTransform)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (pair, transform) in iter {
            result.insert(pair.parent, pair.child, transform);
        }
        result
    }
}
