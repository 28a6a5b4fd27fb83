//! Static frame hierarchy lookups.
//!
//! [`StaticLookup`] is the seam to whatever already knows the platform's
//! static transforms, usually a live frame tree service. [`FrameTree`] is an
//! in-memory implementation for offline use and tests; [`LookupFn`] adapts a
//! closure that forwards to an external service.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExtrinsicsError, Result};
use crate::frame::FrameName;
use crate::transform::RigidTransform;

/// Source of already-known, time-invariant transforms between named frames.
pub trait StaticLookup {
    /// Returns the transform mapping `child` coordinates into `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::NotFound`] when no static path connects the
    /// frames. Implementations backed by a remote service report other
    /// failures (timeouts, disconnects) as [`ExtrinsicsError::LookupFailed`].
    fn lookup(&self, parent: &FrameName, child: &FrameName) -> Result<RigidTransform>;
}

/// Adapts a closure into a [`StaticLookup`].
///
/// # Example
///
/// ```
/// use sensor_extrinsics::{ExtrinsicsError, FrameName, LookupFn, RigidTransform, StaticLookup};
///
/// let service = LookupFn(|parent: &FrameName, child: &FrameName| {
///     if parent.as_str() == "base_link" && child.as_str() == "imu" {
///         Ok(RigidTransform::from_translation(0.0, 0.0, 0.3))
///     } else {
///         Err(ExtrinsicsError::not_found(parent.clone(), child.clone()))
///     }
/// });
///
/// assert!(service.lookup(&"base_link".into(), &"imu".into()).is_ok());
/// assert!(service.lookup(&"imu".into(), &"gps".into()).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LookupFn<F>(pub F);

impl<F> StaticLookup for LookupFn<F>
where
    F: Fn(&FrameName, &FrameName) -> Result<RigidTransform>,
{
    fn lookup(&self, parent: &FrameName, child: &FrameName) -> Result<RigidTransform> {
        (self.0)(parent, child)
    }
}

/// One edge of a static hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticEdge {
    /// Parent frame.
    pub parent: FrameName,
    /// Child frame.
    pub child: FrameName,
    /// Transform mapping `child` into `parent`.
    pub transform: RigidTransform,
}

impl StaticEdge {
    /// Creates an edge.
    #[must_use]
    pub fn new(
        parent: impl Into<FrameName>,
        child: impl Into<FrameName>,
        transform: RigidTransform,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            transform,
        }
    }
}

/// In-memory static frame hierarchy.
///
/// Every frame has at most one parent, and no chain of parents loops back on
/// itself, so the hierarchy is a forest. Any two frames in the same tree can
/// be related through their common root.
///
/// # Example
///
/// ```
/// use sensor_extrinsics::{FrameTree, RigidTransform, StaticLookup};
///
/// let mut tree = FrameTree::new();
/// tree.add_edge("base_link", "roof", RigidTransform::from_translation(0.0, 0.0, 1.5)).unwrap();
/// tree.add_edge("base_link", "bumper", RigidTransform::from_translation(2.0, 0.0, 0.3)).unwrap();
///
/// let roof_to_bumper = tree.lookup(&"roof".into(), &"bumper".into()).unwrap();
/// let t = roof_to_bumper.translation();
/// assert!((t.x - 2.0).abs() < 1e-12);
/// assert!((t.z + 1.2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<StaticEdge>", into = "Vec<StaticEdge>")]
pub struct FrameTree {
    parents: BTreeMap<FrameName, (FrameName, RigidTransform)>,
    frames: BTreeSet<FrameName>,
}

impl FrameTree {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a hierarchy from a list of edges.
    ///
    /// # Errors
    ///
    /// Returns the first error [`FrameTree::add_edge`] reports.
    pub fn from_edges(edges: impl IntoIterator<Item = StaticEdge>) -> Result<Self> {
        let mut tree = Self::new();
        for edge in edges {
            tree.add_edge(edge.parent, edge.child, edge.transform)?;
        }
        Ok(tree)
    }

    /// Attaches `child` below `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::InvalidTransform`] for a non-rigid
    /// transform, and [`ExtrinsicsError::InvalidHierarchy`] if `child`
    /// already has a parent or the edge would close a loop.
    pub fn add_edge(
        &mut self,
        parent: impl Into<FrameName>,
        child: impl Into<FrameName>,
        transform: RigidTransform,
    ) -> Result<()> {
        let parent = parent.into();
        let child = child.into();
        transform.validate()?;

        if let Some((existing, _)) = self.parents.get(&child) {
            return Err(ExtrinsicsError::invalid_hierarchy(format!(
                "frame '{child}' already has parent '{existing}', cannot attach it to '{parent}'"
            )));
        }

        let mut cursor = Some(&parent);
        while let Some(frame) = cursor {
            if frame == &child {
                return Err(ExtrinsicsError::invalid_hierarchy(format!(
                    "edge '{parent}' -> '{child}' would create a loop"
                )));
            }
            cursor = self.parents.get(frame).map(|(p, _)| p);
        }

        self.frames.insert(parent.clone());
        self.frames.insert(child.clone());
        self.parents.insert(child, (parent, transform));
        Ok(())
    }

    /// Returns true if the frame appears in any edge.
    #[must_use]
    pub fn contains(&self, frame: &FrameName) -> bool {
        self.frames.contains(frame)
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Returns true if the hierarchy has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Iterates over all known frames in name order.
    pub fn frames(&self) -> impl Iterator<Item = &FrameName> {
        self.frames.iter()
    }

    /// Walks from `frame` up to its root, returning the root and `T_root,frame`.
    fn resolve_from_root<'a>(
        &'a self,
        frame: &'a FrameName,
    ) -> Result<(&'a FrameName, RigidTransform)> {
        let mut accumulated = RigidTransform::identity();
        let mut cursor = frame;
        while let Some((parent, transform)) = self.parents.get(cursor) {
            accumulated = transform.compose(&accumulated)?;
            cursor = parent;
        }
        Ok((cursor, accumulated))
    }
}

impl StaticLookup for FrameTree {
    fn lookup(&self, parent: &FrameName, child: &FrameName) -> Result<RigidTransform> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(ExtrinsicsError::not_found(parent.clone(), child.clone()));
        }
        if parent == child {
            return Ok(RigidTransform::identity());
        }

        let (parent_root, root_to_parent) = self.resolve_from_root(parent)?;
        let (child_root, root_to_child) = self.resolve_from_root(child)?;
        if parent_root != child_root {
            return Err(ExtrinsicsError::not_found(parent.clone(), child.clone()));
        }

        debug!(%parent, %child, root = %parent_root, "resolved static transform");
        root_to_parent.inverse()?.compose(&root_to_child)
    }
}

impl TryFrom<Vec<StaticEdge>> for FrameTree {
    type Error = ExtrinsicsError;

    fn try_from(edges: Vec<StaticEdge>) -> Result<Self> {
        Self::from_edges(edges)
    }
}

impl From<FrameTree> for Vec<StaticEdge> {
    fn from(tree: FrameTree) -> Self {
        tree.parents
            .into_iter()
            .map(|(child, (parent, transform))| StaticEdge {
                parent,
                child,
                transform,
            })
            .collect()
    }
}
