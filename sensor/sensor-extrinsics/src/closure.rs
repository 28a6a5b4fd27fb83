//! Loop closure over one measured edge and one static edge.
//!
//! A calibrator measures `P -> Q` directly. The static hierarchy already
//! knows `B -> Q` for some bridge frame `B`. Inverting the measurement and
//! composing closes the loop:
//!
//! ```text
//! T_BP = T_BQ · T_PQ⁻¹
//! ```
//!
//! which yields the edge `B -> P` that was never measured.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExtrinsicsError, Result};
use crate::frame::{FrameName, FramePair};
use crate::lookup::StaticLookup;
use crate::result::CalibrationResult;
use crate::transform::RigidTransform;

/// A directly measured edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredEdge {
    /// Measured frames: the transform maps `pair.child` into `pair.parent`.
    pub pair: FramePair,
    /// Measured transform.
    pub transform: RigidTransform,
}

impl MeasuredEdge {
    /// Creates a measured edge.
    #[must_use]
    pub fn new(
        parent: impl Into<FrameName>,
        child: impl Into<FrameName>,
        transform: RigidTransform,
    ) -> Self {
        Self {
            pair: FramePair::new(parent, child),
            transform,
        }
    }

    /// Extracts the edge `pair` from raw calibrator output.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::MissingMeasurement`] if the edge is absent.
    pub fn from_result(result: &CalibrationResult, pair: &FramePair) -> Result<Self> {
        let transform = result
            .edge(pair)
            .copied()
            .ok_or_else(|| ExtrinsicsError::MissingMeasurement(pair.clone()))?;
        Ok(Self {
            pair: pair.clone(),
            transform,
        })
    }
}

/// Derives the edge `bridge -> P` from a measured edge `P -> Q`.
///
/// The static transform `bridge -> Q` is requested from `lookup`. The result
/// holds exactly two edges: the derived `bridge -> P` and the measured
/// `P -> Q`, unchanged. Either both are produced or the call fails.
///
/// A bridge frame equal to `P` or `Q` is accepted; the derived edge is then
/// identity-like and a warning is logged.
///
/// # Errors
///
/// - [`ExtrinsicsError::DerivationFailed`] wrapping the lookup error when
///   `bridge -> Q` cannot be resolved.
/// - [`ExtrinsicsError::InvalidTransform`] if the measured or looked-up
///   transform is not rigid.
///
/// # Example
///
/// ```
/// use sensor_extrinsics::{derive, FrameTree, MeasuredEdge, RigidTransform};
///
/// let mut tree = FrameTree::new();
/// tree.add_edge("camera_mount", "lidar", RigidTransform::from_translation(0.0, 1.0, 0.0)).unwrap();
///
/// let measured = MeasuredEdge::new("camera_optical", "lidar", RigidTransform::from_translation(-1.0, 0.0, 0.0));
/// let result = derive(&measured, &tree, &"camera_mount".into()).unwrap();
///
/// let derived = result.get("camera_mount", "camera_optical").unwrap();
/// assert!(derived.approx_eq(&RigidTransform::from_translation(1.0, 1.0, 0.0), 1e-12));
/// assert!(result.get("camera_optical", "lidar").is_some());
/// ```
pub fn derive<L>(
    measured: &MeasuredEdge,
    lookup: &L,
    bridge: &FrameName,
) -> Result<CalibrationResult>
where
    L: StaticLookup + ?Sized,
{
    let FramePair { parent, child } = &measured.pair;

    if measured.pair.touches(bridge) {
        warn!(
            %bridge,
            measured = %measured.pair,
            "bridge frame coincides with a measured frame, derived edge degenerates"
        );
    }

    let child_to_parent = measured.transform.inverse()?;

    let query = FramePair::new(bridge.clone(), child.clone());
    let bridge_to_child = lookup
        .lookup(bridge, child)
        .map_err(|source| ExtrinsicsError::derivation_failed(query, source))?;

    let bridge_to_parent = bridge_to_child.compose(&child_to_parent)?;

    debug!(
        measured = %measured.pair,
        derived = %FramePair::new(bridge.clone(), parent.clone()),
        "closed calibration loop"
    );

    let mut result = CalibrationResult::new();
    result.insert(bridge.clone(), parent.clone(), bridge_to_parent);
    result.insert(parent.clone(), child.clone(), measured.transform);
    Ok(result)
}

/// Frame wiring for one sensor topology.
///
/// A plan names the measured edge, the bridge frame, and optionally the
/// frame under which the derived edge is recorded. Adding a new sensor pair
/// means writing a new plan, not new code.
///
/// # Example
///
/// ```
/// use sensor_extrinsics::{CalibrationResult, ClosurePlan, FramePair, FrameTree, RigidTransform};
///
/// let plan = ClosurePlan::new(FramePair::new("camera_optical", "lidar"), "camera_mount")
///     .with_output_parent("camera_sensor");
///
/// let mut tree = FrameTree::new();
/// tree.add_edge("camera_mount", "lidar", RigidTransform::from_translation(0.0, 1.0, 0.0)).unwrap();
///
/// let mut raw = CalibrationResult::new();
/// raw.insert("camera_optical", "lidar", RigidTransform::from_translation(-1.0, 0.0, 0.0));
///
/// let derived = plan.apply(&raw, &tree).unwrap();
/// assert!(derived.get("camera_sensor", "camera_optical").is_some());
/// assert!(derived.get("camera_mount", "camera_optical").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosurePlan {
    /// Edge the calibrator measures directly.
    pub measured: FramePair,
    /// Frame statically connected to the measured child.
    pub bridge: FrameName,
    /// Frame under which the derived edge is recorded, if not `bridge`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_parent: Option<FrameName>,
    /// Further frames the topology expects to exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_frames: Vec<FrameName>,
}

impl ClosurePlan {
    /// Creates a plan that records the derived edge under `bridge`.
    #[must_use]
    pub fn new(measured: FramePair, bridge: impl Into<FrameName>) -> Self {
        Self {
            measured,
            bridge: bridge.into(),
            output_parent: None,
            extra_frames: Vec::new(),
        }
    }

    /// Records the derived edge under `frame` instead of the bridge frame.
    #[must_use]
    pub fn with_output_parent(mut self, frame: impl Into<FrameName>) -> Self {
        self.output_parent = Some(frame.into());
        self
    }

    /// Declares an additional frame the topology requires.
    #[must_use]
    pub fn with_extra_frame(mut self, frame: impl Into<FrameName>) -> Self {
        self.extra_frames.push(frame.into());
        self
    }

    /// The edge the derived transform is recorded as.
    #[must_use]
    pub fn derived_pair(&self) -> FramePair {
        FramePair {
            parent: self.output_parent.as_ref().unwrap_or(&self.bridge).clone(),
            child: self.measured.parent.clone(),
        }
    }

    /// Every frame the plan touches, without duplicates, in name order.
    #[must_use]
    pub fn required_frames(&self) -> Vec<FrameName> {
        let mut frames = BTreeSet::new();
        frames.insert(self.bridge.clone());
        frames.insert(self.measured.parent.clone());
        frames.insert(self.measured.child.clone());
        frames.extend(self.output_parent.iter().cloned());
        frames.extend(self.extra_frames.iter().cloned());
        frames.into_iter().collect()
    }

    /// Post-processes raw calibrator output.
    ///
    /// Extracts the measured edge from `raw`, runs [`derive`], and moves the
    /// derived edge under `output_parent` when one is set.
    ///
    /// # Errors
    ///
    /// [`ExtrinsicsError::MissingMeasurement`] if `raw` lacks the measured
    /// edge, otherwise any error [`derive`] returns.
    pub fn apply<L>(&self, raw: &CalibrationResult, lookup: &L) -> Result<CalibrationResult>
    where
        L: StaticLookup + ?Sized,
    {
        let measured = MeasuredEdge::from_result(raw, &self.measured)?;
        let mut result = derive(&measured, lookup, &self.bridge)?;

        if let Some(output_parent) = &self.output_parent {
            if output_parent != &self.bridge {
                let from = FramePair::new(self.bridge.clone(), self.measured.parent.clone());
                let derived = result
                    .remove(&from)
                    .ok_or_else(|| ExtrinsicsError::MissingMeasurement(from.clone()))?;
                warn!(
                    bridge = %self.bridge,
                    %output_parent,
                    "recording derived edge under a frame other than the bridge"
                );
                result.insert(output_parent.clone(), self.measured.parent.clone(), derived);
            }
        }

        Ok(result)
    }
}
