//! Sensor extrinsics loop closure.
//!
//! A calibrator measures one edge between two sensor frames. The platform's
//! static description already knows how one of those frames hangs off a
//! mounting frame. This crate closes the loop between the two and renders
//! the derived edge as a markup snippet ready to paste into the description.
//!
//! # Transform Algebra
//!
//! - [`RigidTransform`] - Validated 4x4 homogeneous rigid transform
//! - [`EulerXyz`] - Intrinsic XYZ Euler angles in radians
//! - [`Decomposition`] - Translation plus Euler angles
//!
//! # Loop Closure
//!
//! - [`derive`] - Closes one measured edge through a bridge frame
//! - [`ClosurePlan`] - Frame wiring for one sensor topology
//! - [`StaticLookup`] - Source of static transforms, e.g. [`FrameTree`]
//! - [`CalibrationResult`] - Parent -> child -> transform mapping
//!
//! # Snippets
//!
//! - [`emit`] - Renders one edge as a `<transform>` block
//! - [`format_component`] - Six significant digit number formatting
//!
//! # Calibrators
//!
//! - [`CalibratorRegistry`] - Plan constructors keyed by project and calibrator
//!
//! # Example
//!
//! ```
//! use sensor_extrinsics::{ClosurePlan, CalibrationResult, FramePair, FrameTree, RigidTransform, emit};
//!
//! // Static description: lidar is bolted 1 m left of the camera mount
//! let mut tree = FrameTree::new();
//! tree.add_edge("camera_mount", "lidar", RigidTransform::from_translation(0.0, 1.0, 0.0))
//!     .unwrap();
//!
//! // Calibrator output: lidar seen from the camera optical frame
//! let mut raw = CalibrationResult::new();
//! raw.insert("camera_optical", "lidar", RigidTransform::from_translation(-1.0, 0.0, 0.0));
//!
//! let plan = ClosurePlan::new(FramePair::new("camera_optical", "lidar"), "camera_mount");
//! let derived = plan.apply(&raw, &tree).unwrap();
//!
//! let pair = plan.derived_pair();
//! let snippet = emit(derived.edge(&pair).unwrap(), &pair.parent, &pair.child).unwrap();
//! assert!(snippet.contains(r#"xyz="1 1 0""#));
//! ```
//!
//! # Logging
//!
//! Diagnostics go through `tracing`. The crate never installs a subscriber.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod closure;
mod error;
mod frame;
mod lookup;
mod registry;
mod result;
mod snippet;
mod transform;

// Re-export frame types
pub use frame::{FrameName, FramePair};

// Re-export transform types
pub use transform::{Decomposition, EulerXyz, ORTHONORMALITY_TOLERANCE, RigidTransform};

// Re-export lookup types
pub use lookup::{FrameTree, LookupFn, StaticEdge, StaticLookup};

// Re-export closure types
pub use closure::{ClosurePlan, MeasuredEdge, derive};
pub use result::CalibrationResult;

// Re-export snippet functions
pub use snippet::{Element, emit, format_component, indent};

// Re-export registry types
pub use registry::{
    BUILTIN_PROJECT, CAMERA_LIDAR_CALIBRATOR, CalibratorKey, CalibratorParams,
    CalibratorRegistry, PlanConstructor,
};

// Re-export error types
pub use error::{ExtrinsicsError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CalibrationResult, CalibratorKey, CalibratorParams, CalibratorRegistry, ClosurePlan,
        EulerXyz, ExtrinsicsError, FrameName, FramePair, FrameTree, MeasuredEdge,
        RigidTransform, StaticLookup, derive, emit,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn public_types_are_send_sync() {
        assert_send_sync::<RigidTransform>();
        assert_send_sync::<CalibrationResult>();
        assert_send_sync::<ClosurePlan>();
        assert_send_sync::<FrameTree>();
        assert_send_sync::<CalibratorRegistry>();
        assert_send_sync::<ExtrinsicsError>();
    }
}
