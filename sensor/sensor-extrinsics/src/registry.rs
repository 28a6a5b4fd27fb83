//! Calibrator registry.
//!
//! Maps a `(project, calibrator)` key to a constructor that turns string
//! parameters into a [`ClosurePlan`]. Hosts either build their own registry
//! or use [`CalibratorRegistry::builtin`], which is populated once and never
//! changes afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::closure::ClosurePlan;
use crate::error::{ExtrinsicsError, Result};
use crate::frame::FramePair;

/// Project of the built-in calibrators.
pub const BUILTIN_PROJECT: &str = "lxo";

/// Camera to lidar calibrator using tag-based `PnP`.
pub const CAMERA_LIDAR_CALIBRATOR: &str = "camera_lidar_tag_based_pnp_calibrator";

/// Registry key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalibratorKey {
    /// Project the calibrator belongs to.
    pub project: String,
    /// Calibrator name.
    pub calibrator: String,
}

impl CalibratorKey {
    /// Creates a key.
    #[must_use]
    pub fn new(project: impl Into<String>, calibrator: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            calibrator: calibrator.into(),
        }
    }
}

impl fmt::Display for CalibratorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.calibrator)
    }
}

/// String parameters handed to a plan constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibratorParams(BTreeMap<String, String>);

impl CalibratorParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Returns a parameter if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns a parameter, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::MissingParameter`] naming `calibrator`.
    pub fn require(&self, name: &str, calibrator: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| ExtrinsicsError::missing_parameter(name, calibrator))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CalibratorParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Builds a plan from parameters.
pub type PlanConstructor = fn(&CalibratorParams) -> Result<ClosurePlan>;

/// Registered plan constructors.
///
/// # Example
///
/// ```
/// use sensor_extrinsics::{CalibratorKey, CalibratorParams, CalibratorRegistry};
///
/// let registry = CalibratorRegistry::builtin();
/// let params = CalibratorParams::new()
///     .with("camera_name", "front")
///     .with("lidar_frame", "lidar_top");
/// let key = CalibratorKey::new("lxo", "camera_lidar_tag_based_pnp_calibrator");
///
/// let plan = registry.build(&key, &params).unwrap();
/// assert_eq!(plan.bridge.as_str(), "camera_front_mount");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CalibratorRegistry {
    constructors: BTreeMap<CalibratorKey, PlanConstructor>,
}

impl CalibratorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the calibrators shipped with this crate.
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<CalibratorRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let mut constructors = BTreeMap::new();
            constructors.insert(
                CalibratorKey::new(BUILTIN_PROJECT, CAMERA_LIDAR_CALIBRATOR),
                camera_lidar_plan as PlanConstructor,
            );
            Self { constructors }
        })
    }

    /// Registers a constructor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::DuplicateCalibrator`] if the key is taken.
    pub fn register(&mut self, key: CalibratorKey, constructor: PlanConstructor) -> Result<()> {
        if self.constructors.contains_key(&key) {
            return Err(ExtrinsicsError::DuplicateCalibrator {
                project: key.project,
                calibrator: key.calibrator,
            });
        }
        debug!(calibrator = %key, "registered calibrator");
        self.constructors.insert(key, constructor);
        Ok(())
    }

    /// Builds the plan registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::UnknownCalibrator`] for an unregistered key,
    /// or whatever the constructor returns.
    pub fn build(&self, key: &CalibratorKey, params: &CalibratorParams) -> Result<ClosurePlan> {
        let constructor =
            self.constructors
                .get(key)
                .ok_or_else(|| ExtrinsicsError::UnknownCalibrator {
                    project: key.project.clone(),
                    calibrator: key.calibrator.clone(),
                })?;
        constructor(params)
    }

    /// Returns true if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &CalibratorKey) -> bool {
        self.constructors.contains_key(key)
    }

    /// Registered keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &CalibratorKey> {
        self.constructors.keys()
    }

    /// Number of registered calibrators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

/// Camera optical frame measured against the lidar, closed through the
/// camera mount and recorded under the camera sensor frame.
fn camera_lidar_plan(params: &CalibratorParams) -> Result<ClosurePlan> {
    let camera = params.require("camera_name", CAMERA_LIDAR_CALIBRATOR)?;
    let lidar = params.require("lidar_frame", CAMERA_LIDAR_CALIBRATOR)?;

    let measured = FramePair::new(format!("camera_{camera}_optical"), lidar);
    Ok(ClosurePlan::new(measured, format!("camera_{camera}_mount"))
        .with_output_parent(format!("camera_{camera}_sensor"))
        .with_extra_frame("vehicle_roof_datum"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn camera_lidar_key() -> CalibratorKey {
        CalibratorKey::new(BUILTIN_PROJECT, CAMERA_LIDAR_CALIBRATOR)
    }

    fn front_params() -> CalibratorParams {
        CalibratorParams::new()
            .with("camera_name", "front")
            .with("lidar_frame", "lidar_top")
    }

    #[test]
    fn builtin_contains_camera_lidar() {
        let registry = CalibratorRegistry::builtin();
        assert!(registry.contains(&camera_lidar_key()));
        assert_eq!(registry.len(), 1);
        assert!(std::ptr::eq(registry, CalibratorRegistry::builtin()));
    }

    #[test]
    fn camera_lidar_plan_frames() {
        let plan = CalibratorRegistry::builtin()
            .build(&camera_lidar_key(), &front_params())
            .unwrap();

        assert_eq!(plan.measured, FramePair::new("camera_front_optical", "lidar_top"));
        assert_eq!(plan.bridge.as_str(), "camera_front_mount");
        assert_eq!(
            plan.derived_pair(),
            FramePair::new("camera_front_sensor", "camera_front_optical")
        );
        assert!(plan.extra_frames.iter().any(|f| f.as_str() == "vehicle_roof_datum"));
    }

    #[test]
    fn missing_parameter() {
        let params = CalibratorParams::new().with("camera_name", "front");
        let err = CalibratorRegistry::builtin()
            .build(&camera_lidar_key(), &params)
            .unwrap_err();
        match err {
            ExtrinsicsError::MissingParameter { name, calibrator } => {
                assert_eq!(name, "lidar_frame");
                assert_eq!(calibrator, CAMERA_LIDAR_CALIBRATOR);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_calibrator() {
        let err = CalibratorRegistry::builtin()
            .build(&CalibratorKey::new("lxo", "radar_corner_reflector"), &front_params())
            .unwrap_err();
        assert!(matches!(err, ExtrinsicsError::UnknownCalibrator { .. }));
        assert_eq!(err.to_string(), "unknown calibrator: lxo/radar_corner_reflector");
    }

    #[test]
    fn register_and_build_custom() {
        fn radar_plan(params: &CalibratorParams) -> Result<ClosurePlan> {
            let radar = params.require("radar_frame", "radar")?;
            Ok(ClosurePlan::new(FramePair::new(radar, "lidar_top"), "radar_mount"))
        }

        let mut registry = CalibratorRegistry::new();
        assert!(registry.is_empty());
        let key = CalibratorKey::new("acme", "radar");
        registry.register(key.clone(), radar_plan).unwrap();

        let params: CalibratorParams = [("radar_frame", "radar_front")].into_iter().collect();
        let plan = registry.build(&key, &params).unwrap();
        assert_eq!(plan.measured.parent.as_str(), "radar_front");
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = CalibratorRegistry::new();
        registry.register(camera_lidar_key(), camera_lidar_plan).unwrap();
        let err = registry
            .register(camera_lidar_key(), camera_lidar_plan)
            .unwrap_err();
        assert!(matches!(err, ExtrinsicsError::DuplicateCalibrator { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn keys_are_ordered() {
        let mut registry = CalibratorRegistry::new();
        registry.register(CalibratorKey::new("b", "x"), camera_lidar_plan).unwrap();
        registry.register(CalibratorKey::new("a", "y"), camera_lidar_plan).unwrap();
        let keys: Vec<String> = registry.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["a/y", "b/x"]);
    }

    #[test]
    fn params_from_json() {
        let params: CalibratorParams =
            serde_json::from_str(r#"{"camera_name": "rear", "lidar_frame": "lidar_top"}"#).unwrap();
        assert_eq!(params.get("camera_name"), Some("rear"));
        assert_eq!(params.require("lidar_frame", "c").unwrap(), "lidar_top");
    }
}
