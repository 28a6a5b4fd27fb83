//! Frame identifiers and directed frame pairs.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a coordinate frame.
///
/// Frames come either from the static description of the platform
/// (`base_link`, `vehicle_roof_datum`) or from a calibrator that introduces
/// sensor-specific frames (`camera_front_optical`).
///
/// # Example
///
/// ```
/// use sensor_extrinsics::FrameName;
///
/// let frame = FrameName::new("lidar_top");
/// assert_eq!(frame.as_str(), "lidar_top");
/// assert_eq!(frame.to_string(), "lidar_top");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameName(String);

impl FrameName {
    /// Creates a frame name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FrameName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for FrameName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FrameName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A directed edge between two frames.
///
/// The transform attached to the edge maps coordinates expressed in `child`
/// into `parent`, i.e. it is the pose of `child` seen from `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FramePair {
    /// Frame the transform maps into.
    pub parent: FrameName,
    /// Frame the transform maps from.
    pub child: FrameName,
}

impl FramePair {
    /// Creates a frame pair.
    #[must_use]
    pub fn new(parent: impl Into<FrameName>, child: impl Into<FrameName>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }

    /// Returns the same edge traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            parent: self.child.clone(),
            child: self.parent.clone(),
        }
    }

    /// Returns true if `frame` is one of the two endpoints.
    #[must_use]
    pub fn touches(&self, frame: &FrameName) -> bool {
        &self.parent == frame || &self.child == frame
    }
}

impl fmt::Display for FramePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.parent, self.child)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn frame_name_conversions() {
        let a = FrameName::from("base_link");
        let b = FrameName::from(String::from("base_link"));
        assert_eq!(a, b);
        assert_eq!(a.as_ref(), "base_link");
    }

    #[test]
    fn frame_name_borrows_as_str() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(FrameName::new("lidar_top"), 1);
        assert_eq!(map.get("lidar_top"), Some(&1));
    }

    #[test]
    fn pair_display() {
        let pair = FramePair::new("camera_front_optical", "lidar_top");
        assert_eq!(pair.to_string(), "camera_front_optical -> lidar_top");
    }

    #[test]
    fn pair_reversed() {
        let pair = FramePair::new("a", "b");
        let rev = pair.reversed();
        assert_eq!(rev.parent.as_str(), "b");
        assert_eq!(rev.child.as_str(), "a");
        assert_eq!(rev.reversed(), pair);
    }

    #[test]
    fn pair_touches() {
        let pair = FramePair::new("a", "b");
        assert!(pair.touches(&FrameName::new("a")));
        assert!(pair.touches(&FrameName::new("b")));
        assert!(!pair.touches(&FrameName::new("c")));
    }

    #[test]
    fn frame_name_serializes_as_plain_string() {
        let json = serde_json::to_string(&FrameName::new("imu")).unwrap();
        assert_eq!(json, "\"imu\"");
        let pair: FramePair =
            serde_json::from_str(r#"{"parent":"base_link","child":"imu"}"#).unwrap();
        assert_eq!(pair, FramePair::new("base_link", "imu"));
    }
}
