//! Error types for sensor-extrinsics crate.

use thiserror::Error;

use crate::frame::{FrameName, FramePair};

/// Errors that can occur while deriving or emitting extrinsics.
#[derive(Debug, Error)]
pub enum ExtrinsicsError {
    /// Matrix is not a proper rigid transform.
    #[error("invalid transform: {reason}")]
    InvalidTransform {
        /// What check failed.
        reason: String,
    },

    /// No static path connects the two frames.
    #[error("no static transform from '{parent}' to '{child}'")]
    NotFound {
        /// Requested parent frame.
        parent: FrameName,
        /// Requested child frame.
        child: FrameName,
    },

    /// The static lookup collaborator failed for a reason other than a missing path.
    #[error("static lookup '{parent}' -> '{child}' failed: {reason}")]
    LookupFailed {
        /// Requested parent frame.
        parent: FrameName,
        /// Requested child frame.
        child: FrameName,
        /// Collaborator-provided reason (timeout, service unavailable, ...).
        reason: String,
    },

    /// Loop closure could not resolve its static edge.
    #[error("derivation failed resolving static edge {query}: {source}")]
    DerivationFailed {
        /// Static edge that was being queried.
        query: FramePair,
        /// Underlying lookup error.
        source: Box<ExtrinsicsError>,
    },

    /// Static hierarchy is not a tree.
    #[error("invalid frame hierarchy: {reason}")]
    InvalidHierarchy {
        /// Description of the violation.
        reason: String,
    },

    /// Raw calibration output lacks the measured edge a plan expects.
    #[error("measured edge {0} not present in calibration result")]
    MissingMeasurement(FramePair),

    /// No calibrator registered under the key.
    #[error("unknown calibrator: {project}/{calibrator}")]
    UnknownCalibrator {
        /// Project name.
        project: String,
        /// Calibrator name.
        calibrator: String,
    },

    /// A calibrator is already registered under the key.
    #[error("calibrator already registered: {project}/{calibrator}")]
    DuplicateCalibrator {
        /// Project name.
        project: String,
        /// Calibrator name.
        calibrator: String,
    },

    /// Calibrator parameter missing.
    #[error("missing parameter '{name}' for calibrator {calibrator}")]
    MissingParameter {
        /// Parameter name.
        name: String,
        /// Calibrator requesting it.
        calibrator: String,
    },

    /// Writing the snippet markup failed.
    #[error("markup error: {0}")]
    Markup(String),
}

impl ExtrinsicsError {
    /// Creates an invalid transform error.
    #[must_use]
    pub fn invalid_transform(reason: impl Into<String>) -> Self {
        Self::InvalidTransform {
            reason: reason.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(parent: impl Into<FrameName>, child: impl Into<FrameName>) -> Self {
        Self::NotFound {
            parent: parent.into(),
            child: child.into(),
        }
    }

    /// Creates a lookup failure for a collaborator error such as a timeout.
    #[must_use]
    pub fn lookup_failed(
        parent: impl Into<FrameName>,
        child: impl Into<FrameName>,
        reason: impl Into<String>,
    ) -> Self {
        Self::LookupFailed {
            parent: parent.into(),
            child: child.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a lookup error raised while resolving `query`.
    #[must_use]
    pub fn derivation_failed(query: FramePair, source: Self) -> Self {
        Self::DerivationFailed {
            query,
            source: Box::new(source),
        }
    }

    /// Creates an invalid hierarchy error.
    #[must_use]
    pub fn invalid_hierarchy(reason: impl Into<String>) -> Self {
        Self::InvalidHierarchy {
            reason: reason.into(),
        }
    }

    /// Creates a missing parameter error.
    #[must_use]
    pub fn missing_parameter(name: impl Into<String>, calibrator: impl Into<String>) -> Self {
        Self::MissingParameter {
            name: name.into(),
            calibrator: calibrator.into(),
        }
    }

    /// Returns true if this error, or the error it wraps, is a missing static path.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::DerivationFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Result type for extrinsics operations.
pub type Result<T> = std::result::Result<T, ExtrinsicsError>;
