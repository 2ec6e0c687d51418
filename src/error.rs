//! Error types for mesh render-state synchronization.

use thiserror::Error;

use crate::geometry::AttributeKind;

/// Errors raised while reading geometry or deriving render state from it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshRendererError {
    /// Geometry data was accessed before the asset pipeline finished streaming it in.
    #[error("geometry '{label}' accessed before it finished loading")]
    NotLoaded { label: String },
    /// The bound geometry has no submesh carrying vertex data.
    #[error("geometry '{label}' has no submesh with vertex data")]
    EmptyGeometry { label: String },
    /// A debug overlay channel needs an attribute the submesh does not declare.
    #[error("overlay '{channel}' skipped for submesh {submesh}: missing {attribute:?}")]
    MissingAttributeForOverlay {
        channel: &'static str,
        submesh: usize,
        attribute: AttributeKind,
    },
    /// A submesh index past the end of the submesh list.
    #[error("submesh index {index} out of range ({count} submeshes)")]
    SubmeshOutOfRange { index: usize, count: usize },
    /// A raw shadow casting mode value outside the supported set.
    #[error("invalid shadow casting mode: {0}")]
    InvalidShadowCastingMode(u32),
}

pub type Result<T> = std::result::Result<T, MeshRendererError>;

/// Handles a [`MeshRendererError::NotLoaded`] hit on an internal path.
///
/// Reaching this means the bind protocol was bypassed: fatal in debug builds,
/// logged and skipped in release builds.
pub(crate) fn contract_violation(err: &MeshRendererError) {
    debug_assert!(false, "mesh renderer contract violation: {err}");
    log::warn!("mesh renderer contract violation, skipping: {err}");
}
