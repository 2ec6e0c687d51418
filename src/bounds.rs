//! Axis-aligned bounding volume in mesh local space.

use glam::Vec3;

use crate::error::{self, MeshRendererError};
use crate::geometry::GeometrySource;

/// Axis-aligned box around a mesh, or explicitly nothing.
///
/// The volume is taken straight from the geometry source's pre-reduced extent;
/// raw vertices are never iterated here.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BoundingVolume {
    /// No geometry is bound, or it has not loaded yet.
    #[default]
    Empty,
    /// Box spanned by two corners.
    Box {
        /// Minimum corner.
        min: Vec3,
        /// Maximum corner.
        max: Vec3,
    },
}

impl BoundingVolume {
    /// Tight box around two points, whatever their order.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self::Box {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Volume of a geometry source, with the corners exactly as the source
    /// reports them (an inverted extent stays inverted).
    ///
    /// `None` or an unloaded source yield [`BoundingVolume::Empty`], never data
    /// from a previous binding.
    pub fn of(source: Option<&GeometrySource>) -> Self {
        let Some(source) = source else {
            return Self::Empty;
        };
        if !source.is_loaded() {
            return Self::Empty;
        }
        match source.extent() {
            Ok((min, max)) => Self::Box { min, max },
            Err(err @ MeshRendererError::NotLoaded { .. }) => {
                error::contract_violation(&err);
                Self::Empty
            }
            Err(_) => Self::Empty,
        }
    }

    /// Replace this volume with the volume of `source`.
    pub fn recompute(&mut self, source: Option<&GeometrySource>) {
        *self = Self::of(source);
    }

    /// Whether this volume holds no box.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Minimum corner.
    pub fn min(&self) -> Option<Vec3> {
        match self {
            Self::Box { min, .. } => Some(*min),
            Self::Empty => None,
        }
    }

    /// Maximum corner.
    pub fn max(&self) -> Option<Vec3> {
        match self {
            Self::Box { max, .. } => Some(*max),
            Self::Empty => None,
        }
    }

    /// Center of the box.
    pub fn center(&self) -> Option<Vec3> {
        match self {
            Self::Box { min, max } => Some((*min + *max) * 0.5),
            Self::Empty => None,
        }
    }

    /// Half the size of the box along each axis.
    pub fn half_extents(&self) -> Option<Vec3> {
        match self {
            Self::Box { min, max } => Some((*max - *min) * 0.5),
            Self::Empty => None,
        }
    }

    /// Whether `point` lies inside or on the box.
    pub fn contains_point(&self, point: Vec3) -> bool {
        match self {
            Self::Box { min, max } => point.cmpge(*min).all() && point.cmple(*max).all(),
            Self::Empty => false,
        }
    }
}
