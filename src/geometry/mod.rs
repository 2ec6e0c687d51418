//! Mesh asset geometry as seen by renderers.
//!
//! - [`VertexFormat`] / [`VertexElement`] - per-submesh attribute declarations
//! - [`Submesh`] / [`GeometryData`] - streamed-in vertex data and extents
//! - [`GeometrySource`] - shared, observable asset view with load and
//!   format-change notifications

mod data;
mod format;
mod source;

pub use data::{GeometryData, Submesh};
pub use format::{AttributeKind, AttributeType, VertexElement, VertexFormat};
pub use source::{GeometryChange, GeometrySource, SubscriptionToken};
