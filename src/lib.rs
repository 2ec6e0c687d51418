//! # RedLilium Mesh Renderer
//!
//! Render-state synchronization for mesh entities.
//!
//! A [`MeshRenderer`] binds to a shared [`GeometrySource`] that may still be
//! streaming in, and keeps the state derived from it consistent:
//!
//! - shader [`FeatureFlagSet`] entries for vertex attributes and shadows
//! - the local-space [`BoundingVolume`]
//! - per-submesh material slots with a default for slot 0
//! - debug overlays of normals and wireframes (feature `debug-overlay`)
//!
//! Drawing, asset I/O, and material compilation are left to collaborators
//! implementing the traits in [`services`] and [`overlay::GraphicsDevice`].

pub mod bounds;
pub mod error;
pub mod flags;
pub mod geometry;
pub mod material;
#[cfg(feature = "debug-overlay")]
pub mod overlay;
pub mod pool;
pub mod renderer;
pub mod services;

pub use bounds::BoundingVolume;
pub use error::{MeshRendererError, Result};
pub use flags::{FeatureFlagSet, FlagValue};
pub use geometry::{
    AttributeKind, AttributeType, GeometryChange, GeometryData, GeometrySource, Submesh,
    SubscriptionToken, VertexElement, VertexFormat,
};
pub use material::{
    BuiltinMaterials, Material, MaterialHandle, MaterialKind, MaterialRegistry, MaterialValue,
    Texture, TextureHandle,
};
pub use renderer::{MaterialSlots, MeshRenderer, MeshRendererConfig, ShadowCastingMode};
pub use services::{AssetPipeline, EntityId, RenderFlagSink, RenderServices};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
