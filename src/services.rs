//! Collaborators a [`MeshRenderer`](crate::MeshRenderer) talks to.
//!
//! The renderer never loads assets, draws, or compiles materials itself. It
//! asks these services to do so and reacts to their callbacks.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::geometry::GeometrySource;
use crate::material::MaterialRegistry;
use crate::pool::AssemblerArena;

/// Identifier of the render entity that owns a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Streams mesh assets in the background.
pub trait AssetPipeline: Send + Sync {
    /// Start loading `source`. Completion is reported through
    /// [`GeometrySource::complete_load`], possibly before this call returns.
    fn request_load(&self, source: &Arc<GeometrySource>);
}

/// Render-flag system deciding which entities take part in the draw pass.
pub trait RenderFlagSink: Send + Sync {
    /// Include or exclude `entity` from the draw pass.
    fn mark_renderable(&self, entity: EntityId, renderable: bool);

    /// Ask for the world transform and culling bounds of `entity` to be refreshed.
    fn request_transform_recompute(&self, entity: EntityId);
}

/// Bundle of collaborators shared by every renderer of a scene.
#[derive(Clone)]
pub struct RenderServices {
    /// Asset streaming.
    pub assets: Arc<dyn AssetPipeline>,
    /// Draw-pass membership.
    pub render_flags: Arc<dyn RenderFlagSink>,
    /// Default materials and per-owner copies.
    pub materials: Arc<dyn MaterialRegistry>,
    /// Render-binding slots, one per live renderer.
    pub assemblers: Arc<Mutex<AssemblerArena>>,
}

impl RenderServices {
    /// Bundle the given collaborators with a fresh assembler arena.
    pub fn new(
        assets: Arc<dyn AssetPipeline>,
        render_flags: Arc<dyn RenderFlagSink>,
        materials: Arc<dyn MaterialRegistry>,
    ) -> Self {
        Self {
            assets,
            render_flags,
            materials,
            assemblers: Arc::new(Mutex::new(AssemblerArena::new())),
        }
    }
}

impl std::fmt::Debug for RenderServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderServices")
            .field("assemblers", &self.assemblers.lock().len())
            .finish_non_exhaustive()
    }
}
