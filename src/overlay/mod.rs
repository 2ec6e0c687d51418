//! Debug overlay geometry derived from a renderer's mesh.
//!
//! Two channels are supported:
//!
//! - [`OverlayChannel::Normal`] - a line per vertex from its position along
//!   its normal, scaled against the entity's world transform
//! - [`OverlayChannel::Wireframe`] - the triangle edges of each submesh,
//!   indexing the submesh's own vertex buffer
//!
//! Entries are cached per submesh. A channel is rebuilt lazily, only when it
//! is switched on in [`DebugOverlayConfig`] and its cached length differs from
//! the current submesh count. [`DebugOverlayCache::invalidate`] empties every
//! channel, which forces the next query to rebuild.

mod device;
mod normals;
mod wireframe;

use std::sync::Arc;

use glam::Mat4;

pub use device::{BufferHandle, BufferUsage, GraphicsDevice, IndexFormat};
pub use normals::line_scale;
pub use wireframe::edge_indices;

use crate::error::MeshRendererError;
use crate::geometry::{GeometrySource, VertexFormat};
use crate::material::{
    MaterialHandle, MaterialKind, MaterialRegistry, MaterialValue, BLACK, DIFFUSE_COLOR, RED,
};
use crate::services::EntityId;

/// A debug visualization channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayChannel {
    /// Vertex normals as short lines.
    Normal,
    /// Triangle edges.
    Wireframe,
}

impl OverlayChannel {
    /// All channels.
    pub const ALL: [OverlayChannel; 2] = [Self::Normal, Self::Wireframe];

    /// Channel name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Wireframe => "wireframe",
        }
    }
}

/// Runtime switches and styling of the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugOverlayConfig {
    /// Build the normal channel.
    pub show_normals: bool,
    /// Build the wireframe channel.
    pub show_wireframe: bool,
    /// Length of normal lines at unit world scale.
    pub normal_reference_length: f32,
    /// Color of normal lines.
    pub normal_color: [f32; 4],
    /// Color of wireframe lines.
    pub wireframe_color: [f32; 4],
}

impl Default for DebugOverlayConfig {
    fn default() -> Self {
        Self {
            show_normals: false,
            show_wireframe: false,
            normal_reference_length: 5.0,
            normal_color: RED,
            wireframe_color: BLACK,
        }
    }
}

impl DebugOverlayConfig {
    /// Create a config with every channel off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the normal channel.
    pub fn with_normals(mut self, show: bool) -> Self {
        self.show_normals = show;
        self
    }

    /// Toggle the wireframe channel.
    pub fn with_wireframe(mut self, show: bool) -> Self {
        self.show_wireframe = show;
        self
    }

    /// Set the normal line length at unit world scale.
    pub fn with_normal_reference_length(mut self, length: f32) -> Self {
        self.normal_reference_length = length;
        self
    }

    /// Set the normal line color.
    pub fn with_normal_color(mut self, color: [f32; 4]) -> Self {
        self.normal_color = color;
        self
    }

    /// Set the wireframe line color.
    pub fn with_wireframe_color(mut self, color: [f32; 4]) -> Self {
        self.wireframe_color = color;
        self
    }

    /// Whether `channel` is switched on.
    pub fn is_enabled(&self, channel: OverlayChannel) -> bool {
        match channel {
            OverlayChannel::Normal => self.show_normals,
            OverlayChannel::Wireframe => self.show_wireframe,
        }
    }
}

/// Where an overlay draw reads its vertices from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexBinding {
    /// A buffer created for the overlay.
    Owned(BufferHandle),
    /// The vertex buffer of the given source submesh.
    Source {
        /// Index of the source submesh.
        submesh: usize,
    },
}

/// Line-list geometry of one overlay entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayGeometry {
    /// Layout of the vertices the lines index into.
    pub format: Arc<VertexFormat>,
    /// Vertex source.
    pub vertices: VertexBinding,
    /// Number of vertices addressed.
    pub vertex_count: usize,
    /// Edge index buffer, two indices per line.
    pub indices: BufferHandle,
    /// Width of the indices.
    pub index_format: IndexFormat,
    /// Number of indices.
    pub index_count: usize,
}

impl OverlayGeometry {
    /// Number of line segments.
    pub fn line_count(&self) -> usize {
        self.index_count / 2
    }
}

/// Overlay payload of one submesh: a flat-color material plus line geometry.
#[derive(Debug, Clone)]
pub struct OverlayEntry {
    /// Source submesh index.
    pub submesh: usize,
    /// Flat-color material.
    pub material: MaterialHandle,
    /// Line geometry.
    pub geometry: OverlayGeometry,
}

/// Collaborators needed to realize overlay entries.
pub(crate) struct OverlayBuild<'a> {
    pub owner: EntityId,
    pub world: &'a Mat4,
    pub materials: &'a dyn MaterialRegistry,
    pub device: &'a dyn GraphicsDevice,
}

impl OverlayBuild<'_> {
    fn material(&self, color: [f32; 4]) -> MaterialHandle {
        let base = self.materials.default_material(MaterialKind::Unlit);
        let material = self.materials.instantiate(&base, self.owner);
        material.set_property(DIFFUSE_COLOR, MaterialValue::Color(color));
        material
    }
}

/// Per-channel, per-submesh cache of overlay entries.
///
/// A slot is `None` when its submesh lacks what the channel needs.
#[derive(Debug, Default)]
pub struct DebugOverlayCache {
    config: DebugOverlayConfig,
    normals: Vec<Option<OverlayEntry>>,
    wireframe: Vec<Option<OverlayEntry>>,
}

impl DebugOverlayCache {
    /// Create an empty cache.
    pub fn new(config: DebugOverlayConfig) -> Self {
        Self {
            config,
            normals: Vec::new(),
            wireframe: Vec::new(),
        }
    }

    /// Get the active config.
    pub fn config(&self) -> &DebugOverlayConfig {
        &self.config
    }

    /// Replace the config. Channels that get switched on are emptied so they
    /// rebuild with the new styling.
    pub fn set_config(&mut self, config: DebugOverlayConfig) {
        for channel in OverlayChannel::ALL {
            if config.is_enabled(channel) && !self.config.is_enabled(channel) {
                self.slots_mut(channel).clear();
            }
        }
        self.config = config;
    }

    /// Empty every channel.
    pub fn invalidate(&mut self) {
        self.normals.clear();
        self.wireframe.clear();
    }

    /// Number of cached slots of a channel.
    pub fn len(&self, channel: OverlayChannel) -> usize {
        self.slots(channel).len()
    }

    /// Whether every channel is empty.
    pub fn is_empty(&self) -> bool {
        self.normals.is_empty() && self.wireframe.is_empty()
    }

    /// Cached slots of a channel, indexed by submesh.
    pub fn slots(&self, channel: OverlayChannel) -> &[Option<OverlayEntry>] {
        match channel {
            OverlayChannel::Normal => &self.normals,
            OverlayChannel::Wireframe => &self.wireframe,
        }
    }

    fn slots_mut(&mut self, channel: OverlayChannel) -> &mut Vec<Option<OverlayEntry>> {
        match channel {
            OverlayChannel::Normal => &mut self.normals,
            OverlayChannel::Wireframe => &mut self.wireframe,
        }
    }

    /// Present entries of a channel, in submesh order.
    pub fn entries(&self, channel: OverlayChannel) -> impl Iterator<Item = &OverlayEntry> + '_ {
        self.slots(channel).iter().flatten()
    }

    /// Rebuild every enabled channel whose length is stale.
    ///
    /// Unloaded sources are left alone.
    pub(crate) fn refresh(&mut self, source: &GeometrySource, ctx: &OverlayBuild<'_>) {
        if !source.is_loaded() {
            return;
        }
        let submesh_count = source.submesh_count();
        for channel in OverlayChannel::ALL {
            if !self.config.is_enabled(channel) || self.len(channel) == submesh_count {
                continue;
            }
            log::debug!(
                "Rebuilding {} overlay for '{}' ({} submeshes)",
                channel.name(),
                source.label(),
                submesh_count
            );
            let config = self.config;
            let scale = match channel {
                OverlayChannel::Normal => {
                    normals::line_scale(ctx.world, config.normal_reference_length)
                }
                OverlayChannel::Wireframe => 1.0,
            };
            let slots = (0..submesh_count)
                .map(|index| Self::build_slot(source, index, channel, ctx, &config, scale))
                .collect();
            *self.slots_mut(channel) = slots;
        }
    }

    fn build_slot(
        source: &GeometrySource,
        index: usize,
        channel: OverlayChannel,
        ctx: &OverlayBuild<'_>,
        config: &DebugOverlayConfig,
        scale: f32,
    ) -> Option<OverlayEntry> {
        let submesh = match source.submesh(index) {
            Ok(submesh) => submesh,
            Err(err @ MeshRendererError::NotLoaded { .. }) => {
                crate::error::contract_violation(&err);
                return None;
            }
            Err(_) => return None,
        };
        let built = match channel {
            OverlayChannel::Normal => {
                normals::build(&submesh, index, ctx, scale, config.normal_color)
            }
            OverlayChannel::Wireframe => {
                wireframe::build(&submesh, index, ctx, config.wireframe_color)
            }
        };
        match built {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!("{err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AttributeKind, GeometryData, Submesh, VertexElement};
    use crate::material::BuiltinMaterials;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingDevice {
        next: Mutex<u64>,
    }

    impl CountingDevice {
        fn issue(&self) -> BufferHandle {
            let mut next = self.next.lock();
            *next += 1;
            BufferHandle::new(*next)
        }
    }

    impl GraphicsDevice for CountingDevice {
        fn create_vertex_buffer(
            &self,
            _: &VertexFormat,
            _: BufferUsage,
            _: &[u8],
        ) -> BufferHandle {
            self.issue()
        }

        fn create_index_buffer(
            &self,
            _: IndexFormat,
            _: BufferUsage,
            _: &[u8],
        ) -> BufferHandle {
            self.issue()
        }
    }

    fn quad_source() -> Arc<GeometrySource> {
        let lit = Submesh::new(Arc::new(
            VertexFormat::new()
                .with_element(VertexElement::float(AttributeKind::Position, 3))
                .with_element(VertexElement::float(AttributeKind::Normal, 3)),
        ))
        .with_attribute(
            AttributeKind::Position,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        )
        .with_attribute(AttributeKind::Normal, [0.0, 0.0, 1.0].repeat(4))
        .with_indices(vec![0, 1, 2, 0, 2, 3]);
        let bare = Submesh::new(Arc::new(VertexFormat::position_only()))
            .with_attribute(AttributeKind::Position, vec![0.0; 9])
            .with_indices(vec![0, 1, 2]);
        GeometrySource::new_loaded("quad", GeometryData::from_submeshes(vec![lit, bare]))
    }

    fn refresh(cache: &mut DebugOverlayCache, source: &GeometrySource, device: &CountingDevice) {
        let materials = BuiltinMaterials::new();
        let ctx = OverlayBuild {
            owner: EntityId(1),
            world: &Mat4::IDENTITY,
            materials: &materials,
            device,
        };
        cache.refresh(source, &ctx);
    }

    #[test]
    fn test_disabled_channels_stay_empty() {
        let mut cache = DebugOverlayCache::default();
        refresh(&mut cache, &quad_source(), &CountingDevice::default());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_refresh_fills_one_slot_per_submesh() {
        let source = quad_source();
        let device = CountingDevice::default();
        let config = DebugOverlayConfig::new()
            .with_normals(true)
            .with_wireframe(true);
        let mut cache = DebugOverlayCache::new(config);
        refresh(&mut cache, &source, &device);

        assert_eq!(cache.len(OverlayChannel::Normal), 2);
        assert_eq!(cache.len(OverlayChannel::Wireframe), 2);
        // the second submesh has no normals
        assert_eq!(cache.entries(OverlayChannel::Normal).count(), 1);
        assert_eq!(cache.entries(OverlayChannel::Wireframe).count(), 2);

        let normal = cache.entries(OverlayChannel::Normal).next().unwrap();
        assert_eq!(normal.geometry.line_count(), 4);
        assert_eq!(normal.material.color(DIFFUSE_COLOR), Some(RED));

        let wire = cache.entries(OverlayChannel::Wireframe).next().unwrap();
        assert_eq!(wire.geometry.line_count(), 6);
        assert_eq!(wire.geometry.vertices, VertexBinding::Source { submesh: 0 });
        assert_eq!(wire.material.color(DIFFUSE_COLOR), Some(BLACK));
    }

    #[test]
    fn test_fresh_cache_is_not_rebuilt() {
        let source = quad_source();
        let device = CountingDevice::default();
        let mut cache = DebugOverlayCache::new(DebugOverlayConfig::new().with_wireframe(true));
        refresh(&mut cache, &source, &device);
        let issued = *device.next.lock();

        refresh(&mut cache, &source, &device);
        assert_eq!(*device.next.lock(), issued);

        cache.invalidate();
        assert_eq!(cache.len(OverlayChannel::Wireframe), 0);
        refresh(&mut cache, &source, &device);
        assert_eq!(*device.next.lock(), issued * 2);
    }

    #[test]
    fn test_enabling_channel_clears_it() {
        let source = quad_source();
        let device = CountingDevice::default();
        let mut cache = DebugOverlayCache::new(DebugOverlayConfig::new().with_normals(true));
        refresh(&mut cache, &source, &device);
        assert_eq!(cache.len(OverlayChannel::Normal), 2);

        cache.set_config(DebugOverlayConfig::new());
        assert_eq!(cache.len(OverlayChannel::Normal), 2);
        cache.set_config(DebugOverlayConfig::new().with_normals(true));
        assert_eq!(cache.len(OverlayChannel::Normal), 0);
    }

    #[test]
    fn test_unloaded_source_is_skipped() {
        let source = GeometrySource::new("pending");
        let mut cache = DebugOverlayCache::new(DebugOverlayConfig::new().with_wireframe(true));
        refresh(&mut cache, &source, &CountingDevice::default());
        assert_eq!(cache.len(OverlayChannel::Wireframe), 0);
    }
}
