//! Common utilities for mesh renderer integration tests.
//!
//! Provides recording implementations of the renderer's collaborators and
//! small geometry builders.

#![allow(dead_code)]

use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;

use redlilium_mesh_renderer::{
    AssetPipeline, AttributeKind, BuiltinMaterials, EntityId, GeometryData, GeometrySource,
    MeshRenderer, MeshRendererConfig, RenderFlagSink, RenderServices, Submesh, VertexElement,
    VertexFormat,
};

/// Initialize logging for test output.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

// ============================================================================
// Collaborators
// ============================================================================

/// Asset pipeline that records load requests and completes them on demand.
#[derive(Default)]
pub struct ManualPipeline {
    requests: Mutex<Vec<Arc<GeometrySource>>>,
    /// Data delivered synchronously from `request_load` when set.
    pub immediate: Mutex<Option<GeometryData>>,
}

impl ManualPipeline {
    /// Labels of the sources requested so far.
    pub fn requested(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|s| s.label().to_string())
            .collect()
    }
}

impl AssetPipeline for ManualPipeline {
    fn request_load(&self, source: &Arc<GeometrySource>) {
        self.requests.lock().push(Arc::clone(source));
        let immediate = self.immediate.lock().take();
        if let Some(data) = immediate {
            source.complete_load(data);
        }
    }
}

/// A call received by [`RecordingFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagEvent {
    Renderable(EntityId, bool),
    Transform(EntityId),
}

/// Render-flag system that records every call.
#[derive(Default)]
pub struct RecordingFlags {
    events: Mutex<Vec<FlagEvent>>,
}

impl RecordingFlags {
    /// All recorded calls, in order.
    pub fn events(&self) -> Vec<FlagEvent> {
        self.events.lock().clone()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Last renderable value reported for `entity`.
    pub fn last_renderable(&self, entity: EntityId) -> Option<bool> {
        self.events.lock().iter().rev().find_map(|e| match e {
            FlagEvent::Renderable(id, value) if *id == entity => Some(*value),
            _ => None,
        })
    }
}

impl RenderFlagSink for RecordingFlags {
    fn mark_renderable(&self, entity: EntityId, renderable: bool) {
        self.events
            .lock()
            .push(FlagEvent::Renderable(entity, renderable));
    }

    fn request_transform_recompute(&self, entity: EntityId) {
        self.events.lock().push(FlagEvent::Transform(entity));
    }
}

/// Shared collaborators of a test scene.
pub struct TestContext {
    pub pipeline: Arc<ManualPipeline>,
    pub flags: Arc<RecordingFlags>,
    pub materials: Arc<BuiltinMaterials>,
    pub services: RenderServices,
}

impl TestContext {
    pub fn new() -> Self {
        init_logging();
        let pipeline = Arc::new(ManualPipeline::default());
        let flags = Arc::new(RecordingFlags::default());
        let materials = Arc::new(BuiltinMaterials::new());
        let services = RenderServices::new(pipeline.clone(), flags.clone(), materials.clone());
        Self {
            pipeline,
            flags,
            materials,
            services,
        }
    }

    /// Create a renderer with default settings.
    pub fn renderer(&self, entity: u64) -> MeshRenderer {
        self.renderer_with(entity, MeshRendererConfig::default())
    }

    /// Create a renderer with the given settings.
    pub fn renderer_with(&self, entity: u64, config: MeshRendererConfig) -> MeshRenderer {
        MeshRenderer::new(EntityId(entity), self.services.clone(), config)
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Vertex format with positions plus the given attributes.
pub fn format_with(kinds: &[AttributeKind]) -> VertexFormat {
    kinds.iter().fold(
        VertexFormat::new().with_element(VertexElement::float(AttributeKind::Position, 3)),
        |format, &kind| format.with_element(VertexElement::float(kind, components(kind))),
    )
}

fn components(kind: AttributeKind) -> u32 {
    match kind {
        AttributeKind::Position | AttributeKind::Normal => 3,
        AttributeKind::Uv0 => 2,
        AttributeKind::Tangent | AttributeKind::Color => 4,
        AttributeKind::Joints | AttributeKind::Weights => 4,
    }
}

/// A unit quad (two triangles) carrying data for every attribute of `format`.
pub fn quad(format: VertexFormat) -> Submesh {
    const CORNERS: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];
    let kinds: Vec<(AttributeKind, u32)> = format
        .elements()
        .iter()
        .map(|e| (e.kind, e.count))
        .collect();
    let mut submesh = Submesh::new(Arc::new(format)).with_indices(vec![0, 1, 2, 0, 2, 3]);
    for (kind, count) in kinds {
        let data: Vec<f32> = match kind {
            AttributeKind::Position => CORNERS.concat(),
            AttributeKind::Normal => [0.0, 0.0, 1.0].repeat(4),
            _ => vec![0.5; 4 * count as usize],
        };
        submesh = submesh.with_attribute(kind, data);
    }
    submesh
}

/// Geometry data of one quad with the given attributes.
pub fn quad_data(kinds: &[AttributeKind]) -> GeometryData {
    GeometryData::from_submeshes(vec![quad(format_with(kinds))])
}

/// Loaded source of one quad with the given attributes.
pub fn loaded_quad(label: &str, kinds: &[AttributeKind]) -> Arc<GeometrySource> {
    GeometrySource::new_loaded(label, quad_data(kinds))
}

/// Loaded source whose extent is given explicitly.
pub fn loaded_with_extent(label: &str, min: Vec3, max: Vec3) -> Arc<GeometrySource> {
    let mut data = quad_data(&[AttributeKind::Normal]);
    data.min = min;
    data.max = max;
    GeometrySource::new_loaded(label, data)
}
