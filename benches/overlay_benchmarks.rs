use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{Mat4, Vec3};

use redlilium_mesh_renderer::overlay::{
    edge_indices, line_scale, BufferHandle, BufferUsage, DebugOverlayConfig, GraphicsDevice,
    IndexFormat, OverlayChannel,
};
use redlilium_mesh_renderer::{
    AssetPipeline, AttributeKind, BuiltinMaterials, EntityId, GeometryData, GeometrySource,
    MeshRenderer, MeshRendererConfig, RenderFlagSink, RenderServices, Submesh, VertexFormat,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct NullDevice;

impl GraphicsDevice for NullDevice {
    fn create_vertex_buffer(&self, _: &VertexFormat, _: BufferUsage, _: &[u8]) -> BufferHandle {
        BufferHandle::new(0)
    }

    fn create_index_buffer(&self, _: IndexFormat, _: BufferUsage, _: &[u8]) -> BufferHandle {
        BufferHandle::new(0)
    }
}

struct NullPipeline;

impl AssetPipeline for NullPipeline {
    fn request_load(&self, _: &Arc<GeometrySource>) {}
}

struct NullFlags;

impl RenderFlagSink for NullFlags {
    fn mark_renderable(&self, _: EntityId, _: bool) {}
    fn request_transform_recompute(&self, _: EntityId) {}
}

/// Flat grid of `n * n` quads with positions and normals.
fn grid(n: u32) -> Submesh {
    let side = n + 1;
    let mut positions = Vec::with_capacity((side * side * 3) as usize);
    let mut normals = Vec::with_capacity((side * side * 3) as usize);
    for y in 0..side {
        for x in 0..side {
            positions.extend_from_slice(&[x as f32, y as f32, 0.0]);
            normals.extend_from_slice(&[0.0, 0.0, 1.0]);
        }
    }
    let mut indices = Vec::with_capacity((n * n * 6) as usize);
    for y in 0..n {
        for x in 0..n {
            let i = y * side + x;
            indices.extend_from_slice(&[i, i + 1, i + side + 1, i, i + side + 1, i + side]);
        }
    }
    Submesh::new(Arc::new(VertexFormat::position_normal_uv()))
        .with_attribute(AttributeKind::Position, positions)
        .with_attribute(AttributeKind::Normal, normals)
        .with_attribute(AttributeKind::Uv0, vec![0.0; (side * side * 2) as usize])
        .with_indices(indices)
}

fn grid_triangles(n: u32) -> Vec<u32> {
    grid(n).indices().to_vec()
}

fn services() -> RenderServices {
    RenderServices::new(
        Arc::new(NullPipeline),
        Arc::new(NullFlags),
        Arc::new(BuiltinMaterials::new()),
    )
}

// ---------------------------------------------------------------------------
// Overlay primitives
// ---------------------------------------------------------------------------

fn bench_edge_indices(c: &mut Criterion) {
    let triangles = grid_triangles(64);
    c.bench_function("edge_indices_64x64", |b| {
        b.iter(|| edge_indices(black_box(&triangles)));
    });
}

fn bench_line_scale(c: &mut Criterion) {
    let world = Mat4::from_scale_rotation_translation(
        Vec3::new(2.0, 3.0, 0.5),
        glam::Quat::from_rotation_y(0.7),
        Vec3::new(10.0, 0.0, -4.0),
    );
    c.bench_function("line_scale", |b| {
        b.iter(|| line_scale(black_box(&world), black_box(5.0)));
    });
}

fn bench_index_encode(c: &mut Criterion) {
    let indices = edge_indices(&grid_triangles(64));
    c.bench_function("index_fitting_and_encode", |b| {
        b.iter(|| {
            let format = IndexFormat::fitting(black_box(&indices));
            black_box(format.encode(&indices))
        });
    });
}

// ---------------------------------------------------------------------------
// Full overlay generation
// ---------------------------------------------------------------------------

fn bench_overlay_rebuild(c: &mut Criterion) {
    let overlay = DebugOverlayConfig::new()
        .with_normals(true)
        .with_wireframe(true);
    let renderer = MeshRenderer::new(
        EntityId(1),
        services(),
        MeshRendererConfig::new().with_overlay(overlay),
    );
    renderer.bind_geometry(Some(GeometrySource::new_loaded(
        "grid",
        GeometryData::from_submeshes(vec![grid(32)]),
    )));
    let device = NullDevice;

    c.bench_function("overlay_rebuild_32x32", |b| {
        b.iter(|| {
            renderer.recompute_attribute_flags();
            black_box(renderer.overlay_entries(OverlayChannel::Normal, &Mat4::IDENTITY, &device))
        });
    });
}

fn bench_overlay_cached(c: &mut Criterion) {
    let overlay = DebugOverlayConfig::new().with_wireframe(true);
    let renderer = MeshRenderer::new(
        EntityId(1),
        services(),
        MeshRendererConfig::new().with_overlay(overlay),
    );
    renderer.bind_geometry(Some(GeometrySource::new_loaded(
        "grid",
        GeometryData::from_submeshes(vec![grid(32)]),
    )));
    let device = NullDevice;
    renderer.overlay_entries(OverlayChannel::Wireframe, &Mat4::IDENTITY, &device);

    c.bench_function("overlay_cached_lookup", |b| {
        b.iter(|| {
            black_box(renderer.overlay_entries(
                OverlayChannel::Wireframe,
                &Mat4::IDENTITY,
                &device,
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_edge_indices,
    bench_line_scale,
    bench_index_encode,
    bench_overlay_rebuild,
    bench_overlay_cached,
);
criterion_main!(benches);
