//! Normal visualization: one line per vertex along its normal.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::device::{BufferUsage, IndexFormat};
use super::{OverlayBuild, OverlayChannel, OverlayEntry, OverlayGeometry, VertexBinding};
use crate::error::{MeshRendererError, Result};
use crate::geometry::{AttributeKind, Submesh, VertexElement, VertexFormat};

/// World-independent length of normal lines.
///
/// A reference vector of `reference_length` is pulled through the inverse of
/// `world`, so lines keep roughly the same on-screen size however the entity
/// is scaled. A singular `world` falls back to `reference_length`.
pub fn line_scale(world: &Mat4, reference_length: f32) -> f32 {
    let det = world.determinant();
    if det == 0.0 || !det.is_finite() {
        log::warn!("Singular world matrix, normal overlay uses unscaled lines");
        return reference_length;
    }
    world
        .inverse()
        .transform_vector3(Vec3::new(reference_length, 0.0, 0.0))
        .length()
}

/// Per-vertex channel copied through to the line vertices, such as joints.
struct Passthrough<'a> {
    count: usize,
    data: &'a [f32],
}

impl<'a> Passthrough<'a> {
    fn of(submesh: &'a Submesh, kind: AttributeKind, vertex_count: usize) -> Option<Self> {
        let element = submesh.format().element(kind)?;
        let data = submesh.attribute(kind)?;
        let count = element.count as usize;
        (count > 0 && data.len() >= vertex_count * count).then_some(Self { count, data })
    }

    fn vertex(&self, index: usize) -> &[f32] {
        &self.data[index * self.count..(index + 1) * self.count]
    }
}

fn channel_data<'a>(
    submesh: &'a Submesh,
    index: usize,
    kind: AttributeKind,
) -> Result<(usize, &'a [f32])> {
    let missing = MeshRendererError::MissingAttributeForOverlay {
        channel: OverlayChannel::Normal.name(),
        submesh: index,
        attribute: kind,
    };
    let element = submesh.format().element(kind).ok_or_else(|| missing.clone())?;
    let data = submesh.attribute(kind).ok_or_else(|| missing.clone())?;
    if element.count < 3 {
        return Err(missing);
    }
    Ok((element.count as usize, data))
}

pub(super) fn build(
    submesh: &Submesh,
    index: usize,
    ctx: &OverlayBuild<'_>,
    scale: f32,
    color: [f32; 4],
) -> Result<OverlayEntry> {
    let (pos_stride, positions) = channel_data(submesh, index, AttributeKind::Position)?;
    let (normal_stride, normals) = channel_data(submesh, index, AttributeKind::Normal)?;

    let vertex_count = (positions.len() / pos_stride).min(normals.len() / normal_stride);
    let joints = Passthrough::of(submesh, AttributeKind::Joints, vertex_count);
    let weights = Passthrough::of(submesh, AttributeKind::Weights, vertex_count);

    let mut format =
        VertexFormat::new().with_element(VertexElement::float(AttributeKind::Position, 3));
    if let Some(j) = &joints {
        format = format.with_element(VertexElement::float(AttributeKind::Joints, j.count as u32));
    }
    if let Some(w) = &weights {
        format = format.with_element(VertexElement::float(AttributeKind::Weights, w.count as u32));
    }

    let floats_per_line = 2 * format.stride() / std::mem::size_of::<f32>();
    let mut vertices = Vec::with_capacity(vertex_count * floats_per_line);
    let mut indices = Vec::with_capacity(vertex_count * 2);

    for i in 0..vertex_count {
        let p = &positions[i * pos_stride..];
        let n = &normals[i * normal_stride..];
        let start = Vec3::new(p[0], p[1], p[2]);
        let end = start + Vec3::new(n[0], n[1], n[2]) * scale;

        for point in [start, end] {
            vertices.extend_from_slice(bytemuck::cast_ref::<Vec3, [f32; 3]>(&point));
            if let Some(j) = &joints {
                vertices.extend_from_slice(j.vertex(i));
            }
            if let Some(w) = &weights {
                vertices.extend_from_slice(w.vertex(i));
            }
        }

        let base = (i * 2) as u32;
        indices.extend_from_slice(&[base, base + 1]);
    }

    let vertex_buffer = ctx.device.create_vertex_buffer(
        &format,
        BufferUsage::VERTEX,
        bytemuck::cast_slice(&vertices),
    );
    let index_format = IndexFormat::fitting(&indices);
    let index_buffer = ctx.device.create_index_buffer(
        index_format,
        BufferUsage::INDEX,
        &index_format.encode(&indices),
    );

    Ok(OverlayEntry {
        submesh: index,
        material: ctx.material(color),
        geometry: OverlayGeometry {
            format: Arc::new(format),
            vertices: VertexBinding::Owned(vertex_buffer),
            vertex_count: vertex_count * 2,
            indices: index_buffer,
            index_format,
            index_count: indices.len(),
        },
    })
}
