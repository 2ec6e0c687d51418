//! Wireframe visualization: triangle edges drawn over the source vertices.

use std::sync::Arc;

use super::device::{BufferUsage, IndexFormat};
use super::{OverlayBuild, OverlayChannel, OverlayEntry, OverlayGeometry, VertexBinding};
use crate::error::{MeshRendererError, Result};
use crate::geometry::{AttributeKind, Submesh};

/// Edge list of a triangle list: `a b c` becomes `a b, b c, c a`.
///
/// A trailing partial triangle is ignored. Shared edges are not deduplicated.
pub fn edge_indices(triangles: &[u32]) -> Vec<u32> {
    let mut edges = Vec::with_capacity(triangles.len() * 2);
    for tri in triangles.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        edges.extend_from_slice(&[a, b, b, c, c, a]);
    }
    edges
}

pub(super) fn build(
    submesh: &Submesh,
    index: usize,
    ctx: &OverlayBuild<'_>,
    color: [f32; 4],
) -> Result<OverlayEntry> {
    if !submesh.format().has(AttributeKind::Position) {
        return Err(MeshRendererError::MissingAttributeForOverlay {
            channel: OverlayChannel::Wireframe.name(),
            submesh: index,
            attribute: AttributeKind::Position,
        });
    }

    let edges = edge_indices(submesh.indices());
    let index_format = IndexFormat::fitting(&edges);
    let index_buffer = ctx.device.create_index_buffer(
        index_format,
        BufferUsage::INDEX,
        &index_format.encode(&edges),
    );

    Ok(OverlayEntry {
        submesh: index,
        material: ctx.material(color),
        geometry: OverlayGeometry {
            format: Arc::clone(submesh.format()),
            vertices: VertexBinding::Source { submesh: index },
            vertex_count: submesh.vertex_count(),
            indices: index_buffer,
            index_format,
            index_count: edges.len(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_indices() {
        assert_eq!(
            edge_indices(&[0, 1, 2, 2, 1, 3]),
            vec![0, 1, 1, 2, 2, 0, 2, 1, 1, 3, 3, 2]
        );
    }

    #[test]
    fn test_edge_indices_ignores_partial_triangle() {
        assert_eq!(edge_indices(&[4, 5, 6, 7, 8]), vec![4, 5, 5, 6, 6, 4]);
        assert!(edge_indices(&[]).is_empty());
    }
}
