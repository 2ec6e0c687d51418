//! CPU-side submesh data as delivered by the asset pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;

use super::format::{AttributeKind, VertexFormat};

/// An independently indexed partition of a mesh asset.
///
/// Attribute channels are stored de-interleaved as flat `f32` buffers with
/// `element.count` components per vertex. Buffers are `Arc`-shared so that
/// readers can hold on to them without copying.
#[derive(Clone)]
pub struct Submesh {
    format: Arc<VertexFormat>,
    attributes: BTreeMap<AttributeKind, Arc<[f32]>>,
    indices: Arc<[u32]>,
    label: Option<String>,
}

impl Submesh {
    /// Create an empty submesh with the given vertex format.
    pub fn new(format: Arc<VertexFormat>) -> Self {
        Self {
            format,
            attributes: BTreeMap::new(),
            indices: Arc::from(Vec::new()),
            label: None,
        }
    }

    /// Set the data buffer of one attribute channel.
    pub fn with_attribute(mut self, kind: AttributeKind, data: Vec<f32>) -> Self {
        self.attributes.insert(kind, Arc::from(data));
        self
    }

    /// Set the triangle index list.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Arc::from(indices);
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the vertex format.
    pub fn format(&self) -> &Arc<VertexFormat> {
        &self.format
    }

    /// Get the data buffer of one attribute channel, if present.
    pub fn attribute(&self, kind: AttributeKind) -> Option<&Arc<[f32]>> {
        self.attributes.get(&kind)
    }

    /// Get the index list.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Get the debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Number of vertices, derived from the position channel.
    pub fn vertex_count(&self) -> usize {
        let Some(element) = self.format.element(AttributeKind::Position) else {
            return 0;
        };
        if element.count == 0 {
            return 0;
        }
        self.attributes
            .get(&AttributeKind::Position)
            .map(|data| data.len() / element.count as usize)
            .unwrap_or(0)
    }

    /// Whether this submesh carries any vertex data.
    pub fn has_data(&self) -> bool {
        self.vertex_count() > 0
    }
}

impl std::fmt::Debug for Submesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submesh")
            .field("label", &self.label)
            .field("format", &self.format)
            .field("vertex_count", &self.vertex_count())
            .field("index_count", &self.indices.len())
            .finish()
    }
}

/// Everything a mesh asset provides once streamed in.
#[derive(Debug, Clone)]
pub struct GeometryData {
    /// Submeshes in draw order.
    pub submeshes: Vec<Arc<Submesh>>,
    /// Minimum corner of the position extent.
    pub min: Vec3,
    /// Maximum corner of the position extent.
    pub max: Vec3,
}

impl GeometryData {
    /// Create geometry data with a pre-reduced extent and no submeshes.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            submeshes: Vec::new(),
            min,
            max,
        }
    }

    /// Append a submesh.
    pub fn with_submesh(mut self, submesh: Submesh) -> Self {
        self.submeshes.push(Arc::new(submesh));
        self
    }

    /// Build geometry data from submeshes, reducing the extent from their positions.
    ///
    /// Submeshes without positions do not contribute. With no positions at all
    /// the extent collapses to the origin.
    pub fn from_submeshes(submeshes: Vec<Submesh>) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        let mut any = false;

        for submesh in &submeshes {
            let Some(element) = submesh.format().element(AttributeKind::Position) else {
                continue;
            };
            let Some(data) = submesh.attribute(AttributeKind::Position) else {
                continue;
            };
            let stride = element.count as usize;
            if stride < 3 {
                continue;
            }
            for p in data.chunks_exact(stride) {
                let p = Vec3::new(p[0], p[1], p[2]);
                min = min.min(p);
                max = max.max(p);
                any = true;
            }
        }

        if !any {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }

        Self {
            submeshes: submeshes.into_iter().map(Arc::new).collect(),
            min,
            max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Submesh {
        Submesh::new(Arc::new(VertexFormat::position_only()))
            .with_attribute(
                AttributeKind::Position,
                vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, -1.0],
            )
            .with_indices(vec![0, 1, 2])
    }

    #[test]
    fn test_vertex_count_from_positions() {
        let submesh = triangle();
        assert_eq!(submesh.vertex_count(), 3);
        assert!(submesh.has_data());
        assert_eq!(submesh.indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_submesh_without_positions_has_no_data() {
        let submesh = Submesh::new(Arc::new(VertexFormat::new()))
            .with_attribute(AttributeKind::Normal, vec![0.0, 1.0, 0.0]);
        assert_eq!(submesh.vertex_count(), 0);
        assert!(!submesh.has_data());
    }

    #[test]
    fn test_from_submeshes_reduces_extent() {
        let data = GeometryData::from_submeshes(vec![triangle()]);
        assert_eq!(data.submeshes.len(), 1);
        assert_eq!(data.min, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(data.max, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_from_submeshes_without_positions() {
        let data = GeometryData::from_submeshes(Vec::new());
        assert_eq!(data.min, Vec3::ZERO);
        assert_eq!(data.max, Vec3::ZERO);
    }
}
