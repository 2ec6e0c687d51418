//! Vertex format descriptors.
//!
//! A [`VertexFormat`] lists the per-vertex attribute channels a submesh
//! declares. Formats are shared via `Arc` between submeshes that use the same
//! layout, so renderers can compare them by pointer.

/// Semantic meaning of a per-vertex data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKind {
    /// Vertex position (typically 3 floats).
    Position,
    /// Vertex normal (typically 3 floats).
    Normal,
    /// Texture coordinates set 0 (typically 2 floats).
    Uv0,
    /// Vertex tangent (typically 4 floats, w = handedness).
    Tangent,
    /// Vertex color (typically 4 floats or 4 normalized bytes).
    Color,
    /// Joint indices for skinning.
    Joints,
    /// Joint weights for skinning.
    Weights,
}

impl AttributeKind {
    /// All attribute kinds, in declaration order.
    pub const ALL: [AttributeKind; 7] = [
        Self::Position,
        Self::Normal,
        Self::Uv0,
        Self::Tangent,
        Self::Color,
        Self::Joints,
        Self::Weights,
    ];
}

/// Numeric type of a single attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeType {
    /// 32-bit float.
    #[default]
    Float32,
    /// 8-bit unsigned integer.
    Uint8,
    /// 16-bit unsigned integer.
    Uint16,
    /// 32-bit unsigned integer.
    Uint32,
}

impl AttributeType {
    /// Size in bytes of one component.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Float32 | Self::Uint32 => 4,
        }
    }
}

/// One attribute channel of a vertex format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Which channel this element describes.
    pub kind: AttributeKind,
    /// Number of components per vertex.
    pub count: u32,
    /// Component type.
    pub ty: AttributeType,
}

impl VertexElement {
    /// Create a new element.
    pub fn new(kind: AttributeKind, count: u32, ty: AttributeType) -> Self {
        Self { kind, count, ty }
    }

    /// A float element with `count` components.
    pub fn float(kind: AttributeKind, count: u32) -> Self {
        Self::new(kind, count, AttributeType::Float32)
    }

    /// Size in bytes of this element for one vertex.
    pub fn size(&self) -> usize {
        self.count as usize * self.ty.size()
    }
}

/// The set of attribute channels declared by a submesh.
///
/// Each [`AttributeKind`] appears at most once; adding a kind that is already
/// present replaces the previous element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    elements: Vec<VertexElement>,
}

impl VertexFormat {
    /// Create an empty format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, replacing any element of the same kind.
    pub fn with_element(mut self, element: VertexElement) -> Self {
        self.push(element);
        self
    }

    /// Position-only format (float3).
    pub fn position_only() -> Self {
        Self::new().with_element(VertexElement::float(AttributeKind::Position, 3))
    }

    /// Interleaved position, normal and uv0 (float3, float3, float2).
    pub fn position_normal_uv() -> Self {
        Self::position_only()
            .with_element(VertexElement::float(AttributeKind::Normal, 3))
            .with_element(VertexElement::float(AttributeKind::Uv0, 2))
    }

    fn push(&mut self, element: VertexElement) {
        match self.elements.iter_mut().find(|e| e.kind == element.kind) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
    }

    /// Look up the element declared for `kind`.
    pub fn element(&self, kind: AttributeKind) -> Option<&VertexElement> {
        self.elements.iter().find(|e| e.kind == kind)
    }

    /// Whether this format declares `kind`.
    pub fn has(&self, kind: AttributeKind) -> bool {
        self.element(kind).is_some()
    }

    /// Declared elements in order.
    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Size in bytes of one interleaved vertex.
    pub fn stride(&self) -> usize {
        self.elements.iter().map(VertexElement::size).sum()
    }

    /// Number of declared elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no element is declared.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
