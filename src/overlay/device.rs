//! Graphics device seam used to realize overlay geometry.

use crate::geometry::VertexFormat;

/// Handle to a GPU buffer created by a [`GraphicsDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

impl BufferHandle {
    /// Wrap a device-specific buffer id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Device-specific buffer id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// How an overlay buffer is bound when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferUsage(u32);

impl BufferUsage {
    /// Bound as an index buffer.
    pub const INDEX: Self = Self(1 << 0);
    /// Bound as a vertex buffer.
    pub const VERTEX: Self = Self(1 << 1);

    /// Whether every bit of `other` is set.
    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Raw bits, for devices that map usages onto their own flags.
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Narrowest format able to address every index in `indices`.
    pub fn fitting(indices: &[u32]) -> Self {
        if indices.iter().all(|&i| i <= u16::MAX as u32) {
            Self::Uint16
        } else {
            Self::Uint32
        }
    }

    /// Encode `indices` as raw bytes in this format.
    pub fn encode(&self, indices: &[u32]) -> Vec<u8> {
        match self {
            Self::Uint16 => {
                let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
                bytemuck::cast_slice(&narrow).to_vec()
            }
            Self::Uint32 => bytemuck::cast_slice(indices).to_vec(),
        }
    }
}

/// Buffer factory of the rendering backend.
pub trait GraphicsDevice: Send + Sync {
    /// Create a vertex buffer holding `data` laid out as `format`.
    fn create_vertex_buffer(
        &self,
        format: &VertexFormat,
        usage: BufferUsage,
        data: &[u8],
    ) -> BufferHandle;

    /// Create an index buffer holding `data` encoded as `format`.
    fn create_index_buffer(
        &self,
        format: IndexFormat,
        usage: BufferUsage,
        data: &[u8],
    ) -> BufferHandle;
}
