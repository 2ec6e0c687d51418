use crate::error::MeshRendererError;

/// Whether a mesh is drawn into the shadow pass.
///
/// Only `Off` and `On` are supported. Raw values 2 (two-sided) and 3
/// (shadows only) are reserved and rejected by [`TryFrom<u32>`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ShadowCastingMode {
    /// Casts no shadow.
    #[default]
    Off = 0,
    /// Casts shadows from front faces.
    On = 1,
}

impl ShadowCastingMode {
    /// Whether this mode puts the mesh into the shadow pass.
    pub fn casts_shadow(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl TryFrom<u32> for ShadowCastingMode {
    type Error = MeshRendererError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::On),
            other => Err(MeshRendererError::InvalidShadowCastingMode(other)),
        }
    }
}

impl From<ShadowCastingMode> for u32 {
    fn from(mode: ShadowCastingMode) -> Self {
        mode as u32
    }
}
