#[cfg(feature = "debug-overlay")]
use crate::overlay::DebugOverlayConfig;

use super::ShadowCastingMode;
use crate::material::MaterialKind;

/// Initial settings of a [`MeshRenderer`](super::MeshRenderer).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeshRendererConfig {
    /// Kind of the default material placed in empty slot 0.
    pub default_material_kind: MaterialKind,
    /// Whether the mesh samples the shadow map.
    pub receive_shadows: bool,
    /// Whether the mesh is drawn into the shadow pass.
    pub shadow_casting_mode: ShadowCastingMode,
    /// Hint that draws may be merged with compatible renderers.
    pub enable_auto_batch: bool,
    /// Debug overlay switches.
    #[cfg(feature = "debug-overlay")]
    pub overlay: DebugOverlayConfig,
}

impl MeshRendererConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default material kind.
    pub fn with_default_material_kind(mut self, kind: MaterialKind) -> Self {
        self.default_material_kind = kind;
        self
    }

    /// Set whether the mesh samples the shadow map.
    pub fn with_receive_shadows(mut self, receive: bool) -> Self {
        self.receive_shadows = receive;
        self
    }

    /// Set the shadow casting mode.
    pub fn with_shadow_casting_mode(mut self, mode: ShadowCastingMode) -> Self {
        self.shadow_casting_mode = mode;
        self
    }

    /// Set the auto-batch hint.
    pub fn with_auto_batch(mut self, enable: bool) -> Self {
        self.enable_auto_batch = enable;
        self
    }

    /// Set the debug overlay switches.
    #[cfg(feature = "debug-overlay")]
    pub fn with_overlay(mut self, overlay: DebugOverlayConfig) -> Self {
        self.overlay = overlay;
        self
    }
}
