//! Render state of a mesh-bearing entity.
//!
//! A [`MeshRenderer`] keeps three derived states in step with the geometry it
//! is bound to:
//!
//! - shader feature flags for the attributes of the primary submesh and for
//!   the shadow settings
//! - the local-space [`BoundingVolume`]
//! - per-submesh debug overlays (feature `debug-overlay`)
//!
//! # Binding protocol
//!
//! [`MeshRenderer::bind_geometry`] releases every listener held on the old
//! source and subscribes to layout changes of the new one. A loaded source is
//! applied at once. An unloaded source marks the entity non-renderable,
//! registers a one-shot load listener and asks the asset pipeline to stream it
//! in; the listener applies the source exactly as a direct bind would have.
//!
//! Listeners only hold a weak reference to the renderer state. Dropping or
//! [destroying](MeshRenderer::destroy) a renderer unsubscribes them, so no
//! callback reaches a destroyed renderer.
//!
//! The asset pipeline and the render-flag sink are never called while the
//! renderer state is locked, so they may call back into the renderer (an asset
//! pipeline may complete a load synchronously from
//! [`AssetPipeline::request_load`](crate::AssetPipeline::request_load)). The
//! [`MaterialRegistry`](crate::MaterialRegistry) and the overlay
//! [`GraphicsDevice`](crate::overlay::GraphicsDevice) are called with the state
//! locked and must not call back into the renderer.

mod config;
mod materials;
mod shadow;

use std::sync::{Arc, Weak};

pub use config::MeshRendererConfig;
pub use materials::MaterialSlots;
pub use shadow::ShadowCastingMode;

use materials::LegacyTextures;
use parking_lot::Mutex;

use crate::bounds::BoundingVolume;
use crate::error::{self, MeshRendererError, Result};
use crate::flags::{
    FeatureFlagSet, FlagValue, CASTS_SHADOW, HAS_COLOR, HAS_NORMAL, HAS_TANGENT, HAS_UV0,
    RECEIVES_SHADOW_MAP,
};
use crate::geometry::{
    AttributeKind, GeometryChange, GeometrySource, SubscriptionToken, VertexFormat,
};
use crate::material::{MaterialHandle, MaterialKind, TextureHandle};
use crate::pool::{ArenaHandle, MeshAssembler};
use crate::services::{EntityId, RenderServices};

#[cfg(feature = "debug-overlay")]
use crate::overlay::{
    DebugOverlayCache, DebugOverlayConfig, GraphicsDevice, OverlayBuild, OverlayChannel,
    OverlayEntry,
};
#[cfg(feature = "debug-overlay")]
use glam::Mat4;

/// Attribute flags derived from the primary submesh.
const ATTRIBUTE_FLAGS: [(&str, AttributeKind); 4] = [
    (HAS_COLOR, AttributeKind::Color),
    (HAS_UV0, AttributeKind::Uv0),
    (HAS_NORMAL, AttributeKind::Normal),
    (HAS_TANGENT, AttributeKind::Tangent),
];

/// Changes the render-flag system has to hear about.
#[derive(Debug, Default, Clone, Copy)]
struct FlagUpdate {
    renderable: Option<bool>,
    transform: bool,
}

struct RendererCore {
    entity: EntityId,
    enabled: bool,
    destroyed: bool,
    geometry: Option<Arc<GeometrySource>>,
    format_token: Option<SubscriptionToken>,
    load_token: Option<SubscriptionToken>,
    flags: FeatureFlagSet,
    bounds: BoundingVolume,
    renderable: bool,
    receive_shadows: bool,
    shadow_casting_mode: ShadowCastingMode,
    enable_auto_batch: bool,
    default_material_kind: MaterialKind,
    materials: MaterialSlots,
    legacy_textures: LegacyTextures,
    assembler: Option<ArenaHandle>,
    #[cfg(feature = "debug-overlay")]
    overlay: DebugOverlayCache,
}

impl RendererCore {
    fn is_bound_to(&self, source: &GeometrySource) -> bool {
        self.geometry
            .as_deref()
            .is_some_and(|bound| std::ptr::eq(bound, source))
    }

    fn release_subscriptions(&mut self) {
        let Some(source) = &self.geometry else {
            return;
        };
        for token in [self.format_token.take(), self.load_token.take()]
            .into_iter()
            .flatten()
        {
            source.unsubscribe(token);
        }
    }

    fn apply_shadow_flags(&mut self) {
        self.flags.define_all([
            (RECEIVES_SHADOW_MAP, FlagValue::Bool(self.receive_shadows)),
            (
                CASTS_SHADOW,
                FlagValue::Bool(self.shadow_casting_mode.casts_shadow()),
            ),
        ]);
    }

    fn primary_format(&self) -> Option<Arc<VertexFormat>> {
        let source = self.geometry.as_deref()?;
        if source.submesh_count() == 0 {
            return None;
        }
        match source.vertex_format(0) {
            Ok(format) => Some(format),
            Err(err @ MeshRendererError::NotLoaded { .. }) => {
                error::contract_violation(&err);
                None
            }
            Err(_) => None,
        }
    }

    /// Attribute flags follow the primary submesh; without one they are all off.
    fn recompute_attribute_flags(&mut self, services: &RenderServices) {
        let format = self.primary_format();
        let values = ATTRIBUTE_FLAGS.map(|(name, kind)| {
            let present = format.as_ref().is_some_and(|f| f.has(kind));
            (name, FlagValue::Bool(present))
        });
        self.flags.define_all(values);

        #[cfg(feature = "debug-overlay")]
        self.overlay.invalidate();

        self.sync_assembler(services);
    }

    fn sync_assembler(&self, services: &RenderServices) {
        let Some(handle) = self.assembler else {
            return;
        };
        let mut arena = services.assemblers.lock();
        if let Some(assembler) = arena.get_mut(handle) {
            assembler.submesh_count = self
                .geometry
                .as_ref()
                .map_or(0, |source| source.submesh_count());
            assembler.flags_version = self.flags.version();
            if self.enabled {
                assembler.node = Some(self.entity);
            }
        }
    }

    fn check_renderable(&mut self) -> bool {
        self.renderable = match self.geometry.as_deref() {
            Some(source) if source.is_loaded() => {
                let has_data = source.has_renderable_submesh();
                if !has_data {
                    let err = MeshRendererError::EmptyGeometry {
                        label: source.label().to_string(),
                    };
                    log::warn!("Renderer {:?}: {err}", self.entity);
                }
                has_data
            }
            _ => false,
        };
        self.renderable
    }

    /// Derive everything from a bound, loaded source.
    fn apply_loaded(&mut self, services: &RenderServices) -> FlagUpdate {
        let previous = self.bounds;
        self.bounds.recompute(self.geometry.as_deref());
        self.recompute_attribute_flags(services);
        let renderable = self.check_renderable();
        FlagUpdate {
            renderable: Some(renderable && self.enabled),
            transform: self.bounds != previous,
        }
    }

    /// Reset derived state while no loaded geometry is available.
    fn apply_unavailable(&mut self, services: &RenderServices) -> FlagUpdate {
        let previous = self.bounds;
        self.bounds = BoundingVolume::Empty;
        self.recompute_attribute_flags(services);
        self.renderable = false;
        FlagUpdate {
            renderable: Some(false),
            transform: self.bounds != previous,
        }
    }
}

struct Shared {
    core: Mutex<RendererCore>,
    services: RenderServices,
}

impl Shared {
    fn publish(&self, entity: EntityId, update: FlagUpdate) {
        if let Some(renderable) = update.renderable {
            self.services
                .render_flags
                .mark_renderable(entity, renderable);
        }
        if update.transform {
            self.services.render_flags.request_transform_recompute(entity);
        }
    }

    /// Wait for `source` to load and ask the pipeline to stream it in.
    fn begin_load(self: &Arc<Self>, source: &Arc<GeometrySource>) {
        let pending = self.core.lock().load_token.is_some();
        if !pending {
            let weak: Weak<Self> = Arc::downgrade(self);
            let token = source.subscribe_loaded(move |loaded| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_loaded(loaded);
                }
            });
            if !token.is_inert() {
                let mut core = self.core.lock();
                // the load may have landed between subscribing and relocking
                if core.destroyed || !core.is_bound_to(source) || source.is_loaded() {
                    drop(core);
                    source.unsubscribe(token);
                } else {
                    core.load_token = Some(token);
                }
            }
        }
        self.services.assets.request_load(source);
    }

    fn subscribe_changes(self: &Arc<Self>, source: &GeometrySource) -> SubscriptionToken {
        let weak: Weak<Self> = Arc::downgrade(self);
        source.subscribe_format_changed(move |changed, change| {
            if let Some(shared) = weak.upgrade() {
                shared.on_changed(changed, change);
            }
        })
    }

    fn on_loaded(&self, source: &GeometrySource) {
        let (entity, update) = {
            let mut core = self.core.lock();
            if core.destroyed || !core.is_bound_to(source) {
                return;
            }
            core.load_token = None;
            log::debug!("Renderer {:?}: geometry '{}' loaded", core.entity, source.label());
            (core.entity, core.apply_loaded(&self.services))
        };
        self.publish(entity, update);
    }

    fn on_changed(&self, source: &GeometrySource, change: GeometryChange) {
        let (entity, update) = {
            let mut core = self.core.lock();
            if core.destroyed || !core.is_bound_to(source) {
                return;
            }
            let update = match change {
                GeometryChange::Format { .. } => {
                    core.recompute_attribute_flags(&self.services);
                    // bounds stay; a submesh may have lost or gained its data
                    let previous = core.renderable;
                    let renderable = core.check_renderable();
                    FlagUpdate {
                        renderable: (renderable != previous)
                            .then_some(renderable && core.enabled),
                        transform: false,
                    }
                }
                GeometryChange::Reloaded => core.apply_loaded(&self.services),
            };
            (core.entity, update)
        };
        self.publish(entity, update);
    }
}

/// Render state of one mesh entity.
///
/// Cloning is not supported; the renderer owns its subscriptions and its
/// assembler slot, both released on [`destroy`](Self::destroy) or drop.
pub struct MeshRenderer {
    shared: Arc<Shared>,
}

impl MeshRenderer {
    /// Create an enabled renderer for `entity` with no geometry bound.
    pub fn new(entity: EntityId, services: RenderServices, config: MeshRendererConfig) -> Self {
        let assembler = {
            let mut arena = services.assemblers.lock();
            let handle = arena.acquire();
            if let Some(slot) = arena.get_mut(handle) {
                slot.node = Some(entity);
            }
            handle
        };

        let mut core = RendererCore {
            entity,
            enabled: true,
            destroyed: false,
            geometry: None,
            format_token: None,
            load_token: None,
            flags: FeatureFlagSet::new(),
            bounds: BoundingVolume::Empty,
            renderable: false,
            receive_shadows: config.receive_shadows,
            shadow_casting_mode: config.shadow_casting_mode,
            enable_auto_batch: config.enable_auto_batch,
            default_material_kind: config.default_material_kind,
            materials: MaterialSlots::default(),
            legacy_textures: LegacyTextures::default(),
            assembler: Some(assembler),
            #[cfg(feature = "debug-overlay")]
            overlay: DebugOverlayCache::new(config.overlay),
        };
        core.apply_shadow_flags();
        core.recompute_attribute_flags(&services);

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                services,
            }),
        }
    }

    /// Entity this renderer belongs to.
    pub fn entity(&self) -> EntityId {
        self.shared.core.lock().entity
    }

    /// Currently bound geometry.
    pub fn geometry(&self) -> Option<Arc<GeometrySource>> {
        self.shared.core.lock().geometry.clone()
    }

    /// Bind `source`, or unbind with `None`.
    ///
    /// Rebinding the current source does nothing.
    pub fn bind_geometry(&self, source: Option<Arc<GeometrySource>>) {
        let shared = &self.shared;
        let mut core = shared.core.lock();
        if core.destroyed {
            log::warn!("Renderer {:?}: bind after destroy ignored", core.entity);
            return;
        }
        let unchanged = match (&core.geometry, &source) {
            (Some(current), Some(next)) => Arc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        core.release_subscriptions();
        core.geometry = source.clone();
        let entity = core.entity;

        let Some(source) = source else {
            log::debug!("Renderer {entity:?}: geometry unbound");
            let update = core.apply_unavailable(&shared.services);
            drop(core);
            shared.publish(entity, FlagUpdate { transform: true, ..update });
            return;
        };

        log::debug!("Renderer {entity:?}: binding geometry '{}'", source.label());
        core.format_token = Some(shared.subscribe_changes(&source));

        if source.is_loaded() {
            let update = core.apply_loaded(&shared.services);
            drop(core);
            shared.publish(entity, FlagUpdate { transform: true, ..update });
            return;
        }

        let update = core.apply_unavailable(&shared.services);
        drop(core);
        shared.publish(entity, FlagUpdate { transform: true, ..update });
        shared.begin_load(&source);
    }

    /// Snapshot of the shader feature flags.
    pub fn feature_flags(&self) -> FeatureFlagSet {
        self.shared.core.lock().flags.clone()
    }

    /// Local-space bounds of the bound geometry.
    pub fn bounding_volume(&self) -> BoundingVolume {
        self.shared.core.lock().bounds
    }

    /// Re-derive the attribute flags from the primary submesh of the bound
    /// geometry and empty the debug overlays.
    pub fn recompute_attribute_flags(&self) {
        let mut core = self.shared.core.lock();
        core.recompute_attribute_flags(&self.shared.services);
    }

    /// Check that bound geometry is loaded and has a submesh with data.
    ///
    /// An invalid renderer is excluded from the draw pass.
    pub fn validate_renderable(&self) -> bool {
        let (entity, valid) = {
            let mut core = self.shared.core.lock();
            (core.entity, core.check_renderable())
        };
        if !valid {
            self.shared.publish(
                entity,
                FlagUpdate {
                    renderable: Some(false),
                    transform: false,
                },
            );
        }
        valid
    }

    /// Result of the last renderability check.
    pub fn is_renderable(&self) -> bool {
        self.shared.core.lock().renderable
    }

    /// Whether the mesh samples the shadow map.
    pub fn receive_shadows(&self) -> bool {
        self.shared.core.lock().receive_shadows
    }

    /// Set whether the mesh samples the shadow map.
    pub fn set_receive_shadows(&self, receive: bool) {
        let mut core = self.shared.core.lock();
        core.receive_shadows = receive;
        core.apply_shadow_flags();
    }

    /// Shadow casting mode.
    pub fn shadow_casting_mode(&self) -> ShadowCastingMode {
        self.shared.core.lock().shadow_casting_mode
    }

    /// Set the shadow casting mode.
    pub fn set_shadow_casting_mode(&self, mode: ShadowCastingMode) {
        let mut core = self.shared.core.lock();
        core.shadow_casting_mode = mode;
        core.apply_shadow_flags();
    }

    /// Set the shadow casting mode from its raw value.
    ///
    /// Unsupported values are rejected and leave the mode unchanged.
    pub fn set_shadow_casting_mode_raw(&self, raw: u32) -> Result<()> {
        let mode = ShadowCastingMode::try_from(raw)?;
        self.set_shadow_casting_mode(mode);
        Ok(())
    }

    /// Whether draws may be merged with compatible renderers.
    pub fn enable_auto_batch(&self) -> bool {
        self.shared.core.lock().enable_auto_batch
    }

    /// Set the auto-batch hint.
    pub fn set_enable_auto_batch(&self, enable: bool) {
        self.shared.core.lock().enable_auto_batch = enable;
    }

    /// Material at `index`.
    ///
    /// Reading an empty slot 0 stores the registry's default material there and
    /// returns it; later reads return the same handle.
    pub fn material_at(&self, index: usize) -> Option<MaterialHandle> {
        let mut core = self.shared.core.lock();
        if index == 0 {
            let kind = core.default_material_kind;
            let registry = &*self.shared.services.materials;
            return Some(core.materials.primary_or_default(registry, kind));
        }
        core.materials.get(index).cloned()
    }

    /// Assign or clear the material at `index`.
    pub fn set_material(&self, index: usize, material: Option<MaterialHandle>) {
        self.shared.core.lock().materials.set(index, material);
    }

    /// Snapshot of all material slots.
    pub fn materials(&self) -> Vec<Option<MaterialHandle>> {
        self.shared.core.lock().materials.to_vec()
    }

    /// Textures assigned through the pre-material API.
    pub fn legacy_textures(&self) -> Vec<TextureHandle> {
        self.shared.core.lock().legacy_textures.textures().to_vec()
    }

    /// Replace the legacy texture list. Call
    /// [`upgrade_legacy_textures`](Self::upgrade_legacy_textures) or re-enable
    /// the renderer to turn them into materials.
    pub fn set_legacy_textures(&self, textures: Vec<TextureHandle>) {
        self.shared.core.lock().legacy_textures.set(textures);
    }

    /// Give every legacy texture without a material at its index an owned
    /// material with that texture bound. Runs once per texture list.
    ///
    /// Returns the number of materials created.
    pub fn upgrade_legacy_textures(&self) -> usize {
        let mut guard = self.shared.core.lock();
        let core = &mut *guard;
        core.legacy_textures.upgrade(
            &mut core.materials,
            &*self.shared.services.materials,
            core.default_material_kind,
            core.entity,
        )
    }

    /// Whether the renderer takes part in rendering.
    pub fn is_enabled(&self) -> bool {
        self.shared.core.lock().enabled
    }

    /// Enable or disable rendering.
    ///
    /// Enabling re-applies the bound geometry (loading it if needed), upgrades
    /// legacy textures, fills the default material and re-attaches the
    /// assembler to the entity. Disabling excludes the entity from the draw pass.
    pub fn set_enabled(&self, enabled: bool) {
        let shared = &self.shared;
        let mut core = shared.core.lock();
        if core.destroyed || core.enabled == enabled {
            return;
        }
        core.enabled = enabled;
        let entity = core.entity;

        if !enabled {
            drop(core);
            log::debug!("Renderer {entity:?} disabled");
            shared.publish(
                entity,
                FlagUpdate {
                    renderable: Some(false),
                    transform: false,
                },
            );
            return;
        }

        log::debug!("Renderer {entity:?} enabled");
        let registry = &*shared.services.materials;
        let kind = core.default_material_kind;
        {
            let core = &mut *core;
            core.legacy_textures
                .upgrade(&mut core.materials, registry, kind, entity);
            core.materials.primary_or_default(registry, kind);
        }
        core.apply_shadow_flags();

        let pending = core.geometry.clone().filter(|source| !source.is_loaded());
        let update = if core.geometry.is_some() && pending.is_none() {
            core.apply_loaded(&shared.services)
        } else {
            core.apply_unavailable(&shared.services)
        };
        drop(core);
        shared.publish(entity, update);
        if let Some(source) = pending {
            shared.begin_load(&source);
        }
    }

    /// Release subscriptions and the assembler slot.
    ///
    /// Afterwards no geometry callback reaches this renderer and every
    /// mutation is ignored. Also run on drop.
    pub fn destroy(&self) {
        let (entity, assembler) = {
            let mut core = self.shared.core.lock();
            if core.destroyed {
                return;
            }
            core.release_subscriptions();
            core.geometry = None;
            core.destroyed = true;
            core.enabled = false;
            core.renderable = false;
            #[cfg(feature = "debug-overlay")]
            core.overlay.invalidate();
            (core.entity, core.assembler.take())
        };
        if let Some(handle) = assembler {
            self.shared.services.assemblers.lock().release(handle);
        }
        log::debug!("Renderer {entity:?} destroyed");
        self.shared.publish(
            entity,
            FlagUpdate {
                renderable: Some(false),
                transform: false,
            },
        );
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.shared.core.lock().destroyed
    }

    /// Snapshot of this renderer's assembler slot.
    pub fn assembler(&self) -> Option<MeshAssembler> {
        let handle = self.shared.core.lock().assembler?;
        self.shared.services.assemblers.lock().get(handle).cloned()
    }

    /// Overlay entries of `channel`, rebuilding stale channels first.
    ///
    /// `world` is the entity's world transform, used to size normal lines.
    #[cfg(feature = "debug-overlay")]
    pub fn overlay_entries(
        &self,
        channel: OverlayChannel,
        world: &Mat4,
        device: &dyn GraphicsDevice,
    ) -> Vec<OverlayEntry> {
        let mut core = self.shared.core.lock();
        if let Some(source) = core.geometry.clone() {
            let ctx = OverlayBuild {
                owner: core.entity,
                world,
                materials: &*self.shared.services.materials,
                device,
            };
            core.overlay.refresh(&source, &ctx);
        }
        core.overlay.entries(channel).cloned().collect()
    }

    /// Number of cached overlay slots of `channel`.
    #[cfg(feature = "debug-overlay")]
    pub fn overlay_len(&self, channel: OverlayChannel) -> usize {
        self.shared.core.lock().overlay.len(channel)
    }

    /// Active overlay switches.
    #[cfg(feature = "debug-overlay")]
    pub fn overlay_config(&self) -> DebugOverlayConfig {
        *self.shared.core.lock().overlay.config()
    }

    /// Replace the overlay switches.
    #[cfg(feature = "debug-overlay")]
    pub fn set_overlay_config(&self, config: DebugOverlayConfig) {
        self.shared.core.lock().overlay.set_config(config);
    }
}

impl Drop for MeshRenderer {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for MeshRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("MeshRenderer")
            .field("entity", &core.entity)
            .field("enabled", &core.enabled)
            .field("geometry", &core.geometry.as_ref().map(|g| g.label()))
            .field("renderable", &core.renderable)
            .field("bounds", &core.bounds)
            .finish()
    }
}
