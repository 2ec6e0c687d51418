//! Materials bound to mesh submeshes.
//!
//! - [`Material`] - a named set of typed properties, shared via [`MaterialHandle`]
//! - [`MaterialRegistry`] - source of shared default materials and per-owner copies
//! - [`BuiltinMaterials`] - in-process registry creating defaults on first use
//!
//! Shared defaults must not be edited through one renderer on behalf of
//! another; renderers that need overrides ask the registry to
//! [`instantiate`](MaterialRegistry::instantiate) a copy they own.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::services::EntityId;

/// Property holding the diffuse texture.
pub const DIFFUSE_TEXTURE: &str = "diffuse_texture";
/// Property holding the diffuse color factor.
pub const DIFFUSE_COLOR: &str = "diffuse_color";

/// Opaque red.
pub const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
/// Opaque black.
pub const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
/// Opaque white.
pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Built-in shading models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialKind {
    /// Flat color/texture, no lighting.
    #[default]
    Unlit,
    /// Lit material.
    Standard,
}

impl MaterialKind {
    /// Registry name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unlit => "unlit",
            Self::Standard => "standard",
        }
    }
}

/// A texture resolved by the application.
#[derive(Debug)]
pub struct Texture {
    name: String,
}

impl Texture {
    /// Create a texture reference with the given name.
    pub fn new(name: impl Into<String>) -> TextureHandle {
        Arc::new(Self { name: name.into() })
    }

    /// Get the texture name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shared texture reference. Compared by identity.
pub type TextureHandle = Arc<Texture>;

/// A typed material property value.
#[derive(Debug, Clone)]
pub enum MaterialValue {
    /// Single float.
    Float(f32),
    /// RGBA color.
    Color([f32; 4]),
    /// Boolean switch.
    Bool(bool),
    /// Texture reference.
    Texture(TextureHandle),
}

impl PartialEq for MaterialValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Color(a), Self::Color(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Texture(a), Self::Texture(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A material: shading model plus property values.
///
/// Properties use interior mutability so a handle can be edited in place by
/// its owner.
#[derive(Debug)]
pub struct Material {
    name: String,
    kind: MaterialKind,
    owner: Option<EntityId>,
    properties: RwLock<BTreeMap<String, MaterialValue>>,
}

impl Material {
    /// Create a material with no properties and no owner.
    pub fn new(name: impl Into<String>, kind: MaterialKind) -> Self {
        Self {
            name: name.into(),
            kind,
            owner: None,
            properties: RwLock::new(BTreeMap::new()),
        }
    }

    /// Set a property while building.
    #[must_use]
    pub fn with_property(self, name: impl Into<String>, value: MaterialValue) -> Self {
        self.properties.write().insert(name.into(), value);
        self
    }

    /// Copy of this material owned by `owner`, with the same property values.
    pub fn copy_for(&self, owner: Option<EntityId>) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            owner,
            properties: RwLock::new(self.properties.read().clone()),
        }
    }

    /// Get the material name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the shading model.
    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    /// Entity this instance belongs to, `None` for shared materials.
    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    /// Set a property value.
    pub fn set_property(&self, name: impl Into<String>, value: MaterialValue) {
        self.properties.write().insert(name.into(), value);
    }

    /// Get a property value.
    pub fn property(&self, name: &str) -> Option<MaterialValue> {
        self.properties.read().get(name).cloned()
    }

    /// Get a texture property.
    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        match self.property(name)? {
            MaterialValue::Texture(t) => Some(t),
            _ => None,
        }
    }

    /// Get a color property.
    pub fn color(&self, name: &str) -> Option<[f32; 4]> {
        match self.property(name)? {
            MaterialValue::Color(c) => Some(c),
            _ => None,
        }
    }
}

/// Shared material reference.
pub type MaterialHandle = Arc<Material>;

/// Source of default materials and per-owner material copies.
pub trait MaterialRegistry: Send + Sync {
    /// Shared default material of the given kind. Repeated calls return the same handle.
    fn default_material(&self, kind: MaterialKind) -> MaterialHandle;

    /// A copy of `base` owned by `owner`, safe to edit.
    fn instantiate(&self, base: &MaterialHandle, owner: EntityId) -> MaterialHandle;
}

/// Registry of built-in materials, created on first request.
#[derive(Debug, Default)]
pub struct BuiltinMaterials {
    defaults: Mutex<HashMap<MaterialKind, MaterialHandle>>,
}

impl BuiltinMaterials {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn create(kind: MaterialKind) -> Material {
        Material::new(kind.name(), kind).with_property(DIFFUSE_COLOR, MaterialValue::Color(WHITE))
    }
}

impl MaterialRegistry for BuiltinMaterials {
    fn default_material(&self, kind: MaterialKind) -> MaterialHandle {
        let mut defaults = self.defaults.lock();
        Arc::clone(
            defaults
                .entry(kind)
                .or_insert_with(|| Arc::new(Self::create(kind))),
        )
    }

    fn instantiate(&self, base: &MaterialHandle, owner: EntityId) -> MaterialHandle {
        Arc::new(base.copy_for(Some(owner)))
    }
}
