use std::sync::Arc;

use crate::material::{
    MaterialHandle, MaterialKind, MaterialRegistry, MaterialValue, TextureHandle, DIFFUSE_TEXTURE,
};
use crate::services::EntityId;

/// Sparse, index-addressed material list. Slot `i` is used by submesh `i`.
#[derive(Debug, Clone, Default)]
pub struct MaterialSlots {
    slots: Vec<Option<MaterialHandle>>,
}

impl MaterialSlots {
    /// Get the material at `index`, if assigned.
    pub fn get(&self, index: usize) -> Option<&MaterialHandle> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Assign or clear the material at `index`, growing the list as needed.
    pub fn set(&mut self, index: usize, material: Option<MaterialHandle>) {
        if index >= self.slots.len() {
            if material.is_none() {
                return;
            }
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = material;
    }

    /// Number of slots, assigned or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Snapshot of all slots.
    pub fn to_vec(&self) -> Vec<Option<MaterialHandle>> {
        self.slots.clone()
    }

    /// Get slot 0, filling it with the registry default when empty.
    pub(crate) fn primary_or_default(
        &mut self,
        registry: &dyn MaterialRegistry,
        kind: MaterialKind,
    ) -> MaterialHandle {
        if let Some(material) = self.get(0) {
            return Arc::clone(material);
        }
        let material = registry.default_material(kind);
        self.set(0, Some(Arc::clone(&material)));
        material
    }
}

/// Textures assigned through the pre-material API, upgraded to materials once.
#[derive(Debug, Clone, Default)]
pub(crate) struct LegacyTextures {
    textures: Vec<TextureHandle>,
    upgraded: Option<Vec<TextureHandle>>,
}

impl LegacyTextures {
    pub fn textures(&self) -> &[TextureHandle] {
        &self.textures
    }

    pub fn set(&mut self, textures: Vec<TextureHandle>) {
        self.textures = textures;
    }

    fn already_upgraded(&self) -> bool {
        self.upgraded.as_ref().is_some_and(|done| {
            done.len() == self.textures.len()
                && done.iter().zip(&self.textures).all(|(a, b)| Arc::ptr_eq(a, b))
        })
    }

    /// Give every texture without a material at its index an owned copy of the
    /// default material with the texture bound. Existing materials are kept.
    ///
    /// Returns the number of materials created.
    pub fn upgrade(
        &mut self,
        slots: &mut MaterialSlots,
        registry: &dyn MaterialRegistry,
        kind: MaterialKind,
        owner: EntityId,
    ) -> usize {
        if self.textures.is_empty() || self.already_upgraded() {
            return 0;
        }
        let mut created = 0;
        for (index, texture) in self.textures.iter().enumerate() {
            if slots.get(index).is_some() {
                continue;
            }
            let base = registry.default_material(kind);
            let material = registry.instantiate(&base, owner);
            material.set_property(DIFFUSE_TEXTURE, MaterialValue::Texture(Arc::clone(texture)));
            slots.set(index, Some(material));
            created += 1;
        }
        log::debug!("Upgraded {created} legacy textures to materials");
        self.upgraded = Some(self.textures.clone());
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{BuiltinMaterials, Material, Texture};

    #[test]
    fn test_set_grows_and_clears() {
        let mut slots = MaterialSlots::default();
        slots.set(2, Some(Arc::new(Material::new("m", MaterialKind::Standard))));
        assert_eq!(slots.len(), 3);
        assert!(slots.get(0).is_none());
        assert!(slots.get(2).is_some());

        slots.set(2, None);
        assert!(slots.get(2).is_none());
        slots.set(10, None);
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn test_primary_or_default_fills_once() {
        let registry = BuiltinMaterials::new();
        let mut slots = MaterialSlots::default();
        let first = slots.primary_or_default(&registry, MaterialKind::Unlit);
        let second = slots.primary_or_default(&registry, MaterialKind::Unlit);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn test_upgrade_keeps_existing_materials() {
        let registry = BuiltinMaterials::new();
        let mut slots = MaterialSlots::default();
        let custom = Arc::new(Material::new("custom", MaterialKind::Standard));
        slots.set(1, Some(Arc::clone(&custom)));

        let mut legacy = LegacyTextures::default();
        legacy.set(vec![Texture::new("a"), Texture::new("b")]);
        let created = legacy.upgrade(&mut slots, &registry, MaterialKind::Unlit, EntityId(4));

        assert_eq!(created, 1);
        assert!(Arc::ptr_eq(slots.get(1).unwrap(), &custom));
        let upgraded = slots.get(0).unwrap();
        assert_eq!(upgraded.owner(), Some(EntityId(4)));
        assert!(Arc::ptr_eq(
            &upgraded.texture(DIFFUSE_TEXTURE).unwrap(),
            &legacy.textures()[0]
        ));
    }

    #[test]
    fn test_upgrade_runs_once_per_list() {
        let registry = BuiltinMaterials::new();
        let mut slots = MaterialSlots::default();
        let mut legacy = LegacyTextures::default();
        legacy.set(vec![Texture::new("a")]);

        assert_eq!(legacy.upgrade(&mut slots, &registry, MaterialKind::Unlit, EntityId(1)), 1);
        slots.set(0, None);
        assert_eq!(legacy.upgrade(&mut slots, &registry, MaterialKind::Unlit, EntityId(1)), 0);
        assert!(slots.get(0).is_none());

        legacy.set(vec![Texture::new("b")]);
        assert_eq!(legacy.upgrade(&mut slots, &registry, MaterialKind::Unlit, EntityId(1)), 1);
    }
}
