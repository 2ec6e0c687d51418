//! Slot arena for per-renderer render bindings.
//!
//! Each live [`MeshRenderer`](crate::MeshRenderer) owns exactly one
//! [`MeshAssembler`] slot in a shared [`AssemblerArena`]. Slots are handed
//! out with [`Arena::acquire`] and given back with [`Arena::release`]; a
//! released slot keeps its allocation and is reused by the next acquire.
//!
//! Handles carry a generation, so a handle that outlived its slot can neither
//! read the slot's new occupant nor release it a second time.
//!
//! # Example
//!
//! ```
//! use redlilium_mesh_renderer::pool::{Arena, Poolable};
//!
//! #[derive(Debug, Default)]
//! struct Scratch {
//!     data: Vec<u8>,
//! }
//!
//! impl Poolable for Scratch {
//!     fn new_empty() -> Self {
//!         Self::default()
//!     }
//!     fn reset(&mut self) {
//!         self.data.clear();
//!     }
//! }
//!
//! let mut arena = Arena::<Scratch>::new();
//! let handle = arena.acquire();
//! arena.get_mut(handle).unwrap().data.push(1);
//!
//! assert!(arena.release(handle));
//! assert!(!arena.release(handle));
//! assert!(arena.get(handle).is_none());
//! ```

use crate::services::EntityId;

/// Trait for types that can live in an [`Arena`] slot.
///
/// Implementors must be able to create an empty instance and clear their
/// contents while preserving allocated capacity.
pub trait Poolable {
    /// Create a new empty instance for a fresh slot.
    fn new_empty() -> Self;

    /// Reset the value to an empty state, preserving allocated capacity.
    fn reset(&mut self);
}

/// Generation-checked reference to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaHandle {
    index: u32,
    generation: u32,
}

impl ArenaHandle {
    /// Slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot had when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    active: bool,
    value: T,
}

/// Free-list arena of reusable values.
#[derive(Debug)]
pub struct Arena<T: Poolable> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T: Poolable> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T: Poolable> Arena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a slot, reusing a released one when available.
    pub fn acquire(&mut self) -> ArenaHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.active = true;
            return ArenaHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            active: true,
            value: T::new_empty(),
        });
        ArenaHandle {
            index,
            generation: 0,
        }
    }

    fn slot(&self, handle: ArenaHandle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.active && s.generation == handle.generation)
    }

    /// Get the value behind a live handle.
    pub fn get(&self, handle: ArenaHandle) -> Option<&T> {
        self.slot(handle).map(|s| &s.value)
    }

    /// Get the value behind a live handle mutably.
    pub fn get_mut(&mut self, handle: ArenaHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &mut s.value)
    }

    /// Whether `handle` still refers to its slot.
    pub fn contains(&self, handle: ArenaHandle) -> bool {
        self.slot(handle).is_some()
    }

    /// Return a slot to the free list.
    ///
    /// Returns `false` and leaves the arena untouched if the handle is stale
    /// or was already released.
    pub fn release(&mut self, handle: ArenaHandle) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.active && s.generation == handle.generation)
        else {
            log::warn!("Ignoring release of stale arena handle {handle:?}");
            return false;
        };
        slot.value.reset();
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        true
    }

    /// Number of slots in use.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether no slot is in use.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Render binding mirrored from a renderer to the draw pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MeshAssembler {
    /// Entity whose transform the binding follows.
    pub node: Option<EntityId>,
    /// Submesh count of the bound geometry at the last sync.
    pub submesh_count: usize,
    /// Feature flag version at the last sync.
    pub flags_version: u64,
}

impl Poolable for MeshAssembler {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.node = None;
        self.submesh_count = 0;
        self.flags_version = 0;
    }
}

/// Arena of [`MeshAssembler`] slots shared by every renderer of a scene.
pub type AssemblerArena = Arena<MeshAssembler>;
