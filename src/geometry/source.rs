//! Shared, observable view of a mesh asset.
//!
//! A [`GeometrySource`] starts out unloaded and is populated by the asset
//! pipeline through [`GeometrySource::complete_load`]. Renderers never mutate
//! it; they read its data and register listeners that fire when it loads or
//! when its vertex layout changes afterwards.
//!
//! Listeners are invoked with no internal lock held, so a listener may freely
//! read the source and subscribe or unsubscribe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::{Mutex, RwLock};

use super::data::{GeometryData, Submesh};
use super::format::{AttributeKind, VertexFormat};
use crate::error::{MeshRendererError, Result};

/// What changed on an already-loaded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryChange {
    /// One submesh replaced its vertex layout or data.
    Format {
        /// Index of the submesh that changed.
        submesh: usize,
    },
    /// The whole asset was streamed in again; extents may differ too.
    Reloaded,
}

/// Handle identifying one registered listener.
///
/// Pass it back to [`GeometrySource::unsubscribe`] to release the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// A token that refers to no listener (the callback already ran).
    pub const INERT: Self = Self(0);

    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this token still refers to a listener slot.
    pub fn is_inert(&self) -> bool {
        self.0 == 0
    }
}

type LoadedListener = Arc<dyn Fn(&GeometrySource) + Send + Sync>;
type ChangeListener = Arc<dyn Fn(&GeometrySource, GeometryChange) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    loaded: Vec<(SubscriptionToken, LoadedListener)>,
    changed: Vec<(SubscriptionToken, ChangeListener)>,
}

/// Read-only mesh asset view shared between renderers.
pub struct GeometrySource {
    label: String,
    data: RwLock<Option<GeometryData>>,
    listeners: Mutex<Listeners>,
}

impl GeometrySource {
    /// Create a source that has not been streamed in yet.
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            data: RwLock::new(None),
            listeners: Mutex::new(Listeners::default()),
        })
    }

    /// Create a source that is already loaded.
    pub fn new_loaded(label: impl Into<String>, data: GeometryData) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            data: RwLock::new(Some(data)),
            listeners: Mutex::new(Listeners::default()),
        })
    }

    /// Get the debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the asset pipeline has delivered the geometry.
    pub fn is_loaded(&self) -> bool {
        self.data.read().is_some()
    }

    /// Number of submeshes; zero while unloaded.
    pub fn submesh_count(&self) -> usize {
        self.data
            .read()
            .as_ref()
            .map(|d| d.submeshes.len())
            .unwrap_or(0)
    }

    fn not_loaded(&self) -> MeshRendererError {
        MeshRendererError::NotLoaded {
            label: self.label.clone(),
        }
    }

    /// Get a submesh by index.
    pub fn submesh(&self, index: usize) -> Result<Arc<Submesh>> {
        let data = self.data.read();
        let data = data.as_ref().ok_or_else(|| self.not_loaded())?;
        data.submeshes
            .get(index)
            .cloned()
            .ok_or(MeshRendererError::SubmeshOutOfRange {
                index,
                count: data.submeshes.len(),
            })
    }

    /// Get the vertex format of a submesh.
    pub fn vertex_format(&self, index: usize) -> Result<Arc<VertexFormat>> {
        self.submesh(index).map(|s| Arc::clone(s.format()))
    }

    /// Get the data buffer of one attribute channel of a submesh.
    ///
    /// Returns `Ok(None)` when the submesh carries no data for `kind`.
    pub fn attribute_data(&self, index: usize, kind: AttributeKind) -> Result<Option<Arc<[f32]>>> {
        self.submesh(index).map(|s| s.attribute(kind).cloned())
    }

    /// Minimum corner of the pre-reduced position extent.
    pub fn extent_min(&self) -> Result<Vec3> {
        self.extent().map(|(min, _)| min)
    }

    /// Maximum corner of the pre-reduced position extent.
    pub fn extent_max(&self) -> Result<Vec3> {
        self.extent().map(|(_, max)| max)
    }

    /// Both extent corners, read under a single lock.
    pub fn extent(&self) -> Result<(Vec3, Vec3)> {
        let data = self.data.read();
        let data = data.as_ref().ok_or_else(|| self.not_loaded())?;
        Ok((data.min, data.max))
    }

    /// Whether at least one submesh carries vertex data.
    pub fn has_renderable_submesh(&self) -> bool {
        self.data
            .read()
            .as_ref()
            .is_some_and(|d| d.submeshes.iter().any(|s| s.has_data()))
    }

    /// Register a one-shot callback fired when the geometry finishes loading.
    ///
    /// If the source is already loaded the callback runs immediately and an
    /// inert token is returned.
    pub fn subscribe_loaded<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(&GeometrySource) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        if self.is_loaded() {
            drop(listeners);
            callback(self);
            return SubscriptionToken::INERT;
        }
        let token = SubscriptionToken::next();
        let listener: LoadedListener = Arc::new(callback);
        listeners.loaded.push((token, listener));
        token
    }

    /// Register a callback fired on every layout change after load.
    pub fn subscribe_format_changed<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(&GeometrySource, GeometryChange) + Send + Sync + 'static,
    {
        let token = SubscriptionToken::next();
        let listener: ChangeListener = Arc::new(callback);
        self.listeners.lock().changed.push((token, listener));
        token
    }

    /// Release a listener. Returns `false` if the token was unknown.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        if token.is_inert() {
            return false;
        }
        let mut listeners = self.listeners.lock();
        let before = listeners.loaded.len() + listeners.changed.len();
        listeners.loaded.retain(|(t, _)| *t != token);
        listeners.changed.retain(|(t, _)| *t != token);
        before != listeners.loaded.len() + listeners.changed.len()
    }

    /// Number of registered listeners (one-shot and repeatable).
    pub fn listener_count(&self) -> usize {
        let listeners = self.listeners.lock();
        listeners.loaded.len() + listeners.changed.len()
    }

    /// Deliver streamed geometry. Called by the asset pipeline.
    ///
    /// The first delivery fires the one-shot loaded listeners. A delivery on an
    /// already-loaded source is a reload and fires the change listeners with
    /// [`GeometryChange::Reloaded`].
    pub fn complete_load(&self, data: GeometryData) {
        // listeners stay locked across the store so no subscriber slips between
        let (was_loaded, loaded) = {
            let mut listeners = self.listeners.lock();
            let mut slot = self.data.write();
            let was_loaded = slot.is_some();
            *slot = Some(data);
            (was_loaded, std::mem::take(&mut listeners.loaded))
        };

        log::debug!(
            "Geometry '{}' {} ({} submeshes)",
            self.label,
            if was_loaded { "reloaded" } else { "loaded" },
            self.submesh_count()
        );

        for (_, listener) in loaded {
            listener(self);
        }

        if was_loaded {
            self.notify_changed(GeometryChange::Reloaded);
        }
    }

    /// Replace one submesh after load, e.g. when its vertex layout is rebuilt.
    pub fn update_submesh(&self, index: usize, submesh: Submesh) -> Result<()> {
        {
            let mut data = self.data.write();
            let data = data.as_mut().ok_or_else(|| self.not_loaded())?;
            let count = data.submeshes.len();
            let slot = data
                .submeshes
                .get_mut(index)
                .ok_or(MeshRendererError::SubmeshOutOfRange { index, count })?;
            *slot = Arc::new(submesh);
        }
        self.notify_changed(GeometryChange::Format { submesh: index });
        Ok(())
    }

    fn notify_changed(&self, change: GeometryChange) {
        let snapshot: Vec<ChangeListener> = self
            .listeners
            .lock()
            .changed
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(self, change);
        }
    }
}

impl std::fmt::Debug for GeometrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometrySource")
            .field("label", &self.label)
            .field("loaded", &self.is_loaded())
            .field("submeshes", &self.submesh_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
