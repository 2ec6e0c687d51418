//! Shader feature switches derived from renderer state.
//!
//! A [`FeatureFlagSet`] maps flag names to small values that select shader
//! variants. Every write is diffed against the stored value: only real
//! changes bump [`FeatureFlagSet::version`], so dependents can cheaply detect
//! whether anything they care about moved.
//!
//! Writes are crate-private; the owning renderer is the only mutator.

use std::collections::BTreeMap;

/// Vertex color attribute present on the primary submesh.
pub const HAS_COLOR: &str = "has-color";
/// UV set 0 present on the primary submesh.
pub const HAS_UV0: &str = "has-uv0";
/// Normal attribute present on the primary submesh.
pub const HAS_NORMAL: &str = "has-normal";
/// Tangent attribute present on the primary submesh.
pub const HAS_TANGENT: &str = "has-tangent";
/// The entity samples the shadow map.
pub const RECEIVES_SHADOW_MAP: &str = "receives-shadow-map";
/// The entity is drawn into the shadow pass.
pub const CASTS_SHADOW: &str = "casts-shadow";

/// Value stored for a feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagValue {
    /// On/off switch.
    Bool(bool),
    /// Small enumerated selector.
    Int(u32),
}

impl FlagValue {
    /// Whether this value turns the feature on.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(v) => *v != 0,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u32> for FlagValue {
    fn from(value: u32) -> Self {
        Self::Int(value)
    }
}

/// Sparse set of named shader feature switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlagSet {
    values: BTreeMap<&'static str, FlagValue>,
    version: u64,
}

impl FeatureFlagSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of a flag, if defined.
    pub fn get(&self, name: &str) -> Option<FlagValue> {
        self.values.get(name).copied()
    }

    /// Whether a flag is defined and enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v.is_enabled())
    }

    /// Number of defined flags.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no flag is defined.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Defined flags in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FlagValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Change counter, bumped once per write that altered at least one value.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Define a single flag. Returns `true` if the stored value changed.
    pub(crate) fn define(&mut self, name: &'static str, value: impl Into<FlagValue>) -> bool {
        let changed = self.store(name, value.into());
        if changed {
            self.version += 1;
        }
        changed
    }

    /// Define a batch of flags as one update.
    ///
    /// All values are applied before the version is bumped, and the version is
    /// bumped at most once. Returns the names whose value actually changed.
    pub(crate) fn define_all<I>(&mut self, flags: I) -> Vec<&'static str>
    where
        I: IntoIterator<Item = (&'static str, FlagValue)>,
    {
        let changed: Vec<&'static str> = flags
            .into_iter()
            .filter_map(|(name, value)| self.store(name, value).then_some(name))
            .collect();
        if !changed.is_empty() {
            self.version += 1;
        }
        changed
    }

    fn store(&mut self, name: &'static str, value: FlagValue) -> bool {
        let previous = self.values.insert(name, value);
        if previous == Some(value) {
            return false;
        }
        log::trace!("feature flag {name}: {previous:?} -> {value:?}");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_reports_changes_only() {
        let mut flags = FeatureFlagSet::new();
        assert!(flags.define(HAS_NORMAL, true));
        assert_eq!(flags.version(), 1);

        assert!(!flags.define(HAS_NORMAL, true));
        assert_eq!(flags.version(), 1);

        assert!(flags.define(HAS_NORMAL, false));
        assert_eq!(flags.version(), 2);
        assert_eq!(flags.get(HAS_NORMAL), Some(FlagValue::Bool(false)));
    }

    #[test]
    fn test_define_all_bumps_version_once() {
        let mut flags = FeatureFlagSet::new();
        let changed = flags.define_all([
            (HAS_COLOR, FlagValue::Bool(true)),
            (HAS_UV0, FlagValue::Bool(false)),
        ]);
        assert_eq!(changed, vec![HAS_COLOR, HAS_UV0]);
        assert_eq!(flags.version(), 1);

        let changed = flags.define_all([
            (HAS_COLOR, FlagValue::Bool(true)),
            (HAS_UV0, FlagValue::Bool(true)),
        ]);
        assert_eq!(changed, vec![HAS_UV0]);
        assert_eq!(flags.version(), 2);

        let changed = flags.define_all([(HAS_COLOR, FlagValue::Bool(true))]);
        assert!(changed.is_empty());
        assert_eq!(flags.version(), 2);
    }

    #[test]
    fn test_is_enabled() {
        let mut flags = FeatureFlagSet::new();
        assert!(!flags.is_enabled(CASTS_SHADOW));

        flags.define(CASTS_SHADOW, true);
        flags.define("shadow-quality", 0u32);
        assert!(flags.is_enabled(CASTS_SHADOW));
        assert!(!flags.is_enabled("shadow-quality"));

        flags.define("shadow-quality", 2u32);
        assert!(flags.is_enabled("shadow-quality"));
        assert_eq!(flags.len(), 2);
    }

    #[test]
    fn test_iter_is_name_ordered() {
        let mut flags = FeatureFlagSet::new();
        flags.define(HAS_UV0, true);
        flags.define(CASTS_SHADOW, false);
        let names: Vec<_> = flags.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec![CASTS_SHADOW, HAS_UV0]);
    }
}
