//! Capability tags and the collections the registry indexes modules by.
//!
//! Help and settings capabilities are looked up by canonical key (a button
//! names the module it belongs to), so they live in a [`CapabilityMap`].
//! Migration, stats, user info and import/export are invoked for every module
//! that has them, so they live in a [`CapabilityList`].  Both keep the
//! configured load order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::module::Module;

/// A named optional behaviour a module may opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Help,
    Migrate,
    Stats,
    UserInfo,
    ImportData,
    ExportData,
    ChatSettings,
    UserSettings,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Self::Help,
        Self::Migrate,
        Self::Stats,
        Self::UserInfo,
        Self::ImportData,
        Self::ExportData,
        Self::ChatSettings,
        Self::UserSettings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Migrate => "migrate",
            Self::Stats => "stats",
            Self::UserInfo => "user_info",
            Self::ImportData => "import_data",
            Self::ExportData => "export_data",
            Self::ChatSettings => "chat_settings",
            Self::UserSettings => "user_settings",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── CapabilityMap ───────────────────────────────────────────────────────────

/// Canonical key → module, iterated in insertion order.
#[derive(Clone, Default)]
pub struct CapabilityMap {
    entries: Vec<(String, Arc<Module>)>,
    index: HashMap<String, usize>,
}

impl CapabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `module` under `key`.
    ///
    /// Returns `false` and leaves the map untouched if the key is taken.
    pub fn insert(&mut self, key: impl Into<String>, module: Arc<Module>) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, module));
        true
    }

    /// Removes and returns the module under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Arc<Module>> {
        let pos = self.index.remove(key)?;
        let (_, module) = self.entries.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(module)
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Module>> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.entries.iter().map(|(_, m)| m)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Module>)> {
        self.entries.iter().map(|(k, m)| (k.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

// ─── CapabilityList ──────────────────────────────────────────────────────────

/// Modules invoked unconditionally, in load order.
#[derive(Clone, Default)]
pub struct CapabilityList {
    modules: Vec<Arc<Module>>,
}

impl CapabilityList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, module: Arc<Module>) {
        self.modules.push(module);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.modules.iter().map(|m| m.canonical_key())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl FromIterator<Arc<Module>> for CapabilityList {
    fn from_iter<I: IntoIterator<Item = Arc<Module>>>(iter: I) -> Self {
        Self {
            modules: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for CapabilityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}
