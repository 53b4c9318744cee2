//! The module registry.
//!
//! [`Registry::load_all`] walks the configured module names in order,
//! instantiates each module from the [`ModuleCatalog`], enforces uniqueness
//! of canonical keys and partitions the modules into capability collections.
//!
//! A module that fails to load (unknown name, factory error, malformed
//! descriptor, duplicate key) is logged, recorded in
//! [`failures`](Registry::failures) and skipped.  It never prevents the
//! remaining modules from loading.
//!
//! The registry is built once at startup.  There is no unload or reload: the
//! finished [`Registry`] is immutable and is shared behind an `Arc`, so
//! concurrent reads need no locking.
//!
//! ```text
//! load_all(["rules", "warns", "users"])
//!     ├── modules        rules, warnings, users         (canonical key → module)
//!     ├── helpable       rules, warnings, users
//!     ├── chat_settings  rules, warnings
//!     ├── migrateable    [rules, warnings, users]       (load order)
//!     └── stats          [rules, warnings, users]
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::capability::{Capability, CapabilityList, CapabilityMap};
use crate::error::{ModuleLoadError, ModuleLoadResult};
use crate::matcher::Matcher;
use crate::module::{Module, ModuleCatalog, ModuleEnv};

// ─── RegistryBuilder ──────────────────────────────────────────────────────────

/// Append-only registry under construction.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live module under its canonical key.
    ///
    /// Fails without touching any collection when the key is already taken
    /// or the display name is blank.
    pub fn register(&mut self, module: Module) -> ModuleLoadResult<()> {
        if module.name().trim().is_empty() {
            return Err(ModuleLoadError::Malformed {
                name: module.id().to_string(),
                reason: "display name is empty".into(),
            });
        }

        let key = module.canonical_key();
        if let Some(existing) = self.registry.modules.get(&key) {
            return Err(ModuleLoadError::Duplicate {
                name: module.id().to_string(),
                key,
                existing: existing.id().to_string(),
            });
        }

        let module = Arc::new(module);
        let reg = &mut self.registry;
        reg.modules.insert(key.clone(), Arc::clone(&module));

        for capability in module.capabilities() {
            let m = Arc::clone(&module);
            match capability {
                Capability::Help => {
                    reg.helpable.insert(key.clone(), m);
                }
                Capability::ChatSettings => {
                    reg.chat_settings.insert(key.clone(), m);
                }
                Capability::UserSettings => {
                    reg.user_settings.insert(key.clone(), m);
                }
                Capability::Migrate => reg.migrateable.push(m),
                Capability::Stats => reg.stats.push(m),
                Capability::UserInfo => reg.user_info.push(m),
                Capability::ImportData => reg.data_import.push(m),
                Capability::ExportData => reg.data_export.push(m),
            }
        }
        Ok(())
    }

    /// Records a load failure.
    pub fn record_failure(&mut self, err: ModuleLoadError) {
        error!(module = %err.module_name(), error = %err, "Module failed to load, skipping");
        self.registry.failures.push(err);
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// Frozen set of loaded modules, indexed by capability.
#[derive(Debug, Default)]
pub struct Registry {
    modules: CapabilityMap,
    helpable: CapabilityMap,
    chat_settings: CapabilityMap,
    user_settings: CapabilityMap,
    migrateable: CapabilityList,
    stats: CapabilityList,
    user_info: CapabilityList,
    data_import: CapabilityList,
    data_export: CapabilityList,
    failures: Vec<ModuleLoadError>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Loads the named modules in order.
    pub fn load_all<S: AsRef<str>>(names: &[S], catalog: &ModuleCatalog, env: &ModuleEnv) -> Self {
        let mut builder = RegistryBuilder::new();

        for name in names {
            let name = name.as_ref();
            let Some(descriptor) = catalog.get(name) else {
                builder.record_failure(ModuleLoadError::Unknown {
                    name: name.to_string(),
                });
                continue;
            };

            let ctx = env.context_for(name);
            let result = descriptor
                .instantiate(&ctx)
                .map_err(|source| ModuleLoadError::Init {
                    name: name.to_string(),
                    source,
                })
                .and_then(|module| builder.register(module));

            if let Err(err) = result {
                builder.record_failure(err);
            }
        }

        let registry = builder.build();
        info!(
            modules = %registry.modules.keys().collect::<Vec<_>>().join(", "),
            failed = registry.failures.len(),
            "Successfully loaded modules"
        );
        registry
    }

    /// Main map: every loaded module by canonical key.
    pub fn modules(&self) -> &CapabilityMap {
        &self.modules
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Module>> {
        self.modules.get(key)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn helpable(&self) -> &CapabilityMap {
        &self.helpable
    }

    pub fn chat_settings(&self) -> &CapabilityMap {
        &self.chat_settings
    }

    pub fn user_settings(&self) -> &CapabilityMap {
        &self.user_settings
    }

    pub fn migrateable(&self) -> &CapabilityList {
        &self.migrateable
    }

    pub fn stats(&self) -> &CapabilityList {
        &self.stats
    }

    pub fn user_info(&self) -> &CapabilityList {
        &self.user_info
    }

    pub fn data_import(&self) -> &CapabilityList {
        &self.data_import
    }

    pub fn data_export(&self) -> &CapabilityList {
        &self.data_export
    }

    /// Modules that were configured but not loaded, with the reason.
    pub fn failures(&self) -> &[ModuleLoadError] {
        &self.failures
    }

    /// Every loaded module's matchers, in load order.
    pub fn matchers(&self) -> impl Iterator<Item = &Matcher> {
        self.modules.modules().flat_map(|m| m.matchers().iter())
    }
}
