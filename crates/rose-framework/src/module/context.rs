use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::access::AccessControl;
use crate::store::{MemoryStore, Namespace, Store};

/// Everything a module factory may capture while building its [`Module`](super::Module).
///
/// # Example
///
/// ```rust,ignore
/// #[derive(serde::Deserialize, Default)]
/// #[serde(default)]
/// struct WarnsConfig { default_limit: u32 }
///
/// fn create(ctx: &ModuleContext) -> Result<Module, BoxError> {
///     let cfg: WarnsConfig = ctx.get_config()?;
///     let ns = ctx.namespace();
///     /* ... */
/// }
/// ```
#[derive(Clone)]
pub struct ModuleContext {
    name: String,
    store: Arc<dyn Store>,
    access: Arc<AccessControl>,
    config: Arc<Value>,
}

impl ModuleContext {
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn Store>,
        access: Arc<AccessControl>,
        config: Value,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            access,
            config: Arc::new(config),
        }
    }

    /// The catalog identifier of the module being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's own key space, named after the module.
    pub fn namespace(&self) -> Namespace {
        Namespace::new(Arc::clone(&self.store), self.name.clone())
    }

    /// A key space with an explicit name.
    pub fn namespace_named(&self, name: &str) -> Namespace {
        Namespace::new(Arc::clone(&self.store), name)
    }

    pub fn access(&self) -> Arc<AccessControl> {
        Arc::clone(&self.access)
    }

    /// Deserialises the module's config section into `T`.
    ///
    /// A missing section deserialises from an empty object, so `T` should use
    /// `#[serde(default)]`.
    pub fn get_config<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(self.config.as_ref())
    }
}

impl std::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Shared resources from which each module's [`ModuleContext`] is cut.
#[derive(Clone)]
pub struct ModuleEnv {
    store: Arc<dyn Store>,
    access: Arc<AccessControl>,
    configs: HashMap<String, Value>,
}

impl Default for ModuleEnv {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()), AccessControl::default())
    }
}

impl ModuleEnv {
    pub fn new(store: Arc<dyn Store>, access: AccessControl) -> Self {
        Self {
            store,
            access: Arc::new(access),
            configs: HashMap::new(),
        }
    }

    /// Sets per-module config sections, keyed by catalog identifier.
    pub fn with_configs(mut self, configs: HashMap<String, Value>) -> Self {
        self.configs = configs;
        self
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub fn access(&self) -> Arc<AccessControl> {
        Arc::clone(&self.access)
    }

    pub fn context_for(&self, name: &str) -> ModuleContext {
        let config = self
            .configs
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::default()));
        ModuleContext {
            name: name.to_string(),
            store: Arc::clone(&self.store),
            access: Arc::clone(&self.access),
            config: Arc::new(config),
        }
    }
}
