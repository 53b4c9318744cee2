//! Module descriptor and catalog: the static side of a module.

use tower::BoxError;

use super::Module;
use super::context::ModuleContext;

// ─── ModuleDescriptor ─────────────────────────────────────────────────────────

/// A static, `Copy` handle that names a module and knows how to build it.
#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    /// Catalog identifier (what `modules.load` / `modules.no_load` refer to).
    pub name: &'static str,

    /// Factory that creates the live [`Module`].
    pub create: fn(&ModuleContext) -> Result<Module, BoxError>,
}

impl ModuleDescriptor {
    pub const fn new(
        name: &'static str,
        create: fn(&ModuleContext) -> Result<Module, BoxError>,
    ) -> Self {
        Self { name, create }
    }

    #[inline]
    pub fn instantiate(&self, ctx: &ModuleContext) -> Result<Module, BoxError> {
        (self.create)(ctx)
    }
}

// ─── ModuleCatalog ────────────────────────────────────────────────────────────

/// Every module compiled into the binary, in default load order.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    descriptors: Vec<ModuleDescriptor>,
}

impl ModuleCatalog {
    pub fn new(descriptors: impl IntoIterator<Item = ModuleDescriptor>) -> Self {
        Self {
            descriptors: descriptors.into_iter().collect(),
        }
    }

    /// Adds a descriptor (builder pattern).
    pub fn with(mut self, descriptor: ModuleDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.iter().map(|d| d.name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Resolves the configured module list.
    ///
    /// Starts from `load`, or every catalog name in catalog order when `load`
    /// is empty, then drops every name in `no_load`.  Order is preserved and
    /// names unknown to the catalog are passed through so that loading
    /// reports them.
    pub fn select<S: AsRef<str>>(&self, load: &[S], no_load: &[S]) -> Vec<String> {
        let base: Vec<String> = if load.is_empty() {
            self.names().map(str::to_string).collect()
        } else {
            load.iter().map(|s| s.as_ref().to_string()).collect()
        };
        base.into_iter()
            .filter(|name| !no_load.iter().any(|n| n.as_ref() == name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &ModuleContext) -> Result<Module, BoxError> {
        Ok(Module::new("noop"))
    }

    fn catalog() -> ModuleCatalog {
        ModuleCatalog::new([
            ModuleDescriptor::new("rules", noop),
            ModuleDescriptor::new("rss", noop),
            ModuleDescriptor::new("warns", noop),
        ])
    }

    #[test]
    fn test_select_all_minus_no_load() {
        let none: [&str; 0] = [];
        assert_eq!(catalog().select(&none, &["rss"]), ["rules", "warns"]);
    }

    #[test]
    fn test_select_explicit_load_keeps_order() {
        assert_eq!(
            catalog().select(&["warns", "rules", "weather"], &[]),
            ["warns", "rules", "weather"]
        );
    }

    #[test]
    fn test_select_everything_when_unconfigured() {
        let none: [&str; 0] = [];
        assert_eq!(catalog().select(&none, &none), ["rules", "rss", "warns"]);
    }
}
