//! Error types for the Rose framework.

use std::time::Duration;

use thiserror::Error;
use tower::BoxError;

use crate::capability::Capability;

/// Why a configured module did not make it into the registry.
///
/// None of these abort startup: the registry logs the error, records it and
/// moves on to the next module.
#[derive(Debug, Error)]
pub enum ModuleLoadError {
    /// No descriptor with this name exists in the catalog.
    #[error("module '{name}' is not available")]
    Unknown { name: String },

    /// The module's canonical key is already taken by an earlier module.
    #[error("module '{name}' has key '{key}', already used by module '{existing}'")]
    Duplicate {
        name: String,
        key: String,
        existing: String,
    },

    /// The descriptor produced an unusable module (e.g. an empty display name).
    #[error("module '{name}' is malformed: {reason}")]
    Malformed { name: String, reason: String },

    /// The module's factory returned an error.
    #[error("module '{name}' failed to initialise: {source}")]
    Init {
        name: String,
        #[source]
        source: BoxError,
    },
}

impl ModuleLoadError {
    /// Name of the module the error refers to.
    pub fn module_name(&self) -> &str {
        match self {
            Self::Unknown { name }
            | Self::Duplicate { name, .. }
            | Self::Malformed { name, .. }
            | Self::Init { name, .. } => name,
        }
    }
}

/// A capability callback failed or overran its time bound.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{capability} callback of module '{module}' failed: {source}")]
    Failed {
        module: String,
        capability: Capability,
        #[source]
        source: BoxError,
    },

    #[error("{capability} callback of module '{module}' timed out after {timeout:?}")]
    TimedOut {
        module: String,
        capability: Capability,
        timeout: Duration,
    },
}

impl CapabilityError {
    pub fn module(&self) -> &str {
        match self {
            Self::Failed { module, .. } | Self::TimedOut { module, .. } => module,
        }
    }
}

/// A help or settings request named a key that is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no module with key '{key}'")]
pub struct NotFound {
    pub key: String,
}

impl NotFound {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

pub type ModuleLoadResult<T> = Result<T, ModuleLoadError>;
pub type CapabilityResult<T> = Result<T, CapabilityError>;
