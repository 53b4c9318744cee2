//! Chat-migration broadcaster.
//!
//! When a group's id changes, every migration-aware module re-keys its own
//! data.  Modules own disjoint state, so the broadcast is best-effort: one
//! module failing does not keep the others from migrating.

use std::time::Duration;

use tracing::info;

use crate::aggregate::{invoke, log_skipped};
use crate::capability::{Capability, CapabilityList};
use crate::error::CapabilityError;
use rose_core::ChatId;

/// Outcome of one broadcast.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Modules whose callback completed, in order.
    pub migrated: Vec<String>,
    pub failures: Vec<CapabilityError>,
}

impl MigrationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Invokes every module's migration callback with `(old, new)`, in order.
pub async fn on_chat_migrated(
    old: ChatId,
    new: ChatId,
    modules: &CapabilityList,
    timeout: Duration,
) -> MigrationReport {
    info!(old_chat = %old, new_chat = %new, modules = modules.len(), "Migrating chat");

    let mut report = MigrationReport::default();
    for module in modules.iter() {
        let Some(migrate) = module.migrate_fn() else {
            continue;
        };
        match invoke(module, Capability::Migrate, timeout, migrate(old, new)).await {
            Ok(()) => report.migrated.push(module.canonical_key()),
            Err(err) => {
                log_skipped(&err);
                report.failures.push(err);
            }
        }
    }

    info!(
        old_chat = %old,
        new_chat = %new,
        migrated = report.migrated.len(),
        failed = report.failures.len(),
        "Successfully migrated"
    );
    report
}
