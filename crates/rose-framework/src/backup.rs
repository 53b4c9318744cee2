//! Per-chat import and export.
//!
//! A backup document is a JSON object with one section per export-capable
//! module, keyed by canonical key:
//!
//! ```json
//! { "rules": { "rules": "Be nice." }, "notes": { ... } }
//! ```
//!
//! On import each import-capable module receives its own section; modules
//! without a section are skipped.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::aggregate::{invoke, log_skipped};
use crate::capability::{Capability, CapabilityList};
use crate::error::CapabilityError;
use rose_core::ChatId;

/// Builds the backup document for `chat`.
///
/// Modules whose export fails are left out of the document.
pub async fn export_chat(chat: ChatId, modules: &CapabilityList, timeout: Duration) -> Value {
    let mut doc = Map::new();
    for module in modules.iter() {
        let Some(export) = module.export_fn() else {
            continue;
        };
        match invoke(module, Capability::ExportData, timeout, export(chat)).await {
            Ok(section) => {
                doc.insert(module.canonical_key(), section);
            }
            Err(err) => log_skipped(&err),
        }
    }
    Value::Object(doc)
}

/// Outcome of an import.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<String>,
    /// Import-capable modules with no section in the document.
    pub skipped: Vec<String>,
    pub failures: Vec<CapabilityError>,
}

/// Hands each import-capable module its section of `document`.
pub async fn import_chat(
    chat: ChatId,
    document: &Value,
    modules: &CapabilityList,
    timeout: Duration,
) -> ImportReport {
    let mut report = ImportReport::default();
    for module in modules.iter() {
        let Some(import) = module.import_fn() else {
            continue;
        };
        let key = module.canonical_key();
        let Some(section) = document.get(&key) else {
            report.skipped.push(key);
            continue;
        };
        match invoke(module, Capability::ImportData, timeout, import(chat, section.clone())).await {
            Ok(()) => report.imported.push(key),
            Err(err) => {
                log_skipped(&err);
                report.failures.push(err);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use tower::BoxError;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_export_collects_sections() {
        let modules: CapabilityList = [
            Arc::new(
                Module::new("rules")
                    .on_export(|chat| async move { Ok(json!({ "chat": chat.0 })) }),
            ),
            Arc::new(
                Module::new("notes")
                    .on_export(|_| async { Err::<Value, BoxError>("unreadable".into()) }),
            ),
        ]
        .into_iter()
        .collect();

        let doc = export_chat(ChatId(-5), &modules, TIMEOUT).await;
        assert_eq!(doc, json!({ "rules": { "chat": -5 } }));
    }

    #[tokio::test]
    async fn test_import_hands_out_sections() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let modules: CapabilityList = [
            Arc::new(Module::new("rules").on_import(move |chat, data| {
                let s = Arc::clone(&s);
                async move {
                    s.lock().push((chat, data));
                    Ok(())
                }
            })),
            Arc::new(Module::new("notes").on_import(|_, _| async { Ok(()) })),
        ]
        .into_iter()
        .collect();

        let report = import_chat(
            ChatId(-5),
            &json!({ "rules": { "rules": "be nice" }, "unknown": 1 }),
            &modules,
            TIMEOUT,
        )
        .await;

        assert_eq!(report.imported, ["rules"]);
        assert_eq!(report.skipped, ["notes"]);
        assert_eq!(*seen.lock(), [(ChatId(-5), json!({ "rules": "be nice" }))]);
    }
}
