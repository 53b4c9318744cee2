//! Stats and user-info aggregation over capability lists.
//!
//! Every callback is bounded by a timeout.  A callback that fails or overruns
//! is logged and its contribution is left out; the remaining modules are
//! still asked.

use std::future::Future;
use std::time::Duration;

use tower::BoxError;
use tracing::warn;

use crate::capability::{Capability, CapabilityList};
use crate::error::{CapabilityError, CapabilityResult};
use crate::module::Module;
use rose_core::UserId;

/// Awaits one capability callback under `timeout`.
pub async fn invoke<T, F>(
    module: &Module,
    capability: Capability,
    timeout: Duration,
    fut: F,
) -> CapabilityResult<T>
where
    F: Future<Output = Result<T, BoxError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(CapabilityError::Failed {
            module: module.canonical_key(),
            capability,
            source,
        }),
        Err(_) => Err(CapabilityError::TimedOut {
            module: module.canonical_key(),
            capability,
            timeout,
        }),
    }
}

/// Logs a skipped contribution.
pub(crate) fn log_skipped(err: &CapabilityError) {
    warn!(module = %err.module(), error = %err, "Capability callback skipped");
}

/// One line per stats-capable module, in registry order.
pub async fn collect_stats(modules: &CapabilityList, timeout: Duration) -> Vec<String> {
    let mut lines = Vec::with_capacity(modules.len());
    for module in modules.iter() {
        let Some(stats) = module.stats_fn() else {
            continue;
        };
        match invoke(module, Capability::Stats, timeout, stats()).await {
            Ok(line) => lines.push(line),
            Err(err) => log_skipped(&err),
        }
    }
    lines
}

/// Non-empty profile fragments about `user`, in registry order.
pub async fn collect_user_info(
    user: UserId,
    modules: &CapabilityList,
    timeout: Duration,
) -> Vec<String> {
    let mut parts = Vec::new();
    for module in modules.iter() {
        let Some(info) = module.user_info_fn() else {
            continue;
        };
        match invoke(module, Capability::UserInfo, timeout, info(user)).await {
            Ok(text) if !text.trim().is_empty() => parts.push(text),
            Ok(_) => {}
            Err(err) => log_skipped(&err),
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn list(modules: Vec<Module>) -> CapabilityList {
        modules.into_iter().map(Arc::new).collect()
    }

    #[tokio::test]
    async fn test_failing_stats_are_skipped() {
        let modules = list(vec![
            Module::new("a").on_stats(|| async { Ok("3 chats".to_string()) }),
            Module::new("b").on_stats(|| async { Err::<String, BoxError>("db down".into()) }),
            Module::new("c").on_stats(|| async { Ok("5 users".to_string()) }),
        ]);
        assert_eq!(collect_stats(&modules, TIMEOUT).await, ["3 chats", "5 users"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stats_time_out() {
        let modules = list(vec![
            Module::new("slow").on_stats(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("never".to_string())
            }),
            Module::new("fast").on_stats(|| async { Ok("fast".to_string()) }),
        ]);
        assert_eq!(collect_stats(&modules, TIMEOUT).await, ["fast"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_reports_timeout() {
        let module = Module::new("slow");
        let err = invoke(&module, Capability::Stats, TIMEOUT, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BoxError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            CapabilityError::TimedOut { capability: Capability::Stats, .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_user_info_is_filtered() {
        let modules = list(vec![
            Module::new("users").on_user_info(|_| async { Ok("Seen in 2 chats.".to_string()) }),
            Module::new("bios").on_user_info(|_| async { Ok(String::new()) }),
        ]);
        assert_eq!(
            collect_user_info(UserId(7), &modules, TIMEOUT).await,
            ["Seen in 2 chats."]
        );
    }
}
