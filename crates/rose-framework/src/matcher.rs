//! Matcher system.
//!
//! A [`Matcher`] groups handlers behind a common check.  Only when the check
//! passes are the handlers executed, in the order they were added.
//!
//! Every matcher belongs to a numeric **group**.  The dispatcher runs groups
//! in ascending order and matchers within a group in registration order.  A
//! matcher marked [`block`](Matcher::block) ends dispatch once it has matched.
//!
//! # Example
//!
//! ```rust,ignore
//! use rose_framework::{Matcher, on_command};
//!
//! // Built from a preset
//! let matcher = on_command("rules").handler(get_rules);
//!
//! // Custom check, runs after the default group and lets nothing through
//! let matcher = Matcher::new()
//!     .check(|ctx| ctx.is_group())
//!     .group(4)
//!     .block(true)
//!     .handler(log_user);
//! ```

use std::future::Future;
use std::sync::Arc;

use tower::BoxError;
use tracing::{debug, error, trace};

use crate::context::UpdateContext;
use crate::handler::{BoxedHandler, call_handler, into_handler};

/// A type-erased check function.
pub type CheckFn = Arc<dyn Fn(&UpdateContext) -> bool + Send + Sync>;

/// Cloned on write by the builder methods.
#[derive(Clone)]
struct MatcherInner {
    check_fn: Option<CheckFn>,
    handlers: Vec<BoxedHandler>,
    block: bool,
    group: i32,
    name: Option<String>,
}

/// A set of handlers guarded by a check.
///
/// `Matcher` keeps its data behind an `Arc`, so clones are cheap.
#[derive(Clone)]
pub struct Matcher {
    inner: Arc<MatcherInner>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher {
    /// Creates an empty matcher in group 0.
    ///
    /// A matcher without a check matches every update.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MatcherInner {
                check_fn: None,
                handlers: Vec::new(),
                block: false,
                group: 0,
                name: None,
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut MatcherInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Sets a name for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner_mut().name = Some(name.into());
        self
    }

    /// Replaces the check function.
    pub fn check<F>(mut self, f: F) -> Self
    where
        F: Fn(&UpdateContext) -> bool + Send + Sync + 'static,
    {
        self.inner_mut().check_fn = Some(Arc::new(f));
        self
    }

    /// Adds a condition on top of the current check.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&UpdateContext) -> bool + Send + Sync + 'static,
    {
        let inner = self.inner_mut();
        let combined: CheckFn = match inner.check_fn.take() {
            Some(prev) => Arc::new(move |ctx| prev(ctx) && f(ctx)),
            None => Arc::new(f),
        };
        inner.check_fn = Some(combined);
        self
    }

    /// Restricts the matcher to private chats.
    pub fn private_only(self) -> Self {
        self.filter(UpdateContext::is_private)
    }

    /// Restricts the matcher to groups and supergroups.
    pub fn group_only(self) -> Self {
        self.filter(UpdateContext::is_group)
    }

    /// Sets whether this matcher ends dispatch after matching.
    pub fn block(mut self, block: bool) -> Self {
        self.inner_mut().block = block;
        self
    }

    /// Sets the dispatch group (lower runs first).
    pub fn group(mut self, group: i32) -> Self {
        self.inner_mut().group = group;
        self
    }

    /// Adds a handler.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<UpdateContext>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.inner_mut().handlers.push(into_handler(f));
        self
    }

    /// Adds a pre-built boxed handler.
    pub fn handler_boxed(mut self, handler: BoxedHandler) -> Self {
        self.inner_mut().handlers.push(handler);
        self
    }

    pub fn matches(&self, ctx: &UpdateContext) -> bool {
        match &self.inner.check_fn {
            Some(f) => f(ctx),
            None => true,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.inner.block
    }

    pub fn get_group(&self) -> i32 {
        self.inner.group
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    pub fn get_name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Runs the handlers if the check passes.
    ///
    /// Returns `true` if the check passed.  A failing handler is logged and
    /// the remaining handlers still run, unless propagation was stopped.
    pub async fn execute(&self, ctx: Arc<UpdateContext>) -> bool {
        let name = self.inner.name.as_deref().unwrap_or("unnamed");
        if !self.matches(&ctx) {
            trace!(matcher = name, "Matcher check failed, skipping");
            return false;
        }

        debug!(
            matcher = name,
            handler_count = self.inner.handlers.len(),
            "Matcher check passed, executing handlers"
        );

        for (i, handler) in self.inner.handlers.iter().enumerate() {
            if !ctx.is_propagating() {
                trace!(matcher = name, "Propagation stopped, skipping remaining handlers");
                break;
            }
            if let Err(e) = call_handler(handler, Arc::clone(&ctx)).await {
                error!(matcher = name, handler_index = i, error = %e, "Handler error");
            }
        }

        true
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("name", &self.inner.name)
            .field("group", &self.inner.group)
            .field("block", &self.inner.block)
            .field("handlers", &self.inner.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandParser;
    use rose_core::testing::RecordingBot;
    use rose_core::{Chat, ChatId, Message, Update, User, UserId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn group_ctx(text: &str) -> Arc<UpdateContext> {
        let msg = Message::new(
            1,
            Chat::group(ChatId(-100), "g"),
            User::new(UserId(7), "Alice"),
            text,
        );
        Arc::new(UpdateContext::new(
            Update::Message(msg),
            RecordingBot::new("rose_bot"),
            &CommandParser::default(),
        ))
    }

    #[test]
    fn test_filter_composes_with_check() {
        let m = Matcher::new().check(|_| true).private_only();
        assert!(!m.matches(&group_ctx("hi")));
        let m = Matcher::new().check(|_| true).group_only();
        assert!(m.matches(&group_ctx("hi")));
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_the_next() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let m = Matcher::new()
            .handler(|_ctx| async { Err::<(), BoxError>("first fails".into()) })
            .handler(move |_ctx| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });

        assert!(m.execute(group_ctx("hi")).await);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_propagation_skips_remaining_handlers() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let m = Matcher::new()
            .handler(|ctx: Arc<UpdateContext>| async move {
                ctx.stop_propagation();
                Ok(())
            })
            .handler(move |_ctx| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });

        m.execute(group_ctx("hi")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_builder_is_copy_on_write() {
        let base = Matcher::new().name("base");
        let derived = base.clone().group(3).block(true);
        assert_eq!(base.get_group(), 0);
        assert!(!base.is_blocking());
        assert_eq!(derived.get_group(), 3);
        assert_eq!(derived.get_name(), Some("base"));
    }
}
