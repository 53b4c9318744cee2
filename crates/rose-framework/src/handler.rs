//! Handlers as type-erased tower services.
//!
//! Any `Fn(Arc<UpdateContext>) -> impl Future<Output = Result<(), BoxError>>`
//! that is `Clone` becomes a [`BoxedHandler`]:
//!
//! ```rust,ignore
//! async fn rules(ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
//!     ctx.reply("Be nice.").await?;
//!     Ok(())
//! }
//!
//! let handler = into_handler(rules);
//! ```
//!
//! Handlers that need state capture it in a cloneable closure:
//!
//! ```rust,ignore
//! let ns = ctx.namespace();
//! into_handler(move |ctx| get_rules(ns.clone(), ctx))
//! ```

use std::future::Future;
use std::sync::Arc;

use tower::util::{BoxCloneSyncService, ServiceExt, service_fn};
use tower::BoxError;

use crate::context::UpdateContext;

/// A type-erased, cheaply cloneable handler service.
pub type BoxedHandler = BoxCloneSyncService<Arc<UpdateContext>, (), BoxError>;

/// Wraps an async function into a [`BoxedHandler`].
pub fn into_handler<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Arc<UpdateContext>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    BoxCloneSyncService::new(service_fn(f))
}

/// Runs a handler to completion on `ctx`.
pub async fn call_handler(handler: &BoxedHandler, ctx: Arc<UpdateContext>) -> Result<(), BoxError> {
    handler.clone().oneshot(ctx).await
}
