//! Middleware chain.
//!
//! Middleware runs strictly in declaration order over the shared
//! [`CommandContext`]. Each one either continues, storing a value in the
//! context under its own name, or cancels, supplying the final result of the
//! dispatch itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use sigil_framework::middleware::{MiddlewareOutcome, middleware_fn};
//!
//! let audit = middleware_fn("audit", |ctx| async move {
//!     if ctx.user().bot {
//!         return Ok(MiddlewareOutcome::cancel_with(ctx.ok_with("ignored bot")));
//!     }
//!     Ok(MiddlewareOutcome::next(ctx.user().id))
//! });
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use sigil_core::DiagnosticError;
use tracing::{debug, trace};

use crate::command::{BoxFuture, DispatchResult};
use crate::context::{CommandContext, SideValue};
use crate::executor::panic_message;

/// What a middleware decided.
pub enum MiddlewareOutcome {
    /// Continue with the next middleware; the value is stored in the context.
    Continue(SideValue),
    /// Stop the dispatch; the future yields its final result.
    Cancel(BoxFuture<'static, DispatchResult>),
}

impl MiddlewareOutcome {
    /// Continues, storing `value` for later middleware and the handler.
    pub fn next<T: Any + Send + Sync>(value: T) -> Self {
        Self::Continue(Arc::new(value))
    }

    /// Continues without a meaningful value.
    pub fn pass() -> Self {
        Self::next(())
    }

    /// Cancels with a result computed later.
    pub fn cancel<F>(result: F) -> Self
    where
        F: Future<Output = DispatchResult> + Send + 'static,
    {
        Self::Cancel(Box::pin(result))
    }

    /// Cancels with a ready result.
    pub fn cancel_with(result: DispatchResult) -> Self {
        Self::cancel(futures::future::ready(result))
    }
}

impl std::fmt::Debug for MiddlewareOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue(_) => f.write_str("Continue"),
            Self::Cancel(_) => f.write_str("Cancel"),
        }
    }
}

/// A step run before the command handler.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name under which the continue value is stored.
    fn name(&self) -> &str;

    async fn run(&self, ctx: Arc<CommandContext>) -> Result<MiddlewareOutcome, DiagnosticError>;
}

/// A middleware backed by a closure.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Arc<CommandContext>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<MiddlewareOutcome, DiagnosticError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: Arc<CommandContext>) -> Result<MiddlewareOutcome, DiagnosticError> {
        (self.f)(ctx).await
    }
}

/// Creates a middleware from a name and an async closure.
pub fn middleware_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn Middleware>
where
    F: Fn(Arc<CommandContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<MiddlewareOutcome, DiagnosticError>> + Send + 'static,
{
    Arc::new(FnMiddleware {
        name: name.into(),
        f,
    })
}

/// How the chain ended.
#[derive(Debug)]
pub enum ChainOutcome {
    /// Every middleware continued.
    Completed,
    /// A middleware cancelled or failed; `result` is the final result.
    Stopped {
        middleware: String,
        result: DispatchResult,
    },
}

/// Runs `middleware` in order over `ctx`.
pub async fn run_chain(middleware: &[Arc<dyn Middleware>], ctx: &Arc<CommandContext>) -> ChainOutcome {
    for mw in middleware {
        let name = mw.name().to_string();
        trace!(middleware = %name, "Running middleware");

        let outcome = match AssertUnwindSafe(mw.run(Arc::clone(ctx))).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                let message = format!("middleware {name} failed: {}", err.message());
                let result = Err(DiagnosticError::middleware(&name, message)
                    .with_debug("middleware", name.as_str())
                    .with_cause(err));
                return ChainOutcome::Stopped {
                    middleware: name,
                    result,
                };
            }
            Err(panic) => {
                let message = format!("middleware {name} panicked: {}", panic_message(panic.as_ref()));
                let result = Err(DiagnosticError::middleware(&name, message)
                    .with_debug("middleware", name.as_str()));
                return ChainOutcome::Stopped {
                    middleware: name,
                    result,
                };
            }
        };

        match outcome {
            MiddlewareOutcome::Continue(value) => ctx.set_side_value(&name, value),
            MiddlewareOutcome::Cancel(result) => {
                let result = match AssertUnwindSafe(result).catch_unwind().await {
                    Ok(Ok(success)) => Ok(success),
                    Ok(Err(err)) => Err(err.with_debug("stopped_by", name.as_str())),
                    Err(panic) => Err(DiagnosticError::middleware(
                        &name,
                        format!(
                            "middleware {name} cancel result panicked: {}",
                            panic_message(panic.as_ref())
                        ),
                    )),
                };
                match &result {
                    Ok(success) => debug!("Middleware {name} stopped, result : {}", success.describe()),
                    Err(err) => debug!("Middleware {name} stopped, result : {err}"),
                }
                return ChainOutcome::Stopped {
                    middleware: name,
                    result,
                };
            }
        }
    }

    ChainOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use sigil_core::ErrorKind;

    use crate::command::Success;
    use crate::testing::{MockPlatform, dm_context};

    fn recording(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn Middleware> {
        middleware_fn(name, move |ctx| {
            let log = log.clone();
            async move {
                log.lock().push(format!("{name}:{:?}", ctx.side_value_names()));
                Ok(MiddlewareOutcome::next(name.len()))
            }
        })
    }

    #[tokio::test]
    async fn test_empty_chain_completes() {
        let ctx = Arc::new(dm_context(Arc::new(MockPlatform::new())));
        assert!(matches!(run_chain(&[], &ctx).await, ChainOutcome::Completed));
    }

    #[tokio::test]
    async fn test_sequential_and_side_values() {
        let ctx = Arc::new(dm_context(Arc::new(MockPlatform::new())));
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = [recording("first", log.clone()), recording("second", log.clone())];

        assert!(matches!(run_chain(&chain, &ctx).await, ChainOutcome::Completed));
        assert_eq!(*log.lock(), vec!["first:[]", "second:[\"first\"]"]);
        assert_eq!(ctx.side_value::<usize>("second").as_deref(), Some(&6));
    }

    #[tokio::test]
    async fn test_cancel_stops_chain() {
        let ctx = Arc::new(dm_context(Arc::new(MockPlatform::new())));
        let later = Arc::new(AtomicUsize::new(0));
        let later_count = later.clone();

        let chain = [
            middleware_fn("gate", |_ctx| async {
                Ok(MiddlewareOutcome::cancel(async { Ok(Success::Message("blocked".into())) }))
            }),
            middleware_fn("after", move |_ctx| {
                let later = later_count.clone();
                async move {
                    later.fetch_add(1, Ordering::SeqCst);
                    Ok(MiddlewareOutcome::pass())
                }
            }),
        ];

        match run_chain(&chain, &ctx).await {
            ChainOutcome::Stopped { middleware, result } => {
                assert_eq!(middleware, "gate");
                assert_eq!(result.unwrap(), Success::Message("blocked".into()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_is_attributed() {
        let ctx = Arc::new(dm_context(Arc::new(MockPlatform::new())));
        let chain = [middleware_fn("auth", |_ctx| async {
            Err(DiagnosticError::internal("token expired"))
        })];

        let ChainOutcome::Stopped { result, .. } = run_chain(&chain, &ctx).await else {
            panic!("chain should stop");
        };
        let err = result.unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::Middleware {
                name: "auth".into()
            }
        );
        assert!(err.message().contains("token expired"));
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let ctx = Arc::new(dm_context(Arc::new(MockPlatform::new())));
        let chain = [middleware_fn("explode", |_ctx| async {
            if true {
                panic!("kaboom");
            }
            Ok(MiddlewareOutcome::pass())
        })];

        let ChainOutcome::Stopped { middleware, result } = run_chain(&chain, &ctx).await else {
            panic!("chain should stop");
        };
        assert_eq!(middleware, "explode");
        assert!(result.unwrap_err().message().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_cancel_error_is_annotated() {
        let ctx = Arc::new(dm_context(Arc::new(MockPlatform::new())));
        let chain = [middleware_fn("limit", |_ctx| async {
            Ok(MiddlewareOutcome::cancel_with(Err(DiagnosticError::handler("quota"))))
        })];

        let ChainOutcome::Stopped { result, .. } = run_chain(&chain, &ctx).await else {
            panic!("chain should stop");
        };
        let err = result.unwrap_err();
        assert_eq!(err.debugs().get("stopped_by"), Some(&serde_json::Value::from("limit")));
    }
}
