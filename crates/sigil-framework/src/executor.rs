//! Command execution.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use futures::FutureExt;
use sigil_core::DiagnosticError;
use tracing::trace;

use crate::command::{CommandHandler, DispatchResult};
use crate::context::CommandContext;

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs the handler of a resolved command.
///
/// A panicking handler yields a handler error instead of unwinding into the
/// dispatcher.
pub async fn execute(command: &CommandHandler, ctx: Arc<CommandContext>) -> DispatchResult {
    trace!(command = command.name(), "Executing command handler");
    match AssertUnwindSafe(command.call(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(DiagnosticError::handler(format!(
            "command handler panicked: {}",
            panic_message(panic.as_ref())
        ))
        .with_debug("command", command.name())),
    }
}

/// Wall-clock timestamps around one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub elapsed: Duration,
}

/// Measures a dispatch from precondition to handler completion.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTimer {
    started_at: SystemTime,
    start: Instant,
}

impl DispatchTimer {
    pub fn start() -> Self {
        Self {
            started_at: SystemTime::now(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Timing {
        let elapsed = self.start.elapsed();
        Timing {
            started_at: self.started_at,
            finished_at: self.started_at + elapsed,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_core::ErrorKind;

    use crate::command::{SlashBuild, Success};
    use crate::testing::{MockPlatform, dm_context};

    #[tokio::test]
    async fn test_execute_success_and_error() {
        let ctx = Arc::new(dm_context(Arc::new(MockPlatform::new())));

        let ok = CommandHandler::new(SlashBuild::new("ok", "ok"), |ctx| async move {
            ctx.ok_with("fine")
        });
        assert_eq!(
            execute(&ok, ctx.clone()).await.unwrap(),
            Success::Message("fine".into())
        );

        let failing = CommandHandler::new(SlashBuild::new("bad", "bad"), |ctx| async move {
            ctx.error("broken")
        });
        let err = execute(&failing, ctx).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Handler);
        assert_eq!(err.message(), "broken");
    }

    #[tokio::test]
    async fn test_execute_catches_panic() {
        let ctx = Arc::new(dm_context(Arc::new(MockPlatform::new())));
        let handler = CommandHandler::new(SlashBuild::new("boom", "boom"), |_ctx| async move {
            let values: Vec<u8> = Vec::new();
            Ok(Success::Message(values[3].to_string()))
        });

        let err = execute(&handler, ctx).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Handler);
        assert!(err.message().contains("panicked"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(5);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_timer() {
        let timing = DispatchTimer::start().finish();
        assert!(timing.finished_at >= timing.started_at);
    }
}
