//! Result handling.
//!
//! The result handler is the only component that reports a failure to the
//! user. It receives exactly one result per dispatch:
//! - `Err`: the diagnostic is logged with its id and the user gets a generic
//!   internal-error message embedding that id
//! - `Ok`: a one-line audit record is logged and nothing is sent

use async_trait::async_trait;
use sigil_core::{DiagnosticError, ErrorKind, Interaction, Platform, ReplyPayload, User};
use tracing::{error, info};

use crate::command::{DispatchResult, Success};
use crate::executor::Timing;

/// Default internal-error message. `{id}` is replaced by the diagnostic id.
pub const DEFAULT_INTERNAL_ERROR: &str =
    "Something went wrong while running this command. Error id: `{id}`";

/// What the result handler knows about the dispatch.
#[derive(Debug, Clone)]
pub struct ResultInfo<'a> {
    pub interaction: &'a Interaction,
    /// Rendered command, as in `/config roles add`.
    pub command_display: &'a str,
    /// `true` when the reply was already deferred or sent.
    pub defer: bool,
    /// Present once the dispatch reached the middleware stage.
    pub timing: Option<Timing>,
}

/// Finalizes the result of a dispatch.
#[async_trait]
pub trait ResultHandler: Send + Sync {
    async fn handle(&self, result: &DispatchResult, info: &ResultInfo<'_>, platform: &dyn Platform);
}

/// User-facing message templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplates {
    pub internal_error: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            internal_error: DEFAULT_INTERNAL_ERROR.to_string(),
        }
    }
}

impl MessageTemplates {
    pub fn render_internal_error(&self, id: &str) -> String {
        self.internal_error.replace("{id}", id)
    }
}

/// The audit line logged for a successful dispatch.
pub fn audit_line(user: &User, command_display: &str, success: &Success) -> String {
    format!(
        "{} used command {}. Result : {}",
        user.name,
        command_display,
        success.describe()
    )
}

/// Logs a diagnostic, generating its id first.
pub fn log_diagnostic(err: &DiagnosticError) {
    let id = err.generate_id();
    match err.cause() {
        Some(cause) => error!(
            diagnostic_id = id,
            kind = %err.kind(),
            debugs = %err.debugs_json(),
            cause = %cause,
            "{}",
            err.message()
        ),
        None => error!(
            diagnostic_id = id,
            kind = %err.kind(),
            debugs = %err.debugs_json(),
            "{}",
            err.message()
        ),
    }
}

/// Tells the user that the command failed.
///
/// Edits the existing reply when one was deferred or sent, otherwise sends
/// an ephemeral reply. A delivery failure is logged and swallowed.
pub async fn send_internal_error(
    platform: &dyn Platform,
    interaction: &Interaction,
    defer: bool,
    content: String,
) {
    let sent = if defer {
        platform
            .edit_reply(interaction, ReplyPayload::new(content))
            .await
    } else {
        platform
            .reply(interaction, ReplyPayload::ephemeral(content))
            .await
    };

    if let Err(e) = sent {
        let err = DiagnosticError::new(
            ErrorKind::Delivery,
            format!("failed to send internal error message: {e}"),
        )
        .with_debug("interaction_id", interaction.id)
        .with_debug("edit", defer)
        .with_cause(e);
        log_diagnostic(&err);
    }
}

/// Logs every result and notifies the user on failure.
#[derive(Debug, Clone, Default)]
pub struct DefaultResultHandler {
    templates: MessageTemplates,
}

impl DefaultResultHandler {
    pub fn new(templates: MessageTemplates) -> Self {
        Self { templates }
    }
}

#[async_trait]
impl ResultHandler for DefaultResultHandler {
    async fn handle(&self, result: &DispatchResult, info: &ResultInfo<'_>, platform: &dyn Platform) {
        match result {
            Ok(success) => {
                info!(
                    elapsed_ms = info.timing.map(|t| t.elapsed.as_millis() as u64),
                    "{}",
                    audit_line(&info.interaction.user, info.command_display, success)
                );
            }
            Err(err) => {
                log_diagnostic(err);
                let content = self.templates.render_internal_error(err.generate_id());
                send_internal_error(platform, info.interaction, info.defer, content).await;
            }
        }
    }
}
