use api_types::{
    envelope::Envelope,
    recurring::{RecurringProcess, RecurringProcessed},
};
use axum::{Extension, Json, extract::State};
use chrono::Utc;

use crate::{ServerError, server::ServerState, user::Caller};

/// Books the caller's due recurring occurrences. Meant to be hit by an
/// external scheduler; the body is optional.
pub async fn process(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    payload: Option<Json<RecurringProcess>>,
) -> Result<Json<Envelope<RecurringProcessed>>, ServerError> {
    let user_id = state.guard.check(&caller).await?;
    let now = payload
        .and_then(|Json(body)| body.now)
        .unwrap_or_else(Utc::now);
    let run = state.engine.process_due_recurring(&user_id, now).await?;
    tracing::info!(
        %user_id,
        templates = run.templates,
        created = run.created.len(),
        failed = run.failed.len(),
        "recurring processed"
    );

    Ok(Json(Envelope::ok(RecurringProcessed {
        templates: run.templates,
        created: run.created,
        failed: run.failed,
    })))
}
