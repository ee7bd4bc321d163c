use std::sync::Arc;

use crate::error::ClientError;
use crate::session::SessionContext;

/// Poll the room until the session is cancelled.
///
/// Each cycle fetches once, then waits for the poll interval or an
/// out-of-band resync request, whichever comes first. A failed fetch keeps
/// the last good snapshot and retries on the next cycle.
pub(crate) async fn run_sync_loop(ctx: Arc<SessionContext>) {
    tracing::info!(
        room_id = ctx.room_id,
        interval_ms = ctx.settings.poll_interval.as_millis() as u64,
        "Room sync started"
    );
    loop {
        sync_once(&ctx).await;
        if ctx.cancel.is_cancelled() {
            break;
        }
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(ctx.settings.poll_interval) => {},
            _ = ctx.resync.notified() => {
                tracing::debug!(room_id = ctx.room_id, "Resync requested");
            },
        }
    }
    tracing::info!(room_id = ctx.room_id, "Room sync stopped");
}

/// One fetch-and-apply cycle.
pub(crate) async fn sync_once(ctx: &SessionContext) {
    let fetched = tokio::select! {
        _ = ctx.cancel.cancelled() => return,
        result = ctx.api.get_room(&ctx.creds, ctx.room_id) => result,
    };
    if ctx.cancel.is_cancelled() {
        return;
    }
    match fetched {
        Ok(snapshot) => {
            ctx.apply(snapshot, "poll").await;
        },
        Err(ClientError::Unauthorized) => ctx.invalidate_login().await,
        Err(e) => {
            tracing::warn!(room_id = ctx.room_id, error = %e, "Room sync failed");
            let message = e.user_message("Could not load room");
            ctx.update(|store| store.record_error(message)).await;
        },
    }
}
