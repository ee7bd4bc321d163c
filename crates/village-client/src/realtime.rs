use std::sync::Arc;

use futures::{Sink, SinkExt, StreamExt};
use reqwest::Url;
use tokio_tungstenite::tungstenite::Message;

use village_core::net::stomp::{self, Command, Frame};
use village_core::room::RoomSnapshot;

use crate::error::ClientError;
use crate::session::{RealtimeSettings, SessionContext};

/// Keep a STOMP subscription to the room topic open, feeding every pushed
/// snapshot into the same apply path as polling. Reconnects after a delay
/// until the session is cancelled.
pub(crate) async fn run_realtime(ctx: Arc<SessionContext>, settings: RealtimeSettings) {
    loop {
        let result = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            result = stream_room(&ctx, &settings) => result,
        };
        match result {
            Ok(()) => tracing::info!(room_id = ctx.room_id, "Real-time channel closed"),
            Err(e) => tracing::warn!(room_id = ctx.room_id, error = %e, "Real-time channel failed"),
        }
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(settings.reconnect_delay) => {},
        }
    }
    tracing::debug!(room_id = ctx.room_id, "Real-time channel stopped");
}

async fn stream_room(ctx: &SessionContext, settings: &RealtimeSettings) -> Result<(), ClientError> {
    let host = Url::parse(&settings.url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| "localhost".to_string());
    let (mut ws, _) = tokio_tungstenite::connect_async(settings.url.as_str())
        .await
        .map_err(|e| ClientError::Channel(e.to_string()))?;

    send(&mut ws, &Frame::connect(&host, &ctx.creds.token)).await?;
    let subscription = format!("sub-{}", uuid::Uuid::new_v4());

    while let Some(msg) = ws.next().await {
        let text = match msg.map_err(|e| ClientError::Channel(e.to_string()))? {
            Message::Text(text) => text.as_str().to_owned(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Message::Close(_) => break,
            _ => continue,
        };
        let frame = match stomp::decode(&text) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed STOMP frame");
                continue;
            },
        };

        match frame.command {
            Command::Connected => {
                send(&mut ws, &Frame::subscribe(&subscription, ctx.room_id)).await?;
                tracing::info!(room_id = ctx.room_id, "Subscribed to room updates");
            },
            Command::Message => {
                if frame
                    .get("subscription")
                    .is_some_and(|s| s != subscription)
                {
                    continue;
                }
                match serde_json::from_str::<RoomSnapshot>(&frame.body) {
                    Ok(snapshot) if snapshot.id == ctx.room_id => {
                        ctx.apply(snapshot, "push").await;
                    },
                    Ok(snapshot) => {
                        tracing::debug!(room_id = snapshot.id, "Ignoring push for another room");
                    },
                    Err(e) => tracing::warn!(error = %e, "Undecodable room push"),
                }
            },
            Command::Error => {
                let message = frame.get("message").unwrap_or("server sent ERROR");
                return Err(ClientError::Channel(message.to_string()));
            },
            _ => {},
        }
        if ctx.cancel.is_cancelled() {
            let _ = send(&mut ws, &Frame::disconnect()).await;
            break;
        }
    }
    Ok(())
}

async fn send<S>(ws: &mut S, frame: &Frame) -> Result<(), ClientError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    ws.send(Message::Text(frame.encode().into()))
        .await
        .map_err(|e| ClientError::Channel(e.to_string()))
}
