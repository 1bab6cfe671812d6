use serde::Serialize;

use crate::services::RefreshEvent;

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "refresh_completed")]
    RefreshCompleted(RefreshEvent),
}

impl From<RefreshEvent> for WsMessage {
    fn from(event: RefreshEvent) -> Self {
        WsMessage::RefreshCompleted(event)
    }
}
