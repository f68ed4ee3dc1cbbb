//! Widget endpoints (visitor surface).
//!
//! Two fronts onto the same display engine: a stateless REST surface where
//! the widget detects triggers itself and reports transitions, and a
//! WebSocket surface where the widget streams viewport events and the
//! server decides when to reveal.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::{get, post},
};
use beacon_common::AppResult;
use beacon_core::{Navigation, PopupSession, Trigger, ViewportEvent};
use beacon_store::entities::{Announcement, TriggerKind};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{extractors::Visitor, middleware::AppState, response::ApiResponse};

/// Create widget router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/popup", get(get_popup))
        .route("/popup/{id}/shown", post(popup_shown))
        .route("/popup/{id}/dismiss", post(popup_dismissed))
        .route("/popup/{id}/cta", post(popup_cta))
        .route("/popup/{id}/suppress", post(popup_suppressed))
        .route("/session", get(session_handler))
}

/// Trigger configuration reported to the widget.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    pub kind: TriggerKind,
    /// Seconds for `timer`, percent for `scroll`, zero for `exit`.
    /// Defaults are already resolved.
    pub value: u32,
}

impl TriggerConfig {
    fn new(kind: TriggerKind, trigger: Trigger) -> Self {
        Self {
            kind,
            value: trigger.resolved_value(),
        }
    }
}

/// Popup offer response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupResponse {
    /// The popup to arm, or `null` when nothing should show this visit.
    pub popup: Option<PopupOffer>,
}

/// One popup offer: the announcement plus the trigger the widget should arm.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupOffer {
    pub announcement: Announcement,
    pub trigger: TriggerConfig,
}

/// The popup this visitor should arm now, if any.
async fn get_popup(
    visitor: Visitor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PopupResponse>> {
    let popup = state
        .widget_service
        .popup_for(&visitor.visitor_id, &visitor.session_id)
        .await?
        .map(|(announcement, trigger)| {
            let trigger = TriggerConfig::new(announcement.trigger_type, trigger);
            PopupOffer {
                announcement,
                trigger,
            }
        });

    Ok(ApiResponse::ok(PopupResponse { popup }))
}

/// The widget's trigger fired and it revealed the popup.
async fn popup_shown(
    visitor: Visitor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .widget_service
        .record_shown(&id, &visitor.visitor_id, &visitor.session_id)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// The visitor closed the popup.
async fn popup_dismissed(
    visitor: Visitor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .widget_service
        .record_dismissed(&id, &visitor.visitor_id, &visitor.session_id)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// The visitor accepted the call-to-action; responds with where to send
/// them.
async fn popup_cta(
    visitor: Visitor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Navigation>> {
    let navigation = state
        .widget_service
        .accept_cta(&id, &visitor.visitor_id, &visitor.session_id)
        .await?;

    Ok(ApiResponse::ok(navigation))
}

/// The visitor asked never to see this popup again.
async fn popup_suppressed(
    visitor: Visitor,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .widget_service
        .suppress(&id, &visitor.visitor_id, &visitor.session_id)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// Client-to-server socket message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Vertical scroll position changed.
    #[serde(rename_all = "camelCase")]
    Scroll {
        offset: f64,
        document_height: f64,
        viewport_height: f64,
    },
    /// Pointer moved.
    #[serde(rename_all = "camelCase")]
    PointerMove { y: f64 },
    /// The visitor closed the popup.
    Dismiss,
    /// The visitor accepted the call-to-action.
    Cta,
    /// The visitor asked never to see this popup again.
    SuppressForever,
}

/// Server-to-client socket message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// A popup is armed for this page view.
    #[serde(rename_all = "camelCase")]
    Armed {
        announcement: Announcement,
        trigger: TriggerConfig,
    },
    /// Nothing will show this page view.
    Idle,
    /// The trigger fired; show the popup now.
    Reveal,
    /// Where to send the visitor after the call-to-action.
    Navigation { navigation: Navigation },
}

/// WebSocket handler for a server-driven popup session.
async fn session_handler(
    ws: WebSocketUpgrade,
    visitor: Visitor,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!(visitor_id = %visitor.visitor_id, "New widget session connection");

    ws.on_upgrade(move |socket| handle_socket(socket, visitor, state))
}

async fn handle_socket(socket: WebSocket, visitor: Visitor, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let session = match state
        .widget_service
        .begin_session(&visitor.visitor_id, &visitor.session_id)
        .await
    {
        Ok(Some(session)) => session,
        Ok(None) => {
            let _ = send(&mut sender, &ServerMessage::Idle).await;
            return;
        }
        Err(e) => {
            error!("Failed to begin popup session: {}", e);
            return;
        }
    };

    run_session(&mut sender, &mut receiver, session).await;
}

async fn run_session(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    receiver: &mut futures::stream::SplitStream<WebSocket>,
    mut session: PopupSession,
) {
    let armed = ServerMessage::Armed {
        announcement: session.announcement().clone(),
        trigger: TriggerConfig::new(session.announcement().trigger_type, session.trigger()),
    };
    if send(sender, &armed).await.is_err() {
        return;
    }

    let events = session.events();
    let Some(mut fired_rx) = session.take_fired() else {
        return;
    };

    // Until the trigger fires, forward viewport events to the watcher.
    let fired = loop {
        tokio::select! {
            fired = &mut fired_rx => break fired.unwrap_or(false),

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Scroll { offset, document_height, viewport_height }) => {
                        let _ = events
                            .send(ViewportEvent::Scroll { offset, document_height, viewport_height })
                            .await;
                    }
                    Ok(ClientMessage::PointerMove { y }) => {
                        let _ = events.send(ViewportEvent::PointerMove { y }).await;
                    }
                    // Dismiss-family messages are meaningless before reveal.
                    Ok(_) => {}
                    Err(e) => warn!("Failed to parse widget message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Widget session closed before trigger fired");
                    return;
                }
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    return;
                }
            }
        }
    };

    if !fired {
        return;
    }
    if let Err(e) = session.reveal().await {
        warn!("Failed to reveal popup: {}", e);
        return;
    }
    if send(sender, &ServerMessage::Reveal).await.is_err() {
        return;
    }

    // Popup is visible; wait for the visitor's verdict.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Dismiss) => {
                    if let Err(e) = session.dismiss().await {
                        warn!("Failed to record dismissal: {}", e);
                    }
                    break;
                }
                Ok(ClientMessage::Cta) => {
                    match session.accept_cta().await {
                        Ok(Navigation::None) => {
                            // No CTA link configured; the popup stays up.
                            let _ = send(
                                sender,
                                &ServerMessage::Navigation {
                                    navigation: Navigation::None,
                                },
                            )
                            .await;
                        }
                        Ok(navigation) => {
                            let _ = send(sender, &ServerMessage::Navigation { navigation }).await;
                            break;
                        }
                        Err(e) => {
                            warn!("Failed to accept CTA: {}", e);
                            break;
                        }
                    }
                }
                Ok(ClientMessage::SuppressForever) => {
                    if let Err(e) = session.suppress_forever().await {
                        warn!("Failed to record suppression: {}", e);
                    }
                    break;
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to parse widget message: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("WebSocket error: {}", e);
                return;
            }
        }
    }
}

async fn send(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).unwrap_or_default();
    sender.send(Message::Text(json.into())).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_widget_wire_format() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "scroll", "offset": 400.0, "documentHeight": 1600.0, "viewportHeight": 800.0}"#,
        )
        .unwrap();
        assert!(matches!(msg, ClientMessage::Scroll { .. }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "pointerMove", "y": 4.0}"#).unwrap();
        assert!(matches!(msg, ClientMessage::PointerMove { y } if y == 4.0));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "suppressForever"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SuppressForever));
    }

    #[test]
    fn navigation_message_nests_the_decision() {
        let msg = ServerMessage::Navigation {
            navigation: Navigation::ExternalNewTab("https://example.com/sale".to_string()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "navigation");
        assert_eq!(json["navigation"]["action"], "externalNewTab");
        assert_eq!(json["navigation"]["target"], "https://example.com/sale");
    }
}
