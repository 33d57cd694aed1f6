use rocket::{
    State,
    futures::{SinkExt, StreamExt, stream::SplitSink},
    get,
    serde::json::Json,
};
use rocket_ws::{Channel, Message, WebSocket, stream::DuplexStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    connection::Connection, error::DeliveryError, logic::SharedLobby, model::api::LobbyStatus,
};

/// Lines queued per client before deliveries start failing and eating into
/// the error budget.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// `Connection` backed by a bounded queue that a dedicated writer task
/// drains into the websocket. The lobby side never awaits the socket.
struct WsConnection {
    queue: Option<mpsc::Sender<Message>>,
}

impl Connection for WsConnection {
    fn deliver(&mut self, line: &str) -> Result<(), DeliveryError> {
        let Some(queue) = &self.queue else {
            return Err(DeliveryError::Closed);
        };
        queue
            .try_send(Message::Text(line.to_string()))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }

    fn close(&mut self) {
        // Dropping the sender ends the writer task, which closes the socket.
        self.queue = None;
    }
}

async fn forward_outbound(
    mut sink: SplitSink<DuplexStream, Message>,
    mut queue: mpsc::Receiver<Message>,
) {
    while let Some(message) = queue.recv().await {
        if sink.send(message).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

#[get("/status")]
pub async fn status(lobby: &State<SharedLobby>) -> Json<LobbyStatus> {
    Json(lobby.lock().await.status())
}

#[get("/ws")]
pub fn websocket_handler(ws: WebSocket, lobby: &State<SharedLobby>) -> Channel<'static> {
    let lobby = lobby.inner().clone();

    ws.channel(move |stream| {
        Box::pin(async move {
            let (write, mut read) = stream.split();

            let (queue, outbound) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
            tokio::spawn(forward_outbound(write, outbound));

            let id = {
                let mut lobby = lobby.lock().await;
                match lobby.connect(Box::new(WsConnection { queue: Some(queue) })) {
                    Ok(id) => id,
                    Err(err) => {
                        warn!("dropping new connection, bootstrap delivery failed: {err}");
                        return Ok(());
                    }
                }
            };

            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        debug!("client {id} sent: {text}");
                        let mut lobby = lobby.lock().await;
                        lobby.handle_line(id, &text);
                    }
                    Ok(Message::Close(_)) => {
                        info!("client {id} closed the connection");
                        break;
                    }
                    Ok(_) => debug!("ignoring non-text frame from client {id}"),
                    Err(err) => {
                        error!("websocket error for client {id}: {err}");
                        break;
                    }
                }
            }

            lobby.lock().await.disconnect(id);
            Ok(())
        })
    })
}
