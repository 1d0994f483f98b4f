//! WebSocket implementation of the event-stream transport.
//!
//! Connects with the API key in both a query parameter and the `x-api-key`
//! header, then fans inbound frames out to the per-category channels the
//! waiter selects over. Frames are JSON envelopes of the shape
//! `{"event": <name>, "data": {..}}`. The reader task ends when the server
//! closes, the transport errors, or the waiter drops its receivers.

use crate::stream::{EventChannels, EventSource};
use crate::TrackingError;
use async_trait::async_trait;
use futures_util::StreamExt;
use inscriber_types::Secret;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const CHANNEL_CAPACITY: usize = 32;

const EVENT_TRANSPORT_ERROR: &str = "error";
const EVENT_INSCRIPTION_ERROR: &str = "inscription_error";
const EVENT_PROGRESS: &str = "inscription_progress";
const EVENT_COMPLETE: &str = "inscription_complete";

struct Senders {
	transport: mpsc::Sender<String>,
	errors: mpsc::Sender<Value>,
	progress: mpsc::Sender<Value>,
	completion: mpsc::Sender<Value>,
}

/// Event source over a WebSocket connection.
#[derive(Default)]
pub struct WsEventSource;

impl WsEventSource {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl EventSource for WsEventSource {
	async fn connect(
		&self,
		server_url: &str,
		api_key: &Secret,
	) -> Result<EventChannels, TrackingError> {
		let separator = if server_url.contains('?') { '&' } else { '?' };
		let url = format!("{}{}apiKey={}", server_url, separator, api_key.expose());

		let mut request = url
			.as_str()
			.into_client_request()
			.map_err(|e| TrackingError::Stream(e.to_string()))?;
		request.headers_mut().insert(
			"x-api-key",
			HeaderValue::from_str(api_key.expose())
				.map_err(|e| TrackingError::Stream(e.to_string()))?,
		);

		tracing::debug!(url = %server_url, "connecting to event stream");
		let (socket, _) = connect_async(request)
			.await
			.map_err(|e| TrackingError::Stream(e.to_string()))?;

		let (transport, transport_errors) = mpsc::channel(CHANNEL_CAPACITY);
		let (errors, inscription_errors) = mpsc::channel(CHANNEL_CAPACITY);
		let (progress, progress_rx) = mpsc::channel(CHANNEL_CAPACITY);
		let (completion, completion_rx) = mpsc::channel(CHANNEL_CAPACITY);

		tokio::spawn(read_loop(
			socket,
			Senders {
				transport,
				errors,
				progress,
				completion,
			},
		));

		Ok(EventChannels {
			transport_errors,
			inscription_errors,
			progress: progress_rx,
			completion: completion_rx,
		})
	}
}

fn error_text(data: &Value) -> String {
	data.get("message")
		.and_then(Value::as_str)
		.map(str::to_string)
		.unwrap_or_else(|| data.to_string())
}

async fn read_loop(
	mut socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
	senders: Senders,
) {
	while let Some(frame) = socket.next().await {
		match frame {
			Ok(Message::Text(text)) => {
				let Ok(envelope) = serde_json::from_str::<Value>(&text) else {
					tracing::debug!("ignoring non-JSON frame");
					continue;
				};
				let event = envelope
					.get("event")
					.and_then(Value::as_str)
					.unwrap_or_default()
					.to_string();
				let data = envelope.get("data").cloned().unwrap_or(Value::Null);

				let delivered = match event.as_str() {
					EVENT_TRANSPORT_ERROR => {
						senders.transport.send(error_text(&data)).await.is_ok()
					}
					EVENT_INSCRIPTION_ERROR => senders.errors.send(data).await.is_ok(),
					EVENT_PROGRESS => senders.progress.send(data).await.is_ok(),
					EVENT_COMPLETE => senders.completion.send(data).await.is_ok(),
					other => {
						tracing::trace!(event = other, "ignoring event");
						true
					}
				};
				if !delivered {
					// Waiter is gone; nothing left to deliver to.
					break;
				}
			}
			Ok(Message::Close(_)) => {
				let _ = senders
					.transport
					.send("stream closed by server".to_string())
					.await;
				break;
			}
			Ok(_) => {}
			Err(e) => {
				let _ = senders.transport.send(e.to_string()).await;
				break;
			}
		}
	}
}
