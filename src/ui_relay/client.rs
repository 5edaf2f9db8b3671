use log::{debug, info, warn};
use serde_json::Value;

use super::binary::BinaryDataMsg;
use super::event::UiEvent;
use crate::graph_sync::Transport;
use crate::socket::SocketEvents;

/// Frame sent once the relay socket opens.
pub const RELAY_CONNECT: &str = "connect";
/// Frame sent before the relay socket is given up.
pub const RELAY_DISCONNECT: &str = "disconnect";

/// Where relay events land.
pub trait UiSink {
	/// Push `value` into `property` of element `id`.
	fn set_property(&mut self, id: &str, property: &str, value: Value);
	/// Replace the figure shown by element `id`.
	fn update_figure(&mut self, id: &str, figure: Value, config: Value);
	/// Dispatch a DOM event at element `id`.
	fn trigger(&mut self, id: &str, event_type: &str, params: Option<&Value>);
	/// Hand a binary payload to element `id`.
	fn binary(&mut self, id: &str, msg: &BinaryDataMsg);
}

/// One relay connection shared by every component that needs it.
///
/// Components [`acquire`](Self::acquire) it on mount and
/// [`release`](Self::release) it on unmount; the last release says
/// goodbye and closes the socket.
pub struct RelayClient<T, S> {
	transport: T,
	sink: S,
	holders: usize,
	open: bool,
}

impl<T: Transport, S: UiSink> RelayClient<T, S> {
	/// A client with no holders that waits for the socket to open.
	pub fn new(transport: T, sink: S) -> Self {
		Self {
			transport,
			sink,
			holders: 0,
			open: false,
		}
	}

	/// Components currently sharing the connection.
	pub fn holders(&self) -> usize {
		self.holders
	}

	/// Whether `connect` has been sent and no goodbye yet.
	pub fn is_open(&self) -> bool {
		self.open
	}

	/// The outbound side.
	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Where events land.
	pub fn sink(&self) -> &S {
		&self.sink
	}

	/// Register one more holder.
	pub fn acquire(&mut self) {
		self.holders += 1;
	}

	/// Drop one holder. Returns `true` when that was the last one and the
	/// connection has been shut down.
	pub fn release(&mut self) -> bool {
		self.holders = self.holders.saturating_sub(1);
		if self.holders > 0 {
			return false;
		}
		self.shutdown();
		true
	}

	/// The page is going away; tell the server regardless of holders.
	pub fn on_unload(&mut self) {
		self.shutdown();
	}

	fn shutdown(&mut self) {
		if !self.open {
			return;
		}
		self.open = false;
		if let Err(e) = self.transport.send(RELAY_DISCONNECT) {
			warn!("{e}");
		}
		if let Err(e) = self.transport.close() {
			warn!("{e}");
		}
	}

	/// Route a decoded event into the sink.
	pub fn dispatch(&mut self, event: UiEvent) {
		match event {
			UiEvent::Modify(changes) => {
				for change in changes {
					self.sink.set_property(&change.id, &change.property, change.value);
				}
			}
			UiEvent::UpdateFigure { id, figure, config } => self.sink.update_figure(&id, figure, config),
			UiEvent::Trigger(spec) => self.sink.trigger(&spec.id, &spec.event_type, spec.params.as_ref()),
			UiEvent::Unknown(kind) => debug!("Ignoring relay event `{kind}`"),
		}
	}
}

impl<T: Transport, S: UiSink> SocketEvents for RelayClient<T, S> {
	fn on_open(&mut self) {
		self.open = true;
		if let Err(e) = self.transport.send(RELAY_CONNECT) {
			warn!("{e}");
		}
	}

	fn on_close(&mut self) {
		self.open = false;
		info!("Relay connection closed");
	}

	fn on_error(&mut self, reason: &str) {
		warn!("Relay socket error: {reason}");
	}

	fn on_text(&mut self, text: &str) {
		match UiEvent::from_json(text) {
			Ok(event) => self.dispatch(event),
			Err(e) => warn!("{e}"),
		}
	}

	// JSON sent as a binary frame is still an event
	fn on_binary(&mut self, bytes: &[u8]) {
		if let Some(event) = std::str::from_utf8(bytes).ok().and_then(|t| UiEvent::from_json(t).ok()) {
			self.dispatch(event);
			return;
		}
		match BinaryDataMsg::decode(bytes) {
			Ok(msg) => self.sink.binary(&msg.elt_id, &msg),
			Err(e) => warn!("{e}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph_sync::SyncError;
	use serde_json::json;

	#[derive(Default)]
	struct Wire {
		sent: Vec<String>,
		closed: bool,
	}

	impl Transport for Wire {
		fn send(&mut self, frame: &str) -> Result<(), SyncError> {
			self.sent.push(frame.to_owned());
			Ok(())
		}

		fn close(&mut self) -> Result<(), SyncError> {
			self.closed = true;
			Ok(())
		}
	}

	#[derive(Default)]
	struct Recorder {
		props: Vec<(String, String, Value)>,
		figures: Vec<(String, Value)>,
		triggers: Vec<(String, String, Option<Value>)>,
		blobs: Vec<(String, Vec<u8>)>,
	}

	impl UiSink for Recorder {
		fn set_property(&mut self, id: &str, property: &str, value: Value) {
			self.props.push((id.into(), property.into(), value));
		}

		fn update_figure(&mut self, id: &str, figure: Value, _config: Value) {
			self.figures.push((id.into(), figure));
		}

		fn trigger(&mut self, id: &str, event_type: &str, params: Option<&Value>) {
			self.triggers.push((id.into(), event_type.into(), params.cloned()));
		}

		fn binary(&mut self, id: &str, msg: &BinaryDataMsg) {
			self.blobs.push((id.into(), msg.payload().to_vec()));
		}
	}

	fn client() -> RelayClient<Wire, Recorder> {
		RelayClient::new(Wire::default(), Recorder::default())
	}

	#[test]
	fn greets_on_open() {
		let mut c = client();
		c.acquire();
		c.on_open();
		assert!(c.is_open());
		assert_eq!(c.transport().sent, ["connect"]);
	}

	#[test]
	fn last_release_disconnects() {
		let mut c = client();
		c.acquire();
		c.acquire();
		c.on_open();

		assert!(!c.release());
		assert_eq!(c.holders(), 1);
		assert!(!c.transport().closed);

		assert!(c.release());
		assert_eq!(c.transport().sent, ["connect", "disconnect"]);
		assert!(c.transport().closed);
		assert!(!c.is_open());
	}

	#[test]
	fn release_before_open_sends_nothing() {
		let mut c = client();
		c.acquire();
		assert!(c.release());
		assert!(c.transport().sent.is_empty());
	}

	#[test]
	fn unload_says_goodbye_once() {
		let mut c = client();
		c.acquire();
		c.on_open();
		c.on_unload();
		c.on_unload();
		assert_eq!(c.transport().sent, ["connect", "disconnect"]);
	}

	#[test]
	fn unmount_after_unload_stays_quiet() {
		let mut c = client();
		c.acquire();
		c.on_open();
		c.on_unload();
		assert!(c.release());
		assert_eq!(c.holders(), 0);
		assert_eq!(c.transport().sent, ["connect", "disconnect"]);
	}

	#[test]
	fn holders_never_underflow() {
		let mut c = client();
		assert!(c.release());
		c.acquire();
		assert_eq!(c.holders(), 1);
	}

	#[test]
	fn text_events_reach_the_sink() {
		let mut c = client();
		c.on_text(r#"{"event":"update_div_text","data":["status","2 peers"]}"#);
		c.on_text(r#"{"event":"update_figure","data":["plot",{"data":[]}]}"#);
		c.on_text(r#"{"event":"trigger_event","data":{"id":"t","eventType":"ping","params":[1]}}"#);
		c.on_text(r#"{"event":"unheard_of"}"#);
		c.on_text("not json");

		let sink = c.sink();
		assert_eq!(sink.props, [("status".to_string(), "children".to_string(), json!("2 peers"))]);
		assert_eq!(sink.figures, [("plot".to_string(), json!({"data": []}))]);
		assert_eq!(sink.triggers, [("t".to_string(), "ping".to_string(), Some(json!([1])))]);
	}

	#[test]
	fn binary_frames_prefer_json() {
		let mut c = client();
		c.on_binary(br#"{"event":"modify","data":[{"id":"a","property":"value","value":3}]}"#);
		assert_eq!(c.sink().props.len(), 1);
		assert!(c.sink().blobs.is_empty());
	}

	#[test]
	fn protobuf_frames_become_blobs() {
		// event="image", elt_id="cam", size=2, data=[1,2,3]
		let frame = [
			0x0a, 5, b'i', b'm', b'a', b'g', b'e', 0x12, 3, b'c', b'a', b'm', 0x18, 2, 0x22, 3, 1, 2, 3,
		];
		let mut c = client();
		c.on_binary(&frame);
		assert_eq!(c.sink().blobs, [("cam".to_string(), vec![1, 2])]);

		c.on_binary(&[0x22, 9, 1]);
		assert_eq!(c.sink().blobs.len(), 1);
	}
}
