//! `web_sys::WebSocket` plumbing shared by the graph panel and the UI relay.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};
use url::Url;
use wasm_bindgen::prelude::*;
use web_sys::{BinaryType, CloseEvent, Event, MessageEvent, WebSocket};

use crate::graph_sync::{GraphSyncSession, Renderer, SyncError, Transport};

/// Receiver of socket lifecycle and frame events.
pub trait SocketEvents {
	/// The socket finished its handshake.
	fn on_open(&mut self);
	/// The socket closed, cleanly or not.
	fn on_close(&mut self);
	/// The socket reported a failure.
	fn on_error(&mut self, reason: &str);
	/// A text frame arrived.
	fn on_text(&mut self, text: &str);
	/// A binary frame arrived.
	fn on_binary(&mut self, _bytes: &[u8]) {}
}

fn js_error(value: JsValue) -> SyncError {
	SyncError::Transport(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

impl<T: Transport, R: Renderer> SocketEvents for GraphSyncSession<T, R> {
	fn on_open(&mut self) {
		GraphSyncSession::on_open(self);
	}

	fn on_close(&mut self) {
		GraphSyncSession::on_close(self);
	}

	fn on_error(&mut self, reason: &str) {
		GraphSyncSession::on_error(self, reason);
	}

	fn on_text(&mut self, text: &str) {
		GraphSyncSession::on_text(self, text);
	}

	fn on_binary(&mut self, bytes: &[u8]) {
		warn!("Ignoring {} byte binary frame on the graph socket", bytes.len());
	}
}

/// A browser WebSocket used as a [`Transport`].
pub struct WsTransport {
	ws: WebSocket,
}

impl WsTransport {
	/// Open a socket; binary frames are delivered as array buffers.
	pub fn connect(url: &Url) -> Result<Self, SyncError> {
		let ws = WebSocket::new(url.as_str()).map_err(js_error)?;
		ws.set_binary_type(BinaryType::Arraybuffer);
		debug!("Connecting to {url}");
		Ok(Self { ws })
	}

	/// The underlying socket.
	pub fn socket(&self) -> &WebSocket {
		&self.ws
	}
}

impl Transport for WsTransport {
	fn send(&mut self, frame: &str) -> Result<(), SyncError> {
		if self.ws.ready_state() != WebSocket::OPEN {
			return Err(SyncError::Transport(format!(
				"socket {} is not open",
				self.ws.url()
			)));
		}
		self.ws.send_with_str(frame).map_err(js_error)
	}

	fn close(&mut self) -> Result<(), SyncError> {
		self.ws.close().map_err(js_error)
	}
}

/// Keeps the socket's event callbacks alive; dropping it detaches them.
pub struct SocketHandlers {
	ws: WebSocket,
	_open: Closure<dyn FnMut()>,
	_close: Closure<dyn FnMut(CloseEvent)>,
	_error: Closure<dyn FnMut(Event)>,
	_message: Closure<dyn FnMut(MessageEvent)>,
}

impl Drop for SocketHandlers {
	fn drop(&mut self) {
		self.ws.set_onopen(None);
		self.ws.set_onclose(None);
		self.ws.set_onerror(None);
		self.ws.set_onmessage(None);
	}
}

/// Route the socket's events into `target`.
pub fn attach<E: SocketEvents + 'static>(ws: &WebSocket, target: Rc<RefCell<E>>) -> SocketHandlers {
	let t = target.clone();
	let open = Closure::<dyn FnMut()>::new(move || t.borrow_mut().on_open());

	let t = target.clone();
	let close = Closure::<dyn FnMut(CloseEvent)>::new(move |ev: CloseEvent| {
		debug!("Socket closed with code {}", ev.code());
		t.borrow_mut().on_close();
	});

	let t = target.clone();
	let error = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
		t.borrow_mut().on_error(&ev.type_());
	});

	let t = target;
	let message = Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
		let data = ev.data();
		if let Some(text) = data.as_string() {
			t.borrow_mut().on_text(&text);
		} else if let Ok(buf) = data.dyn_into::<js_sys::ArrayBuffer>() {
			let bytes = js_sys::Uint8Array::new(&buf).to_vec();
			t.borrow_mut().on_binary(&bytes);
		}
	});

	ws.set_onopen(Some(open.as_ref().unchecked_ref()));
	ws.set_onclose(Some(close.as_ref().unchecked_ref()));
	ws.set_onerror(Some(error.as_ref().unchecked_ref()));
	ws.set_onmessage(Some(message.as_ref().unchecked_ref()));

	SocketHandlers {
		ws: ws.clone(),
		_open: open,
		_close: close,
		_error: error,
		_message: message,
	}
}
