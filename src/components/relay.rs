use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{info, warn};
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, HtmlDivElement};

use crate::graph_sync::SyncConfig;
use crate::socket::{self, SocketHandlers, WsTransport};
use crate::ui_relay::{PropertyRegistry, RelayClient};

type Relay = RelayClient<WsTransport, PropertyRegistry>;

/// The mounted relay. Dropping it releases this component's hold and
/// unhooks the page-unload goodbye.
struct RelayLink {
	client: Rc<RefCell<Relay>>,
	unload: Closure<dyn FnMut(Event)>,
	_socket: SocketHandlers,
}

impl Drop for RelayLink {
	fn drop(&mut self) {
		if let Some(window) = web_sys::window() {
			let _ = window.remove_event_listener_with_callback("beforeunload", self.unload.as_ref().unchecked_ref());
		}
		if self.client.borrow_mut().release() {
			info!("Relay released");
		}
	}
}

fn open_relay(config: &SyncConfig, registry: PropertyRegistry) -> Option<RelayLink> {
	let location = web_sys::window()?.location();
	let (protocol, host) = (
		location.protocol().unwrap_or_else(|_| "http:".into()),
		location.hostname().unwrap_or_else(|_| "localhost".into()),
	);
	let endpoint = match config.relay_endpoint(&protocol, &host)? {
		Ok(endpoint) => endpoint,
		Err(e) => {
			warn!("{e}");
			return None;
		}
	};
	let transport = match WsTransport::connect(&endpoint) {
		Ok(transport) => transport,
		Err(e) => {
			warn!("{e}");
			return None;
		}
	};
	let ws = transport.socket().clone();
	let client = Rc::new(RefCell::new(RelayClient::new(transport, registry)));
	client.borrow_mut().acquire();
	let handlers = socket::attach(&ws, client.clone());

	let client_unload = client.clone();
	let unload = Closure::<dyn FnMut(Event)>::new(move |_: Event| client_unload.borrow_mut().on_unload());
	if let Some(window) = web_sys::window() {
		let _ = window.add_event_listener_with_callback("beforeunload", unload.as_ref().unchecked_ref());
	}
	info!("Relay listening on {endpoint}");

	Some(RelayLink {
		client,
		unload,
		_socket: handlers,
	})
}

/// Invisible relay connection feeding `registry`. Renders nothing when the
/// relay is not configured.
#[component]
pub fn AsyncUpdate(#[prop(into)] config: SyncConfig, registry: PropertyRegistry) -> impl IntoView {
	let div_ref = NodeRef::<leptos::html::Div>::new();
	let link: Rc<RefCell<Option<RelayLink>>> = Rc::new(RefCell::new(None));

	let held = SendWrapper::new(link.clone());
	on_cleanup(move || {
		held.take().borrow_mut().take();
	});

	Effect::new(move |_| {
		if div_ref.get().is_none() || link.borrow().is_some() {
			return;
		}
		*link.borrow_mut() = open_relay(&config, registry.clone());
	});

	view! { <div node_ref=div_ref class="async-update" style="display: none;" /> }
}

/// A `div` that counts the server-triggered events of type `event_type`
/// aimed at it.
#[component]
pub fn Trigger(
	#[prop(into)] id: String,
	#[prop(into)] event_type: String,
	triggers: RwSignal<u32>,
) -> impl IntoView {
	let div_ref = NodeRef::<leptos::html::Div>::new();
	type Listener = (HtmlDivElement, Closure<dyn FnMut(Event)>);
	let listener: Rc<RefCell<Option<Listener>>> = Rc::new(RefCell::new(None));
	let own_id = id.clone();

	let held = SendWrapper::new((listener.clone(), event_type.clone()));
	on_cleanup(move || {
		let (listener, event_type) = held.take();
		if let Some((div, closure)) = listener.borrow_mut().take() {
			let _ = div.remove_event_listener_with_callback(&event_type, closure.as_ref().unchecked_ref());
		}
	});

	Effect::new(move |_| {
		let Some(div) = div_ref.get() else {
			return;
		};
		if listener.borrow().is_some() {
			return;
		}
		let own_id = own_id.clone();
		let closure = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
			let on_self = ev
				.target()
				.and_then(|t| t.dyn_into::<Element>().ok())
				.is_some_and(|el| el.id() == own_id);
			if on_self {
				triggers.update(|n| *n += 1);
			}
		});
		let _ = div.add_event_listener_with_callback(&event_type, closure.as_ref().unchecked_ref());
		*listener.borrow_mut() = Some((div, closure));
	});

	view! { <div id=id node_ref=div_ref class="trigger" /> }
}
