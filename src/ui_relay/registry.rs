use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, info, warn};
use serde_json::{Value, json};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, CustomEvent, CustomEventInit, Event};

use super::binary::BinaryDataMsg;
use super::client::UiSink;

/// A pushed value as element text: strings verbatim, `null` empty,
/// anything else as JSON.
pub fn display_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

#[derive(Default)]
struct Slots {
	props: HashMap<(String, String), RwSignal<Value>>,
	object_urls: HashMap<String, String>,
}

/// Reactive element properties the relay writes into.
///
/// Components read `property(id, name)` and re-render when the server pushes
/// a new value. Clones share the same slots.
#[derive(Clone, Default)]
pub struct PropertyRegistry {
	slots: Rc<RefCell<Slots>>,
}

impl PropertyRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// The signal behind `property` of element `id`, created as `null` on
	/// first use.
	pub fn property(&self, id: &str, property: &str) -> RwSignal<Value> {
		let key = (id.to_owned(), property.to_owned());
		*self.slots.borrow_mut().props.entry(key).or_insert_with(|| RwSignal::new(Value::Null))
	}

	/// `property` of `id` through [`display_text`].
	pub fn text(&self, id: &str, property: &str) -> String {
		display_text(&self.property(id, property).get())
	}

	fn replace_object_url(&self, id: &str, url: String) {
		let previous = self.slots.borrow_mut().object_urls.insert(id.to_owned(), url);
		if let Some(previous) = previous {
			let _ = web_sys::Url::revoke_object_url(&previous);
		}
	}
}

fn object_url(msg: &BinaryDataMsg) -> Result<String, JsValue> {
	let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(msg.payload()));
	let options = BlobPropertyBag::new();
	options.set_type(msg.mime_type());
	let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
	web_sys::Url::create_object_url_with_blob(&blob)
}

impl UiSink for PropertyRegistry {
	fn set_property(&mut self, id: &str, property: &str, value: Value) {
		// signal is copied out so effects it wakes can use the registry
		let signal = self.property(id, property);
		signal.set(value);
	}

	fn update_figure(&mut self, id: &str, figure: Value, config: Value) {
		let signal = self.property(id, "figure");
		signal.set(json!({ "figure": figure, "config": config }));
	}

	fn trigger(&mut self, id: &str, event_type: &str, params: Option<&Value>) {
		let Some(element) = web_sys::window()
			.and_then(|w| w.document())
			.and_then(|d| d.get_element_by_id(id))
		else {
			info!("No DOM element {id} exists");
			return;
		};
		// params is the init dictionary itself, e.g. {"detail": ..., "bubbles": true}
		let event = match params {
			Some(params) => js_sys::JSON::parse(&params.to_string()).and_then(|init| {
				CustomEvent::new_with_event_init_dict(event_type, init.unchecked_ref::<CustomEventInit>())
					.map(Event::from)
			}),
			None => Event::new(event_type),
		};
		match event.and_then(|ev| element.dispatch_event(&ev)) {
			Ok(_) => debug!("Dispatched {event_type} at {id}"),
			Err(e) => warn!("Could not dispatch {event_type} at {id}: {e:?}"),
		}
	}

	fn binary(&mut self, id: &str, msg: &BinaryDataMsg) {
		match object_url(msg) {
			Ok(url) => {
				self.property(id, "src").set(Value::String(url.clone()));
				self.replace_object_url(id, url);
			}
			Err(e) => warn!("Could not build a blob for {id}: {e:?}"),
		}
	}
}
