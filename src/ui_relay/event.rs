use serde::Deserialize;
use serde_json::Value;

use crate::graph_sync::SyncError;

/// One property push: set `property` of element `id` to `value`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PropertyChange {
	/// Target element id.
	pub id: String,
	/// Property name, e.g. `children`.
	pub property: String,
	/// New value.
	pub value: Value,
}

/// A DOM event to dispatch at element `id`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TriggerSpec {
	/// Target element id.
	pub id: String,
	/// DOM event name.
	#[serde(rename = "eventType")]
	pub event_type: String,
	/// Init dictionary of a `CustomEvent` (`detail`, `bubbles`, ...) when
	/// present; a plain `Event` is dispatched otherwise.
	#[serde(default)]
	pub params: Option<Value>,
}

/// A decoded relay text frame.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
	/// `modify`: property pushes, applied in order.
	Modify(Vec<PropertyChange>),
	/// `update_figure` and its aliases.
	UpdateFigure {
		/// Element showing the figure.
		id: String,
		/// The new figure.
		figure: Value,
		/// Display options sent alongside; `null` when absent.
		config: Value,
	},
	/// `trigger_event`.
	Trigger(TriggerSpec),
	/// Event name outside the recognized set.
	Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
	event: String,
	#[serde(default)]
	data: Value,
}

fn positional(data: Value, what: &str) -> Result<(String, Vec<Value>), SyncError> {
	let Value::Array(mut items) = data else {
		return Err(SyncError::MalformedEvent(format!("`{what}` expects an array")));
	};
	if items.is_empty() {
		return Err(SyncError::MalformedEvent(format!("`{what}` is missing its element id")));
	}
	match items.remove(0) {
		Value::String(id) => Ok((id, items)),
		other => Err(SyncError::MalformedEvent(format!("`{what}` element id must be a string, got {other}"))),
	}
}

impl UiEvent {
	/// Decode one relay frame.
	pub fn from_json(frame: &str) -> Result<Self, SyncError> {
		let Envelope { event, data } = serde_json::from_str(frame)?;
		Ok(match event.as_str() {
			"modify" => UiEvent::Modify(serde_json::from_value(data)?),
			"trigger_event" => UiEvent::Trigger(serde_json::from_value(data)?),
			"update_figure" | "new_graph_figure" | "update_graph_figure" => {
				let (id, rest) = positional(data, &event)?;
				let mut rest = rest.into_iter();
				UiEvent::UpdateFigure {
					id,
					figure: rest.next().unwrap_or(Value::Null),
					config: rest.next().unwrap_or(Value::Null),
				}
			}
			"update_div_text" => {
				let (id, rest) = positional(data, &event)?;
				UiEvent::Modify(vec![PropertyChange {
					id,
					property: "children".into(),
					value: rest.into_iter().next().unwrap_or(Value::Null),
				}])
			}
			_ => UiEvent::Unknown(event),
		})
	}
}
