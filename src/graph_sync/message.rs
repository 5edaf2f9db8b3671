//! Decoding of the graph socket's JSON text frames.

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::SyncError;
use super::model::{Endpoint, Group, Link, Node, NodeId};

/// A node entry in a `remove` message: either the raw id or a node object.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum NodeSelector {
	Id(NodeId),
	Object { id: NodeId },
}

impl From<NodeSelector> for NodeId {
	fn from(selector: NodeSelector) -> Self {
		match selector {
			NodeSelector::Id(id) | NodeSelector::Object { id } => id,
		}
	}
}

/// Selects a link by its endpoint ids.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LinkKey {
	/// Source endpoint.
	pub source: Endpoint,
	/// Target endpoint.
	pub target: Endpoint,
}

/// Whitelisted node metadata carried by a `meta` message.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NodeMeta {
	/// Node to update.
	pub id: NodeId,
	/// New group; absent clears it.
	#[serde(default)]
	pub group: Option<Group>,
}

/// Whitelisted link metadata carried by a `meta` message.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LinkMeta {
	/// Source endpoint of the link to update.
	pub source: Endpoint,
	/// Target endpoint of the link to update.
	pub target: Endpoint,
	/// New group, if given.
	#[serde(default)]
	pub group: Option<Group>,
	/// New weight, if given.
	#[serde(default, alias = "weight")]
	pub value: Option<f64>,
}

/// A decoded update from the graph source.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
	/// Append nodes and links.
	Add {
		/// Nodes to append.
		nodes: Vec<Node>,
		/// Links to append.
		links: Vec<Link>,
	},
	/// Remove nodes by id and links by endpoint ids.
	Remove {
		/// Ids of the nodes to remove.
		nodes: Vec<NodeId>,
		/// Endpoints of the links to remove.
		links: Vec<LinkKey>,
	},
	/// Overwrite whitelisted metadata in place.
	Meta {
		/// Node metadata updates.
		nodes: Vec<NodeMeta>,
		/// Link metadata updates.
		links: Vec<LinkMeta>,
	},
	/// Discard the graph and adopt this one.
	Replace {
		/// The new node set.
		nodes: Vec<Node>,
		/// The new link set.
		links: Vec<Link>,
		/// Legend categories, when the source sends them.
		groups: Option<Vec<Group>>,
	},
	/// A `type` this client does not know.
	Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
	#[serde(rename = "type")]
	kind: Option<String>,
	#[serde(default)]
	nodes: Vec<Value>,
	#[serde(default)]
	links: Vec<Value>,
	#[serde(default)]
	groups: Option<Vec<Group>>,
}

// one bad entry is dropped rather than failing the frame, so the exchange keeps moving
fn decode_all<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
	items
		.into_iter()
		.filter_map(|item| match serde_json::from_value(item) {
			Ok(decoded) => Some(decoded),
			Err(e) => {
				debug!("Skipping {what} entry: {e}");
				None
			}
		})
		.collect()
}

impl Message {
	/// Decode one text frame. Fails only when the envelope itself is not
	/// usable; entries that do not decode are skipped.
	pub fn from_json(frame: &str) -> Result<Self, SyncError> {
		let envelope: Envelope = serde_json::from_str(frame)?;
		Ok(match envelope.kind.as_deref() {
			Some("add") => Message::Add {
				nodes: decode_all(envelope.nodes, "node"),
				links: decode_all(envelope.links, "link"),
			},
			Some("remove") => Message::Remove {
				nodes: decode_all::<NodeSelector>(envelope.nodes, "node")
					.into_iter()
					.map(NodeId::from)
					.collect(),
				links: decode_all(envelope.links, "link"),
			},
			Some("meta") => Message::Meta {
				nodes: decode_all(envelope.nodes, "node"),
				links: decode_all(envelope.links, "link"),
			},
			// The graph source tags its first full snapshot "new".
			None | Some("new") => Message::Replace {
				nodes: decode_all(envelope.nodes, "node"),
				links: decode_all(envelope.links, "link"),
				groups: envelope.groups,
			},
			Some(other) => Message::Unknown(other.to_string()),
		})
	}

	/// Short name used in log lines.
	pub fn kind(&self) -> &str {
		match self {
			Message::Add { .. } => "add",
			Message::Remove { .. } => "remove",
			Message::Meta { .. } => "meta",
			Message::Replace { .. } => "full graph",
			Message::Unknown(kind) => kind,
		}
	}

	/// Payload sizes as `(nodes, links)`.
	pub fn payload_len(&self) -> (usize, usize) {
		match self {
			Message::Add { nodes, links } | Message::Replace { nodes, links, .. } => {
				(nodes.len(), links.len())
			}
			Message::Remove { nodes, links } => (nodes.len(), links.len()),
			Message::Meta { nodes, links } => (nodes.len(), links.len()),
			Message::Unknown(_) => (0, 0),
		}
	}
}
