//! Node/link data model and the structural operations the session applies.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Node identity. Numeric ids on the wire are normalized to their decimal string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
	/// Wrap an id.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Borrow the id text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for NodeId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for NodeId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl<'de> Deserialize<'de> for NodeId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum RawId {
			Text(String),
			Signed(i64),
			Unsigned(u64),
		}

		Ok(match RawId::deserialize(deserializer)? {
			RawId::Text(s) => Self(s),
			RawId::Signed(n) => Self(n.to_string()),
			RawId::Unsigned(n) => Self(n.to_string()),
		})
	}
}

/// Categorical classifier shared by nodes, links and the legend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Group {
	/// Integer class. `0` on a link means "default, no color".
	Index(i64),
	/// Named class.
	Label(String),
}

impl Group {
	/// True for the link group that is drawn without a color.
	pub fn is_default(&self) -> bool {
		matches!(self, Group::Index(0))
	}
}

impl Default for Group {
	fn default() -> Self {
		Group::Index(0)
	}
}

impl fmt::Display for Group {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Group::Index(n) => write!(f, "{n}"),
			Group::Label(s) => f.write_str(s),
		}
	}
}

/// A graph vertex. Only `group` may change after insertion; `x`/`y` and
/// everything in `extra` belong to the renderer or are carried verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	/// Identity within the session.
	pub id: NodeId,
	/// Color class, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group: Option<Group>,
	/// Placeholder layout position.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	/// Placeholder layout position.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
	/// Fields the sync core never interprets.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl Node {
	/// A bare node with an optional group.
	pub fn new(id: impl Into<NodeId>, group: Option<Group>) -> Self {
		Self {
			id: id.into(),
			group,
			x: None,
			y: None,
			extra: Map::new(),
		}
	}

	/// Place the node at a layout position.
	pub fn place(&mut self, (x, y): (f64, f64)) {
		self.x = Some(x);
		self.y = Some(y);
	}
}

/// One end of a link: a raw id, or a node object the id is read from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
	/// Raw node id.
	Id(NodeId),
	/// A node reference, as rewritten in place by some layout engines.
	Resolved(Box<Node>),
}

impl Endpoint {
	/// The node id this endpoint refers to.
	pub fn id(&self) -> &NodeId {
		match self {
			Endpoint::Id(id) => id,
			Endpoint::Resolved(node) => &node.id,
		}
	}
}

impl From<&str> for Endpoint {
	fn from(id: &str) -> Self {
		Endpoint::Id(id.into())
	}
}

fn default_weight() -> f64 {
	1.0
}

/// A graph edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
	/// Source endpoint.
	pub source: Endpoint,
	/// Target endpoint.
	pub target: Endpoint,
	/// Color class; `0` is drawn grey.
	#[serde(default)]
	pub group: Group,
	/// Edge weight; drives stroke width.
	#[serde(default = "default_weight", alias = "weight")]
	pub value: f64,
	/// Fields the sync core never interprets.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl Link {
	/// A link between two raw ids.
	pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, group: Group, value: f64) -> Self {
		Self {
			source: Endpoint::Id(source.into()),
			target: Endpoint::Id(target.into()),
			group,
			value,
			extra: Map::new(),
		}
	}

	/// True if both endpoints resolve to the given ids.
	pub fn connects(&self, source: &NodeId, target: &NodeId) -> bool {
		self.source.id() == source && self.target.id() == target
	}
}

/// The authoritative node set and link list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
	/// Nodes in arrival order.
	pub nodes: Vec<Node>,
	/// Links in arrival order.
	pub links: Vec<Link>,
}

impl Graph {
	/// An empty graph.
	pub fn new() -> Self {
		Self::default()
	}

	/// First node with the given id.
	pub fn node(&self, id: &NodeId) -> Option<&Node> {
		self.nodes.iter().find(|n| &n.id == id)
	}

	/// Ids of every node currently present.
	pub fn node_ids(&self) -> HashSet<&NodeId> {
		self.nodes.iter().map(|n| &n.id).collect()
	}

	/// Remove the first node with the given id.
	pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
		let pos = self.nodes.iter().position(|n| &n.id == id)?;
		Some(self.nodes.remove(pos))
	}

	/// Remove the first link whose endpoints resolve to `source` and `target`.
	pub fn remove_link(&mut self, source: &NodeId, target: &NodeId) -> Option<Link> {
		let pos = self.links.iter().position(|l| l.connects(source, target))?;
		Some(self.links.remove(pos))
	}

	/// Overwrite the group of the first node with the given id.
	pub fn set_node_group(&mut self, id: &NodeId, group: Option<Group>) -> bool {
		let Some(node) = self.nodes.iter_mut().find(|n| &n.id == id) else {
			return false;
		};
		if let Some(group) = group {
			node.group = Some(group);
		}
		true
	}

	/// Overwrite the metadata fields of the first matching link.
	pub fn set_link_meta(
		&mut self,
		source: &NodeId,
		target: &NodeId,
		group: Option<Group>,
		value: Option<f64>,
	) -> bool {
		let Some(link) = self.links.iter_mut().find(|l| l.connects(source, target)) else {
			return false;
		};
		if let Some(group) = group {
			link.group = group;
		}
		if let Some(value) = value {
			link.value = value;
		}
		true
	}

	/// Endpoint pairs of every link that references a missing node, in link order.
	pub fn dangling_links(&self) -> Vec<(NodeId, NodeId)> {
		let ids = self.node_ids();
		self.links
			.iter()
			.filter(|l| !ids.contains(l.source.id()) || !ids.contains(l.target.id()))
			.map(|l| (l.source.id().clone(), l.target.id().clone()))
			.collect()
	}

	/// True if every link resolves on both ends.
	pub fn is_consistent(&self) -> bool {
		let ids = self.node_ids();
		self.links
			.iter()
			.all(|l| ids.contains(l.source.id()) && ids.contains(l.target.id()))
	}

	/// Drop every node and link.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.links.clear();
	}
}
