//! The client side of the credit-paced graph exchange.
//!
//! The remote source sends one delta per continuation request, so the
//! session never holds more than one unapplied update. Every structural
//! change is followed by a link validation pass that silently drops links
//! whose endpoints are no longer in the node set.

use log::{debug, info, warn};

use super::config::{DuplicateIds, SyncConfig};
use super::error::SyncError;
use super::message::{LinkMeta, Message, NodeMeta};
use super::model::{Graph, Group, Link, Node, NodeId};

/// Outbound frame asking for the next delta.
pub const REQUEST_NEXT: &str = "";
/// Outbound frame ending the exchange.
pub const REQUEST_DONE: &str = "done";

/// Bidirectional frame channel to the graph source.
pub trait Transport {
	/// Send one text frame.
	fn send(&mut self, frame: &str) -> Result<(), SyncError>;

	/// Close the channel. Sessions never call this on their own.
	fn close(&mut self) -> Result<(), SyncError> {
		Ok(())
	}
}

/// A transport that was never connected, for sessions fed by
/// [`GraphSyncSession::load`]. Every send fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl Transport for Detached {
	fn send(&mut self, _frame: &str) -> Result<(), SyncError> {
		Err(SyncError::Transport("no graph socket in static mode".into()))
	}
}

/// Energy a layout restart begins with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reheat {
	/// After an incremental add or remove.
	Gentle,
	/// While the user drags a node.
	Drag,
	/// After a full replace.
	Strong,
}

impl Reheat {
	/// Simulation alpha the restart begins with.
	pub fn energy(self) -> f64 {
		match self {
			Reheat::Gentle => 0.1,
			Reheat::Strong => 0.3,
			Reheat::Drag => 0.5,
		}
	}
}

/// Layout engine consuming the authoritative graph.
pub trait Renderer {
	/// Repaint from the current graph. Must be idempotent.
	fn render(&mut self, graph: &Graph, legend: &[Group]);
	/// Restart the layout with `heat`.
	fn reheat(&mut self, heat: Reheat);
	/// Freeze the layout where it is.
	fn halt(&mut self);

	/// Where freshly inserted nodes are placed, if the layout needs a seed position.
	fn placeholder_position(&self) -> Option<(f64, f64)> {
		None
	}
}

/// What a completed message asked the source for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
	/// Continue with one more delta.
	Next,
	/// No more deltas.
	Done,
}

impl Request {
	fn frame(self) -> &'static str {
		match self {
			Request::Next => REQUEST_NEXT,
			Request::Done => REQUEST_DONE,
		}
	}
}

fn default_legend() -> Vec<Group> {
	('a'..='t').map(|c| Group::Label(c.to_string())).collect()
}

/// Owns one graph panel's state and drives its exchange with the source.
pub struct GraphSyncSession<T, R> {
	graph: Graph,
	legend_groups: Vec<Group>,
	message_count: i64,
	max_messages: i64,
	initial_payload: String,
	duplicate_ids: DuplicateIds,
	debug: bool,
	active: bool,
	pending_start: bool,
	stopped: bool,
	transport: T,
	renderer: R,
}

impl<T: Transport, R: Renderer> GraphSyncSession<T, R> {
	/// A fresh session; nothing is sent until [`start`](Self::start).
	pub fn new(config: &SyncConfig, transport: T, renderer: R) -> Self {
		Self {
			graph: Graph::new(),
			legend_groups: default_legend(),
			message_count: 0,
			max_messages: config.max_messages,
			initial_payload: config.initial_payload.clone(),
			duplicate_ids: config.duplicate_ids,
			debug: config.debug_logging,
			active: false,
			pending_start: false,
			stopped: false,
			transport,
			renderer,
		}
	}

	/// The authoritative graph.
	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	/// Groups the legend shows, in order.
	pub fn legend_groups(&self) -> &[Group] {
		&self.legend_groups
	}

	/// Number of requests issued so far, the initial payload included.
	pub fn step(&self) -> i64 {
		self.message_count
	}

	/// Whether the transport is usable.
	pub fn is_active(&self) -> bool {
		self.active
	}

	/// Whether the initial payload is waiting for the transport to open.
	pub fn is_start_pending(&self) -> bool {
		self.pending_start
	}

	/// Whether [`stop`](Self::stop) ended the exchange.
	pub fn is_stopped(&self) -> bool {
		self.stopped
	}

	/// The outbound side.
	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// The layout engine.
	pub fn renderer(&self) -> &R {
		&self.renderer
	}

	/// The layout engine, mutably.
	pub fn renderer_mut(&mut self) -> &mut R {
		&mut self.renderer
	}

	/// Send the initial payload now, or as soon as the transport opens.
	pub fn start(&mut self) {
		if self.active {
			self.send_initial();
		} else {
			self.pending_start = true;
		}
	}

	/// Stop requesting deltas and halt the layout. Every later request is
	/// `"done"`, whatever the cap. The transport stays open.
	pub fn stop(&mut self) {
		self.stopped = true;
		self.message_count = self.message_count.max(self.max_messages);
		self.send(REQUEST_DONE);
		self.renderer.halt();
		info!("Graph exchange stopped at step {}", self.message_count);
	}

	/// Forget all graph state and counters.
	pub fn reset(&mut self) {
		self.graph.clear();
		self.legend_groups = default_legend();
		self.message_count = 0;
		self.pending_start = false;
		self.stopped = false;
		self.renderer.render(&self.graph, &self.legend_groups);
	}

	/// The transport opened; flush a pending start.
	pub fn on_open(&mut self) {
		self.active = true;
		info!("Graph socket opened");
		if self.pending_start {
			self.send_initial();
		}
	}

	/// The transport closed.
	pub fn on_close(&mut self) {
		self.active = false;
		info!("Graph socket closed");
	}

	/// The transport failed.
	pub fn on_error(&mut self, reason: &str) {
		self.active = false;
		warn!("Graph socket error: {reason}");
	}

	/// Decode and apply one text frame. Frames that fail to decode are dropped
	/// without consuming a credit.
	pub fn on_text(&mut self, frame: &str) {
		match Message::from_json(frame) {
			Ok(msg) => {
				self.apply_message(msg);
			}
			Err(e) => warn!("Dropping graph frame: {e}"),
		}
	}

	/// Apply one message, then ask the source for the next.
	pub fn apply_message(&mut self, msg: Message) -> Request {
		if self.debug {
			let (nodes, links) = msg.payload_len();
			debug!("{}: {nodes} nodes and {links} links", msg.kind());
		}
		match msg {
			Message::Add { nodes, links } => {
				self.add(nodes, links);
				self.after_structural_change(Reheat::Gentle);
			}
			Message::Remove { nodes, links } => {
				for id in &nodes {
					self.graph.remove_node(id);
				}
				for key in &links {
					self.graph.remove_link(key.source.id(), key.target.id());
				}
				self.after_structural_change(Reheat::Gentle);
			}
			Message::Meta { nodes, links } => {
				self.change_meta(&nodes, &links);
				self.renderer.render(&self.graph, &self.legend_groups);
			}
			Message::Replace { nodes, links, groups } => {
				self.replace(nodes, links, groups);
				self.after_structural_change(Reheat::Strong);
			}
			Message::Unknown(kind) => {
				if self.debug {
					debug!("{}", SyncError::UnknownMessageType(kind));
				}
			}
		}
		self.request_next()
	}

	/// Drop every link with an endpoint outside the node set. Returns how many were dropped.
	pub fn validate_links(&mut self) -> usize {
		let dangling = self.graph.dangling_links();
		for (source, target) in &dangling {
			if self.debug {
				debug!(
					"{}",
					SyncError::MalformedLink {
						from: source.clone(),
						to: target.clone(),
					}
				);
			}
			self.graph.remove_link(source, target);
		}
		dangling.len()
	}

	/// Spend one credit on a continuation request, or end the exchange once
	/// the cap is reached or the session was stopped. A request that fails to
	/// send costs nothing.
	pub fn request_next(&mut self) -> Request {
		let has_credit = self.max_messages < 1 || self.message_count < self.max_messages;
		let request = if !self.stopped && has_credit {
			Request::Next
		} else {
			Request::Done
		};
		if self.send(request.frame()) && request == Request::Next {
			self.message_count += 1;
		}
		request
	}

	/// Load a whole graph in one go, without a transport exchange. The frame
	/// must be a full replace.
	pub fn load(&mut self, frame: &str) -> Result<(), SyncError> {
		match Message::from_json(frame)? {
			Message::Replace { nodes, links, groups } => {
				self.replace(nodes, links, groups);
				self.after_structural_change(Reheat::Strong);
				info!("Loaded {} nodes and {} links", self.graph.nodes.len(), self.graph.links.len());
				Ok(())
			}
			other => Err(SyncError::UnknownMessageType(other.kind().to_string())),
		}
	}

	/// Close the transport, e.g. when the panel goes away.
	pub fn close(&mut self) {
		self.active = false;
		if let Err(e) = self.transport.close() {
			warn!("{e}");
		}
	}

	fn add(&mut self, nodes: Vec<Node>, links: Vec<Link>) {
		let seed = self.renderer.placeholder_position();
		for mut node in nodes {
			if self.duplicate_ids == DuplicateIds::Skip && self.graph.node(&node.id).is_some() {
				if self.debug {
					debug!("Skipping duplicate node {}", node.id);
				}
				continue;
			}
			if let Some(pos) = seed {
				node.place(pos);
			}
			self.graph.nodes.push(node);
		}
		self.graph.links.extend(links);
	}

	fn change_meta(&mut self, nodes: &[NodeMeta], links: &[LinkMeta]) {
		for meta in nodes {
			if !self.graph.set_node_group(&meta.id, meta.group.clone()) && self.debug {
				debug!("No node {} to update", meta.id);
			}
		}
		for meta in links {
			let (source, target): (&NodeId, &NodeId) = (meta.source.id(), meta.target.id());
			if !self.graph.set_link_meta(source, target, meta.group.clone(), meta.value) && self.debug {
				debug!("No link {source} -> {target} to update");
			}
		}
	}

	fn replace(&mut self, nodes: Vec<Node>, links: Vec<Link>, groups: Option<Vec<Group>>) {
		self.graph.clear();
		let seed = self.renderer.placeholder_position();
		self.graph.nodes = nodes;
		if let Some(pos) = seed {
			for node in &mut self.graph.nodes {
				node.place(pos);
			}
		}
		self.graph.links = links;
		if let Some(groups) = groups {
			self.legend_groups = groups;
		}
	}

	fn after_structural_change(&mut self, heat: Reheat) {
		self.validate_links();
		self.renderer.render(&self.graph, &self.legend_groups);
		self.renderer.reheat(heat);
	}

	fn send_initial(&mut self) {
		let payload = self.initial_payload.clone();
		if self.send(&payload) {
			self.message_count += 1;
		}
		self.pending_start = false;
	}

	fn send(&mut self, frame: &str) -> bool {
		match self.transport.send(frame) {
			Ok(()) => true,
			Err(e) => {
				warn!("{e}");
				self.active = false;
				false
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph_sync::model::Endpoint;
	use proptest::prelude::*;
	use serde_json::json;

	#[derive(Default)]
	struct Wire {
		sent: Vec<String>,
		fail: bool,
	}

	impl Transport for Wire {
		fn send(&mut self, frame: &str) -> Result<(), SyncError> {
			if self.fail {
				return Err(SyncError::Transport("socket is closed".into()));
			}
			self.sent.push(frame.to_string());
			Ok(())
		}
	}

	#[derive(Default)]
	struct Canvas {
		renders: usize,
		reheats: Vec<Reheat>,
		halted: bool,
	}

	impl Renderer for Canvas {
		fn render(&mut self, _: &Graph, _: &[Group]) {
			self.renders += 1;
		}

		fn reheat(&mut self, heat: Reheat) {
			self.reheats.push(heat);
		}

		fn halt(&mut self) {
			self.halted = true;
		}

		fn placeholder_position(&self) -> Option<(f64, f64)> {
			Some((400.0, 300.0))
		}
	}

	fn session(max_messages: i64) -> GraphSyncSession<Wire, Canvas> {
		let config = SyncConfig {
			max_messages,
			initial_payload: "hierarchy".into(),
			..SyncConfig::default()
		};
		GraphSyncSession::new(&config, Wire::default(), Canvas::default())
	}

	fn frame(value: serde_json::Value) -> Message {
		Message::from_json(&value.to_string()).unwrap()
	}

	fn scenario_a() -> Message {
		frame(json!({
			"type": "add",
			"nodes": [{"id": "A", "group": 1}, {"id": "B", "group": 1}],
			"links": [{"source": "A", "target": "B", "group": 0, "value": 2}]
		}))
	}

	#[test]
	fn add_builds_graph_and_reheats_gently() {
		let mut s = session(10);
		assert_eq!(s.apply_message(scenario_a()), Request::Next);
		assert_eq!(s.graph().nodes.len(), 2);
		assert_eq!(s.graph().links.len(), 1);
		assert_eq!(s.graph().nodes[0].x, Some(400.0));
		assert_eq!(s.renderer().reheats, vec![Reheat::Gentle]);
		assert_eq!(s.transport().sent, vec![REQUEST_NEXT]);
	}

	#[test]
	fn removing_a_node_drops_its_links() {
		let mut s = session(10);
		s.apply_message(scenario_a());
		s.apply_message(frame(json!({"type": "remove", "nodes": ["A"], "links": []})));
		assert_eq!(s.graph().nodes.len(), 1);
		assert_eq!(s.graph().nodes[0].id, NodeId::from("B"));
		assert!(s.graph().links.is_empty());
	}

	#[test]
	fn links_to_unknown_nodes_never_survive_an_add() {
		let mut s = session(10);
		s.apply_message(frame(json!({
			"type": "add",
			"nodes": [],
			"links": [{"source": "X", "target": "Y", "group": 1, "value": 1}]
		})));
		assert!(s.graph().links.is_empty());
	}

	#[test]
	fn remove_link_matches_by_endpoint_ids() {
		let mut s = session(10);
		s.apply_message(scenario_a());
		s.apply_message(frame(json!({
			"type": "remove",
			"nodes": [],
			"links": [{"source": "B", "target": "A"}, {"source": "A", "target": "B"}]
		})));
		assert!(s.graph().links.is_empty());
		assert_eq!(s.graph().nodes.len(), 2);
	}

	#[test]
	fn validation_handles_resolved_endpoints() {
		let mut s = session(0);
		s.apply_message(scenario_a());
		s.graph.links.push(Link {
			source: Endpoint::Resolved(Box::new(Node::new("B", None))),
			target: Endpoint::Resolved(Box::new(Node::new("Z", None))),
			group: Group::Index(1),
			value: 1.0,
			extra: Default::default(),
		});
		assert_eq!(s.validate_links(), 1);
		assert_eq!(s.graph().links.len(), 1);
		assert!(s.graph().is_consistent());
	}

	#[test]
	fn meta_only_changes_group_and_never_reheats() {
		let mut s = session(10);
		s.apply_message(scenario_a());
		let before = s.graph().clone();
		s.apply_message(frame(json!({
			"type": "meta",
			"nodes": [{"id": "A", "group": 5, "x": 1.0, "name": "ignored"}],
			"links": []
		})));

		let node = s.graph().node(&"A".into()).unwrap();
		assert_eq!(node.group, Some(Group::Index(5)));
		assert_eq!(node.x, before.nodes[0].x);
		assert!(node.extra.is_empty());
		assert_eq!(s.graph().links, before.links);
		assert_eq!(s.graph().nodes[1], before.nodes[1]);
		assert_eq!(s.renderer().reheats, vec![Reheat::Gentle]);
	}

	#[test]
	fn full_replace_discards_previous_state() {
		let mut s = session(10);
		s.apply_message(scenario_a());
		s.apply_message(frame(json!({
			"nodes": [{"id": 1, "group": "x"}, {"id": 2, "group": "y"}],
			"links": [{"source": 1, "target": 2, "weight": 3}, {"source": 1, "target": "A"}],
			"groups": ["x", "y"]
		})));

		let g = s.graph();
		assert_eq!(g.nodes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);
		assert_eq!(g.links.len(), 1);
		assert_eq!(g.links[0].value, 3.0);
		assert_eq!(s.legend_groups(), &[Group::Label("x".into()), Group::Label("y".into())]);
		assert_eq!(s.renderer().reheats.last(), Some(&Reheat::Strong));
	}

	#[test]
	fn legend_is_kept_when_replace_has_no_groups() {
		let mut s = session(10);
		s.apply_message(frame(json!({"nodes": [], "links": [], "groups": [1, 2]})));
		s.apply_message(frame(json!({"type": "new", "nodes": [], "links": []})));
		assert_eq!(s.legend_groups(), &[Group::Index(1), Group::Index(2)]);
	}

	#[test]
	fn duplicate_ids_follow_policy() {
		let mut s = session(10);
		s.apply_message(scenario_a());
		s.apply_message(frame(json!({"type": "add", "nodes": [{"id": "A"}], "links": []})));
		assert_eq!(s.graph().nodes.len(), 3);

		let config = SyncConfig {
			duplicate_ids: DuplicateIds::Skip,
			..SyncConfig::default()
		};
		let mut s = GraphSyncSession::new(&config, Wire::default(), Canvas::default());
		s.apply_message(scenario_a());
		s.apply_message(frame(json!({"type": "add", "nodes": [{"id": "A"}], "links": []})));
		assert_eq!(s.graph().nodes.len(), 2);
	}

	#[test]
	fn unknown_type_is_a_noop_that_still_requests_more() {
		let mut s = session(10);
		s.apply_message(scenario_a());
		let before = s.graph().clone();
		assert_eq!(s.apply_message(Message::Unknown("spin".into())), Request::Next);
		assert_eq!(s.graph(), &before);
		assert_eq!(s.renderer().reheats.len(), 1);
	}

	#[test]
	fn third_request_after_two_messages_is_done() {
		let mut s = session(2);
		s.apply_message(scenario_a());
		s.apply_message(frame(json!({"type": "remove", "nodes": ["A"], "links": []})));
		assert_eq!(s.request_next(), Request::Done);
		assert_eq!(s.transport().sent, vec![REQUEST_NEXT, REQUEST_NEXT, REQUEST_DONE]);
	}

	#[test]
	fn start_waits_for_open() {
		let mut s = session(3);
		s.start();
		assert!(s.is_start_pending());
		assert!(s.transport().sent.is_empty());

		s.on_open();
		assert!(!s.is_start_pending());
		assert_eq!(s.transport().sent, vec!["hierarchy"]);
		assert_eq!(s.step(), 1);

		s.on_close();
		s.start();
		assert!(s.is_start_pending());
		s.on_error("connection refused");
		assert!(s.is_start_pending());
	}

	#[test]
	fn start_when_open_sends_immediately() {
		let mut s = session(3);
		s.on_open();
		s.start();
		assert_eq!(s.transport().sent, vec!["hierarchy"]);
		assert!(!s.is_start_pending());
	}

	#[test]
	fn stop_exhausts_credit_and_halts() {
		let mut s = session(50);
		s.on_open();
		s.start();
		s.stop();
		assert!(s.renderer().halted);
		assert_eq!(s.apply_message(scenario_a()), Request::Done);
		assert_eq!(s.transport().sent, vec!["hierarchy", REQUEST_DONE, REQUEST_DONE]);
	}

	#[test]
	fn undecodable_frames_cost_nothing() {
		let mut s = session(10);
		s.on_text("<html>");
		s.on_text(r#"{"type": "add", "nodes": {"id": "A"}}"#);
		assert!(s.transport().sent.is_empty());
		assert_eq!(s.step(), 0);
	}

	#[test]
	fn a_bad_entry_does_not_stall_the_exchange() {
		let mut s = session(10);
		s.on_text(r#"{"type": "add", "nodes": [{"group": 1}, {"id": "A"}], "links": []}"#);
		assert_eq!(s.graph().nodes.len(), 1);
		assert_eq!(s.transport().sent, vec![REQUEST_NEXT]);
	}

	#[test]
	fn stop_cancels_an_unbounded_exchange() {
		let mut s = session(0);
		s.on_open();
		s.stop();
		assert!(s.is_stopped());
		assert_eq!(s.apply_message(scenario_a()), Request::Done);
		assert_eq!(s.request_next(), Request::Done);
		assert_eq!(s.transport().sent, vec![REQUEST_DONE, REQUEST_DONE, REQUEST_DONE]);

		s.reset();
		assert!(!s.is_stopped());
		assert_eq!(s.request_next(), Request::Next);
	}

	#[test]
	fn failed_sends_spend_no_credit() {
		let mut s = session(2);
		s.transport.fail = true;
		s.apply_message(scenario_a());
		s.apply_message(Message::Unknown("tick".into()));
		assert_eq!(s.step(), 0);

		s.transport.fail = false;
		assert_eq!(s.request_next(), Request::Next);
		assert_eq!(s.request_next(), Request::Next);
		assert_eq!(s.request_next(), Request::Done);
	}

	#[test]
	fn failed_initial_send_spends_no_credit() {
		let mut s = session(3);
		s.transport.fail = true;
		s.on_open();
		s.start();
		assert_eq!(s.step(), 0);
		assert!(!s.is_start_pending());
	}

	#[test]
	fn load_replaces_without_requesting() {
		let config = SyncConfig::default();
		let mut s = GraphSyncSession::new(&config, Detached, Canvas::default());
		s.load(r#"{"nodes": [{"id": 1}, {"id": 2}], "links": [{"source": 1, "target": 2}, {"source": 1, "target": 9}]}"#)
			.unwrap();
		assert_eq!(s.graph().nodes.len(), 2);
		assert_eq!(s.graph().links.len(), 1);
		assert_eq!(s.renderer().reheats, vec![Reheat::Strong]);
		assert_eq!(s.step(), 0);

		assert!(matches!(
			s.load(r#"{"type": "add", "nodes": []}"#),
			Err(SyncError::UnknownMessageType(_))
		));
	}

	#[test]
	fn send_failure_marks_session_inactive() {
		let mut s = session(10);
		s.on_open();
		s.transport.fail = true;
		s.apply_message(scenario_a());
		assert!(!s.is_active());
	}

	#[test]
	fn reset_clears_graph_and_counters() {
		let mut s = session(10);
		s.apply_message(scenario_a());
		s.reset();
		assert!(s.graph().nodes.is_empty());
		assert_eq!(s.step(), 0);
		assert_eq!(s.legend_groups().len(), 20);
	}

	#[derive(Clone, Debug)]
	enum Op {
		Add(Vec<u8>, Vec<(u8, u8)>),
		Remove(Vec<u8>, Vec<(u8, u8)>),
		Replace(Vec<u8>, Vec<(u8, u8)>),
	}

	fn op_strategy() -> impl Strategy<Value = Op> {
		let ids = proptest::collection::vec(0u8..8, 0..5);
		let pairs = proptest::collection::vec((0u8..8, 0u8..8), 0..6);
		prop_oneof![
			(ids.clone(), pairs.clone()).prop_map(|(n, l)| Op::Add(n, l)),
			(ids.clone(), pairs.clone()).prop_map(|(n, l)| Op::Remove(n, l)),
			(ids, pairs).prop_map(|(n, l)| Op::Replace(n, l)),
		]
	}

	fn to_message(op: Op) -> Message {
		let nodes = |ids: &[u8]| -> Vec<Node> { ids.iter().map(|i| Node::new(i.to_string(), None)).collect() };
		let links = |pairs: &[(u8, u8)]| -> Vec<Link> {
			pairs
				.iter()
				.map(|(s, t)| Link::new(s.to_string(), t.to_string(), Group::Index(1), 1.0))
				.collect()
		};
		match op {
			Op::Add(n, l) => Message::Add {
				nodes: nodes(&n),
				links: links(&l),
			},
			Op::Remove(n, l) => Message::Remove {
				nodes: n.iter().map(|i| NodeId::new(i.to_string())).collect(),
				links: l
					.iter()
					.map(|(s, t)| crate::graph_sync::message::LinkKey {
						source: Endpoint::Id(s.to_string().into()),
						target: Endpoint::Id(t.to_string().into()),
					})
					.collect(),
			},
			Op::Replace(n, l) => Message::Replace {
				nodes: nodes(&n),
				links: links(&l),
				groups: None,
			},
		}
	}

	proptest! {
		#[test]
		fn every_surviving_link_resolves(ops in proptest::collection::vec(op_strategy(), 1..20)) {
			let mut s = session(0);
			for op in ops {
				s.apply_message(to_message(op));
				prop_assert!(s.graph().is_consistent());
			}
		}

		#[test]
		fn credit_cap_is_exact(max in 1i64..12, extra in 0usize..6) {
			let mut s = session(max);
			let total = max as usize + extra;
			let requests: Vec<Request> = (0..total)
				.map(|_| s.apply_message(Message::Unknown("tick".into())))
				.collect();
			prop_assert!(requests[..max as usize].iter().all(|r| *r == Request::Next));
			prop_assert!(requests[max as usize..].iter().all(|r| *r == Request::Done));
			prop_assert_eq!(s.request_next(), Request::Done);
		}

		#[test]
		fn unbounded_never_says_done(max in -5i64..1, count in 1usize..40) {
			let mut s = session(max);
			for _ in 0..count {
				prop_assert_eq!(s.apply_message(Message::Unknown("tick".into())), Request::Next);
			}
			prop_assert!(s.transport().sent.iter().all(|f| f.is_empty()));
		}
	}
}
