use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use crate::graph_sync::{Graph, Group, NodeId, Reheat};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];
const DEFAULT_LINK_COLOR: &str = "#777";

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;
/// Spawn ring radius around the placeholder position, in world units.
const SPAWN_RADIUS: f64 = 10.0;

pub const ALPHA_MIN: f64 = 0.001;
// 300 ticks from 1.0 down to ALPHA_MIN
pub const ALPHA_DECAY: f64 = 0.0228;

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: NodeId,
	pub color: String,
}

#[derive(Clone, Debug, Default)]
pub struct LinkInfo {
	pub color: String,
	pub width: f64,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

/// Ordinal color of a group: its position in the legend, or a stable
/// fallback slot for groups the legend does not list.
pub fn group_color(group: &Group, legend: &[Group]) -> &'static str {
	let slot = match legend.iter().position(|g| g == group) {
		Some(pos) => pos,
		None => match group {
			Group::Index(n) => n.unsigned_abs() as usize,
			Group::Label(s) => s.bytes().map(usize::from).sum(),
		},
	};
	COLORS[slot % COLORS.len()]
}

fn simulation() -> ForceGraph<NodeInfo, LinkInfo> {
	ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	})
}

pub struct ForceGraphState {
	pub graph: ForceGraph<NodeInfo, LinkInfo>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub alpha: f64,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx)>,
}

impl ForceGraphState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			graph: simulation(),
			edges: Vec::new(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			animation_running: true,
			alpha: 0.0,
		}
	}

	/// Rebuild the simulation from the authoritative graph. Nodes that were
	/// already laid out keep their position and anchoring; new nodes spawn on
	/// a small ring around their seed position.
	pub fn sync(&mut self, data: &Graph, legend: &[Group]) {
		let mut previous: HashMap<NodeId, (f32, f32, bool)> = HashMap::new();
		let mut dragged = None;
		self.graph.visit_nodes(|node| {
			if self.drag.node_idx == Some(node.index()) {
				dragged = Some(node.data.user_data.id.clone());
			}
			previous.insert(
				node.data.user_data.id.clone(),
				(node.x(), node.y(), node.data.is_anchor),
			);
		});

		let mut graph = simulation();
		let mut id_to_idx = HashMap::new();
		let count = data.nodes.len().max(1) as f64;

		for (i, node) in data.nodes.iter().enumerate() {
			let color = node
				.group
				.as_ref()
				.map(|g| group_color(g, legend))
				.unwrap_or(COLORS[0]);
			let (x, y, is_anchor) = previous.get(&node.id).copied().unwrap_or_else(|| {
				let angle = (i as f64) * 2.0 * PI / count;
				let (cx, cy) = (node.x.unwrap_or(0.0), node.y.unwrap_or(0.0));
				(
					(cx + SPAWN_RADIUS * angle.cos()) as f32,
					(cy + SPAWN_RADIUS * angle.sin()) as f32,
					false,
				)
			});

			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: NodeInfo {
					id: node.id.clone(),
					color: color.into(),
				},
			});
			// duplicate ids: links attach to the first node carrying the id
			id_to_idx.entry(node.id.clone()).or_insert(idx);
		}

		let mut edges = Vec::new();
		for link in &data.links {
			if let (Some(&src), Some(&tgt)) =
				(id_to_idx.get(link.source.id()), id_to_idx.get(link.target.id()))
			{
				let color = if link.group.is_default() {
					DEFAULT_LINK_COLOR
				} else {
					group_color(&link.group, legend)
				};
				graph.add_edge(
					src,
					tgt,
					EdgeData {
						user_data: LinkInfo {
							color: color.into(),
							width: link.value.max(0.0).sqrt(),
						},
					},
				);
				edges.push((src, tgt));
			}
		}

		self.graph = graph;
		self.edges = edges;
		// indices from the previous simulation are gone
		self.hover = HoverState::default();
		self.drag.node_idx = dragged.and_then(|id| id_to_idx.get(&id).copied());
		if self.drag.node_idx.is_none() {
			self.drag.active = false;
		}
	}

	pub fn reheat(&mut self, heat: Reheat) {
		self.alpha = self.alpha.max(heat.energy());
		self.animation_running = true;
	}

	pub fn halt(&mut self) {
		self.animation_running = false;
	}

	pub fn is_cooling(&self) -> bool {
		self.animation_running && self.alpha >= ALPHA_MIN
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for &(src, tgt) in &self.edges {
				if src == idx {
					self.hover.neighbors.insert(tgt);
				} else if tgt == idx {
					self.hover.neighbors.insert(src);
				}
			}
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f32) {
		if self.is_cooling() {
			self.graph.update(dt);
			self.alpha += (0.0 - self.alpha) * ALPHA_DECAY;
		}

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph_sync::{Link, Node};

	fn graph() -> Graph {
		Graph {
			nodes: vec![
				Node::new("A", Some(Group::Label("b".into()))),
				Node::new("B", Some(Group::Label("c".into()))),
				Node::new("C", None),
			],
			links: vec![
				Link::new("A", "B", Group::Index(0), 4.0),
				Link::new("B", "C", Group::Label("c".into()), 1.0),
			],
		}
	}

	fn legend() -> Vec<Group> {
		["a", "b", "c"].iter().map(|s| Group::Label(s.to_string())).collect()
	}

	#[test]
	fn colors_follow_legend_order() {
		let legend = legend();
		assert_eq!(group_color(&legend[1], &legend), COLORS[1]);
		assert_eq!(group_color(&Group::Index(12), &legend), COLORS[2]);
	}

	#[test]
	fn sync_builds_nodes_and_styled_edges() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		state.sync(&graph(), &legend());

		let mut nodes = 0;
		state.graph.visit_nodes(|_| nodes += 1);
		assert_eq!(nodes, 3);

		let mut styles = Vec::new();
		state
			.graph
			.visit_edges(|_, _, edge| styles.push((edge.user_data.color.clone(), edge.user_data.width)));
		assert_eq!(styles.len(), 2);
		assert!(styles.contains(&(DEFAULT_LINK_COLOR.to_string(), 2.0)));
		assert!(styles.contains(&(COLORS[2].to_string(), 1.0)));
	}

	#[test]
	fn sync_keeps_positions_of_surviving_nodes() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		let mut data = graph();
		state.sync(&data, &legend());
		state.graph.visit_nodes_mut(|node| {
			if node.data.user_data.id.as_str() == "A" {
				node.data.x = 42.0;
				node.data.y = -7.0;
			}
		});

		data.nodes.remove(2);
		data.links.pop();
		state.sync(&data, &legend());

		let mut seen = None;
		state.graph.visit_nodes(|node| {
			if node.data.user_data.id.as_str() == "A" {
				seen = Some((node.x(), node.y()));
			}
		});
		assert_eq!(seen, Some((42.0, -7.0)));
	}

	#[test]
	fn reheat_and_halt_control_cooling() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		assert!(!state.is_cooling());
		state.reheat(Reheat::Strong);
		assert!(state.is_cooling());
		state.reheat(Reheat::Gentle);
		assert_eq!(state.alpha, Reheat::Strong.energy());

		state.halt();
		assert!(!state.is_cooling());
		state.reheat(Reheat::Gentle);
		assert!(state.animation_running);
	}

	#[test]
	fn alpha_decays_below_threshold() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		state.reheat(Reheat::Gentle);
		for _ in 0..1000 {
			state.tick(0.016);
		}
		assert!(state.alpha < ALPHA_MIN);
		assert!(!state.is_cooling());
	}
}
