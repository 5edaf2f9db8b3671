use std::cell::RefCell;
use std::rc::Rc;

use crate::graph_sync::{Graph, Group, Reheat, Renderer};

use super::state::ForceGraphState;

/// Feeds the authoritative graph into the canvas simulation shared with the
/// animation loop and the pointer handlers.
#[derive(Clone)]
pub struct CanvasRenderer {
	state: Rc<RefCell<Option<ForceGraphState>>>,
}

impl CanvasRenderer {
	pub fn new(state: Rc<RefCell<Option<ForceGraphState>>>) -> Self {
		Self { state }
	}
}

impl Renderer for CanvasRenderer {
	fn render(&mut self, graph: &Graph, legend: &[Group]) {
		if let Some(ref mut s) = *self.state.borrow_mut() {
			s.sync(graph, legend);
		}
	}

	fn reheat(&mut self, heat: Reheat) {
		if let Some(ref mut s) = *self.state.borrow_mut() {
			s.reheat(heat);
		}
	}

	fn halt(&mut self) {
		if let Some(ref mut s) = *self.state.borrow_mut() {
			s.halt();
		}
	}

	// world origin sits at the canvas centre
	fn placeholder_position(&self) -> Option<(f64, f64)> {
		Some((0.0, 0.0))
	}
}
