use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{info, warn};
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
	CanvasRenderingContext2d, HtmlAnchorElement, HtmlCanvasElement, KeyboardEvent, MouseEvent, Response,
	WheelEvent, Window,
};

use super::render;
use super::renderer::CanvasRenderer;
use super::state::ForceGraphState;
use crate::graph_sync::{Detached, GraphSyncSession, Reheat, Renderer, SyncConfig, Transport};
use crate::socket::{self, SocketHandlers, WsTransport};

type Session<T> = Rc<RefCell<GraphSyncSession<T, CanvasRenderer>>>;

/// Everything that must outlive the mount effect. Dropping it unhooks the
/// keyboard and closes the graph socket.
struct LiveLink {
	keys: Closure<dyn FnMut(KeyboardEvent)>,
	shutdown: Box<dyn Fn()>,
	_socket: Option<SocketHandlers>,
}

impl Drop for LiveLink {
	fn drop(&mut self) {
		if let Some(document) = web_sys::window().and_then(|w| w.document()) {
			let _ = document.remove_event_listener_with_callback("keypress", self.keys.as_ref().unchecked_ref());
		}
		(self.shutdown)();
	}
}

/// Download the canvas as a PNG.
fn export_image(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
	let url = canvas.to_data_url_with_type("image/png")?;
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| JsValue::from_str("no document"))?;
	let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
	anchor.set_href(&url);
	anchor.set_download("graph.png");
	anchor.click();
	Ok(())
}

fn key_bindings<T: Transport + 'static>(
	session: Session<T>,
	canvas: HtmlCanvasElement,
) -> Closure<dyn FnMut(KeyboardEvent)> {
	let keys = Closure::<dyn FnMut(KeyboardEvent)>::new(move |ev: KeyboardEvent| match ev.key().as_str() {
		"i" => {
			session.borrow_mut().renderer_mut().halt();
			if let Err(e) = export_image(&canvas) {
				warn!("Could not export the graph image: {e:?}");
			}
		}
		"n" => info!("Step {}", session.borrow().step()),
		"s" => session.borrow_mut().stop(),
		_ => {}
	});
	if let Some(document) = web_sys::window().and_then(|w| w.document()) {
		let _ = document.add_event_listener_with_callback("keypress", keys.as_ref().unchecked_ref());
	}
	keys
}

async fn fetch_text(url: &str) -> Result<String, JsValue> {
	let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
	let response: Response = JsFuture::from(window.fetch_with_str(url)).await?.dyn_into()?;
	if !response.ok() {
		return Err(JsValue::from_str(&format!("{url}: HTTP {}", response.status())));
	}
	JsFuture::from(response.text()?)
		.await?
		.as_string()
		.ok_or_else(|| JsValue::from_str("response body is not text"))
}

/// Load `source` once; no socket is opened.
fn load_static(
	source: &str,
	config: &SyncConfig,
	state: Rc<RefCell<Option<ForceGraphState>>>,
	canvas: HtmlCanvasElement,
) -> LiveLink {
	let session: Session<Detached> =
		Rc::new(RefCell::new(GraphSyncSession::new(config, Detached, CanvasRenderer::new(state))));
	let (session_load, source) = (session.clone(), source.to_owned());
	leptos::task::spawn_local(async move {
		match fetch_text(&source).await {
			Ok(text) => {
				if let Err(e) = session_load.borrow_mut().load(&text) {
					warn!("{source}: {e}");
				}
			}
			Err(e) => warn!("Could not fetch {source}: {e:?}"),
		}
	});
	LiveLink {
		keys: key_bindings(session, canvas),
		shutdown: Box::new(|| {}),
		_socket: None,
	}
}

fn connect(
	config: &SyncConfig,
	state: Rc<RefCell<Option<ForceGraphState>>>,
	canvas: HtmlCanvasElement,
) -> Option<LiveLink> {
	if let Some(source) = &config.static_graph {
		return Some(load_static(source, config, state, canvas));
	}
	let endpoint = match config.graph_endpoint() {
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
	let session: Session<WsTransport> = Rc::new(RefCell::new(GraphSyncSession::new(
		config,
		transport,
		CanvasRenderer::new(state),
	)));
	let handlers = socket::attach(&ws, session.clone());
	session.borrow_mut().start();

	let session_close = session.clone();
	Some(LiveLink {
		keys: key_bindings(session, canvas),
		shutdown: Box::new(move || session_close.borrow_mut().close()),
		_socket: Some(handlers),
	})
}

/// Canvas graph panel kept in sync with a remote graph source.
#[component]
pub fn LiveForceGraph(
	#[prop(into)] config: SyncConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<ForceGraphState>>> = Rc::new(RefCell::new(None));
	let link_init: Rc<RefCell<Option<LiveLink>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let frame = Rc::new(Cell::new(0));
	let (state_init, animate_init, resize_cb_init, frame_init) =
		(state.clone(), animate.clone(), resize_cb.clone(), frame.clone());

	// unhook window listeners, stop the frame loop, close the socket
	let teardown = SendWrapper::new((link_init.clone(), animate.clone(), resize_cb.clone(), frame.clone()));
	on_cleanup(move || {
		let (link, animate, resize_cb, frame) = teardown.take();
		if let Some(win) = web_sys::window() {
			let _ = win.cancel_animation_frame(frame.get());
			if let Some(cb) = resize_cb.borrow_mut().take() {
				let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		animate.borrow_mut().take();
		link.borrow_mut().take();
	});

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if link_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let inner_size = |win: &Window| {
			(
				win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0),
				win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0),
			)
		};

		let (w, h) = if fullscreen {
			inner_size(&window)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into().ok())
		{
			Some(ctx) => ctx,
			None => {
				warn!("Canvas has no 2d context");
				return;
			}
		};
		*state_init.borrow_mut() = Some(ForceGraphState::new(w, h));
		*link_init.borrow_mut() = connect(&config, state_init.clone(), canvas.clone());

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = inner_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner, frame_inner) =
			(state_init.clone(), animate_init.clone(), frame_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				render::render(s, &ctx);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				if let Ok(id) = win.request_animation_frame(cb.as_ref().unchecked_ref()) {
					frame_inner.set(id);
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				frame_init.set(id);
			}
		}
	});

	let pointer = move |ev: &MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
		let rect = canvas.get_bounding_client_rect();
		Some((
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		))
	};

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(&ev) else {
			return;
		};

		if let Some(ref mut s) = *state_md.borrow_mut() {
			if let Some(idx) = s.node_at_position(x, y) {
				s.drag.active = true;
				s.drag.node_idx = Some(idx);
				s.drag.start_x = x;
				s.drag.start_y = y;
				s.graph.visit_nodes(|node| {
					if node.index() == idx {
						s.drag.node_start_x = node.x();
						s.drag.node_start_y = node.y();
					}
				});
				s.reheat(Reheat::Drag);
			} else {
				s.pan.active = true;
				s.pan.start_x = x;
				s.pan.start_y = y;
				s.pan.transform_start_x = s.transform.x;
				s.pan.transform_start_y = s.transform.y;
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(&ev) else {
			return;
		};

		if let Some(ref mut s) = *state_mm.borrow_mut() {
			// Update hover state when not dragging
			if !s.drag.active {
				let hovered = s.node_at_position(x, y);
				s.set_hover(hovered);
			}

			if s.drag.active {
				if let Some(idx) = s.drag.node_idx {
					let (dx, dy) = (
						(x - s.drag.start_x) / s.transform.k,
						(y - s.drag.start_y) / s.transform.k,
					);
					let (nx, ny) = (
						s.drag.node_start_x + dx as f32,
						s.drag.node_start_y + dy as f32,
					);
					s.graph.visit_nodes_mut(|node| {
						if node.index() == idx {
							node.data.x = nx;
							node.data.y = ny;
							node.data.is_anchor = true;
						}
					});
					s.reheat(Reheat::Drag);
				}
			} else if s.pan.active {
				s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
				s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
			}
		}
	};

	// released nodes rejoin the simulation
	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			if let (true, Some(idx)) = (s.drag.active, s.drag.node_idx) {
				s.graph.visit_nodes_mut(|node| {
					if node.index() == idx {
						node.data.is_anchor = false;
					}
				});
			}
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
			s.set_hover(None);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(&ev) else {
			return;
		};

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(1.0 / 32.0, 64.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
