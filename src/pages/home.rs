use leptos::prelude::*;

use crate::components::force_graph::LiveForceGraph;
use crate::components::relay::{AsyncUpdate, Trigger};
use crate::page_config;
use crate::ui_relay::{PropertyRegistry, display_text};

/// Element the relay writes its status text into.
const STATUS_ID: &str = "graph-status";
/// Element the relay fires `refresh` events at.
const REFRESH_ID: &str = "graph-refresh";

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = page_config();
	let registry = PropertyRegistry::new();
	let status = registry.property(STATUS_ID, "children");
	let refreshes = RwSignal::new(0u32);

	// relay widgets only exist when a relay port was given
	let relay_overlay = config.relay_port.is_some().then(|| {
		view! {
			<p id=STATUS_ID class="subtitle">{move || display_text(&status.get())}</p>
			<Trigger id=REFRESH_ID event_type="refresh" triggers=refreshes />
			<p class="subtitle">{move || format!("{} refreshes", refreshes.get())}</p>
		}
	});
	let relay = config
		.relay_port
		.is_some()
		.then(|| view! { <AsyncUpdate config=config.clone() registry=registry /> });

	view! {
		<div class="fullscreen-graph">
			<LiveForceGraph config=config fullscreen=true />
			<div class="graph-overlay">
				<h1>"Live Graph"</h1>
				<p class="subtitle">"Press n to log the step, s to stop. Drag nodes, scroll to zoom."</p>
				{relay_overlay}
			</div>
			{relay}
		</div>
	}
}
