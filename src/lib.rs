//! Live force-directed graph panel for the browser.
//!
//! [`graph_sync`] keeps a local copy of a remote graph in step over a
//! client-paced WebSocket exchange; [`ui_relay`] is the optional second
//! channel that pushes property updates into the page.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info, warn};

pub mod graph_sync;
pub mod ui_relay;

// Modules
mod components;
mod pages;
mod socket;

// Top-Level pages
use crate::graph_sync::SyncConfig;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
///
/// `verbose` lowers the filter from `Info` to `Debug`, which is where
/// per-message traces land.
pub fn init_logging(verbose: bool) {
	let level = if verbose { Level::Debug } else { Level::Info };
	let _ = console_log::init_with_level(level);
	console_error_panic_hook::set_once();
	info!("Logging initialized at {level}");
}

/// Configuration from the page's query string, or the defaults when it
/// cannot be read or parsed.
pub fn page_config() -> SyncConfig {
	let query = web_sys::window()
		.and_then(|w| w.location().search().ok())
		.unwrap_or_default();
	SyncConfig::from_query(&query).unwrap_or_else(|e| {
		warn!("{e}; using defaults");
		SyncConfig::default()
	})
}

/// An app router which renders the live graph and handles 404's
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />

		// sets the document title
		<Title text="Live Graph" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
