use leptos::prelude::*;
use live_force_graph::{App, init_logging, page_config};

fn main() {
	init_logging(page_config().debug_logging);
	mount_to_body(App)
}
