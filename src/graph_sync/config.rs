//! Panel options: defaults, JSON, or the page's query string.

use serde::Deserialize;
use url::Url;

use super::error::SyncError;

/// Port of the graph socket unless configured.
pub const DEFAULT_TRANSPORT_PORT: u16 = 8000;
/// Credit cap unless configured.
pub const DEFAULT_MAX_MESSAGES: i64 = 500;
/// Graph file loaded by `?static` with no value.
pub const DEFAULT_STATIC_GRAPH: &str = "force.json";

/// What `add` does with a node whose id is already present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateIds {
	/// Insert it anyway; the graph may hold several nodes with one id.
	#[default]
	Allow,
	/// Ignore the incoming node.
	Skip,
}

/// Options recognized by a graph panel.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// Host of the graph socket.
	pub transport_host: String,
	/// Port of the graph socket.
	pub transport_port: u16,
	/// Credit cap; values below 1 mean unbounded.
	pub max_messages: i64,
	/// Per-message tracing and the `Debug` console level.
	pub debug_logging: bool,
	/// Sent once when the session starts; names the graph to simulate.
	pub initial_payload: String,
	/// Policy for `add` entries whose id is already present.
	pub duplicate_ids: DuplicateIds,
	/// Port of the UI relay socket. `None` leaves the relay off.
	pub relay_port: Option<u16>,
	/// URL of a JSON graph to load once instead of opening the graph socket.
	pub static_graph: Option<String>,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			transport_host: "127.0.0.1".into(),
			transport_port: DEFAULT_TRANSPORT_PORT,
			max_messages: DEFAULT_MAX_MESSAGES,
			debug_logging: false,
			initial_payload: String::new(),
			duplicate_ids: DuplicateIds::Allow,
			relay_port: None,
			static_graph: None,
		}
	}
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SyncError> {
	value
		.parse()
		.map_err(|_| SyncError::Config(format!("`{key}` has invalid value `{value}`")))
}

impl SyncConfig {
	/// Parse a JSON object; missing fields keep their defaults.
	pub fn from_json(json: &str) -> Result<Self, SyncError> {
		serde_json::from_str(json).map_err(|e| SyncError::Config(e.to_string()))
	}

	/// Overlay options from a URL query string such as `?port=8001&max=0&debug`.
	/// Unknown keys are ignored.
	pub fn from_query(query: &str) -> Result<Self, SyncError> {
		let mut config = Self::default();
		let query = query.trim_start_matches('?');
		for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
			match key.as_ref() {
				"port" => config.transport_port = parse(&key, &value)?,
				"host" => config.transport_host = value.into_owned(),
				"max" => config.max_messages = parse(&key, &value)?,
				"debug" => config.debug_logging = value.is_empty() || parse::<bool>(&key, &value)?,
				"graph" => config.initial_payload = value.into_owned(),
				"relay" => config.relay_port = Some(parse(&key, &value)?),
				"static" => {
					config.static_graph = Some(if value.is_empty() {
						DEFAULT_STATIC_GRAPH.to_owned()
					} else {
						value.into_owned()
					})
				}
				"duplicates" => {
					config.duplicate_ids = match value.as_ref() {
						"allow" => DuplicateIds::Allow,
						"skip" => DuplicateIds::Skip,
						other => {
							return Err(SyncError::Config(format!(
								"`duplicates` must be `allow` or `skip`, got `{other}`"
							)));
						}
					}
				}
				_ => {}
			}
		}
		Ok(config)
	}

	/// Endpoint of the graph socket.
	pub fn graph_endpoint(&self) -> Result<Url, SyncError> {
		let raw = format!("ws://{}:{}/ws", self.transport_host, self.transport_port);
		Url::parse(&raw).map_err(|e| SyncError::Config(format!("{raw}: {e}")))
	}

	/// Endpoint of the relay socket on the page's host, `wss` when the page is served over https.
	pub fn relay_endpoint(&self, page_protocol: &str, page_host: &str) -> Option<Result<Url, SyncError>> {
		let port = self.relay_port?;
		let scheme = if page_protocol == "https:" { "wss" } else { "ws" };
		let raw = format!("{scheme}://{page_host}:{port}/");
		Some(Url::parse(&raw).map_err(|e| SyncError::Config(format!("{raw}: {e}"))))
	}
}
