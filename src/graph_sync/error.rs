use thiserror::Error;

use super::model::NodeId;

/// Every failure the sync core and the UI relay can run into.
///
/// None of these are fatal: callers log them and carry on.
#[derive(Debug, Error)]
pub enum SyncError {
	/// A link references a node id that is not in the graph.
	#[error("link {from} -> {to} references a missing node")]
	MalformedLink {
		/// Resolved source id.
		from: NodeId,
		/// Resolved target id.
		to: NodeId,
	},
	/// The underlying socket failed or is not open.
	#[error("transport error: {0}")]
	Transport(String),
	/// A message carried a `type` outside the recognized set.
	#[error("unknown message type `{0}`")]
	UnknownMessageType(String),
	/// A text frame was not a valid message envelope.
	#[error("undecodable frame: {0}")]
	Decode(#[from] serde_json::Error),
	/// A configuration value could not be used.
	#[error("invalid configuration: {0}")]
	Config(String),
	/// A relay event carried data of the wrong shape.
	#[error("malformed relay event: {0}")]
	MalformedEvent(String),
	/// A binary relay frame was truncated or malformed.
	#[error("malformed binary frame: {0}")]
	BinaryFrame(String),
}
