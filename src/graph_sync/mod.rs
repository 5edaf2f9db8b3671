//! Client-side graph state kept in step with a remote source over a
//! credit-paced message exchange.

mod config;
mod error;
mod message;
mod model;
mod session;

pub use config::{DEFAULT_MAX_MESSAGES, DEFAULT_STATIC_GRAPH, DEFAULT_TRANSPORT_PORT, DuplicateIds, SyncConfig};
pub use error::SyncError;
pub use message::{LinkKey, LinkMeta, Message, NodeMeta};
pub use model::{Endpoint, Graph, Group, Link, Node, NodeId};
pub use session::{
	Detached, GraphSyncSession, REQUEST_DONE, REQUEST_NEXT, Renderer, Reheat, Request, Transport,
};
