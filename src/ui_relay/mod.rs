//! Secondary server-push channel that writes element properties, figures,
//! DOM events and binary blobs into the page.

mod binary;
mod client;
mod event;
mod registry;

pub use binary::BinaryDataMsg;
pub use client::{RELAY_CONNECT, RELAY_DISCONNECT, RelayClient, UiSink};
pub use event::{PropertyChange, TriggerSpec, UiEvent};
pub use registry::{PropertyRegistry, display_text};
