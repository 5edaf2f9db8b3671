//! The relay's binary frames, one protobuf message:
//!
//! ```text
//! message BinaryDataMsg {
//!   string event  = 1;
//!   string elt_id = 2;
//!   int32  size   = 3;
//!   bytes  data   = 4;
//! }
//! ```

use crate::graph_sync::SyncError;

/// A decoded binary relay frame.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BinaryDataMsg {
	/// What kind of payload this is, e.g. `"image"`.
	#[prost(string, tag = "1")]
	pub event: String,
	/// Target element id.
	#[prost(string, tag = "2")]
	pub elt_id: String,
	/// Declared payload length; zero or negative means "use all of `data`".
	#[prost(int32, tag = "3")]
	pub size: i32,
	/// Raw payload.
	#[prost(bytes = "vec", tag = "4")]
	pub data: Vec<u8>,
}

impl BinaryDataMsg {
	/// Decode a frame. Unknown fields are skipped.
	pub fn decode(buf: &[u8]) -> Result<Self, SyncError> {
		<Self as prost::Message>::decode(buf).map_err(|e| SyncError::BinaryFrame(e.to_string()))
	}

	/// The payload, cut to `size` when a positive size is declared.
	pub fn payload(&self) -> &[u8] {
		match usize::try_from(self.size) {
			Ok(size) if size > 0 && size < self.data.len() => &self.data[..size],
			_ => &self.data,
		}
	}

	/// Content type for the payload when it is turned into a blob.
	pub fn mime_type(&self) -> &'static str {
		match self.event.as_str() {
			"image" | "video" | "frame" => "image/jpeg",
			"png" => "image/png",
			_ => "application/octet-stream",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use prost::Message as _;

	fn frame(event: &str, id: &str, size: i32, data: &[u8]) -> Vec<u8> {
		BinaryDataMsg {
			event: event.into(),
			elt_id: id.into(),
			size,
			data: data.to_vec(),
		}
		.encode_to_vec()
	}

	#[test]
	fn decodes_every_field() {
		let msg = BinaryDataMsg::decode(&frame("image", "cam", 3, &[1, 2, 3, 4, 5])).unwrap();
		assert_eq!(msg.event, "image");
		assert_eq!(msg.elt_id, "cam");
		assert_eq!(msg.size, 3);
		assert_eq!(msg.payload(), &[1, 2, 3]);
		assert_eq!(msg.mime_type(), "image/jpeg");
	}

	#[test]
	fn non_positive_size_keeps_everything() {
		let msg = BinaryDataMsg::decode(&frame("blob", "x", -1, &[9, 9])).unwrap();
		assert_eq!(msg.size, -1);
		assert_eq!(msg.payload(), &[9, 9]);

		let msg = BinaryDataMsg::decode(&frame("blob", "x", 0, &[7])).unwrap();
		assert_eq!(msg.payload(), &[7]);
		assert_eq!(msg.mime_type(), "application/octet-stream");
	}

	#[test]
	fn unknown_fields_are_skipped() {
		// field 9 varint 300, then field 10 fixed32
		let mut buf = vec![0x48, 0xac, 0x02, 0x55, 0, 0, 0, 0];
		buf.extend(frame("image", "cam", 0, b"jpg"));
		let msg = BinaryDataMsg::decode(&buf).unwrap();
		assert_eq!(msg.elt_id, "cam");
		assert_eq!(msg.data, b"jpg");
	}

	#[test]
	fn truncated_frames_fail() {
		let full = frame("image", "cam", 0, &[1, 2, 3, 4]);
		let err = BinaryDataMsg::decode(&full[..full.len() - 2]).unwrap_err();
		assert!(matches!(err, SyncError::BinaryFrame(_)));
		assert!(BinaryDataMsg::decode(&[0x80]).is_err());
	}

	#[test]
	fn empty_frame_is_empty_message() {
		assert_eq!(BinaryDataMsg::decode(&[]).unwrap(), BinaryDataMsg::default());
	}
}
