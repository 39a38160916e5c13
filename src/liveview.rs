//! WLED binary live-view frames.
//!
//! A frame is `'L'`, a format version byte, (for version 2, two bytes of matrix dimensions,) then one RGB triple per LED.

/// First byte of every live-view frame.
pub const MAGIC: u8 = b'L';

/// Decodes a frame into a comma-separated list of `rgb(r,g,b)` colour stops.
///
/// Returns [`None`] for frames that aren't live-view frames or carry no complete triple.
/// A trailing partial triple is ignored.
#[must_use]
pub fn decode_frame(frame: &[u8]) -> Option<String> {
	let (&magic, rest) = frame.split_first()?;
	if magic != MAGIC {
		return None;
	}
	let offset = if rest.first() == Some(&2) { 4 } else { 2 };
	let pixels = frame.get(offset..)?;

	let stops: Vec<String> = pixels.chunks_exact(3).map(|rgb| format!("rgb({},{},{})", rgb[0], rgb[1], rgb[2])).collect();
	if stops.is_empty() {
		None
	} else {
		Some(stops.join(","))
	}
}
